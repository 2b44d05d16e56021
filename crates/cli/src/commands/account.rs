use draftwatch::auth;
use serde::Serialize;

use crate::context::CommandContext;
use crate::output::{accounts_text, emit};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginSummary<'a> {
	email: &'a str,
	active_account: Option<&'a str>,
	accounts: usize,
}

pub async fn login(ctx: &CommandContext) -> anyhow::Result<()> {
	let mut watcher = ctx.online_watcher()?;
	let session = watcher.session_mut();
	auth::login(session).await?;

	let summary = LoginSummary {
		email: &session.credentials().email,
		active_account: session.active_account_name(),
		accounts: session.accounts().len(),
	};
	emit(ctx.format, &summary, |s| {
		format!(
			"logged in as {} (active account: {}, {} accounts)",
			s.email,
			s.active_account.unwrap_or("unknown"),
			s.accounts
		)
	})
}

pub async fn accounts(ctx: &CommandContext) -> anyhow::Result<()> {
	let mut watcher = ctx.online_watcher()?;
	let session = watcher.session_mut();
	auth::login(session).await?;
	emit(ctx.format, &session.accounts().to_vec(), |a| accounts_text(a))
}

pub async fn switch(ctx: &CommandContext, row_key: &str) -> anyhow::Result<()> {
	let mut watcher = ctx.online_watcher()?;
	let session = watcher.session_mut();
	auth::login(session).await?;
	auth::switch_account(session, row_key).await?;
	emit(ctx.format, &session.accounts().to_vec(), |a| accounts_text(a))
}
