use draftwatch::{auth, list_drafts};

use crate::context::CommandContext;
use crate::output::{drafts_text, emit};

pub async fn list(ctx: &CommandContext) -> anyhow::Result<()> {
	let mut watcher = ctx.online_watcher()?;
	let session = watcher.session_mut();
	auth::login(session).await?;
	let drafts = list_drafts(session).await?;
	emit(ctx.format, &drafts, |d| drafts_text(d))
}
