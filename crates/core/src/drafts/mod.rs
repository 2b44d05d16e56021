//! Draft lifecycle workflows.
//!
//! Each workflow is a fixed sequence of page loads and partial submits
//! against one [`Session`]. Nothing here retries a step on its own except
//! the list re-fetch that waits out server-side consistency after a
//! duplicate; the caller decides what a failure means for the cycle.

mod address;
mod duplicate;
pub mod naming;
mod plan;
mod rename;

use std::time::Duration;

use draftwatch_protocol::PartialResponse;
use tracing::{debug, info};

pub use address::correct_address;
pub use duplicate::{DuplicateOutcome, duplicate_draft};
pub use plan::{plan_and_poll, poll_plan};
pub use rename::rename_draft;

use crate::auth;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::extract::{DraftRecord, find_by_name, parse_draft_table};
use crate::session::Session;
use crate::transport::Page;

/// Timing knobs of the workflows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftSettings {
	pub poll_interval: Duration,
	pub poll_attempts: u32,
	pub consistency_attempts: u32,
	pub consistency_backoff: Duration,
}

impl DraftSettings {
	pub fn from_config(config: &Config) -> Self {
		Self {
			poll_interval: config.poll_interval(),
			poll_attempts: config.poll.max_attempts,
			consistency_attempts: config.consistency.attempts,
			consistency_backoff: config.consistency_backoff(),
		}
	}
}

impl Default for DraftSettings {
	fn default() -> Self {
		Self::from_config(&Config::default())
	}
}

/// Draft table rows of the current account.
pub async fn list_drafts(session: &mut Session) -> Result<Vec<DraftRecord>> {
	let (_, drafts) = fetch_draft_page(session).await?;
	info!(target = "dw.drafts", count = drafts.len(), "listed drafts");
	Ok(drafts)
}

/// Loads the draft page, logging in again once if the session has expired.
/// The re-login returns to the account that was active.
pub(crate) async fn fetch_draft_page(session: &mut Session) -> Result<(Page, Vec<DraftRecord>)> {
	let url = session.endpoints().drafts.clone();
	let page = match session.load(&url).await {
		Err(Error::SessionExpired) => {
			debug!(target = "dw.drafts", "draft page bounced to login; re-authenticating");
			let account = session.active_account_id().map(str::to_string);
			auth::relogin(session, account.as_deref()).await?;
			session.load(&url).await?
		}
		other => other?,
	};
	let drafts = parse_draft_table(&page.body);
	Ok((page, drafts))
}

/// Re-fetches the list until a row named `name` appears, backing off
/// exponentially from `consistency_backoff` between attempts.
pub(crate) async fn await_row_named(
	session: &mut Session,
	name: &str,
	settings: &DraftSettings,
) -> Result<(Page, DraftRecord)> {
	for attempt in 0..settings.consistency_attempts {
		tokio::time::sleep(settings.consistency_backoff * 2u32.saturating_pow(attempt)).await;
		let (page, drafts) = fetch_draft_page(session).await?;
		if let Some(row) = find_by_name(&drafts, name) {
			let row = row.clone();
			return Ok((page, row));
		}
		debug!(target = "dw.drafts", %name, attempt, "row not listed yet");
	}
	Err(Error::not_found(format!("draft row named {name:?}")))
}

/// Resolves the in-band redirect a partial response must carry.
pub(crate) fn required_redirect(session: &Session, page: &Page, what: &str) -> Result<String> {
	let response = PartialResponse::parse(&page.body);
	let target = response.redirect().ok_or_else(|| Error::not_found(format!("{what} redirect")))?;
	session.endpoints().resolve(target)
}


#[cfg(test)]
mod tests {
	use super::*;
	use super::fixtures::scripted_session as session;
	use crate::auth::fixtures::{account_table, header_page, login_page, switch_ack};
	use crate::extract::drafts::fixtures::{draft_page, draft_row};

	#[tokio::test]
	async fn lists_rows_of_draft_page() {
		let (mut session, controller) = session();
		controller.reply(draft_page(&[draft_row(0, "Spring", "Reno, NV", "k1")], "t"));
		let drafts = list_drafts(&mut session).await.unwrap();
		assert_eq!(drafts.len(), 1);
		assert_eq!(drafts[0].created, "k1");
	}

	#[tokio::test]
	async fn list_logs_in_again_once_when_bounced() {
		let (mut session, controller) = session();
		controller
			.reply_at("https://app.test/login.jsf", "<html>login</html>")
			.reply(login_page("l1"))
			.reply_at("https://app.test/draft.jsf", "<html>home</html>")
			.reply("<html>no menu</html>")
			.reply(draft_page(&[draft_row(0, "Spring", "Reno, NV", "k1")], "t"));

		let drafts = list_drafts(&mut session).await.unwrap();
		assert_eq!(drafts.len(), 1);
		assert_eq!(controller.cookie_clears(), 1);
		assert_eq!(controller.pending(), 0);
	}

	#[tokio::test]
	async fn relisting_after_bounce_happens_in_the_same_account() {
		let (mut session, controller) = session();
		session.set_active_account("202", Some("Babil Design"));
		let accounts = [("101", "Acme Store"), ("202", "Babil Design")];
		controller
			.reply_at("https://app.test/login.jsf", "<html>login</html>")
			.reply(login_page("l1"))
			.reply_at("https://app.test/draft.jsf", "<html>home</html>")
			.reply(header_page("Acme Store", "h1"))
			.reply(account_table(&accounts, "m1"))
			.reply(header_page("Acme Store", "h2"))
			.reply(switch_ack("Babil Design", "s1"))
			.reply(header_page("Babil Design", "h3"))
			.reply(account_table(&accounts, "m2"))
			.reply(draft_page(&[draft_row(0, "Babil Spring", "Reno, NV", "k9")], "t"));

		let drafts = list_drafts(&mut session).await.unwrap();
		assert_eq!(drafts[0].created, "k9");
		assert_eq!(session.active_account_id(), Some("202"));
		assert_eq!(controller.pending(), 0);
	}

	#[tokio::test]
	async fn second_bounce_surfaces_session_expired() {
		let (mut session, controller) = session();
		controller
			.reply_at("https://app.test/login.jsf", "<html>login</html>")
			.reply(login_page("l1"))
			.reply_at("https://app.test/draft.jsf", "<html>home</html>")
			.reply("<html>no menu</html>")
			.reply_at("https://app.test/login.jsf", "<html>login</html>");

		assert!(matches!(list_drafts(&mut session).await, Err(Error::SessionExpired)));
	}

	#[tokio::test]
	async fn waits_for_row_with_bounded_attempts() {
		let (mut session, controller) = session();
		let settings = DraftSettings {
			consistency_attempts: 2,
			consistency_backoff: Duration::ZERO,
			..DraftSettings::default()
		};
		controller
			.reply(draft_page(&[draft_row(0, "Old", "Reno, NV", "k1")], "t1"))
			.reply(draft_page(&[draft_row(0, "Old", "Reno, NV", "k1")], "t2"));
		assert!(matches!(
			await_row_named(&mut session, "New", &settings).await,
			Err(Error::ElementNotFound { .. })
		));

		controller
			.reply(draft_page(&[draft_row(0, "Old", "Reno, NV", "k1")], "t3"))
			.reply(draft_page(&[draft_row(0, "New", "Reno, NV", "k2")], "t4"));
		let (_, row) = await_row_named(&mut session, "New", &settings).await.unwrap();
		assert_eq!(row.created, "k2");
	}
}
