//! Plan creation and progress polling.

use draftwatch_protocol::{MAIN_FORM, PartialRequest};
use tracing::{debug, info, warn};

use super::{DraftSettings, fetch_draft_page, required_redirect};
use crate::error::{Error, Result};
use crate::extract::{FormFields, collect_form_fields, detail, find_by_created};
use crate::session::Session;

const CREATE_PLAN: &str = "mainForm:create_plan";
const STATUS_POLL: &str = "mainForm:planingStatusDialogPoll";
const POLL_RENDER: &str = "mainForm:shipmentPlansPanel mainForm:a2dw_boxContentPanel mainForm:progressBarPlaning";
/// Progress above this, followed by a reset to zero, means the plan is done.
const COMPLETION_PEAK: u32 = 50;

/// Opens the draft keyed by `created`, starts planning and polls until the
/// plan completes. Returns the final poll response body.
pub async fn plan_and_poll(session: &mut Session, created: &str, settings: &DraftSettings) -> Result<String> {
	let (page, drafts) = fetch_draft_page(session).await?;
	let row = find_by_created(&drafts, created).ok_or_else(|| Error::not_found(format!("draft row created {created}")))?;
	let open = row
		.controls
		.open
		.clone()
		.ok_or_else(|| Error::not_found(format!("open control of draft {created}")))?;

	let drafts_url = session.endpoints().drafts.clone();
	let form = collect_form_fields(&page.body);
	let opened = session.submit_partial(&drafts_url, &form, PartialRequest::new(open)).await?;
	let detail_url = required_redirect(session, &opened, "draft detail")?;

	let detail_page = session.load(&detail_url).await?;
	let detail_form = collect_form_fields(&detail_page.body);

	let plan_url = session.endpoints().plan.clone();
	let created_plan = session
		.submit_partial(&plan_url, &detail_form, PartialRequest::new(CREATE_PLAN).render(MAIN_FORM))
		.await?;
	if detail::has_error_marker(&created_plan.body) {
		return Err(Error::Rejected(format!("plan creation for draft {created}")));
	}
	info!(target = "dw.drafts", %created, "planning started");

	poll_plan(session, &plan_url, &detail_form, settings).await
}

/// Polls plan progress until it resets to 0 after passing 50%.
///
/// A network failure on one attempt is logged and counted against the
/// bound; an expired session aborts the poll.
pub async fn poll_plan(session: &mut Session, plan_url: &str, form: &FormFields, settings: &DraftSettings) -> Result<String> {
	let mut peak = 0u32;
	let mut last_body: Option<String> = None;

	for attempt in 1..=settings.poll_attempts {
		let request = PartialRequest::new(STATUS_POLL).render(POLL_RENDER);
		match session.submit_partial(plan_url, form, request).await {
			Ok(page) => {
				let percent = detail::progress_percent(&page.body);
				debug!(target = "dw.drafts", attempt, percent, peak, "plan progress");
				if !page.body.trim().is_empty() {
					last_body = Some(page.body);
				}
				if percent == 0 && peak > COMPLETION_PEAK {
					info!(target = "dw.drafts", attempts = attempt, "plan complete");
					return last_body.ok_or_else(|| Error::not_found("plan result body"));
				}
				peak = peak.max(percent);
			}
			Err(Error::SessionExpired) => return Err(Error::SessionExpired),
			Err(err) => warn!(target = "dw.drafts", attempt, error = %err, "plan poll attempt failed"),
		}

		if attempt < settings.poll_attempts {
			tokio::time::sleep(settings.poll_interval).await;
		}
	}

	warn!(target = "dw.drafts", attempts = settings.poll_attempts, "plan polling gave up");
	Err(Error::PollTimeout {
		attempts: settings.poll_attempts,
	})
}
