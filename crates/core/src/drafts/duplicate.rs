//! Duplicate a draft, fix its origin and give it a unique name.

use chrono::Local;
use draftwatch_protocol::PartialRequest;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{DraftSettings, await_row_named, correct_address, fetch_draft_page, naming, rename_draft, required_redirect};
use crate::error::{Error, Result};
use crate::extract::{FormFields, collect_form_fields, controls, detail, find_by_created};
use crate::session::Session;

const CONFIRM_DIALOG: &str = "clone_draft_confirm";

/// Identity of the copy a successful duplicate produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateOutcome {
	pub name: String,
	pub created: String,
	pub origin: String,
}

/// Duplicates the draft keyed by `created`.
///
/// `origin` is the location recorded for the original; when the copy comes
/// back with a different ship-from address the address is corrected. The
/// copy is then renamed to a normalized, timestamped name. A failed address
/// correction or rename is logged and the copy is kept as the server made it.
pub async fn duplicate_draft(
	session: &mut Session,
	created: &str,
	origin: &str,
	settings: &DraftSettings,
) -> Result<DuplicateOutcome> {
	let (page, drafts) = fetch_draft_page(session).await?;
	let row = find_by_created(&drafts, created).ok_or_else(|| Error::not_found(format!("draft row created {created}")))?;
	let copy = row
		.controls
		.duplicate
		.clone()
		.ok_or_else(|| Error::not_found(format!("duplicate control of draft {created}")))?;

	let drafts_url = session.endpoints().drafts.clone();
	let form = collect_form_fields(&page.body);
	let dialog = session
		.submit_partial(&drafts_url, &form, PartialRequest::new(copy).render(CONFIRM_DIALOG))
		.await?;
	let confirm = controls::confirm_button(&dialog.body).ok_or_else(|| Error::not_found("duplicate confirm control"))?;

	let confirmed = session
		.submit_partial(&drafts_url, &FormFields::new(), PartialRequest::new(confirm))
		.await?;
	let copy_url = required_redirect(session, &confirmed, "duplicated draft")?;

	let copy_page = session.load(&copy_url).await?;
	let copy_name = detail::draft_name(&copy_page.body).ok_or_else(|| Error::not_found("duplicated draft name"))?;
	let copy_origin = detail::ship_from_address(&copy_page.body).unwrap_or_default();
	info!(target = "dw.drafts", from = %created, copy = %copy_name, "draft duplicated");

	if !copy_origin.to_lowercase().contains(&origin.to_lowercase()) {
		info!(target = "dw.drafts", found = %copy_origin, expected = %origin, "correcting ship-from address");
		if let Err(err) = correct_address(session, &copy_page.body, origin).await {
			warn!(target = "dw.drafts", error = %err, "address correction failed; keeping copy as is");
		}
	}

	let (list_page, copy_row) = await_row_named(session, &copy_name, settings).await?;

	let renamed = naming::normalized_name(&copy_name, Local::now().naive_local());
	let final_name = match rename_draft(session, &list_page.body, &copy_row.controls.name_field, &renamed).await {
		Ok(()) => renamed,
		Err(err) => {
			warn!(target = "dw.drafts", error = %err, name = %copy_name, "rename failed; keeping server name");
			copy_name
		}
	};

	tokio::time::sleep(settings.consistency_backoff).await;
	let (_, drafts) = fetch_draft_page(session).await?;
	let outcome = match drafts.iter().find(|d| d.name == final_name) {
		Some(row) => DuplicateOutcome {
			name: final_name,
			created: row.created.clone(),
			origin: row.origin.clone(),
		},
		None => DuplicateOutcome {
			name: final_name,
			created: copy_row.created,
			origin: copy_row.origin,
		},
	};
	info!(target = "dw.drafts", name = %outcome.name, created = %outcome.created, "duplicate settled");
	Ok(outcome)
}
