//! Two-step inline rename of a draft row.

use draftwatch_protocol::{PartialRequest, SCOPE_NONE};
use tracing::info;

use crate::error::Result;
use crate::extract::{FormFields, collect_form_fields};
use crate::session::Session;

/// Table component holding the inline name inputs.
const DRAFT_TABLE: &str = "mainForm:drafts";

/// Renames the row whose inline name input is `name_field`.
///
/// Step one submits the whole list form with the name overwritten, scoped
/// to the table, so the server commits the pending edit. Step two fires the
/// input's change event with the token step one returned; sending the
/// token held before step one leaves the old name in place.
pub async fn rename_draft(session: &mut Session, list_html: &str, name_field: &str, new_name: &str) -> Result<()> {
	let drafts_url = session.endpoints().drafts.clone();

	let mut form = collect_form_fields(list_html);
	form.insert(name_field, new_name);
	let commit = PartialRequest::new(DRAFT_TABLE)
		.execute(DRAFT_TABLE)
		.render(DRAFT_TABLE)
		.field(format!("{DRAFT_TABLE}_encodeFeature"), "true");
	session.submit_partial(&drafts_url, &form, commit).await?;

	let change = PartialRequest::new(name_field)
		.execute(name_field)
		.event("change")
		.render(SCOPE_NONE)
		.field(name_field, new_name);
	session.submit_partial(&drafts_url, &FormFields::new(), change).await?;

	info!(target = "dw.drafts", %new_name, "renamed draft");
	Ok(())
}
