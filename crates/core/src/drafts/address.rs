//! Ship-from address correction on a draft detail page.

use draftwatch_protocol::{PartialRequest, PartialResponse};
use tracing::info;

use crate::error::{Error, Result};
use crate::extract::{collect_form_fields, controls, detail, first_match};
use crate::session::Session;

const ADDRESS_FORM: &str = "addressDialog:addressForm";
const ADDRESS_TABLE: &str = "addressDialog:addressForm:addressTable";
const DRAFT_INFO: &str = "mainForm:draftInfo";

/// Selects `location` in the address dialog and re-renders the draft info.
///
/// `detail_html` is the detail page the dialog is opened from. Any missing
/// control aborts the correction with [`Error::ElementNotFound`].
pub async fn correct_address(session: &mut Session, detail_html: &str, location: &str) -> Result<()> {
	let refresh = controls::address_refresh_script(detail_html).ok_or_else(|| Error::not_found("address refresh script"))?;
	let edit = first_match(detail_html, controls::ADDRESS_EDIT).ok_or_else(|| Error::not_found("ship-from edit control"))?;

	let plan_url = session.endpoints().plan.clone();
	let form = collect_form_fields(detail_html);
	let opened = session
		.submit_partial(&plan_url, &form, PartialRequest::new(&edit).execute(&edit).render(ADDRESS_TABLE))
		.await?;

	let response = PartialResponse::parse(&opened.body);
	let table = response.update(ADDRESS_TABLE).ok_or_else(|| Error::not_found("address table update"))?;
	let select = controls::select_button(table).ok_or_else(|| Error::not_found("address select control"))?;
	let row_key =
		detail::address_row_key(table, location).ok_or_else(|| Error::not_found(format!("address row for {location:?}")))?;
	let dialog = collect_form_fields(table);

	let choose = PartialRequest::new(select)
		.execute(ADDRESS_FORM)
		.form(ADDRESS_FORM)
		.field(format!("{ADDRESS_TABLE}_radio"), "on")
		.field(format!("{ADDRESS_TABLE}_selection"), row_key.as_str());
	session.submit_partial(&plan_url, &dialog, choose).await?;

	session
		.submit_partial(&plan_url, &dialog, PartialRequest::new(refresh).render(DRAFT_INFO))
		.await?;

	info!(target = "dw.drafts", %location, %row_key, "ship-from address corrected");
	Ok(())
}

#[cfg(test)]
mod tests {
	use draftwatch_protocol::VIEW_STATE;

	use super::super::fixtures::{detail_page, scripted_session, token_update};
	use super::*;

	fn address_dialog(token: &str) -> String {
		format!(
			r#"<partial-response><changes><update id="addressDialog:addressForm:addressTable"><![CDATA[<div id="addressDialog:addressForm:addressTable"><table><tbody>
			<tr data-rk="11"><td><input type="hidden" name="addr11" value="Newark, NJ"></td></tr>
			<tr data-rk="12"><td><input type="hidden" name="addr12" value="Reno, NV"></td></tr>
			</tbody></table><button id="addressDialog:addressForm:select" type="button"><span class="ui-button-text">Select</span></button></div>]]></update><update id="j_id1:javax.faces.ViewState:0"><![CDATA[{token}]]></update></changes></partial-response>"#
		)
	}

	#[tokio::test]
	async fn opens_dialog_selects_row_and_refreshes() {
		let (mut session, controller) = scripted_session();
		let detail = detail_page("Spring - Copy", "Newark, NJ", "d0");
		controller.reply(detail.clone()).reply(address_dialog("d1")).reply(token_update("d2")).reply(token_update("d3"));
		session.load("https://app.test/draftplan.jsf?draft=10").await.unwrap();

		correct_address(&mut session, &detail, "Reno, NV").await.unwrap();

		let posts = controller.posts();
		assert_eq!(posts[0].source(), Some("mainForm:draftInfo:0:edit"));
		assert_eq!(posts[0].field("javax.faces.partial.execute"), Some("mainForm:draftInfo:0:edit"));
		assert_eq!(posts[0].field("javax.faces.partial.render"), Some(ADDRESS_TABLE));
		assert_eq!(posts[0].url, "https://app.test/draftplan.jsf");

		assert_eq!(posts[1].source(), Some("addressDialog:addressForm:select"));
		assert_eq!(posts[1].field(ADDRESS_FORM), Some(ADDRESS_FORM));
		assert_eq!(posts[1].field("addressDialog:addressForm:addressTable_selection"), Some("12"));
		assert_eq!(posts[1].field("addressDialog:addressForm:addressTable_radio"), Some("on"));
		assert_eq!(posts[1].field(VIEW_STATE), Some("d1"));

		assert_eq!(posts[2].source(), Some("mainForm:j_idt90"));
		assert_eq!(posts[2].field("javax.faces.partial.render"), Some(DRAFT_INFO));
		assert_eq!(posts[2].field(VIEW_STATE), Some("d2"));
	}

	#[tokio::test]
	async fn unknown_location_aborts_before_selecting() {
		let (mut session, controller) = scripted_session();
		let detail = detail_page("Spring - Copy", "Newark, NJ", "d0");
		controller.reply(address_dialog("d1"));
		let outcome = correct_address(&mut session, &detail, "Austin, TX").await;
		assert!(matches!(outcome, Err(Error::ElementNotFound { .. })));
		assert_eq!(controller.posts().len(), 1);
	}

	#[tokio::test]
	async fn missing_refresh_script_sends_nothing() {
		let (mut session, controller) = scripted_session();
		let detail = detail_page("x", "y", "t").replace("updateAddress", "somethingElse");
		assert!(matches!(
			correct_address(&mut session, &detail, "Reno, NV").await,
			Err(Error::ElementNotFound { .. })
		));
		assert!(controller.sent().is_empty());
	}
}
