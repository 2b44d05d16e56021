//! Login and account context.

use draftwatch_protocol::{MAIN_FORM, PartialRequest, PartialResponse, VIEW_STATE};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::extract::accounts::ACTIVE_BADGE_ID;
use crate::extract::{FormFields, active_account_name, controls, detail, extract_token, first_match, parse_account_table};
use crate::session::{AuthState, Session};

/// Form that hosts the account table.
const ACCOUNT_FORM: &str = "__my_store_form__";
/// Account table component; also the partial-update id of its fragment.
const ACCOUNT_TABLE: &str = "__my_store_form__:__my_stor_table__";
/// Form that hosts the store menu in the page header.
const LOGO_FORM: &str = "formLogo";
const SWITCH_RENDER: &str = "ccFlag contentPanel mainForm menuform";

const EMAIL_FIELD: &str = "mainForm:email";
const PASSWORD_FIELD: &str = "mainForm:password";

/// Logs in from scratch, then discovers the account context.
///
/// A discovery failure after a good login is logged and does not fail the login.
pub async fn login(session: &mut Session) -> Result<()> {
	session.reset();
	session.set_state(AuthState::Authenticating);

	if let Err(err) = authenticate(session).await {
		session.set_state(AuthState::LoggedOut);
		warn!(target = "dw.auth", error = %err, "login failed");
		return Err(err);
	}

	session.set_state(AuthState::LoggedIn);
	info!(target = "dw.auth", email = %session.credentials().email, "logged in");

	if let Err(err) = discover_account_context(session).await {
		warn!(target = "dw.auth", error = %err, "account discovery failed after login");
	}
	Ok(())
}

/// Logs in again after the session expired and re-selects `account`.
///
/// A fresh login lands on the default account, so work that was running
/// under another one would otherwise continue in the wrong account.
pub async fn relogin(session: &mut Session, account: Option<&str>) -> Result<()> {
	login(session).await?;
	let Some(row_key) = account else {
		return Ok(());
	};
	if session.active_account_id() == Some(row_key) {
		return Ok(());
	}
	info!(target = "dw.auth", %row_key, landed = session.active_account_id().unwrap_or("unknown"), "returning to account after re-login");
	switch_account(session, row_key).await
}

async fn authenticate(session: &mut Session) -> Result<()> {
	let login_url = session.endpoints().login.clone();
	let page = session.get(&login_url).await?;
	if !page.is_success() {
		return Err(Error::LoginFailed(format!("login page answered {}", page.status)));
	}

	let token = extract_token(&page.body).ok_or_else(|| Error::LoginFailed("login page carries no token".into()))?;
	let submit = controls::login_submit(&page.body).ok_or_else(|| Error::LoginFailed("login page has no submit control".into()))?;

	let credentials = session.credentials().clone();
	let fields = FormFields::new()
		.with(MAIN_FORM, MAIN_FORM)
		.with(EMAIL_FIELD, credentials.email)
		.with(PASSWORD_FIELD, credentials.password)
		.with(submit, "")
		.with(VIEW_STATE, token);

	let reply = session.post(&login_url, fields).await?;
	if detail::has_error_marker(&reply.body) {
		return Err(Error::LoginFailed("credentials rejected".into()));
	}
	if session.endpoints().is_login(&reply.url) {
		return Err(Error::LoginFailed("still on the login page".into()));
	}
	Ok(())
}

/// Reads the active account from the header badge and enumerates the
/// selectable accounts through the store menu.
pub async fn discover_account_context(session: &mut Session) -> Result<()> {
	let drafts_url = session.endpoints().drafts.clone();
	let page = session.load(&drafts_url).await?;

	let active_name = active_account_name(&page.body);
	if active_name.is_none() {
		warn!(target = "dw.auth", "active-account badge not found");
	}

	let menu = first_match(&page.body, controls::ACCOUNT_MENU).ok_or_else(|| Error::not_found("account menu control"))?;
	let request = PartialRequest::new(menu).render(ACCOUNT_TABLE).form(LOGO_FORM);
	let reply = session.submit_partial(&drafts_url, &FormFields::new(), request).await?;

	let response = PartialResponse::parse(&reply.body);
	let fragment = response.update(ACCOUNT_TABLE).ok_or_else(|| Error::not_found("account table update"))?;
	let accounts = parse_account_table(fragment, active_name.as_deref());

	info!(
		target = "dw.auth",
		active = active_name.as_deref().unwrap_or("unknown"),
		accounts = accounts.len(),
		"account context discovered"
	);
	session.set_account_context(active_name, accounts);
	Ok(())
}

/// Makes the account with `row_key` active.
///
/// Success is judged by the header badge being re-rendered. Discovery then
/// re-runs so the cached active flags follow the switch.
pub async fn switch_account(session: &mut Session, row_key: &str) -> Result<()> {
	let drafts_url = session.endpoints().drafts.clone();
	session.load(&drafts_url).await?;

	let request = PartialRequest::new(ACCOUNT_TABLE)
		.execute(ACCOUNT_TABLE)
		.render(SWITCH_RENDER)
		.event("rowSelect")
		.without_form()
		.field(format!("{ACCOUNT_TABLE}_instantSelectedRowKey"), row_key)
		.field(ACCOUNT_FORM, ACCOUNT_FORM)
		.field(format!("{ACCOUNT_TABLE}:j_idt26:filter"), "")
		.field(format!("{ACCOUNT_TABLE}_selection"), row_key)
		.field(format!("{ACCOUNT_TABLE}_scrollState"), "0,0");

	let reply = session.submit_partial(&drafts_url, &FormFields::new(), request).await?;
	if !PartialResponse::parse(&reply.body).has_update(ACTIVE_BADGE_ID) {
		warn!(target = "dw.auth", %row_key, "account switch not acknowledged");
		return Err(Error::not_found("active-account badge update"));
	}

	let name = session
		.accounts()
		.iter()
		.find(|a| a.row_key == row_key)
		.map(|a| a.name.clone());
	session.set_active_account(row_key, name.as_deref());

	if let Err(err) = discover_account_context(session).await {
		warn!(target = "dw.auth", error = %err, "account discovery failed after switch");
	}
	session.set_active_account(row_key, None);
	info!(target = "dw.auth", %row_key, name = session.active_account_name().unwrap_or("unknown"), "switched account");
	Ok(())
}
