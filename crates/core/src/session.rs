//! Authenticated connection state.
//!
//! A [`Session`] owns the transport, the synchronization token the server
//! handed out last, and the active-account cache. Every workflow takes it
//! by `&mut`, so requests within one session are strictly sequential and
//! each dependent request carries the token of the response before it.

use draftwatch_protocol::{PartialRequest, PartialResponse, extract_token};
use tracing::{debug, trace};

use crate::config::{Credentials, Endpoints};
use crate::error::{Error, Result};
use crate::extract::{AccountRecord, FormFields};
use crate::transport::{Page, Transport};

/// Authentication progress of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
	#[default]
	LoggedOut,
	Authenticating,
	LoggedIn,
}

pub struct Session {
	transport: Box<dyn Transport>,
	endpoints: Endpoints,
	credentials: Credentials,
	token: Option<String>,
	state: AuthState,
	referer: Option<String>,
	active_account_id: Option<String>,
	active_account_name: Option<String>,
	accounts: Vec<AccountRecord>,
}

impl std::fmt::Debug for Session {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Session")
			.field("endpoints", &self.endpoints)
			.field("credentials", &self.credentials)
			.field("has_token", &self.token.is_some())
			.field("state", &self.state)
			.field("active_account_id", &self.active_account_id)
			.field("active_account_name", &self.active_account_name)
			.field("accounts", &self.accounts.len())
			.finish()
	}
}

impl Session {
	pub fn new(transport: Box<dyn Transport>, endpoints: Endpoints, credentials: Credentials) -> Self {
		Self {
			transport,
			endpoints,
			credentials,
			token: None,
			state: AuthState::LoggedOut,
			referer: None,
			active_account_id: None,
			active_account_name: None,
			accounts: Vec::new(),
		}
	}

	pub fn endpoints(&self) -> &Endpoints {
		&self.endpoints
	}

	pub fn credentials(&self) -> &Credentials {
		&self.credentials
	}

	/// Token to attach to the next dependent request.
	pub fn token(&self) -> Option<&str> {
		self.token.as_deref()
	}

	pub fn state(&self) -> AuthState {
		self.state
	}

	pub fn is_logged_in(&self) -> bool {
		self.state == AuthState::LoggedIn
	}

	pub fn active_account_id(&self) -> Option<&str> {
		self.active_account_id.as_deref()
	}

	pub fn active_account_name(&self) -> Option<&str> {
		self.active_account_name.as_deref()
	}

	pub fn accounts(&self) -> &[AccountRecord] {
		&self.accounts
	}

	pub(crate) fn set_state(&mut self, state: AuthState) {
		debug!(target = "dw.session", from = ?self.state, to = ?state, "auth state");
		self.state = state;
	}

	/// Drops cookies, token and account cache ahead of a fresh login.
	pub(crate) fn reset(&mut self) {
		self.transport.clear_cookies();
		self.token = None;
		self.referer = None;
		self.active_account_id = None;
		self.active_account_name = None;
		self.accounts.clear();
		self.state = AuthState::LoggedOut;
	}

	/// Replaces the account cache; the active id follows the row marked active.
	pub(crate) fn set_account_context(&mut self, active_name: Option<String>, accounts: Vec<AccountRecord>) {
		if let Some(active) = accounts.iter().find(|a| a.is_active) {
			self.active_account_id = Some(active.row_key.clone());
		}
		if active_name.is_some() {
			self.active_account_name = active_name;
		}
		self.accounts = accounts;
	}

	pub(crate) fn set_active_account(&mut self, row_key: &str, name: Option<&str>) {
		self.active_account_id = Some(row_key.to_string());
		if let Some(name) = name {
			self.active_account_name = Some(name.to_string());
		}
	}

	/// Raw GET. The page's hidden token, if any, becomes the held token.
	pub async fn get(&mut self, url: &str) -> Result<Page> {
		let page = self.transport.get(url).await?;
		self.absorb_token(&page);
		self.referer = Some(page.url.clone());
		Ok(page)
	}

	/// Raw form POST with the last visited page as referer.
	pub async fn post(&mut self, url: &str, fields: FormFields) -> Result<Page> {
		let fields = fields.into_vec();
		let page = self.transport.post(url, &fields, self.referer.as_deref()).await?;
		self.absorb_token(&page);
		Ok(page)
	}

	/// GET that treats a bounce to the login page as an expired session.
	pub async fn load(&mut self, url: &str) -> Result<Page> {
		let page = self.get(url).await?;
		self.ensure_live(&page)?;
		Ok(page)
	}

	/// Issues a partial-update request.
	///
	/// `base` is the echoed form state; the partial fields overlay it and the
	/// held token goes last. The response's token replaces the held one.
	pub async fn submit_partial(&mut self, url: &str, base: &FormFields, request: PartialRequest) -> Result<Page> {
		trace!(target = "dw.session", %url, source = request.source(), "partial submit");
		let mut fields = base.clone();
		fields.extend(request.into_fields(self.token.as_deref()));
		let page = self.post(url, fields).await?;
		self.ensure_live(&page)?;
		Ok(page)
	}

	fn absorb_token(&mut self, page: &Page) {
		if let Some(token) = extract_token(&page.body) {
			self.token = Some(token);
		}
	}

	fn ensure_live(&mut self, page: &Page) -> Result<()> {
		let redirect_to_login = PartialResponse::parse(&page.body)
			.redirect()
			.is_some_and(|target| self.endpoints.is_login(target));

		if !page.is_success() || self.endpoints.is_login(&page.url) || redirect_to_login {
			debug!(target = "dw.session", status = page.status, url = %page.url, "session expired");
			self.state = AuthState::LoggedOut;
			return Err(Error::SessionExpired);
		}
		Ok(())
	}
}
