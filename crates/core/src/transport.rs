//! HTTP seam between the session and the network.
//!
//! [`HttpTransport`] is the production implementation over `reqwest` with a
//! cookie jar. With the `test-util` feature, [`ScriptedTransport`] replays
//! queued replies in order and records every request, for exercising
//! workflows without a server.

use std::time::Duration;

use async_trait::async_trait;
use draftwatch_protocol::{FACES_REQUEST_HEADER, FACES_REQUEST_PARTIAL, PARTIAL_AJAX};
use reqwest::header::REFERER;
use tracing::trace;

use crate::error::{Error, Result};

#[cfg(any(test, feature = "test-util"))]
mod scripted;

#[cfg(any(test, feature = "test-util"))]
pub use scripted::{Method, ScriptController, ScriptedTransport, Sent};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A response after redirects have been followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
	/// Final URL, which differs from the requested one after a redirect.
	pub url: String,
	pub status: u16,
	pub body: String,
}

impl Page {
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

#[async_trait]
pub trait Transport: Send + Sync {
	async fn get(&self, url: &str) -> Result<Page>;

	/// Form-encoded POST. AJAX submits are recognized by the partial field and
	/// carry the partial-request headers.
	async fn post(&self, url: &str, fields: &[(String, String)], referer: Option<&str>) -> Result<Page>;

	/// Drops every cookie so the next request starts a fresh server session.
	fn clear_cookies(&mut self);
}

/// `reqwest` client with an in-memory cookie store.
pub struct HttpTransport {
	client: reqwest::Client,
	user_agent: String,
}

impl HttpTransport {
	pub fn new(user_agent: impl Into<String>) -> Result<Self> {
		let user_agent = user_agent.into();
		Ok(Self {
			client: build_client(&user_agent)?,
			user_agent,
		})
	}
}

fn build_client(user_agent: &str) -> Result<reqwest::Client> {
	reqwest::Client::builder()
		.cookie_store(true)
		.user_agent(user_agent)
		.timeout(REQUEST_TIMEOUT)
		.build()
		.map_err(|e| Error::Network(format!("cannot build HTTP client: {e}")))
}

async fn into_page(response: reqwest::Response) -> Result<Page> {
	let url = response.url().to_string();
	let status = response.status().as_u16();
	let body = response.text().await?;
	Ok(Page { url, status, body })
}

#[async_trait]
impl Transport for HttpTransport {
	async fn get(&self, url: &str) -> Result<Page> {
		trace!(target = "dw.transport", %url, "GET");
		into_page(self.client.get(url).send().await?).await
	}

	async fn post(&self, url: &str, fields: &[(String, String)], referer: Option<&str>) -> Result<Page> {
		let mut request = self.client.post(url).form(fields);
		if fields.iter().any(|(k, _)| k == PARTIAL_AJAX) {
			request = request
				.header(FACES_REQUEST_HEADER, FACES_REQUEST_PARTIAL)
				.header("X-Requested-With", "XMLHttpRequest");
		}
		if let Some(referer) = referer {
			request = request.header(REFERER, referer);
		}

		trace!(target = "dw.transport", %url, fields = fields.len(), "POST");
		into_page(request.send().await?).await
	}

	fn clear_cookies(&mut self) {
		match build_client(&self.user_agent) {
			Ok(client) => self.client = client,
			Err(err) => trace!(target = "dw.transport", error = %err, "keeping old client"),
		}
	}
}
