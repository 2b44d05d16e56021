//! In-memory transport for exercising workflows without a server.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{Page, Transport};
use crate::error::{Error, Result};

/// HTTP method of a recorded request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
	Get,
	Post,
}

/// One request seen by [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
	pub method: Method,
	pub url: String,
	pub fields: Vec<(String, String)>,
	pub referer: Option<String>,
}

impl Sent {
	/// Value of a posted field.
	pub fn field(&self, name: &str) -> Option<&str> {
		self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
	}

	/// Value of the partial-request source field.
	pub fn source(&self) -> Option<&str> {
		self.field(draftwatch_protocol::SOURCE)
	}
}

enum Reply {
	Page { url: Option<String>, status: u16, body: String },
	Fail(String),
}

#[derive(Default)]
struct Script {
	replies: VecDeque<Reply>,
	sent: Vec<Sent>,
	cookie_clears: usize,
}

/// Transport that answers from a queue of scripted replies.
///
/// Created together with a [`ScriptController`] that queues replies and
/// inspects what the code under test sent.
pub struct ScriptedTransport {
	script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
	pub fn new() -> (Self, ScriptController) {
		let script = Arc::new(Mutex::new(Script::default()));
		(
			Self {
				script: Arc::clone(&script),
			},
			ScriptController { script },
		)
	}

	fn answer(&self, sent: Sent) -> Result<Page> {
		let mut script = self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
		let requested = sent.url.clone();
		script.sent.push(sent);
		match script.replies.pop_front() {
			Some(Reply::Page { url, status, body }) => Ok(Page {
				url: url.unwrap_or(requested),
				status,
				body,
			}),
			Some(Reply::Fail(message)) => Err(Error::Network(message)),
			None => Err(Error::Network(format!("no scripted reply for {requested}"))),
		}
	}
}

#[async_trait]
impl Transport for ScriptedTransport {
	async fn get(&self, url: &str) -> Result<Page> {
		self.answer(Sent {
			method: Method::Get,
			url: url.to_string(),
			fields: Vec::new(),
			referer: None,
		})
	}

	async fn post(&self, url: &str, fields: &[(String, String)], referer: Option<&str>) -> Result<Page> {
		self.answer(Sent {
			method: Method::Post,
			url: url.to_string(),
			fields: fields.to_vec(),
			referer: referer.map(str::to_string),
		})
	}

	fn clear_cookies(&mut self) {
		self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).cookie_clears += 1;
	}
}

/// Queues replies for, and inspects requests sent through, a [`ScriptedTransport`].
#[derive(Clone)]
pub struct ScriptController {
	script: Arc<Mutex<Script>>,
}

impl ScriptController {
	fn push(&self, reply: Reply) -> &Self {
		self.script
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.replies
			.push_back(reply);
		self
	}

	/// Answers the next request with 200 at the requested URL.
	pub fn reply(&self, body: impl Into<String>) -> &Self {
		self.push(Reply::Page {
			url: None,
			status: 200,
			body: body.into(),
		})
	}

	/// Answers the next request with 200 after a redirect to `final_url`.
	pub fn reply_at(&self, final_url: impl Into<String>, body: impl Into<String>) -> &Self {
		self.push(Reply::Page {
			url: Some(final_url.into()),
			status: 200,
			body: body.into(),
		})
	}

	pub fn reply_status(&self, status: u16, body: impl Into<String>) -> &Self {
		self.push(Reply::Page {
			url: None,
			status,
			body: body.into(),
		})
	}

	/// Fails the next request with a network error.
	pub fn fail(&self, message: impl Into<String>) -> &Self {
		self.push(Reply::Fail(message.into()))
	}

	/// Every request sent so far, in order.
	pub fn sent(&self) -> Vec<Sent> {
		self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).sent.clone()
	}

	/// Only the POST requests sent so far.
	pub fn posts(&self) -> Vec<Sent> {
		self.sent().into_iter().filter(|s| s.method == Method::Post).collect()
	}

	/// Replies still queued.
	pub fn pending(&self) -> usize {
		self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).replies.len()
	}

	pub fn cookie_clears(&self) -> usize {
		self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).cookie_clears
	}
}
