//! Outbound notifications.

use std::fmt;
#[cfg(any(test, feature = "test-util"))]
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::Result;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
	#[default]
	Info,
	Success,
	Warning,
	Error,
}

impl Severity {
	fn card_style(self) -> &'static str {
		match self {
			Severity::Success => "good",
			Severity::Error => "attention",
			Severity::Warning => "warning",
			Severity::Info => "accent",
		}
	}

	pub fn icon(self) -> &'static str {
		match self {
			Severity::Success => "✅",
			Severity::Error => "❌",
			Severity::Warning => "⚠️",
			Severity::Info => "ℹ️",
		}
	}
}

impl fmt::Display for Severity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Severity::Info => "info",
			Severity::Success => "success",
			Severity::Warning => "warning",
			Severity::Error => "error",
		})
	}
}

/// Fire-and-forget delivery of a titled message with ordered facts.
///
/// Implementations swallow their own failures.
#[async_trait]
pub trait Notifier: Send + Sync {
	async fn notify(&self, title: &str, message: &str, severity: Severity, facts: &[(String, String)]);
}

/// Drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
	async fn notify(&self, title: &str, _message: &str, severity: Severity, _facts: &[(String, String)]) {
		debug!(target = "dw.notify", %title, %severity, "notification dropped; no webhook configured");
	}
}

/// Posts an adaptive card to a chat webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
	client: reqwest::Client,
	url: String,
}

impl WebhookNotifier {
	pub fn new(url: impl Into<String>) -> Result<Self> {
		let client = reqwest::Client::builder().timeout(WEBHOOK_TIMEOUT).build()?;
		Ok(Self { client, url: url.into() })
	}

	/// Webhook notifier when a URL is configured, otherwise a no-op.
	pub fn from_url(url: Option<&str>) -> Result<Box<dyn Notifier>> {
		match url.map(str::trim).filter(|u| !u.is_empty()) {
			Some(url) => Ok(Box::new(Self::new(url)?)),
			None => Ok(Box::new(NoopNotifier)),
		}
	}
}

#[async_trait]
impl Notifier for WebhookNotifier {
	async fn notify(&self, title: &str, message: &str, severity: Severity, facts: &[(String, String)]) {
		let payload = adaptive_card(title, message, severity, facts);
		match self.client.post(&self.url).json(&payload).send().await {
			Ok(response) if matches!(response.status(), StatusCode::OK | StatusCode::ACCEPTED) => {
				debug!(target = "dw.notify", %title, "notification delivered");
			}
			Ok(response) => warn!(target = "dw.notify", status = %response.status(), %title, "webhook refused notification"),
			Err(err) => warn!(target = "dw.notify", error = %err, %title, "webhook unreachable"),
		}
	}
}

/// Builds the card body: a severity-colored header, the message, and one
/// two-column row per fact with a divider above every row but the first.
pub fn adaptive_card(title: &str, message: &str, severity: Severity, facts: &[(String, String)]) -> Value {
	let mut body = vec![
		json!({
			"type": "Container",
			"style": severity.card_style(),
			"padding": "Default",
			"items": [{
				"type": "TextBlock",
				"text": format!("{} {title}", severity.icon()),
				"weight": "Bolder",
				"size": "Medium",
				"color": if severity == Severity::Error { "Light" } else { "Default" },
			}],
		}),
		json!({
			"type": "Container",
			"padding": "Default",
			"items": [{
				"type": "TextBlock",
				"text": message,
				"wrap": true,
				"isSubtle": false,
				"size": "Default",
			}],
		}),
	];

	if !facts.is_empty() {
		let rows: Vec<Value> = facts
			.iter()
			.enumerate()
			.map(|(i, (key, value))| {
				json!({
					"type": "ColumnSet",
					"spacing": "Medium",
					"separator": i > 0,
					"columns": [
						{
							"type": "Column",
							"width": "auto",
							"items": [{ "type": "TextBlock", "text": key, "weight": "Bolder", "wrap": true }],
						},
						{
							"type": "Column",
							"width": "stretch",
							"items": [{ "type": "TextBlock", "text": value, "wrap": true, "horizontalAlignment": "Right" }],
						},
					],
				})
			})
			.collect();
		body.push(json!({
			"type": "Container",
			"padding": "Default",
			"style": "emphasis",
			"items": [{ "type": "Container", "padding": "None", "items": rows }],
		}));
	}

	json!({
		"type": "message",
		"attachments": [{
			"contentType": "application/vnd.microsoft.card.adaptive",
			"contentUrl": null,
			"content": {
				"$schema": "http://adaptivecards.io/schemas/adaptive-card.json",
				"type": "AdaptiveCard",
				"version": "1.2",
				"msteams": { "width": "Full" },
				"body": body,
			},
		}],
	})
}

/// A delivered notification, as seen by [`RecordingNotifier`].
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
	pub title: String,
	pub message: String,
	pub severity: Severity,
	pub facts: Vec<(String, String)>,
}

/// Keeps every notification in memory; clones share the same record.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
	sent: Arc<Mutex<Vec<Notification>>>,
}

#[cfg(any(test, feature = "test-util"))]
impl RecordingNotifier {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn sent(&self) -> Vec<Notification> {
		self.sent.lock().unwrap_or_else(|p| p.into_inner()).clone()
	}
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait]
impl Notifier for RecordingNotifier {
	async fn notify(&self, title: &str, message: &str, severity: Severity, facts: &[(String, String)]) {
		self.sent.lock().unwrap_or_else(|p| p.into_inner()).push(Notification {
			title: title.to_string(),
			message: message.to_string(),
			severity,
			facts: facts.to_vec(),
		});
	}
}
