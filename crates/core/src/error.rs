//! Error taxonomy for the automation layer.
//!
//! Every variant is scoped to one workflow step or one watched item; none of
//! them is fatal to a scheduler pass. Callers branch on the variant, never on
//! the message text.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	/// The server bounced the request to the login page or refused it.
	/// Re-authenticate and retry the current step once.
	#[error("session expired; re-authentication required")]
	SessionExpired,

	/// An expected control, marker or fragment is missing from a response.
	#[error("expected element not found: {what}")]
	ElementNotFound { what: String },

	/// One table row could not be parsed.
	#[error("malformed row: {reason}")]
	MalformedRow { reason: String },

	/// Plan polling exhausted its attempt bound without completing.
	#[error("plan polling gave up after {attempts} attempts")]
	PollTimeout { attempts: u32 },

	#[error("network failure: {0}")]
	Network(String),

	#[error("login failed: {0}")]
	LoginFailed(String),

	/// The server answered with an error marker.
	#[error("server rejected request: {0}")]
	Rejected(String),

	#[error("configuration error: {0}")]
	Config(String),

	#[error("store error: {0}")]
	Store(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Shorthand for [`Error::ElementNotFound`].
	pub fn not_found(what: impl Into<String>) -> Self {
		Error::ElementNotFound { what: what.into() }
	}

	/// Shorthand for [`Error::MalformedRow`].
	pub fn malformed(reason: impl Into<String>) -> Self {
		Error::MalformedRow { reason: reason.into() }
	}

	/// Whether the failure clears after re-authenticating.
	pub fn is_recoverable(&self) -> bool {
		matches!(self, Error::SessionExpired)
	}

	/// Whether the failure means "no result this cycle" rather than a fault.
	pub fn is_no_result(&self) -> bool {
		matches!(self, Error::PollTimeout { .. })
	}
}

impl From<reqwest::Error> for Error {
	fn from(err: reqwest::Error) -> Self {
		Error::Network(err.to_string())
	}
}
