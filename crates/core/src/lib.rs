// draftwatch: session-bound automation of the draft shipment pages
//
// Everything here runs against one logged-in `Session`. The watcher in
// `watch` is the only piece that strings the workflows together.

pub mod analysis;
pub mod auth;
pub mod config;
pub mod drafts;
pub mod error;
pub mod extract;
pub mod history;
pub mod notify;
pub mod session;
pub mod store;
pub mod transport;
pub mod watch;

pub use analysis::{Analysis, Criteria, Finding, analyze};
pub use config::{Config, Credentials, Endpoints, TriggerMode};
pub use drafts::{DraftSettings, DuplicateOutcome, list_drafts};
pub use error::{Error, Result};
pub use extract::{AccountRecord, DraftRecord};
pub use history::{History, HistoryEntry};
pub use notify::{NoopNotifier, Notifier, Severity, WebhookNotifier};
#[cfg(any(test, feature = "test-util"))]
pub use notify::{Notification, RecordingNotifier};
pub use session::{AuthState, Session};
pub use store::{JsonFileStore, LogEntry, MemoryStore, WatchItem, WatchStore};
pub use transport::{HttpTransport, Page, Transport};
#[cfg(any(test, feature = "test-util"))]
pub use transport::{ScriptController, ScriptedTransport};
pub use watch::{TickReport, WatchSettings, Watcher};
