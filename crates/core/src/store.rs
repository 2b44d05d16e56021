//! Persisted watch-list and user-visible log.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::analysis::normalize_codes;
use crate::error::{Error, Result};
use crate::extract::DraftRecord;
use crate::notify::Severity;

pub const STORE_SCHEMA_VERSION: u32 = 1;
/// Oldest log entries are dropped past this count.
pub const MAX_LOG_ENTRIES: usize = 500;

/// A watched draft, keyed by its created timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchItem {
	pub created: String,
	#[serde(default)]
	pub account_id: Option<String>,
	#[serde(default)]
	pub account_name: Option<String>,
	pub draft_name: String,
	pub origin: String,
	/// Falls back to the global threshold when unset.
	#[serde(default)]
	pub mile_limit: Option<u32>,
	#[serde(default)]
	pub targets: Vec<String>,
	#[serde(default)]
	pub found: Vec<String>,
}

impl WatchItem {
	pub fn from_draft(
		draft: &DraftRecord,
		account_id: Option<&str>,
		account_name: Option<&str>,
		mile_limit: Option<u32>,
		targets: &[String],
	) -> Self {
		Self {
			created: draft.created.clone(),
			account_id: account_id.map(str::to_string),
			account_name: account_name.map(str::to_string),
			draft_name: draft.name.clone(),
			origin: draft.origin.clone(),
			mile_limit,
			targets: normalize_codes(targets),
			found: Vec::new(),
		}
	}

	pub fn effective_mile_limit(&self, global: u32) -> u32 {
		self.mile_limit.unwrap_or(global)
	}

	pub fn set_targets<S: AsRef<str>>(&mut self, targets: &[S]) {
		self.targets = normalize_codes(targets);
	}

	/// Adds unseen warehouses to `found`, comparing case-insensitively.
	/// Returns whether anything was added.
	pub fn merge_found<'a>(&mut self, warehouses: impl IntoIterator<Item = &'a str>) -> bool {
		let mut added = false;
		for warehouse in warehouses {
			let code = warehouse.trim().to_uppercase();
			if code.is_empty() || self.found.iter().any(|f| f.eq_ignore_ascii_case(&code)) {
				continue;
			}
			self.found.push(code);
			added = true;
		}
		added
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
	pub time: DateTime<Local>,
	pub severity: Severity,
	pub message: String,
}

impl fmt::Display for LogEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {} {}", self.time.format("%H:%M:%S"), self.severity.icon(), self.message)
	}
}

/// Persistence of watch items and log entries.
pub trait WatchStore: Send + Sync {
	/// Inserts or overwrites the item under `key`.
	fn put_watch_item(&mut self, key: &str, item: &WatchItem) -> Result<()>;
	fn delete_watch_item(&mut self, key: &str) -> Result<()>;
	fn list_watch_items(&self) -> Result<BTreeMap<String, WatchItem>>;
	fn append_log(&mut self, message: &str, severity: Severity) -> Result<()>;
	/// Newest first.
	fn recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>>;
}

/// On-disk layout of [`JsonFileStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreFile {
	pub schema: u32,
	#[serde(default)]
	pub items: BTreeMap<String, WatchItem>,
	#[serde(default)]
	pub logs: Vec<LogEntry>,
}

impl Default for StoreFile {
	fn default() -> Self {
		Self {
			schema: STORE_SCHEMA_VERSION,
			items: BTreeMap::new(),
			logs: Vec::new(),
		}
	}
}

impl StoreFile {
	fn push_log(&mut self, message: &str, severity: Severity) {
		self.logs.push(LogEntry {
			time: Local::now(),
			severity,
			message: message.to_string(),
		});
		if self.logs.len() > MAX_LOG_ENTRIES {
			let excess = self.logs.len() - MAX_LOG_ENTRIES;
			self.logs.drain(..excess);
		}
	}

	fn recent(&self, limit: usize) -> Vec<LogEntry> {
		self.logs.iter().rev().take(limit).cloned().collect()
	}
}

/// JSON file rewritten after every mutation.
#[derive(Debug)]
pub struct JsonFileStore {
	path: PathBuf,
	file: StoreFile,
}

impl JsonFileStore {
	/// Opens the store at `path`; a missing file starts empty.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
		let path = path.into();
		let file = match fs::read_to_string(&path) {
			Ok(content) => serde_json::from_str(&content).map_err(|e| Error::Store(format!("{}: {e}", path.display())))?,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
				debug!(target = "dw.store", path = %path.display(), "no store file yet");
				StoreFile::default()
			}
			Err(err) => return Err(err.into()),
		};
		if file.schema != STORE_SCHEMA_VERSION {
			warn!(target = "dw.store", found = file.schema, expected = STORE_SCHEMA_VERSION, "store schema mismatch");
		}
		Ok(Self { path, file })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn save(&self) -> Result<()> {
		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent)?;
		}
		let json = serde_json::to_string_pretty(&self.file)?;
		fs::write(&self.path, json)?;
		Ok(())
	}
}

impl WatchStore for JsonFileStore {
	fn put_watch_item(&mut self, key: &str, item: &WatchItem) -> Result<()> {
		self.file.items.insert(key.to_string(), item.clone());
		debug!(target = "dw.store", %key, "watch item saved");
		self.save()
	}

	fn delete_watch_item(&mut self, key: &str) -> Result<()> {
		if self.file.items.remove(key).is_none() {
			return Ok(());
		}
		debug!(target = "dw.store", %key, "watch item deleted");
		self.save()
	}

	fn list_watch_items(&self) -> Result<BTreeMap<String, WatchItem>> {
		Ok(self.file.items.clone())
	}

	fn append_log(&mut self, message: &str, severity: Severity) -> Result<()> {
		self.file.push_log(message, severity);
		self.save()
	}

	fn recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>> {
		Ok(self.file.recent(limit))
	}
}

/// In-memory store for tests and throwaway runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
	file: StoreFile,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}

impl WatchStore for MemoryStore {
	fn put_watch_item(&mut self, key: &str, item: &WatchItem) -> Result<()> {
		self.file.items.insert(key.to_string(), item.clone());
		Ok(())
	}

	fn delete_watch_item(&mut self, key: &str) -> Result<()> {
		self.file.items.remove(key);
		Ok(())
	}

	fn list_watch_items(&self) -> Result<BTreeMap<String, WatchItem>> {
		Ok(self.file.items.clone())
	}

	fn append_log(&mut self, message: &str, severity: Severity) -> Result<()> {
		self.file.push_log(message, severity);
		Ok(())
	}

	fn recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>> {
		Ok(self.file.recent(limit))
	}
}
