//! Runtime configuration loaded from `config.json` and the environment.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://app.2dworkflow.com";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const ENV_EMAIL: &str = "DRAFTWATCH_EMAIL";
pub const ENV_PASSWORD: &str = "DRAFTWATCH_PASSWORD";
pub const ENV_WEBHOOK: &str = "DRAFTWATCH_WEBHOOK";
pub const ENV_BASE_URL: &str = "DRAFTWATCH_BASE_URL";

/// How the recurring watch run is triggered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
	/// Every `interval_minutes`.
	#[default]
	Interval,
	/// At minutes 00 and 30 of every hour.
	HalfHourly,
	/// At minutes 00, 15, 30 and 45 of every hour.
	Quarterly,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PollConfig {
	pub interval_secs: u64,
	pub max_attempts: u32,
}

impl Default for PollConfig {
	fn default() -> Self {
		Self {
			interval_secs: 5,
			max_attempts: 60,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TriggerConfig {
	pub mode: TriggerMode,
	pub interval_minutes: u32,
}

impl Default for TriggerConfig {
	fn default() -> Self {
		Self {
			mode: TriggerMode::Interval,
			interval_minutes: 30,
		}
	}
}

/// Bounded re-fetch used while the server settles after a duplicate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsistencyConfig {
	pub attempts: u32,
	pub backoff_ms: u64,
}

impl Default for ConsistencyConfig {
	fn default() -> Self {
		Self {
			attempts: 3,
			backoff_ms: 2000,
		}
	}
}

/// Persisted tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
	pub base_url: String,
	pub email: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub password: Option<String>,
	pub webhook_url: Option<String>,
	/// Global distance threshold; watch items may override it.
	pub mile_threshold: u32,
	pub poll: PollConfig,
	pub trigger: TriggerConfig,
	pub account_settle_secs: u64,
	pub consistency: ConsistencyConfig,
	pub store_path: Option<PathBuf>,
	pub user_agent: String,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			base_url: DEFAULT_BASE_URL.to_string(),
			email: None,
			password: None,
			webhook_url: None,
			mile_threshold: 300,
			poll: PollConfig::default(),
			trigger: TriggerConfig::default(),
			account_settle_secs: 2,
			consistency: ConsistencyConfig::default(),
			store_path: None,
			user_agent: DEFAULT_USER_AGENT.to_string(),
		}
	}
}

impl Config {
	/// Default location: `<config_dir>/draftwatch/config.json`.
	pub fn default_path() -> PathBuf {
		dirs::config_dir()
			.unwrap_or_else(|| PathBuf::from("."))
			.join("draftwatch")
			.join("config.json")
	}

	/// Loads `path`; a missing file yields the defaults.
	pub fn load(path: &Path) -> Result<Self> {
		match fs::read_to_string(path) {
			Ok(content) => {
				let config: Config = serde_json::from_str(&content)?;
				debug!(target = "dw.config", path = %path.display(), "loaded config");
				Ok(config)
			}
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
				debug!(target = "dw.config", path = %path.display(), "no config file; using defaults");
				Ok(Self::default())
			}
			Err(err) => Err(err.into()),
		}
	}

	pub fn save(&self, path: &Path) -> Result<()> {
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)?;
		}
		fs::write(path, serde_json::to_string_pretty(self)?)?;
		Ok(())
	}

	/// Applies `DRAFTWATCH_*` overrides from the process environment.
	pub fn apply_env(self) -> Self {
		self.apply_env_with(|key| std::env::var(key).ok())
	}

	/// Applies overrides from an arbitrary lookup; empty values are ignored.
	pub fn apply_env_with(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
		let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
		if let Some(email) = get(ENV_EMAIL) {
			self.email = Some(email);
		}
		if let Some(password) = get(ENV_PASSWORD) {
			self.password = Some(password);
		}
		if let Some(webhook) = get(ENV_WEBHOOK) {
			self.webhook_url = Some(webhook);
		}
		if let Some(base) = get(ENV_BASE_URL) {
			self.base_url = base;
		}
		self
	}

	pub fn validate(&self) -> Result<()> {
		Url::parse(&self.base_url).map_err(|e| Error::Config(format!("invalid base URL {:?}: {e}", self.base_url)))?;
		if self.poll.max_attempts == 0 {
			return Err(Error::Config("poll.maxAttempts must be at least 1".into()));
		}
		if self.trigger.mode == TriggerMode::Interval && self.trigger.interval_minutes == 0 {
			return Err(Error::Config("trigger.intervalMinutes must be at least 1".into()));
		}
		if self.consistency.attempts == 0 {
			return Err(Error::Config("consistency.attempts must be at least 1".into()));
		}
		Ok(())
	}

	/// Email and password, or a config error naming what is missing.
	pub fn credentials(&self) -> Result<Credentials> {
		let email = self
			.email
			.clone()
			.ok_or_else(|| Error::Config(format!("no email configured (set {ENV_EMAIL})")))?;
		let password = self
			.password
			.clone()
			.ok_or_else(|| Error::Config(format!("no password configured (set {ENV_PASSWORD})")))?;
		Ok(Credentials { email, password })
	}

	/// Resolved store location: explicit path or `<data_dir>/draftwatch/store.json`.
	pub fn store_path(&self) -> PathBuf {
		self.store_path.clone().unwrap_or_else(|| {
			dirs::data_dir()
				.unwrap_or_else(|| PathBuf::from("."))
				.join("draftwatch")
				.join("store.json")
		})
	}

	pub fn endpoints(&self) -> Result<Endpoints> {
		Endpoints::new(&self.base_url)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_secs(self.poll.interval_secs)
	}

	pub fn account_settle(&self) -> Duration {
		Duration::from_secs(self.account_settle_secs)
	}

	pub fn consistency_backoff(&self) -> Duration {
		Duration::from_millis(self.consistency.backoff_ms)
	}
}

/// Login credentials, kept only in memory.
#[derive(Clone)]
pub struct Credentials {
	pub email: String,
	pub password: String,
}

impl std::fmt::Debug for Credentials {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Credentials").field("email", &self.email).field("password", &"<redacted>").finish()
	}
}

/// Absolute URLs of the pages the workflows visit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
	base: Url,
	pub login: String,
	pub drafts: String,
	pub plan: String,
}

impl Endpoints {
	pub fn new(base_url: &str) -> Result<Self> {
		let base = Url::parse(base_url).map_err(|e| Error::Config(format!("invalid base URL {base_url:?}: {e}")))?;
		let join = |path: &str| {
			base.join(path)
				.map(String::from)
				.map_err(|e| Error::Config(format!("cannot join {path} onto {base_url}: {e}")))
		};
		Ok(Self {
			login: join("/login.jsf")?,
			drafts: join("/draft.jsf")?,
			plan: join("/draftplan.jsf")?,
			base,
		})
	}

	/// Resolves an in-band redirect target against the base URL.
	pub fn resolve(&self, target: &str) -> Result<String> {
		self.base
			.join(target)
			.map(String::from)
			.map_err(|e| Error::not_found(format!("resolvable redirect target {target:?}: {e}")))
	}

	/// Whether `url` points at the login page.
	pub fn is_login(&self, url: &str) -> bool {
		url.contains("login.jsf")
	}
}
