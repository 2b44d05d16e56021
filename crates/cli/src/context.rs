//! Shared state a command runs against.

use std::path::PathBuf;

use anyhow::Context as _;
use draftwatch::{
	Config, Credentials, HttpTransport, JsonFileStore, Session, TriggerMode, WatchSettings, Watcher, WebhookNotifier,
};
use draftwatch_runtime::TriggerSpec;
use tracing::debug;

use crate::output::OutputFormat;

pub struct CommandContext {
	pub config: Config,
	pub config_path: PathBuf,
	pub format: OutputFormat,
}

impl CommandContext {
	/// Loads the config file, then applies environment overrides.
	pub fn load(config_path: Option<PathBuf>, format: OutputFormat) -> anyhow::Result<Self> {
		let config_path = config_path.unwrap_or_else(Config::default_path);
		let config = Config::load(&config_path)
			.with_context(|| format!("reading {}", config_path.display()))?
			.apply_env();
		config.validate()?;
		debug!(target = "dw.config", path = %config_path.display(), base = %config.base_url, "config ready");
		Ok(Self {
			config,
			config_path,
			format,
		})
	}

	/// Watcher over the live site; credentials are required.
	pub fn online_watcher(&self) -> anyhow::Result<Watcher> {
		let credentials = self.config.credentials()?;
		self.watcher(credentials)
	}

	/// Watcher for watch-list and log commands that never touch the network.
	pub fn offline_watcher(&self) -> anyhow::Result<Watcher> {
		let credentials = self.config.credentials().unwrap_or_else(|_| Credentials {
			email: String::new(),
			password: String::new(),
		});
		self.watcher(credentials)
	}

	fn watcher(&self, credentials: Credentials) -> anyhow::Result<Watcher> {
		let transport = HttpTransport::new(self.config.user_agent.clone())?;
		let session = Session::new(Box::new(transport), self.config.endpoints()?, credentials);
		let store_path = self.config.store_path();
		let store = JsonFileStore::open(&store_path).with_context(|| format!("opening store {}", store_path.display()))?;
		let notifier = WebhookNotifier::from_url(self.config.webhook_url.as_deref())?;
		Ok(Watcher::new(
			session,
			Box::new(store),
			notifier,
			WatchSettings::from_config(&self.config),
		))
	}

	pub fn trigger(&self) -> TriggerSpec {
		trigger_spec(self.config.trigger.mode, self.config.trigger.interval_minutes)
	}
}

pub fn trigger_spec(mode: TriggerMode, interval_minutes: u32) -> TriggerSpec {
	match mode {
		TriggerMode::Interval => TriggerSpec::interval(interval_minutes),
		TriggerMode::HalfHourly => TriggerSpec::half_hourly(),
		TriggerMode::Quarterly => TriggerSpec::quarterly(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn modes_map_onto_trigger_specs() {
		assert_eq!(trigger_spec(TriggerMode::Interval, 10), TriggerSpec::interval(10));
		assert_eq!(trigger_spec(TriggerMode::HalfHourly, 10), TriggerSpec::half_hourly());
		assert_eq!(trigger_spec(TriggerMode::Quarterly, 10), TriggerSpec::quarterly());
	}

	#[test]
	fn missing_config_file_means_defaults() {
		let dir = tempfile::tempdir().unwrap();
		let ctx = CommandContext::load(Some(dir.path().join("absent.json")), OutputFormat::Text).unwrap();
		assert_eq!(ctx.config.mile_threshold, 300);
		assert_eq!(ctx.trigger(), TriggerSpec::interval(30));
	}
}
