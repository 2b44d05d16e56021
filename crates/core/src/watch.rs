//! The watch-list scheduler: one pass over every watched draft.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::analysis::{Analysis, Criteria, Finding, analyze};
use crate::auth;
use crate::config::Config;
use crate::drafts::{DraftSettings, DuplicateOutcome, duplicate_draft, plan_and_poll};
use crate::error::{Error, Result};
use crate::extract::DraftRecord;
use crate::history::History;
use crate::notify::{Notifier, Severity};
use crate::session::Session;
use crate::store::{LogEntry, WatchItem, WatchStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSettings {
	/// Mile limit of items without their own.
	pub mile_threshold: u32,
	/// Pause after an account switch before touching drafts.
	pub account_settle: Duration,
	pub drafts: DraftSettings,
}

impl WatchSettings {
	pub fn from_config(config: &Config) -> Self {
		Self {
			mile_threshold: config.mile_threshold,
			account_settle: config.account_settle(),
			drafts: DraftSettings::from_config(config),
		}
	}
}

impl Default for WatchSettings {
	fn default() -> Self {
		Self::from_config(&Config::default())
	}
}

/// Counters of one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
	pub checked: usize,
	pub target_hits: usize,
	pub duplicated: usize,
	pub skipped: usize,
	pub removed: usize,
}

/// Owns one user's session, watch-list and notification channel.
pub struct Watcher {
	session: Session,
	store: Box<dyn WatchStore>,
	notifier: Box<dyn Notifier>,
	settings: WatchSettings,
	history: History,
	paused: bool,
}

impl Watcher {
	pub fn new(session: Session, store: Box<dyn WatchStore>, notifier: Box<dyn Notifier>, settings: WatchSettings) -> Self {
		Self {
			session,
			store,
			notifier,
			settings,
			history: History::new(),
			paused: false,
		}
	}

	pub fn session(&self) -> &Session {
		&self.session
	}

	pub fn session_mut(&mut self) -> &mut Session {
		&mut self.session
	}

	pub fn store(&self) -> &dyn WatchStore {
		self.store.as_ref()
	}

	pub fn history(&self) -> &History {
		&self.history
	}

	pub fn settings(&self) -> &WatchSettings {
		&self.settings
	}

	pub fn is_paused(&self) -> bool {
		self.paused
	}

	pub fn pause(&mut self) {
		self.paused = true;
		info!(target = "dw.watch", "watcher paused");
	}

	pub fn resume(&mut self) {
		self.paused = false;
		info!(target = "dw.watch", "watcher resumed");
	}

	/// Watches `draft` under the active account. Returns `false` when its
	/// key is already watched.
	pub fn add(&mut self, draft: &DraftRecord, mile_limit: Option<u32>, targets: &[String]) -> Result<bool> {
		if self.store.list_watch_items()?.contains_key(&draft.created) {
			debug!(target = "dw.watch", created = %draft.created, "already watched");
			return Ok(false);
		}
		let item = WatchItem::from_draft(
			draft,
			self.session.active_account_id(),
			self.session.active_account_name(),
			mile_limit,
			targets,
		);
		self.store.put_watch_item(&item.created, &item)?;
		self.log(Severity::Info, format!("Watching {} ({})", item.draft_name, item.created));
		Ok(true)
	}

	/// Returns whether `key` was watched.
	pub fn remove(&mut self, key: &str) -> Result<bool> {
		let Some(item) = self.store.list_watch_items()?.remove(key) else {
			return Ok(false);
		};
		self.store.delete_watch_item(key)?;
		self.log(Severity::Info, format!("Stopped watching {}", item.draft_name));
		Ok(true)
	}

	/// Replaces the mile limit and targets; found warehouses and the account stay.
	pub fn update_settings(&mut self, key: &str, mile_limit: Option<u32>, targets: &[String]) -> Result<WatchItem> {
		let mut item = self
			.store
			.list_watch_items()?
			.remove(key)
			.ok_or_else(|| Error::Store(format!("no watch item {key}")))?;
		item.mile_limit = mile_limit;
		item.set_targets(targets);
		self.store.put_watch_item(key, &item)?;
		self.log(Severity::Info, format!("Updated settings of {}", item.draft_name));
		Ok(item)
	}

	/// Watched items ordered by key.
	pub fn list(&self) -> Result<Vec<WatchItem>> {
		Ok(self.store.list_watch_items()?.into_values().collect())
	}

	pub fn recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>> {
		self.store.recent_logs(limit)
	}

	/// Runs a pass, logging and swallowing any error.
	pub async fn run_guarded(&mut self) -> Option<TickReport> {
		match self.run_tick().await {
			Ok(report) => Some(report),
			Err(err) => {
				self.log(Severity::Error, format!("Scheduler pass failed: {err}"));
				None
			}
		}
	}

	/// One pass over the watch-list.
	///
	/// Items are visited grouped by account. Deletions of finished or
	/// replaced items are applied after the pass; replacements are inserted
	/// as soon as they exist.
	pub async fn run_tick(&mut self) -> Result<TickReport> {
		let mut report = TickReport::default();
		if self.paused {
			debug!(target = "dw.watch", "paused; pass skipped");
			return Ok(report);
		}
		let mut items: Vec<WatchItem> = self.store.list_watch_items()?.into_values().collect();
		if items.is_empty() {
			debug!(target = "dw.watch", "watch-list empty; pass skipped");
			return Ok(report);
		}

		self.log(Severity::Info, format!("Periodic check started ({} items)", items.len()));
		if !self.session.is_logged_in() {
			auth::login(&mut self.session).await?;
		}

		items.sort_by(|a, b| a.account_id.cmp(&b.account_id));
		let mut deletions: Vec<String> = Vec::new();

		for item in items {
			report.checked += 1;
			if !self.ensure_account(&item).await {
				report.skipped += 1;
				continue;
			}

			let analysis = match self.evaluate(&item).await {
				Ok(analysis) => analysis,
				Err(err) => {
					self.log(Severity::Error, format!("{}: {err}", item.draft_name));
					report.skipped += 1;
					continue;
				}
			};

			match analysis {
				Analysis::NoOpportunity => {
					self.log(Severity::Warning, format!("{} complete, no opportunity", item.draft_name));
				}
				Analysis::TargetHit(hit) => {
					self.on_target_hit(&item, &hit).await;
					deletions.push(item.created.clone());
					report.target_hits += 1;
				}
				Analysis::Qualifying(findings) => {
					self.announce(&item, &Analysis::Qualifying(findings.clone())).await;
					match self.duplicate(&item).await {
						Ok(outcome) => match self.apply_duplicate(&item, outcome, &findings) {
							Ok(replaced) => {
								deletions.extend(replaced);
								report.duplicated += 1;
							}
							Err(err) => {
								warn!(target = "dw.watch", created = %item.created, error = %err, "copy not recorded");
								self.log(Severity::Error, format!("Recording the copy of {} failed: {err}", item.draft_name));
								report.skipped += 1;
							}
						},
						Err(err) => {
							self.log(Severity::Error, format!("Duplicate of {} failed: {err}", item.draft_name));
							report.skipped += 1;
						}
					}
				}
			}
		}

		for key in deletions {
			match self.store.delete_watch_item(&key) {
				Ok(()) => report.removed += 1,
				Err(err) => {
					warn!(target = "dw.watch", %key, error = %err, "deletion not applied");
					self.log(Severity::Error, format!("Removing {key} from the watch-list failed: {err}"));
				}
			}
		}
		info!(
			target = "dw.watch",
			checked = report.checked,
			hits = report.target_hits,
			duplicated = report.duplicated,
			skipped = report.skipped,
			"pass finished"
		);
		Ok(report)
	}

	/// Switches to the item's account unless it is already active.
	async fn ensure_account(&mut self, item: &WatchItem) -> bool {
		let Some(target) = item.account_id.as_deref() else {
			return true;
		};
		if self.session.active_account_id() == Some(target) {
			return true;
		}

		let outcome = match auth::switch_account(&mut self.session, target).await {
			Err(Error::SessionExpired) => self.relogin(Some(target)).await,
			other => other,
		};
		match outcome {
			Ok(()) => {
				let name = item.account_name.as_deref().unwrap_or(target);
				self.log(Severity::Success, format!("Switched to account {name}"));
				tokio::time::sleep(self.settings.account_settle).await;
				true
			}
			Err(err) => {
				self.log(Severity::Error, format!("Account switch for {} failed: {err}", item.draft_name));
				false
			}
		}
	}

	/// Plans and polls the item's draft, then classifies the result.
	async fn evaluate(&mut self, item: &WatchItem) -> Result<Analysis> {
		self.log(Severity::Info, format!("Planning {}", item.draft_name));
		let settings = self.settings.drafts.clone();
		let polled = match plan_and_poll(&mut self.session, &item.created, &settings).await {
			Err(Error::SessionExpired) => {
				self.relogin(item.account_id.as_deref()).await?;
				plan_and_poll(&mut self.session, &item.created, &settings).await
			}
			other => other,
		};
		let body = match polled {
			Ok(body) => body,
			Err(err) if err.is_no_result() => {
				self.log(Severity::Warning, format!("{}: {err}", item.draft_name));
				return Ok(Analysis::NoOpportunity);
			}
			Err(err) => return Err(err),
		};

		let criteria = Criteria {
			mile_limit: item.effective_mile_limit(self.settings.mile_threshold),
			targets: &item.targets,
			found: &item.found,
		};
		Ok(analyze(&body, &criteria))
	}

	async fn duplicate(&mut self, item: &WatchItem) -> Result<DuplicateOutcome> {
		self.log(Severity::Info, format!("Duplicating {}", item.draft_name));
		let settings = self.settings.drafts.clone();
		match duplicate_draft(&mut self.session, &item.created, &item.origin, &settings).await {
			Err(Error::SessionExpired) => {
				self.relogin(item.account_id.as_deref()).await?;
				duplicate_draft(&mut self.session, &item.created, &item.origin, &settings).await
			}
			other => other,
		}
	}

	/// Logs in again and returns to `account` before a step is retried.
	async fn relogin(&mut self, account: Option<&str>) -> Result<()> {
		warn!(target = "dw.watch", account = account.unwrap_or("default"), "session expired; logging in again");
		auth::relogin(&mut self.session, account).await
	}

	async fn on_target_hit(&mut self, item: &WatchItem, hit: &Finding) {
		self.log(
			Severity::Success,
			format!("Target warehouse {} reached for {}; tracking ends", hit.warehouse, item.draft_name),
		);
		self.announce(item, &Analysis::TargetHit(hit.clone())).await;
		self.history.record(account_label(item), &item.draft_name, std::slice::from_ref(hit));
	}

	async fn announce(&self, item: &WatchItem, analysis: &Analysis) {
		let facts = analysis.facts();
		match analysis {
			Analysis::TargetHit(hit) => {
				let message = format!(
					"Target warehouse {} found for {}. Removing it from the watch-list.",
					hit.warehouse, item.draft_name
				);
				self.notifier.notify("Target warehouse reached", &message, Severity::Success, &facts).await;
			}
			Analysis::Qualifying(findings) => {
				let limit = item.effective_mile_limit(self.settings.mile_threshold);
				let title = format!("{} opportunities found", findings.len());
				let message = format!("These plans for {} are under {limit} mi:", item.draft_name);
				self.notifier.notify(&title, &message, Severity::Info, &facts).await;
			}
			Analysis::NoOpportunity => {}
		}
	}

	/// Persists the copy that replaces `item`. Returns the key to drop at the
	/// end of the pass when the identity changed.
	fn apply_duplicate(&mut self, item: &WatchItem, outcome: DuplicateOutcome, findings: &[Finding]) -> Result<Option<String>> {
		let mut next = item.clone();
		next.created = outcome.created;
		next.draft_name = outcome.name;
		if !outcome.origin.trim().is_empty() {
			next.origin = outcome.origin;
		}
		let added = next.merge_found(findings.iter().map(|f| f.warehouse.as_str()));
		self.store.put_watch_item(&next.created, &next)?;
		if added {
			self.history.record(account_label(item), &item.draft_name, findings);
		}

		let warehouses: Vec<&str> = findings.iter().map(|f| f.warehouse.as_str()).collect();
		self.log(
			Severity::Success,
			format!("{} duplicated as {} ({})", item.draft_name, next.draft_name, warehouses.join(", ")),
		);
		Ok((next.created != item.created).then(|| item.created.clone()))
	}

	/// Writes a user-visible log entry and mirrors it to tracing.
	fn log(&mut self, severity: Severity, message: String) {
		match severity {
			Severity::Error => error!(target = "dw.watch", "{message}"),
			Severity::Warning => warn!(target = "dw.watch", "{message}"),
			Severity::Info | Severity::Success => info!(target = "dw.watch", %severity, "{message}"),
		}
		if let Err(err) = self.store.append_log(&message, severity) {
			warn!(target = "dw.store", error = %err, "log entry not persisted");
		}
	}
}

fn account_label(item: &WatchItem) -> &str {
	item.account_name.as_deref().or(item.account_id.as_deref()).unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::auth::fixtures::{account_table, header_page, login_page, switch_ack};
	use crate::drafts::fixtures::{detail_page, progress, redirect, scripted_session, token_update};
	use crate::extract::drafts::fixtures::{draft_page, draft_row};
	use crate::notify::RecordingNotifier;
	use crate::session::AuthState;
	use crate::store::{JsonFileStore, MemoryStore};
	use crate::transport::ScriptController;

	const CONFIRM: &str = r#"<partial-response><changes><update id="clone_draft_confirm"><![CDATA[<button id="j_idt61" class="ui-confirmdialog-yes" type="button">Yes</button>]]></update><update id="j_id1:javax.faces.ViewState:0"><![CDATA[c1]]></update></changes></partial-response>"#;

	fn fast() -> WatchSettings {
		WatchSettings {
			mile_threshold: 300,
			account_settle: Duration::ZERO,
			drafts: DraftSettings {
				poll_interval: Duration::ZERO,
				poll_attempts: 5,
				consistency_attempts: 3,
				consistency_backoff: Duration::ZERO,
			},
		}
	}

	fn watched(created: &str) -> WatchItem {
		WatchItem {
			created: created.to_string(),
			account_id: Some("7".into()),
			account_name: Some("Acme Store".into()),
			draft_name: "Spring".into(),
			origin: "Reno, NV".into(),
			mile_limit: Some(300),
			targets: vec!["MEM1".into()],
			found: vec!["TTN2".into()],
		}
	}

	fn watcher(store: Box<dyn WatchStore>) -> (Watcher, ScriptController, RecordingNotifier) {
		let (mut session, controller) = scripted_session();
		session.set_state(AuthState::LoggedIn);
		session.set_active_account("7", Some("Acme Store"));
		let notifier = RecordingNotifier::new();
		let watcher = Watcher::new(session, store, Box::new(notifier.clone()), fast());
		(watcher, controller, notifier)
	}

	fn result_row(dest: &str, distance: &str) -> String {
		format!("<tr><td>1</td><td>SPD</td><td>{dest}</td><td>{distance}</td><td>4</td></tr>")
	}

	fn plan_result(rows: &[String]) -> String {
		format!(
			r#"<partial-response><changes><update id="mainForm:progressBarPlaning"><![CDATA[<div class="ui-progressbar-label">0%</div>]]></update><update id="mainForm:shipmentPlansPanel"><![CDATA[<table><tbody id="mainForm:plans_data"><tr class="ui-rowgroup-header"><td>Option 1</td></tr>{}</tbody></table>]]></update><update id="j_id1:javax.faces.ViewState:0"><![CDATA[done]]></update></changes></partial-response>"#,
			rows.concat()
		)
	}

	fn script_plan(controller: &ScriptController, rows: &[String]) {
		script_plan_for(controller, "k1", rows);
	}

	fn script_plan_for(controller: &ScriptController, created: &str, rows: &[String]) {
		script_plan_start(controller, created);
		controller.reply(progress(80, "p1")).reply(plan_result(rows));
	}

	/// Everything up to the first progress poll.
	fn script_plan_start(controller: &ScriptController, created: &str) {
		controller
			.reply(draft_page(&[draft_row(0, "Spring", "Reno, NV", created)], "list"))
			.reply(redirect("/draftplan.jsf?draft=9"))
			.reply(detail_page("Spring", "Reno, NV", "detail"))
			.reply(token_update("created"));
	}

	/// A fresh login that lands on Acme Store, then the switch back to Babil Design.
	fn script_relogin_into_babil(controller: &ScriptController) {
		let accounts = [("7", "Acme Store"), ("202", "Babil Design")];
		controller
			.reply(login_page("l1"))
			.reply_at("https://app.test/draft.jsf", "<html>home</html>")
			.reply(header_page("Acme Store", "h1"))
			.reply(account_table(&accounts, "m1"))
			.reply(header_page("Acme Store", "h2"))
			.reply(switch_ack("Babil Design", "s1"))
			.reply(header_page("Babil Design", "h3"))
			.reply(account_table(&accounts, "m2"));
	}

	fn babil_watcher(keys: &[&str]) -> (Watcher, ScriptController) {
		let mut store = MemoryStore::new();
		for key in keys {
			let mut item = watched(key);
			item.account_id = Some("202".into());
			item.account_name = Some("Babil Design".into());
			store.put_watch_item(key, &item).unwrap();
		}
		let (mut watcher, controller, _) = watcher(Box::new(store));
		watcher.session_mut().set_active_account("202", Some("Babil Design"));
		(watcher, controller)
	}

	/// Store whose writes to the listed keys fail.
	struct RefusingStore {
		inner: MemoryStore,
		refused: Vec<String>,
	}

	impl RefusingStore {
		fn check(&self, key: &str) -> Result<()> {
			if self.refused.iter().any(|k| k == key) {
				return Err(Error::Store(format!("disk full writing {key}")));
			}
			Ok(())
		}
	}

	impl WatchStore for RefusingStore {
		fn put_watch_item(&mut self, key: &str, item: &WatchItem) -> Result<()> {
			self.check(key)?;
			self.inner.put_watch_item(key, item)
		}

		fn delete_watch_item(&mut self, key: &str) -> Result<()> {
			self.check(key)?;
			self.inner.delete_watch_item(key)
		}

		fn list_watch_items(&self) -> Result<std::collections::BTreeMap<String, WatchItem>> {
			self.inner.list_watch_items()
		}

		fn append_log(&mut self, message: &str, severity: Severity) -> Result<()> {
			self.inner.append_log(message, severity)
		}

		fn recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>> {
			self.inner.recent_logs(limit)
		}
	}

	fn refusing(keys: &[&str], refused: &[&str]) -> RefusingStore {
		let mut inner = MemoryStore::new();
		for key in keys {
			inner.put_watch_item(key, &watched(key)).unwrap();
		}
		RefusingStore {
			inner,
			refused: refused.iter().map(|k| k.to_string()).collect(),
		}
	}

	#[tokio::test]
	async fn target_hit_notifies_and_removes_item() {
		let mut store = MemoryStore::new();
		store.put_watch_item("k1", &watched("k1")).unwrap();
		let (mut watcher, controller, notifier) = watcher(Box::new(store));
		script_plan(&controller, &[result_row("MEM1: Memphis", "150mi"), result_row("AVP1", "90mi")]);

		let report = watcher.run_tick().await.unwrap();
		assert_eq!(report.target_hits, 1);
		assert_eq!(report.removed, 1);
		assert!(watcher.list().unwrap().is_empty());

		let sent = notifier.sent();
		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0].severity, Severity::Success);
		assert!(sent[0].facts.contains(&("Warehouse".to_string(), "MEM1".to_string())));
		assert_eq!(watcher.history().entries().next().unwrap().summary, "MEM1: 150 Mil");
		assert_eq!(controller.pending(), 0);
	}

	#[tokio::test]
	async fn qualifying_result_duplicates_and_replaces_identity() {
		let mut store = MemoryStore::new();
		store.put_watch_item("k1", &watched("k1")).unwrap();
		let (mut watcher, controller, notifier) = watcher(Box::new(store));
		script_plan(&controller, &[result_row("AVP1: Avenel", "287mi"), result_row("TTN2", "12mi")]);

		let original = draft_row(0, "Spring", "Reno, NV", "k1");
		let copy = draft_row(1, "Spring - Copy", "Reno, NV", "k2");
		controller
			.reply(draft_page(&[original.clone()], "list"))
			.reply(CONFIRM)
			.reply(redirect("/draftplan.jsf?draft=10"))
			.reply(detail_page("Spring - Copy", "Reno, NV 89501", "copy"))
			.reply(draft_page(&[original.clone(), copy.clone()], "list2"))
			.reply(token_update("r1"))
			.reply(token_update("r2"))
			.reply(draft_page(&[original, copy], "list3"));

		let report = watcher.run_tick().await.unwrap();
		assert_eq!(report.duplicated, 1);
		assert_eq!(controller.pending(), 0);

		let items = watcher.store().list_watch_items().unwrap();
		assert_eq!(items.keys().collect::<Vec<_>>(), vec!["k2"]);
		let next = &items["k2"];
		assert_eq!(next.mile_limit, Some(300));
		assert_eq!(next.targets, vec!["MEM1".to_string()]);
		assert_eq!(next.account_id.as_deref(), Some("7"));
		assert_eq!(next.found, vec!["TTN2".to_string(), "AVP1".to_string()]);
		assert!(next.draft_name.starts_with("Spring "));

		let sent = notifier.sent();
		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0].facts, vec![("Option 1".to_string(), "287 mi -> AVP1".to_string())]);
		assert_eq!(watcher.history().len(), 1);
	}

	#[tokio::test]
	async fn tick_without_opportunity_leaves_watch_list_identical() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("store.json");
		let mut store = JsonFileStore::open(&path).unwrap();
		store.put_watch_item("k1", &watched("k1")).unwrap();
		let items_on_disk = || {
			let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
			serde_json::to_string_pretty(&value["items"]).unwrap()
		};
		let before = items_on_disk();

		let (mut watcher, controller, notifier) = watcher(Box::new(store));
		script_plan(&controller, &[result_row("ABE8", "900mi"), result_row("TTN2", "12mi")]);
		let report = watcher.run_tick().await.unwrap();

		assert_eq!(report.checked, 1);
		assert_eq!(report.removed, 0);
		assert_eq!(items_on_disk(), before);
		assert!(notifier.sent().is_empty());
		assert!(watcher.history().is_empty());
	}

	#[tokio::test]
	async fn failed_account_switch_skips_item_unchanged() {
		let mut store = MemoryStore::new();
		let mut item = watched("k1");
		item.account_id = Some("9".into());
		store.put_watch_item("k1", &item).unwrap();
		let (mut watcher, controller, _) = watcher(Box::new(store));
		controller
			.reply(draft_page(&[], "list"))
			.reply(token_update("no-badge"));

		let report = watcher.run_tick().await.unwrap();
		assert_eq!(report.skipped, 1);
		assert_eq!(watcher.list().unwrap(), vec![item]);
		assert_eq!(controller.pending(), 0);
	}

	#[tokio::test]
	async fn expired_poll_logs_in_again_and_retries_in_the_item_account() {
		let (mut watcher, controller) = babil_watcher(&["k1"]);
		script_plan_start(&controller, "k1");
		controller.reply(redirect("/login.jsf"));
		script_relogin_into_babil(&controller);
		script_plan_for(&controller, "k1", &[result_row("ABE8", "900mi")]);

		let report = watcher.run_tick().await.unwrap();
		assert_eq!(report.checked, 1);
		assert_eq!(report.skipped, 0);
		assert_eq!(controller.pending(), 0);
		assert_eq!(controller.cookie_clears(), 1);
		assert_eq!(watcher.session().active_account_id(), Some("202"));

		let posts = controller.posts();
		let position = |source: &str| -> Vec<usize> {
			posts
				.iter()
				.enumerate()
				.filter(|(_, post)| post.source() == Some(source))
				.map(|(index, _)| index)
				.collect()
		};
		let selects = position("__my_store_form__:__my_stor_table__");
		let plans = position("mainForm:create_plan");
		assert_eq!(selects.len(), 1);
		assert_eq!(plans.len(), 2);
		assert!(plans[0] < selects[0] && selects[0] < plans[1]);
		assert_eq!(posts[selects[0]].field("__my_store_form__:__my_stor_table___selection"), Some("202"));
	}

	#[tokio::test]
	async fn second_expiry_skips_the_item_and_the_pass_continues() {
		let (mut watcher, controller) = babil_watcher(&["k1", "k2"]);
		script_plan_start(&controller, "k1");
		controller.reply(redirect("/login.jsf"));
		script_relogin_into_babil(&controller);
		script_plan_start(&controller, "k1");
		controller.reply(redirect("/login.jsf"));
		script_plan_for(&controller, "k2", &[result_row("ABE8", "900mi")]);

		let report = watcher.run_tick().await.unwrap();
		assert_eq!(report.checked, 2);
		assert_eq!(report.skipped, 1);
		assert_eq!(controller.pending(), 0);
		assert_eq!(controller.cookie_clears(), 1);
		assert_eq!(watcher.list().unwrap().len(), 2);
		assert!(
			watcher
				.recent_logs(10)
				.unwrap()
				.iter()
				.any(|e| e.severity == Severity::Error && e.message.contains("Spring"))
		);
	}

	#[tokio::test]
	async fn failed_deletion_does_not_stop_the_pass() {
		let store = refusing(&["k1", "k2"], &["k1"]);
		let (mut watcher, controller, notifier) = watcher(Box::new(store));
		script_plan_for(&controller, "k1", &[result_row("MEM1", "150mi")]);
		script_plan_for(&controller, "k2", &[result_row("MEM1", "150mi")]);

		let report = watcher.run_tick().await.unwrap();
		assert_eq!(report.target_hits, 2);
		assert_eq!(report.removed, 1);
		assert_eq!(notifier.sent().len(), 2);
		assert_eq!(watcher.list().unwrap().iter().map(|i| i.created.as_str()).collect::<Vec<_>>(), vec!["k1"]);
		assert_eq!(watcher.recent_logs(1).unwrap()[0].severity, Severity::Error);
	}

	#[tokio::test]
	async fn unrecorded_copy_leaves_the_item_for_the_next_pass() {
		let store = refusing(&["k1"], &["k2"]);
		let (mut watcher, controller, _) = watcher(Box::new(store));
		script_plan(&controller, &[result_row("AVP1: Avenel", "287mi")]);
		let original = draft_row(0, "Spring", "Reno, NV", "k1");
		let copy = draft_row(1, "Spring - Copy", "Reno, NV", "k2");
		controller
			.reply(draft_page(&[original.clone()], "list"))
			.reply(CONFIRM)
			.reply(redirect("/draftplan.jsf?draft=10"))
			.reply(detail_page("Spring - Copy", "Reno, NV 89501", "copy"))
			.reply(draft_page(&[original.clone(), copy.clone()], "list2"))
			.reply(token_update("r1"))
			.reply(token_update("r2"))
			.reply(draft_page(&[original, copy], "list3"));

		let report = watcher.run_tick().await.unwrap();
		assert_eq!(report.duplicated, 0);
		assert_eq!(report.skipped, 1);
		assert_eq!(report.removed, 0);
		assert_eq!(watcher.list().unwrap(), vec![watched("k1")]);
		assert!(watcher.history().is_empty());
	}

	#[tokio::test]
	async fn paused_or_empty_watcher_sends_nothing() {
		let mut store = MemoryStore::new();
		store.put_watch_item("k1", &watched("k1")).unwrap();
		let (mut watcher, controller, _) = watcher(Box::new(store));
		watcher.pause();
		assert_eq!(watcher.run_tick().await.unwrap(), TickReport::default());
		assert!(controller.sent().is_empty());

		let (mut empty, controller, _) = self::watcher(Box::new(MemoryStore::new()));
		assert_eq!(empty.run_tick().await.unwrap(), TickReport::default());
		assert!(controller.sent().is_empty());
	}

	#[tokio::test]
	async fn guarded_run_swallows_login_failure() {
		let mut store = MemoryStore::new();
		store.put_watch_item("k1", &watched("k1")).unwrap();
		let (transport_session, controller) = scripted_session();
		let mut watcher = Watcher::new(transport_session, Box::new(store), Box::new(RecordingNotifier::new()), fast());
		controller.fail("connection refused");

		assert!(watcher.run_guarded().await.is_none());
		let logs = watcher.recent_logs(1).unwrap();
		assert_eq!(logs[0].severity, Severity::Error);
		assert_eq!(watcher.list().unwrap().len(), 1);
	}

	#[tokio::test]
	async fn management_operations() {
		let (mut watcher, _, _) = watcher(Box::new(MemoryStore::new()));
		let record = crate::extract::parse_draft_table(&draft_page(&[draft_row(0, "Spring", "Reno, NV", "k1")], "t"))
			.pop()
			.unwrap();

		assert!(watcher.add(&record, Some(250), &[" mem1 ".to_string()]).unwrap());
		assert!(!watcher.add(&record, None, &[]).unwrap());
		let item = &watcher.list().unwrap()[0];
		assert_eq!(item.account_name.as_deref(), Some("Acme Store"));
		assert_eq!(item.targets, vec!["MEM1".to_string()]);

		let updated = watcher.update_settings("k1", None, &["avp1".to_string()]).unwrap();
		assert_eq!(updated.mile_limit, None);
		assert_eq!(updated.targets, vec!["AVP1".to_string()]);
		assert_eq!(updated.account_id.as_deref(), Some("7"));
		assert!(matches!(watcher.update_settings("nope", None, &[]), Err(Error::Store(_))));

		assert!(watcher.remove("k1").unwrap());
		assert!(!watcher.remove("k1").unwrap());
		assert!(watcher.list().unwrap().is_empty());
	}
}
