use std::sync::Arc;

use chrono::Local;
use draftwatch::{HistoryEntry, TickReport};
use draftwatch_runtime::Scheduler;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::info;

use crate::context::CommandContext;
use crate::output::{emit, history_line, report_text};

#[derive(Serialize)]
struct PassSummary<'a> {
	report: TickReport,
	history: Vec<&'a HistoryEntry>,
}

pub async fn once(ctx: &CommandContext) -> anyhow::Result<()> {
	let mut watcher = ctx.online_watcher()?;
	let report = watcher.run_tick().await?;
	let summary = PassSummary {
		report,
		history: watcher.history().entries().collect(),
	};
	emit(ctx.format, &summary, |s| {
		let mut lines = vec![report_text(&s.report)];
		lines.extend(s.history.iter().map(|e| history_line(e)));
		lines.join("\n")
	})
}

/// Runs passes on the configured trigger until Ctrl-C.
pub async fn start(ctx: &CommandContext) -> anyhow::Result<()> {
	let watcher = Arc::new(Mutex::new(ctx.online_watcher()?));
	let trigger = ctx.trigger();
	let mut scheduler = Scheduler::new();

	let job_watcher = watcher.clone();
	scheduler.schedule_recurring(trigger.clone(), move || {
		let watcher = job_watcher.clone();
		async move {
			let mut watcher = watcher.lock().await;
			let started = Local::now();
			if let Some(report) = watcher.run_guarded().await {
				info!(target = "dw.runtime", summary = %report_text(&report), "pass complete");
			}
			for entry in watcher.history().entries().take_while(|e| e.time >= started) {
				info!(target = "dw.runtime", finding = %history_line(entry), "history");
			}
		}
	})?;
	info!(target = "dw.runtime", %trigger, "watching; press Ctrl-C to stop");

	tokio::signal::ctrl_c().await?;
	scheduler.cancel();
	watcher.lock().await.pause();
	info!(target = "dw.runtime", "stopped");
	Ok(())
}
