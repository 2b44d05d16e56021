//! Rendering of command results.

use clap::ValueEnum;
use draftwatch::{AccountRecord, DraftRecord, HistoryEntry, LogEntry, TickReport, WatchItem};
use serde::Serialize;

/// Output format for CLI results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text
	#[default]
	Text,
	/// Pretty-printed JSON
	Json,
}

impl std::fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OutputFormat::Text => write!(f, "text"),
			OutputFormat::Json => write!(f, "json"),
		}
	}
}

/// Prints `value` as JSON, or the text rendering otherwise.
pub fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce(&T) -> String) -> anyhow::Result<()> {
	match format {
		OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
		OutputFormat::Text => {
			let rendered = text(value);
			if !rendered.is_empty() {
				println!("{rendered}");
			}
		}
	}
	Ok(())
}

pub fn accounts_text(accounts: &[AccountRecord]) -> String {
	if accounts.is_empty() {
		return "no accounts discovered".to_string();
	}
	accounts
		.iter()
		.map(|a| format!("{} {:<8} {}", if a.is_active { "*" } else { " " }, a.row_key, a.name))
		.collect::<Vec<_>>()
		.join("\n")
}

pub fn drafts_text(drafts: &[DraftRecord]) -> String {
	if drafts.is_empty() {
		return "no drafts".to_string();
	}
	drafts
		.iter()
		.map(|d| {
			let count = |n: Option<u32>| n.map(|n| n.to_string()).unwrap_or_else(|| "-".into());
			format!(
				"{:<18} {:<32} {:<24} skus={} units={}",
				d.created,
				d.name,
				d.origin,
				count(d.sku_count),
				count(d.unit_count)
			)
		})
		.collect::<Vec<_>>()
		.join("\n")
}

pub fn watch_items_text(items: &[WatchItem], global_limit: u32) -> String {
	if items.is_empty() {
		return "watch-list is empty".to_string();
	}
	items
		.iter()
		.map(|item| {
			let limit = match item.mile_limit {
				Some(limit) => limit.to_string(),
				None => format!("{global_limit} (global)"),
			};
			format!(
				"{:<18} {:<32} account={} limit={limit} targets=[{}] found=[{}]",
				item.created,
				item.draft_name,
				item.account_name.as_deref().unwrap_or("-"),
				item.targets.join(","),
				item.found.join(","),
			)
		})
		.collect::<Vec<_>>()
		.join("\n")
}

pub fn logs_text(entries: &[LogEntry]) -> String {
	entries.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
}

pub fn history_line(entry: &HistoryEntry) -> String {
	format!(
		"{} {} / {}: {}",
		entry.time.format("%H:%M:%S"),
		entry.account,
		entry.draft_name,
		entry.summary
	)
}

pub fn report_text(report: &TickReport) -> String {
	format!(
		"checked {} | target hits {} | duplicated {} | skipped {} | removed {}",
		report.checked, report.target_hits, report.duplicated, report.skipped, report.removed
	)
}
