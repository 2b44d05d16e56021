//! Bounded record of actionable findings, for display only.

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::analysis::Finding;

pub const HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
	pub account: String,
	pub draft_name: String,
	/// `"AVP1: 287 Mil, ABE8: 120 Mil"`
	pub summary: String,
	pub time: DateTime<Local>,
}

/// Newest-first ring holding at most [`HISTORY_CAPACITY`] entries.
#[derive(Debug, Clone, Default)]
pub struct History {
	entries: VecDeque<HistoryEntry>,
}

impl History {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn record(&mut self, account: &str, draft_name: &str, findings: &[Finding]) {
		let summary = findings
			.iter()
			.map(|f| format!("{}: {} Mil", f.warehouse, f.distance))
			.collect::<Vec<_>>()
			.join(", ");
		if self.entries.len() == HISTORY_CAPACITY {
			self.entries.pop_back();
		}
		self.entries.push_front(HistoryEntry {
			account: account.to_string(),
			draft_name: draft_name.to_string(),
			summary,
			time: Local::now(),
		});
	}

	pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
		self.entries.iter()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
