//! Classification of a completed plan's result rows.

use draftwatch_protocol::cdata_sections;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::extract::markup::{elements, outermost};

/// Row-group label marking the aggregate plan, which is never actionable.
const OPTIMIZED_GROUP: &str = "Amazon Optimized";
const GROUP_HEADER_CLASS: &str = "ui-rowgroup-header";
const DISTANCE_UNIT: &str = "mi";

/// What the analyzer compares each result row against.
#[derive(Debug, Clone, Copy)]
pub struct Criteria<'a> {
	pub mile_limit: u32,
	/// Warehouse codes whose appearance ends tracking.
	pub targets: &'a [String],
	/// Warehouse codes already acted on for this draft.
	pub found: &'a [String],
}

/// One destination warehouse within one option group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
	pub warehouse: String,
	pub distance: u32,
	pub group: String,
}

impl Finding {
	/// `"287 mi -> AVP1"`
	pub fn describe(&self) -> String {
		format!("{} {DISTANCE_UNIT} -> {}", self.distance, self.warehouse)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Analysis {
	NoOpportunity,
	/// A target warehouse appeared; remaining rows were not evaluated.
	TargetHit(Finding),
	/// New destinations under the mile limit, one per warehouse.
	Qualifying(Vec<Finding>),
}

impl Analysis {
	/// Notification facts: option group to `"<distance> mi -> <warehouse>"`.
	pub fn facts(&self) -> Vec<(String, String)> {
		match self {
			Analysis::NoOpportunity => Vec::new(),
			Analysis::TargetHit(hit) => vec![
				("Warehouse".to_string(), hit.warehouse.clone()),
				("Distance".to_string(), format!("{} {DISTANCE_UNIT}", hit.distance)),
				("Plan".to_string(), hit.group.clone()),
			],
			Analysis::Qualifying(findings) => findings.iter().map(|f| (f.group.clone(), f.describe())).collect(),
		}
	}
}

/// Classifies the rows of a plan-result partial response.
pub fn analyze(response: &str, criteria: &Criteria<'_>) -> Analysis {
	let combined = cdata_sections(response);
	let markup = if combined.is_empty() { response } else { combined.as_str() };

	let Some(plans) = elements(markup, "tbody")
		.into_iter()
		.find(|t| t.attr("id").is_some_and(|id| id.contains("plans")))
	else {
		debug!(target = "dw.analysis", "no plan results table");
		return Analysis::NoOpportunity;
	};

	let targets: Vec<String> = normalize_codes(criteria.targets);
	let found: Vec<String> = normalize_codes(criteria.found);
	let mut group = String::from("unknown");
	let mut qualifying: Vec<Finding> = Vec::new();

	for row in elements(plans.inner, "tr") {
		if row.has_class(GROUP_HEADER_CLASS) {
			group = row.text();
			continue;
		}

		let cells = outermost(row.inner, "td");
		if cells.len() <= 3 {
			continue;
		}
		let distance_text = cells[3].text();
		if !distance_text.contains(DISTANCE_UNIT) {
			continue;
		}
		let distance = match parse_distance(&distance_text) {
			Some(distance) => distance,
			None => {
				warn!(target = "dw.analysis", cell = %distance_text, "unparseable distance; row skipped");
				continue;
			}
		};
		if group.contains(OPTIMIZED_GROUP) {
			continue;
		}
		let warehouse = destination_code(&cells[2].text());

		if targets.iter().any(|t| warehouse.contains(t.as_str())) {
			debug!(target = "dw.analysis", %warehouse, distance, "target warehouse reached");
			return Analysis::TargetHit(Finding { warehouse, distance, group });
		}

		if distance < criteria.mile_limit {
			if found.contains(&warehouse) {
				debug!(target = "dw.analysis", %warehouse, distance, "already acted on; skipping");
				continue;
			}
			if !qualifying.iter().any(|f| f.warehouse == warehouse) {
				debug!(target = "dw.analysis", %warehouse, distance, group = %group, "qualifying destination");
				qualifying.push(Finding {
					warehouse,
					distance,
					group: group.clone(),
				});
			}
		}
	}

	if qualifying.is_empty() {
		Analysis::NoOpportunity
	} else {
		Analysis::Qualifying(qualifying)
	}
}

/// Upper-cased, trimmed codes with empties dropped.
pub fn normalize_codes<S: AsRef<str>>(codes: &[S]) -> Vec<String> {
	codes
		.iter()
		.map(|c| c.as_ref().trim().to_uppercase())
		.filter(|c| !c.is_empty())
		.collect()
}

fn parse_distance(text: &str) -> Option<u32> {
	text.replace(DISTANCE_UNIT, "").replace(',', "").trim().parse().ok()
}

fn destination_code(cell: &str) -> String {
	let upper = cell.to_uppercase();
	upper.split(':').next().unwrap_or_default().trim().to_string()
}
