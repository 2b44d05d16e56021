//! Draft table rows.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::markup::{Element, elements, outermost};
use crate::error::{Error, Result};

const MIN_CELLS: usize = 11;
const OPEN_TITLE: &str = "Open Draft Shipment";

/// Control ids attached to one draft row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftControls {
	pub open: Option<String>,
	pub duplicate: Option<String>,
	/// Id of the inline name input; rename posts against it.
	pub name_field: String,
}

/// One row of the draft table. `created` is the natural key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRecord {
	pub name: String,
	pub origin: String,
	pub sku_count: Option<u32>,
	pub unit_count: Option<u32>,
	pub created: String,
	pub controls: DraftControls,
}

/// Parses every well-formed draft row; malformed rows are logged and skipped.
pub fn parse_draft_table(html: &str) -> Vec<DraftRecord> {
	elements(html, "tr")
		.into_iter()
		.filter(|row| row.attr("role").as_deref() == Some("row"))
		.filter_map(|row| {
			let cells = outermost(row.inner, "td");
			if cells.len() < MIN_CELLS {
				return None;
			}
			match parse_row(&row, &cells) {
				Ok(record) => Some(record),
				Err(err) => {
					warn!(target = "dw.extract", error = %err, "skipping draft row");
					None
				}
			}
		})
		.collect()
}

/// Finds the row whose created timestamp equals `created`.
pub fn find_by_created<'a>(drafts: &'a [DraftRecord], created: &str) -> Option<&'a DraftRecord> {
	drafts.iter().find(|d| d.created == created)
}

/// Finds the row whose display name equals `name`.
pub fn find_by_name<'a>(drafts: &'a [DraftRecord], name: &str) -> Option<&'a DraftRecord> {
	drafts.iter().find(|d| d.name == name)
}

fn parse_row(row: &Element<'_>, cells: &[Element<'_>]) -> Result<DraftRecord> {
	let name_input = elements(cells[2].inner, "input")
		.into_iter()
		.next()
		.ok_or_else(|| Error::malformed("name cell has no input"))?;
	let name_field = name_input.id().ok_or_else(|| Error::malformed("name input has no id"))?;
	let name = name_input.attr("value").unwrap_or_else(|| cells[2].text());

	let anchors = elements(row.inner, "a");
	let open = anchors
		.iter()
		.find(|a| a.attr("title").as_deref() == Some(OPEN_TITLE))
		.and_then(|a| a.id())
		.or_else(|| elements(cells[1].inner, "a").first().and_then(|a| a.id()));

	let duplicate = anchors
		.iter()
		.find(|a| {
			a.attr("title").is_some_and(|t| {
				let t = t.to_lowercase();
				t.contains("duplicate") || t.contains("copy")
			})
		})
		.or_else(|| {
			anchors.iter().find(|a| {
				elements(a.inner, "span")
					.iter()
					.any(|s| s.class_contains("copy") || s.class_contains("clone"))
			})
		})
		.and_then(|a| a.id());

	Ok(DraftRecord {
		name,
		origin: cells[3].text(),
		sku_count: parse_count(&cells[8].text()),
		unit_count: parse_count(&cells[9].text()),
		created: cells[10].text(),
		controls: DraftControls {
			open,
			duplicate,
			name_field,
		},
	})
}

fn parse_count(text: &str) -> Option<u32> {
	text.replace(',', "").trim().parse().ok()
}
