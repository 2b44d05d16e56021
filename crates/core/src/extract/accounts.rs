//! Account list fragment and header badge.

use serde::{Deserialize, Serialize};

use super::markup::{element_by_id, elements};

/// Element id of the header badge naming the active account.
pub const ACTIVE_BADGE_ID: &str = "ccFlag";

/// One selectable account, keyed by the table's row key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
	pub row_key: String,
	pub name: String,
	pub is_active: bool,
}

/// Name shown in the header badge, if the page renders one.
pub fn active_account_name(html: &str) -> Option<String> {
	element_by_id(html, "div", ACTIVE_BADGE_ID)
		.map(|badge| badge.text())
		.filter(|name| !name.is_empty())
}

/// Parses account rows and marks the one matching `active_name`.
pub fn parse_account_table(fragment: &str, active_name: Option<&str>) -> Vec<AccountRecord> {
	let active = active_name.map(normalize_name);
	elements(fragment, "tr")
		.into_iter()
		.filter_map(|row| {
			let row_key = row.attr("data-rk")?;
			let name = elements(row.inner, "input")
				.into_iter()
				.find(|input| input.attr("id").is_some_and(|id| id.contains("store_name")))
				.and_then(|input| input.attr("value"))
				.unwrap_or_else(|| row.text());
			let is_active = active.as_deref().is_some_and(|a| a == normalize_name(&name));
			Some(AccountRecord { row_key, name, is_active })
		})
		.collect()
}

/// Trim and case-fold; account matching uses nothing fuzzier.
pub fn normalize_name(name: &str) -> String {
	name.trim().to_lowercase()
}
