//! Readers for the draft detail page, its dialogs and plan progress.

use std::sync::LazyLock;

use regex::Regex;

use super::markup::{element_by_id, elements};

/// Marker class the target system renders around validation messages.
pub const ERROR_MARKER: &str = "ui-messages-error";

const SHIP_FROM_ID: &str = "mainForm:draftInfo:0:ship_from_address";

static PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\s*(\d+)\s*%\s*<").expect("PERCENT_RE should compile"));

/// Value of the draft-name input on a detail page.
pub fn draft_name(html: &str) -> Option<String> {
	elements(html, "input")
		.into_iter()
		.find(|input| input.attr("name").is_some_and(|n| n.contains("draft_name")))
		.and_then(|input| input.attr("value"))
}

/// Displayed ship-from address on a detail page.
pub fn ship_from_address(html: &str) -> Option<String> {
	element_by_id(html, "span", SHIP_FROM_ID).map(|span| span.text())
}

/// Completion percentage reported by the plan progress bar; 0 when absent.
pub fn progress_percent(body: &str) -> u32 {
	PERCENT_RE
		.captures(body)
		.and_then(|c| c.get(1))
		.and_then(|m| m.as_str().parse().ok())
		.unwrap_or(0)
}

pub fn has_error_marker(body: &str) -> bool {
	body.contains(ERROR_MARKER)
}

/// Row key of the address-dialog row holding an input whose value is `address`.
pub fn address_row_key(fragment: &str, address: &str) -> Option<String> {
	elements(fragment, "tr").into_iter().find_map(|row| {
		let key = row.attr("data-rk")?;
		elements(row.inner, "input")
			.iter()
			.any(|input| input.attr("value").as_deref() == Some(address))
			.then_some(key)
	})
}
