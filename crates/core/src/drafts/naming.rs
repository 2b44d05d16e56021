//! Names given to duplicated drafts.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

/// Longest base name kept before the timestamp is appended.
pub const MAX_BASE_CHARS: usize = 30;
/// Day/month and wall-clock time, unique enough within one account.
pub const STAMP_FORMAT: &str = "%d/%m %H:%M:%S";

static COPY_SUFFIX_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?i)((\s+|\s*-\s*)copy|\s*-\s*clone)+$").expect("COPY_SUFFIX_RE should compile"));
static STAMP_SUFFIX_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\s\d{2}[/.-]\d{2}\s\d{2}:\d{2}:\d{2}$").expect("STAMP_SUFFIX_RE should compile"));

/// Strips copy/clone suffixes and earlier stamps until the name is stable.
pub fn base_name(name: &str) -> String {
	let mut current = name.trim().to_string();
	loop {
		let stripped = COPY_SUFFIX_RE.replace(&current, "");
		let stripped = STAMP_SUFFIX_RE.replace(stripped.trim_end(), "");
		let stripped = stripped.trim_end().to_string();
		if stripped == current {
			return current;
		}
		current = stripped;
	}
}

/// Base name truncated to [`MAX_BASE_CHARS`] with a fresh stamp appended.
pub fn normalized_name(name: &str, now: NaiveDateTime) -> String {
	let base: String = base_name(name).chars().take(MAX_BASE_CHARS).collect();
	format!("{} {}", base.trim_end(), now.format(STAMP_FORMAT))
}
