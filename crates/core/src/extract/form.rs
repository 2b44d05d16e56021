//! Browser-equivalent form state.
//!
//! The target system resets any field that is missing from a submit, so every
//! request echoes the full visible form state collected here.

use std::sync::LazyLock;

use regex::Regex;

use super::markup::{attr, decode_entities, element_by_id, elements};
use draftwatch_protocol::MAIN_FORM;

static CONTROL_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?is)<(input|select|textarea)\b[^>]*>").expect("CONTROL_RE should compile"));
static SELECT_END_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</select\s*>").expect("SELECT_END_RE should compile"));
static TEXTAREA_END_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?i)</textarea\s*>").expect("TEXTAREA_END_RE should compile"));

/// Ordered name/value pairs; inserting an existing name overwrites in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields(Vec<(String, String)>);

impl FormFields {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
		let name = name.into();
		let value = value.into();
		match self.0.iter_mut().find(|(k, _)| *k == name) {
			Some(slot) => slot.1 = value,
			None => self.0.push((name, value)),
		}
	}

	pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.insert(name, value);
		self
	}

	pub fn get(&self, name: &str) -> Option<&str> {
		self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
	}

	pub fn contains(&self, name: &str) -> bool {
		self.get(name).is_some()
	}

	pub fn remove(&mut self, name: &str) -> Option<String> {
		let index = self.0.iter().position(|(k, _)| k == name)?;
		Some(self.0.remove(index).1)
	}

	/// Overlays `pairs` on top of the current state.
	pub fn extend<I, K, V>(&mut self, pairs: I)
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		for (k, v) in pairs {
			self.insert(k, v);
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn into_vec(self) -> Vec<(String, String)> {
		self.0
	}
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormFields {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let mut fields = FormFields::new();
		fields.extend(iter);
		fields
	}
}

/// Collects what a browser would submit from the main form.
///
/// Falls back to the whole markup when no main form is present, which is
/// the case for dialog fragments delivered by partial updates.
pub fn collect_form_fields(html: &str) -> FormFields {
	let scope = element_by_id(html, "form", MAIN_FORM).map(|form| form.inner).unwrap_or(html);
	collect_controls(scope)
}

/// Collects every successful control in `html`, without narrowing to a form.
pub fn collect_controls(html: &str) -> FormFields {
	let mut fields = FormFields::new();

	for found in CONTROL_RE.captures_iter(html) {
		let (Some(whole), Some(kind)) = (found.get(0), found.get(1)) else {
			continue;
		};
		let open = whole.as_str();
		let Some(name) = attr(open, "name").filter(|n| !n.is_empty()) else {
			continue;
		};
		if attr(open, "disabled").is_some() {
			continue;
		}

		match kind.as_str().to_ascii_lowercase().as_str() {
			"input" => {
				let kind = attr(open, "type").unwrap_or_else(|| "text".into()).to_ascii_lowercase();
				match kind.as_str() {
					"submit" | "button" | "image" | "reset" | "file" => continue,
					"checkbox" | "radio" => {
						if attr(open, "checked").is_none() {
							continue;
						}
						fields.insert(name, attr(open, "value").unwrap_or_else(|| "on".into()));
					}
					_ => fields.insert(name, attr(open, "value").unwrap_or_default()),
				}
			}
			"select" => {
				let rest = &html[whole.end()..];
				let body = SELECT_END_RE.find(rest).map(|end| &rest[..end.start()]).unwrap_or(rest);
				fields.insert(name, selected_option(body));
			}
			"textarea" => {
				let rest = &html[whole.end()..];
				let body = TEXTAREA_END_RE.find(rest).map(|end| &rest[..end.start()]).unwrap_or(rest);
				fields.insert(name, decode_entities(body));
			}
			_ => {}
		}
	}

	fields
}

fn selected_option(select_body: &str) -> String {
	elements(select_body, "option")
		.into_iter()
		.find(|option| option.has_attr("selected"))
		.map(|option| option.attr("value").unwrap_or_else(|| option.text()))
		.unwrap_or_default()
}
