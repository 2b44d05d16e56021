//! Minimal element scanning over server-rendered markup.
//!
//! This is not a DOM: it finds elements by tag name with balanced nesting,
//! reads attributes of opening tags and flattens text. That is all the page
//! model needs from the target system's markup.

use std::sync::LazyLock;

use regex::Regex;

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"([a-zA-Z_:@][-a-zA-Z0-9_:.@]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#).expect("ATTR_RE should compile")
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("TAG_RE should compile"));
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("COMMENT_RE should compile"));
static ELEMENT_TAG_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?s)<(/?)([a-zA-Z][a-zA-Z0-9:-]*)[^>]*>").expect("ELEMENT_TAG_RE should compile"));
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("WHITESPACE_RE should compile"));

/// One element located in a markup string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element<'a> {
	/// The opening tag, `<td class="x">`.
	pub open: &'a str,
	/// Everything between the opening and closing tag.
	pub inner: &'a str,
	/// Byte offset of the opening tag in the scanned markup.
	pub start: usize,
}

impl<'a> Element<'a> {
	/// Attribute value; valueless attributes (`checked`) read as `""`.
	pub fn attr(&self, name: &str) -> Option<String> {
		attr(self.open, name)
	}

	pub fn has_attr(&self, name: &str) -> bool {
		self.attr(name).is_some()
	}

	pub fn id(&self) -> Option<String> {
		self.attr("id").filter(|id| !id.is_empty())
	}

	/// Whether the class list contains `class` as a whole token.
	pub fn has_class(&self, class: &str) -> bool {
		self.attr("class").is_some_and(|list| list.split_whitespace().any(|c| c == class))
	}

	/// Whether any class token contains `fragment`.
	pub fn class_contains(&self, fragment: &str) -> bool {
		self.attr("class").is_some_and(|list| list.split_whitespace().any(|c| c.contains(fragment)))
	}

	/// Flattened, whitespace-collapsed text content.
	pub fn text(&self) -> String {
		text_content(self.inner)
	}

	/// Byte offset just past the inner markup.
	fn inner_end(&self) -> usize {
		self.start + self.open.len() + self.inner.len()
	}
}

/// Every `name` element in document order, nested ones included.
///
/// Void or self-closing elements have empty `inner`. An element whose closing
/// tag is missing extends to the end of `html`.
pub fn elements<'a>(html: &'a str, name: &str) -> Vec<Element<'a>> {
	let marks: Vec<(bool, usize, usize)> = ELEMENT_TAG_RE
		.captures_iter(html)
		.filter(|caps| caps.get(2).is_some_and(|tag| tag.as_str().eq_ignore_ascii_case(name)))
		.filter_map(|caps| {
			let whole = caps.get(0)?;
			let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
			Some((closing, whole.start(), whole.end()))
		})
		.collect();

	let mut found = Vec::new();
	for (index, &(closing, start, end)) in marks.iter().enumerate() {
		if closing {
			continue;
		}
		let open = &html[start..end];
		if open.ends_with("/>") || is_void(name) {
			found.push(Element { open, inner: "", start });
			continue;
		}

		let mut depth = 0usize;
		let mut inner_end = html.len();
		for &(later_closing, later_start, later_end) in &marks[index + 1..] {
			let later_self_closing = html[later_start..later_end].ends_with("/>");
			if later_closing {
				if depth == 0 {
					inner_end = later_start;
					break;
				}
				depth -= 1;
			} else if !later_self_closing {
				depth += 1;
			}
		}
		found.push(Element {
			open,
			inner: &html[end..inner_end],
			start,
		});
	}
	found
}

/// `name` elements not nested inside another `name` element, so the cells
/// of a nested table do not count as cells of the row around it.
pub fn outermost<'a>(html: &'a str, name: &str) -> Vec<Element<'a>> {
	let mut kept: Vec<Element<'a>> = Vec::new();
	for el in elements(html, name) {
		if kept.last().is_some_and(|outer| el.start < outer.inner_end()) {
			continue;
		}
		kept.push(el);
	}
	kept
}

/// First `name` element whose `id` equals `id`.
pub fn element_by_id<'a>(html: &'a str, name: &str, id: &str) -> Option<Element<'a>> {
	elements(html, name).into_iter().find(|el| el.attr("id").as_deref() == Some(id))
}

/// First `name` element whose `id` contains `fragment`.
pub fn element_by_id_containing<'a>(html: &'a str, name: &str, fragment: &str) -> Option<Element<'a>> {
	elements(html, name)
		.into_iter()
		.find(|el| el.attr("id").is_some_and(|id| id.contains(fragment)))
}

/// Reads one attribute from an opening tag.
pub fn attr(open_tag: &str, name: &str) -> Option<String> {
	let body = open_tag.trim_start_matches('<');
	let body = body.split_once(|c: char| c.is_whitespace()).map(|(_, rest)| rest).unwrap_or("");
	ATTR_RE.captures_iter(body).find_map(|caps| {
		let key = caps.get(1)?.as_str();
		if !key.eq_ignore_ascii_case(name) {
			return None;
		}
		let value = caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4)).map(|m| m.as_str()).unwrap_or("");
		Some(decode_entities(value))
	})
}

/// Strips tags and comments, decodes entities and collapses whitespace.
pub fn text_content(html: &str) -> String {
	let without_comments = COMMENT_RE.replace_all(html, "");
	let without_tags = TAG_RE.replace_all(&without_comments, " ");
	let decoded = decode_entities(&without_tags);
	WHITESPACE_RE.replace_all(&decoded, " ").trim().to_string()
}

/// Decodes the entities the target system emits in text and attributes.
pub fn decode_entities(s: &str) -> String {
	if !s.contains('&') {
		return s.to_string();
	}
	s.replace("&lt;", "<")
		.replace("&gt;", ">")
		.replace("&quot;", "\"")
		.replace("&#39;", "'")
		.replace("&#x27;", "'")
		.replace("&apos;", "'")
		.replace("&nbsp;", " ")
		.replace("&#160;", " ")
		.replace("&amp;", "&")
}

fn is_void(name: &str) -> bool {
	matches!(
		name.to_ascii_lowercase().as_str(),
		"input" | "br" | "hr" | "img" | "meta" | "link" | "col" | "area" | "base" | "source" | "wbr"
	)
}
