//! Partial response envelope parsing.
//!
//! A partial response looks like:
//!
//! ```text
//! <partial-response id="j_id1">
//!   <changes>
//!     <update id="mainForm:drafts"><![CDATA[<tbody>...</tbody>]]></update>
//!     <update id="j_id1:javax.faces.ViewState:0"><![CDATA[-123:456]]></update>
//!   </changes>
//! </partial-response>
//! ```
//!
//! or carries an in-band `<redirect url="..."/>` instead of changes. Parsing
//! collects every `update` by id and never relies on the surrounding shape.

use std::sync::LazyLock;

use regex::Regex;

use crate::fields::VIEW_STATE;

static UPDATE_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r#"(?s)<update\b[^>]*?\bid="([^"]*)"[^>]*>(.*?)</update>"#).expect("UPDATE_RE should compile"));
static REDIRECT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"<redirect\b[^>]*?\burl="([^"]*)""#).expect("REDIRECT_RE should compile"));
static ERROR_MESSAGE_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?s)<error>.*?<error-message>(.*?)</error-message>").expect("ERROR_MESSAGE_RE should compile"));
static CDATA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("CDATA_RE should compile"));
static INPUT_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<input\b[^>]*>").expect("INPUT_TAG_RE should compile"));
static NAME_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"\bname\s*=\s*["']([^"']*)["']"#).expect("NAME_ATTR_RE should compile"));
static VALUE_ATTR_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r#"\bvalue\s*=\s*["']([^"']*)["']"#).expect("VALUE_ATTR_RE should compile"));

/// One `update` element of a partial response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
	/// Element id the update replaces.
	pub id: String,
	/// Markup of the update, with CDATA wrappers removed.
	pub content: String,
}

/// Parsed partial response envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialResponse {
	updates: Vec<Update>,
	redirect: Option<String>,
	error: Option<String>,
}

impl PartialResponse {
	/// Parses an envelope; unknown elements are ignored.
	pub fn parse(body: &str) -> Self {
		let updates = UPDATE_RE
			.captures_iter(body)
			.filter_map(|caps| {
				let id = caps.get(1)?.as_str().to_string();
				let raw = caps.get(2)?.as_str();
				Some(Update { id, content: unwrap_cdata(raw) })
			})
			.collect();

		let redirect = REDIRECT_RE.captures(body).and_then(|c| c.get(1)).map(|m| decode_xml_entities(m.as_str()));
		let error = ERROR_MESSAGE_RE
			.captures(body)
			.and_then(|c| c.get(1))
			.map(|m| unwrap_cdata(m.as_str()).trim().to_string());

		Self { updates, redirect, error }
	}

	/// All updates in document order.
	pub fn updates(&self) -> &[Update] {
		&self.updates
	}

	/// Content of the update with exactly this id.
	pub fn update(&self, id: &str) -> Option<&str> {
		self.updates.iter().find(|u| u.id == id).map(|u| u.content.as_str())
	}

	/// Whether an update with exactly this id is present.
	pub fn has_update(&self, id: &str) -> bool {
		self.updates.iter().any(|u| u.id == id)
	}

	/// In-band redirect target, entity-decoded and possibly relative.
	pub fn redirect(&self) -> Option<&str> {
		self.redirect.as_deref()
	}

	/// Server-side error message, if the envelope carries one.
	pub fn error(&self) -> Option<&str> {
		self.error.as_deref()
	}

	/// Fresh synchronization token carried by the envelope.
	pub fn token(&self) -> Option<&str> {
		self.updates
			.iter()
			.find(|u| u.id.contains(VIEW_STATE))
			.map(|u| u.content.trim())
			.filter(|t| !t.is_empty())
	}
}

/// Extracts the synchronization token from a partial response or a full page.
///
/// Partial responses carry it as a CDATA `update`; full pages carry it as a
/// hidden input named after the token field.
pub fn extract_token(body: &str) -> Option<String> {
	if !body.contains(VIEW_STATE) {
		return None;
	}

	if let Some(token) = PartialResponse::parse(body).token() {
		return Some(token.to_string());
	}

	INPUT_TAG_RE.find_iter(body).find_map(|tag| {
		let tag = tag.as_str();
		let name = NAME_ATTR_RE.captures(tag)?.get(1)?.as_str();
		if name != VIEW_STATE {
			return None;
		}
		VALUE_ATTR_RE.captures(tag)?.get(1).map(|m| decode_xml_entities(m.as_str()))
	})
}

/// Concatenates every CDATA payload of `body` in document order.
pub fn cdata_sections(body: &str) -> String {
	CDATA_RE.captures_iter(body).filter_map(|c| c.get(1)).map(|m| m.as_str()).collect()
}

fn unwrap_cdata(raw: &str) -> String {
	if raw.contains("<![CDATA[") {
		cdata_sections(raw)
	} else {
		decode_xml_entities(raw)
	}
}

fn decode_xml_entities(s: &str) -> String {
	s.replace("&lt;", "<")
		.replace("&gt;", ">")
		.replace("&quot;", "\"")
		.replace("&apos;", "'")
		.replace("&#39;", "'")
		.replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
	use super::*;

	const ENVELOPE: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<partial-response id="j_id1"><changes><update id="mainForm:drafts"><![CDATA[<tr><td>row</td></tr>]]></update><update id="j_id1:javax.faces.ViewState:0"><![CDATA[-42:17]]></update></changes></partial-response>"#;

	#[test]
	fn parses_updates_by_id() {
		let response = PartialResponse::parse(ENVELOPE);
		assert_eq!(response.updates().len(), 2);
		assert_eq!(response.update("mainForm:drafts"), Some("<tr><td>row</td></tr>"));
		assert!(response.has_update("mainForm:drafts"));
		assert!(!response.has_update("mainForm"));
		assert_eq!(response.token(), Some("-42:17"));
	}

	#[test]
	fn extracts_redirect_and_decodes_entities() {
		let body = r#"<partial-response><redirect url="/draftplan.jsf?id=9&amp;tab=1"></redirect></partial-response>"#;
		let response = PartialResponse::parse(body);
		assert_eq!(response.redirect(), Some("/draftplan.jsf?id=9&tab=1"));
		assert!(response.updates().is_empty());
	}

	#[test]
	fn extracts_error_message() {
		let body = "<partial-response><error><error-name>ViewExpiredException</error-name><error-message><![CDATA[view expired]]></error-message></error></partial-response>";
		assert_eq!(PartialResponse::parse(body).error(), Some("view expired"));
	}

	#[test]
	fn extracts_token_from_partial_response() {
		assert_eq!(extract_token(ENVELOPE), Some("-42:17".to_string()));
	}

	#[test]
	fn extracts_token_from_hidden_input() {
		let page = r#"<form id="mainForm"><input type="hidden" name="javax.faces.ViewState" id="j_id1:javax.faces.ViewState:0" value="abc:def" autocomplete="off" /></form>"#;
		assert_eq!(extract_token(page), Some("abc:def".to_string()));
	}

	#[test]
	fn missing_token_is_none() {
		assert_eq!(extract_token("<html><body>nothing</body></html>"), None);
		assert_eq!(extract_token("<update id=\"javax.faces.ViewState\"><![CDATA[]]></update>"), None);
	}

	#[test]
	fn concatenates_cdata_sections() {
		let body = "<update id=\"a\"><![CDATA[<p>one</p>]]></update><update id=\"b\"><![CDATA[<p>two</p>]]></update>";
		assert_eq!(cdata_sections(body), "<p>one</p><p>two</p>");
	}

	#[test]
	fn plain_update_content_is_entity_decoded() {
		let body = r#"<update id="ccFlag">&lt;div&gt;Acme&lt;/div&gt;</update>"#;
		assert_eq!(PartialResponse::parse(body).update("ccFlag"), Some("<div>Acme</div>"));
	}
}
