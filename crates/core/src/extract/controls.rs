//! Control-id discovery.
//!
//! The target system renders generated ids (`j_idt42`) that drift between
//! releases, so each control is located by a ranked list of independent
//! lookups tried in order until one matches.

use std::sync::LazyLock;

use regex::Regex;

use super::markup::{Element, elements, text_content};

/// A pure lookup from markup to a control id.
pub type Strategy = fn(&str) -> Option<String>;

/// Store-menu control that opens the account list.
pub const ACCOUNT_MENU: &[Strategy] = &[menu_by_id, menu_by_icon, menu_by_onclick];

/// Edit control of the ship-from address on a draft detail page.
pub const ADDRESS_EDIT: &[Strategy] = &[address_edit_by_title, address_edit_by_id, address_edit_by_icon];

const STORE_MENU_MARKER: &str = "__my_store__";
const ADDRESS_EDIT_TITLE: &str = "Change 'Ship From' address";

static ADDRESS_EDIT_ID_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"ship_from_address_edit").expect("ADDRESS_EDIT_ID_RE should compile"));
static UPDATE_ADDRESS_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"updateAddress\s*=").expect("UPDATE_ADDRESS_RE should compile"));

/// Runs `strategies` in order and returns the first id found.
pub fn first_match(html: &str, strategies: &[Strategy]) -> Option<String> {
	strategies.iter().find_map(|lookup| lookup(html))
}

fn anchor_ids<'a>(html: &'a str, keep: impl Fn(&Element<'a>) -> bool) -> Option<String> {
	elements(html, "a").into_iter().filter(|a| keep(a)).find_map(|a| a.id())
}

/// Anchor whose own id names the store menu.
pub fn menu_by_id(html: &str) -> Option<String> {
	anchor_ids(html, |a| a.attr("id").is_some_and(|id| id.contains(STORE_MENU_MARKER)))
}

/// Anchor wrapping the marketplace icon.
pub fn menu_by_icon(html: &str) -> Option<String> {
	anchor_ids(html, |a| elements(a.inner, "i").iter().any(|i| i.has_class("fa-amazon")))
}

/// Anchor whose click handler names the store menu.
pub fn menu_by_onclick(html: &str) -> Option<String> {
	anchor_ids(html, |a| a.attr("onclick").is_some_and(|js| js.contains(STORE_MENU_MARKER)))
}

pub fn address_edit_by_title(html: &str) -> Option<String> {
	anchor_ids(html, |a| a.attr("title").as_deref() == Some(ADDRESS_EDIT_TITLE))
}

pub fn address_edit_by_id(html: &str) -> Option<String> {
	anchor_ids(html, |a| a.attr("id").is_some_and(|id| ADDRESS_EDIT_ID_RE.is_match(&id)))
}

/// Anchor wrapping a pencil icon.
pub fn address_edit_by_icon(html: &str) -> Option<String> {
	anchor_ids(html, |a| elements(a.inner, "i").iter().any(|i| i.has_class("pi-pencil")))
}

/// "Yes" button of a confirmation dialog.
pub fn confirm_button(html: &str) -> Option<String> {
	elements(html, "button")
		.into_iter()
		.filter(|b| b.has_class("ui-confirmdialog-yes"))
		.find_map(|b| b.id())
}

/// Button whose label reads `Select`.
pub fn select_button(html: &str) -> Option<String> {
	elements(html, "button")
		.into_iter()
		.filter(|b| elements(b.inner, "span").iter().any(|s| s.text() == "Select") || text_content(b.inner) == "Select")
		.find_map(|b| b.id())
}

/// Submit control of the login form: the first button carrying an id.
pub fn login_submit(html: &str) -> Option<String> {
	elements(html, "button").into_iter().find_map(|b| b.id())
}

/// Id of the page script that declares the address refresh hook.
pub fn address_refresh_script(html: &str) -> Option<String> {
	elements(html, "script")
		.into_iter()
		.filter(|s| UPDATE_ADDRESS_RE.is_match(s.inner))
		.find_map(|s| s.id())
}
