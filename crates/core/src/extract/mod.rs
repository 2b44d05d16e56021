//! Page model extraction.
//!
//! Pure functions from full pages or partial-update fragments to typed
//! records and control ids. Nothing here performs I/O or holds state.

pub mod accounts;
pub mod controls;
pub mod detail;
pub mod drafts;
pub mod form;
pub mod markup;

pub use accounts::{AccountRecord, active_account_name, normalize_name, parse_account_table};
pub use controls::{Strategy, first_match};
pub use drafts::{DraftControls, DraftRecord, find_by_created, find_by_name, parse_draft_table};
pub use draftwatch_protocol::extract_token;
pub use form::{FormFields, collect_controls, collect_form_fields};
