//! Wire vocabulary for the partial-page-update protocol.
//!
//! This crate holds the field names, request shape and response envelope of
//! the target system's AJAX convention: a form-encoded POST that names its
//! source control, execute scope and render scope, answered by an XML
//! envelope of `update` elements keyed by element id.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: no I/O, no session state
//! * Generic over element ids: responses are read by id, never by assumed shape
//! * Stable: changes only when the wire convention changes
//!
//! Session handling and markup scraping are built on top of this in `draftwatch`.

pub mod fields;
pub mod request;
pub mod response;

pub use fields::*;
pub use request::PartialRequest;
pub use response::{PartialResponse, Update, cdata_sections, extract_token};
