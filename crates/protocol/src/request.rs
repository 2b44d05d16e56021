//! Builder for partial request field sets.

use crate::fields::{BEHAVIOR_EVENT, EXECUTE, MAIN_FORM, PARTIAL_AJAX, PARTIAL_EVENT, RENDER, SCOPE_ALL, SOURCE, VIEW_STATE};

/// A partial request before it is merged with echoed form state.
///
/// The source control id is mirrored as its own field (`<id>=<id>`), and so
/// is the owning form, matching what the browser-side library submits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialRequest {
	source: String,
	execute: String,
	render: Option<String>,
	event: Option<String>,
	form: Option<String>,
	extra: Vec<(String, String)>,
}

impl PartialRequest {
	/// Starts a request fired by `source`, executing `@all` within the main form.
	pub fn new(source: impl Into<String>) -> Self {
		Self {
			source: source.into(),
			execute: SCOPE_ALL.to_string(),
			render: None,
			event: None,
			form: Some(MAIN_FORM.to_string()),
			extra: Vec::new(),
		}
	}

	/// Sets the execute scope.
	pub fn execute(mut self, scope: impl Into<String>) -> Self {
		self.execute = scope.into();
		self
	}

	/// Sets the render scope.
	pub fn render(mut self, scope: impl Into<String>) -> Self {
		self.render = Some(scope.into());
		self
	}

	/// Marks the request as a behavior event (`change`, `rowSelect`, ...).
	pub fn event(mut self, name: impl Into<String>) -> Self {
		self.event = Some(name.into());
		self
	}

	/// Names the owning form (defaults to `mainForm`).
	pub fn form(mut self, name: impl Into<String>) -> Self {
		self.form = Some(name.into());
		self
	}

	/// Omits the owning-form field entirely.
	pub fn without_form(mut self) -> Self {
		self.form = None;
		self
	}

	/// Adds an extra field; later values for the same key win.
	pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.extra.push((key.into(), value.into()));
		self
	}

	/// Returns the source control id.
	pub fn source(&self) -> &str {
		&self.source
	}

	/// Flattens the request into ordered form fields.
	///
	/// `token` is appended last so that it overrides any token echoed from
	/// stale form state.
	pub fn into_fields(self, token: Option<&str>) -> Vec<(String, String)> {
		let mut fields = vec![
			(PARTIAL_AJAX.to_string(), "true".to_string()),
			(SOURCE.to_string(), self.source.clone()),
			(EXECUTE.to_string(), self.execute),
		];
		if let Some(render) = self.render {
			fields.push((RENDER.to_string(), render));
		}
		if let Some(event) = self.event {
			fields.push((BEHAVIOR_EVENT.to_string(), event.clone()));
			fields.push((PARTIAL_EVENT.to_string(), event));
		}
		fields.push((self.source.clone(), self.source));
		if let Some(form) = self.form {
			fields.push((form.clone(), form));
		}
		fields.extend(self.extra);
		if let Some(token) = token {
			fields.push((VIEW_STATE.to_string(), token.to_string()));
		}
		fields
	}
}
