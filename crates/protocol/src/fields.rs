//! Request field names and scope keywords.

/// Marks a POST as a partial (AJAX) request.
pub const PARTIAL_AJAX: &str = "javax.faces.partial.ajax";
/// Id of the control that fired the request.
pub const SOURCE: &str = "javax.faces.source";
/// Space-separated ids processed on the server.
pub const EXECUTE: &str = "javax.faces.partial.execute";
/// Space-separated ids re-rendered in the response.
pub const RENDER: &str = "javax.faces.partial.render";
/// Client behavior event name (`change`, `rowSelect`, ...).
pub const BEHAVIOR_EVENT: &str = "javax.faces.behavior.event";
/// Partial event name, always sent alongside [`BEHAVIOR_EVENT`].
pub const PARTIAL_EVENT: &str = "javax.faces.partial.event";
/// Synchronization token field.
pub const VIEW_STATE: &str = "javax.faces.ViewState";

/// Execute scope covering the whole view.
pub const SCOPE_ALL: &str = "@all";
/// Render scope that re-renders nothing.
pub const SCOPE_NONE: &str = "@none";

/// Id of the main page form.
pub const MAIN_FORM: &str = "mainForm";

/// Request header sent with every partial request.
pub const FACES_REQUEST_HEADER: &str = "Faces-Request";
/// Value of [`FACES_REQUEST_HEADER`].
pub const FACES_REQUEST_PARTIAL: &str = "partial/ajax";
