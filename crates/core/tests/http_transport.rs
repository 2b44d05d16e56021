use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Form, State};
use axum::http::header::{COOKIE, REFERER, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect};
use axum::routing::get;
use axum::Router;
use draftwatch::{Credentials, Endpoints, HttpTransport, Session, Transport};
use draftwatch_protocol::{PartialRequest, VIEW_STATE};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

#[derive(Debug, Clone)]
struct Captured {
	cookie: Option<String>,
	faces_request: Option<String>,
	requested_with: Option<String>,
	referer: Option<String>,
	fields: Vec<(String, String)>,
}

#[derive(Clone, Default)]
struct MockState {
	posts: Arc<Mutex<Vec<Captured>>>,
}

fn header(headers: &HeaderMap, name: impl axum::http::header::AsHeaderName) -> Option<String> {
	headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

async fn login_page() -> impl IntoResponse {
	(
		[(SET_COOKIE, "JSESSIONID=abc123; Path=/")],
		r#"<html><form id="mainForm"><input type="hidden" name="javax.faces.ViewState" value="page-token"></form></html>"#,
	)
}

async fn draft_page(headers: HeaderMap) -> impl IntoResponse {
	let cookie = header(&headers, COOKIE).unwrap_or_default();
	(StatusCode::OK, format!("<html>cookie={cookie}</html>"))
}

async fn old_drafts() -> Redirect {
	Redirect::to("/draft.jsf")
}

async fn partial(State(state): State<MockState>, headers: HeaderMap, Form(fields): Form<Vec<(String, String)>>) -> impl IntoResponse {
	state.posts.lock().expect("posts lock").push(Captured {
		cookie: header(&headers, COOKIE),
		faces_request: header(&headers, "faces-request"),
		requested_with: header(&headers, "x-requested-with"),
		referer: header(&headers, REFERER),
		fields,
	});
	(
		[("content-type", "text/xml")],
		r#"<partial-response><changes><update id="j_id1:javax.faces.ViewState:0"><![CDATA[ajax-token]]></update></changes></partial-response>"#,
	)
}

async fn spawn_mock_server() -> (String, MockState, oneshot::Sender<()>) {
	let state = MockState::default();
	let app = Router::new()
		.route("/login.jsf", get(login_page))
		.route("/draft.jsf", get(draft_page).post(partial))
		.route("/old-drafts", get(old_drafts))
		.with_state(state.clone());

	let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock listener");
	let address: SocketAddr = listener.local_addr().expect("mock listener address");
	let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
	tokio::spawn(async move {
		axum::serve(listener, app)
			.with_graceful_shutdown(async {
				let _ = shutdown_rx.await;
			})
			.await
			.expect("run mock server");
	});
	(format!("http://{address}"), state, shutdown_tx)
}

#[tokio::test]
async fn cookies_persist_and_clear() {
	let (base, _, shutdown) = spawn_mock_server().await;
	let mut transport = HttpTransport::new("draftwatch-test").unwrap();

	transport.get(&format!("{base}/login.jsf")).await.unwrap();
	let page = transport.get(&format!("{base}/draft.jsf")).await.unwrap();
	assert!(page.body.contains("JSESSIONID=abc123"));

	transport.clear_cookies();
	let page = transport.get(&format!("{base}/draft.jsf")).await.unwrap();
	assert!(!page.body.contains("JSESSIONID"));
	let _ = shutdown.send(());
}

#[tokio::test]
async fn redirects_report_final_url() {
	let (base, _, shutdown) = spawn_mock_server().await;
	let transport = HttpTransport::new("draftwatch-test").unwrap();
	let page = transport.get(&format!("{base}/old-drafts")).await.unwrap();
	assert_eq!(page.url, format!("{base}/draft.jsf"));
	assert!(page.is_success());
	let _ = shutdown.send(());
}

#[tokio::test]
async fn partial_submit_is_form_encoded_with_ajax_headers() {
	let (base, state, shutdown) = spawn_mock_server().await;
	let transport = HttpTransport::new("draftwatch-test").unwrap();
	let mut session = Session::new(
		Box::new(transport),
		Endpoints::new(&base).unwrap(),
		Credentials {
			email: "ops@example.com".into(),
			password: "secret".into(),
		},
	);

	let login_url = session.endpoints().login.clone();
	session.get(&login_url).await.unwrap();
	assert_eq!(session.token(), Some("page-token"));

	let drafts_url = session.endpoints().drafts.clone();
	let request = PartialRequest::new("mainForm:drafts:0:name")
		.execute("mainForm:drafts:0:name")
		.event("change")
		.field("mainForm:drafts:0:name", "Spring 30/01 14:05:09");
	session
		.submit_partial(&drafts_url, &Default::default(), request)
		.await
		.unwrap();
	assert_eq!(session.token(), Some("ajax-token"));

	let posts = state.posts.lock().expect("posts lock").clone();
	assert_eq!(posts.len(), 1);
	let post = &posts[0];
	assert_eq!(post.faces_request.as_deref(), Some("partial/ajax"));
	assert_eq!(post.requested_with.as_deref(), Some("XMLHttpRequest"));
	assert_eq!(post.referer.as_deref(), Some(login_url.as_str()));
	assert!(post.cookie.as_deref().is_some_and(|c| c.contains("JSESSIONID=abc123")));

	let field = |name: &str| post.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str());
	assert_eq!(field("mainForm:drafts:0:name"), Some("Spring 30/01 14:05:09"));
	assert_eq!(field("javax.faces.behavior.event"), Some("change"));
	assert_eq!(field(VIEW_STATE), Some("page-token"));
	assert_eq!(post.fields.last().map(|(k, _)| k.as_str()), Some(VIEW_STATE));
	let _ = shutdown.send(());
}
