//! End-to-end tests driving the router with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use cookie::Cookie;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tower::ServiceExt;

use sg_domain::config::Config;
use sg_domain::error::{Error, Result};
use sg_gateway::api;
use sg_gateway::state::AppState;
use sg_sessions::{MemoryBackend, SessionBackend};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Harness
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Get(String),
    SetEx { key: String, ttl: u64, value: String },
}

/// In-memory backend that records every command and can be told to fail.
#[derive(Default)]
struct RecordingBackend {
    inner: MemoryBackend,
    calls: Mutex<Vec<Call>>,
    fail_get: bool,
    fail_set: bool,
}

impl RecordingBackend {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    fn set_calls(&self) -> Vec<(String, u64, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::SetEx { key, ttl, value } => Some((key, ttl, value)),
                Call::Get(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl SessionBackend for RecordingBackend {
    fn kind(&self) -> &'static str {
        "recording"
    }

    async fn get(&self, key: &str) -> Result<String> {
        self.calls.lock().push(Call::Get(key.to_owned()));
        if self.fail_get {
            return Err(Error::backend("recording", "connection reset"));
        }
        self.inner.get(key).await
    }

    async fn set_with_expiry(&self, key: &str, ttl_secs: u64, value: &str) -> Result<()> {
        self.calls.lock().push(Call::SetEx {
            key: key.to_owned(),
            ttl: ttl_secs,
            value: value.to_owned(),
        });
        if self.fail_set {
            return Err(Error::backend("recording", "READONLY"));
        }
        self.inner.set_with_expiry(key, ttl_secs, value).await
    }
}

fn app(config: Config, backend: Option<Arc<RecordingBackend>>) -> Router {
    let backend = backend.map(|b| b as Arc<dyn SessionBackend>);
    let state = AppState::new(Arc::new(config), backend);
    api::router(state.clone()).with_state(state)
}

fn request(method: &str, uri: &str, sid: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(sid) = sid {
        builder = builder.header(COOKIE, format!("sid={sid}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.unwrap()
}

async fn json_body(resp: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn set_cookie(resp: &Response<Body>) -> Option<Cookie<'static>> {
    let header = resp.headers().get(SET_COOKIE)?.to_str().ok()?;
    Cookie::parse(header.to_owned()).ok()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scenarios
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn first_visit_creates_and_persists_a_session() {
    let backend = Arc::new(RecordingBackend::default());
    let app = app(Config::default(), Some(backend.clone()));

    let resp = send(&app, request("GET", "/v1/session", None)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = set_cookie(&resp).expect("Set-Cookie on a new session");
    assert_eq!(cookie.name(), "sid");
    assert!(cookie.value().starts_with("sg:"));
    assert_eq!(cookie.max_age(), Some(cookie::time::Duration::seconds(1800)));
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.path(), Some("/"));
    let id = cookie.value().to_owned();

    let body = json_body(resp).await;
    assert_eq!(body["id"], id);
    assert_eq!(body["data"], json!({}));

    // No cookie means no lookup: exactly one write.
    let writes = backend.set_calls();
    assert_eq!(backend.calls().len(), 1);
    let (key, ttl, value) = &writes[0];
    assert_eq!(key, &id);
    assert_eq!(*ttl, 1800);
    assert!(value.contains("\n    \"cookie\""));

    let stored: Value = serde_json::from_str(value).unwrap();
    assert_eq!(stored["cookie"]["value"], id);
    assert_eq!(stored["cookie"]["name"], "sid");
    assert_eq!(stored["cookie"]["max_age"], 1800);
    assert_eq!(stored["data"], json!({}));
}

#[tokio::test]
async fn returning_client_keeps_its_session() {
    let backend = Arc::new(RecordingBackend::default());
    let app = app(Config::default(), Some(backend.clone()));

    let resp = send(&app, request("POST", "/v1/session/visits", None)).await;
    let id = set_cookie(&resp).unwrap().value().to_owned();
    assert_eq!(json_body(resp).await["visits"], 1);

    let resp = send(&app, request("POST", "/v1/session/visits", Some(&id))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(set_cookie(&resp).unwrap().value(), id);
    let body = json_body(resp).await;
    assert_eq!(body["visits"], 2);
    assert_eq!(body["id"], id);

    let calls = backend.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[1], Call::Get(id.clone()));

    let stored: Value = serde_json::from_str(&backend.inner.get(&id).await.unwrap()).unwrap();
    assert_eq!(stored["data"], json!({ "visits": 2 }));
}

#[tokio::test]
async fn put_merges_into_the_payload() {
    let backend = Arc::new(RecordingBackend::default());
    let app = app(Config::default(), Some(backend.clone()));

    let req = Request::builder()
        .method("PUT")
        .uri("/v1/session")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"theme":"dark","lang":"en"}"#))
        .unwrap();
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let id = set_cookie(&resp).unwrap().value().to_owned();
    assert_eq!(json_body(resp).await["data"], json!({ "theme": "dark", "lang": "en" }));

    let resp = send(&app, request("GET", "/v1/session", Some(&id))).await;
    assert_eq!(json_body(resp).await["data"]["theme"], "dark");

    let req = Request::builder()
        .method("PUT")
        .uri("/v1/session")
        .header(CONTENT_TYPE, "application/json")
        .header(COOKIE, format!("sid={id}"))
        .body(Body::from("[1, 2]"))
        .unwrap();
    assert_eq!(send(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn saturated_visit_counter_is_a_conflict() {
    let backend = Arc::new(RecordingBackend::default());
    let app = app(Config::default(), Some(backend.clone()));

    let req = Request::builder()
        .method("PUT")
        .uri("/v1/session")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(format!(r#"{{"visits":{}}}"#, u64::MAX)))
        .unwrap();
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let id = set_cookie(&resp).unwrap().value().to_owned();

    let resp = send(&app, request("POST", "/v1/session/visits", Some(&id))).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let stored: Value = serde_json::from_str(&backend.inner.get(&id).await.unwrap()).unwrap();
    assert_eq!(stored["data"]["visits"], u64::MAX);
}

#[tokio::test]
async fn unknown_cookie_gets_a_fresh_id() {
    let backend = Arc::new(RecordingBackend::default());
    let app = app(Config::default(), Some(backend.clone()));

    let resp = send(&app, request("GET", "/v1/session", Some("sg:stale"))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = set_cookie(&resp).unwrap();
    assert_ne!(cookie.value(), "sg:stale");
    assert_eq!(backend.calls()[0], Call::Get("sg:stale".into()));
}

#[tokio::test]
async fn lookup_failure_is_an_internal_error() {
    let backend = Arc::new(RecordingBackend {
        fail_get: true,
        ..Default::default()
    });
    let app = app(Config::default(), Some(backend.clone()));

    let resp = send(&app, request("GET", "/v1/session", Some("sg:1"))).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(set_cookie(&resp).is_none());
    assert_eq!(json_body(resp).await, json!({ "error": "internal server error" }));
    assert!(backend.set_calls().is_empty());
}

#[tokio::test]
async fn corrupt_record_is_an_internal_error() {
    let backend = Arc::new(RecordingBackend::default());
    backend.inner.set_with_expiry("sg:bad", 60, "{not json").await.unwrap();
    let app = app(Config::default(), Some(backend.clone()));

    let resp = send(&app, request("GET", "/v1/session", Some("sg:bad"))).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(backend.set_calls().is_empty());
}

#[tokio::test]
async fn write_failure_is_an_internal_error() {
    let backend = Arc::new(RecordingBackend {
        fail_set: true,
        ..Default::default()
    });
    let app = app(Config::default(), Some(backend.clone()));

    let resp = send(&app, request("POST", "/v1/session/visits", None)).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(backend.set_calls().len(), 1);
}

#[tokio::test]
async fn requests_outside_the_cookie_path_are_left_alone() {
    let mut config = Config::default();
    config.session.path = "/app".into();
    let backend = Arc::new(RecordingBackend::default());
    let app = app(config, Some(backend.clone()));

    let resp = send(&app, request("GET", "/v1/session", Some("sg:1"))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(set_cookie(&resp).is_none());
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn no_backend_means_no_session() {
    let app = app(Config::default(), None);

    let resp = send(&app, request("POST", "/v1/session/visits", None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(set_cookie(&resp).is_none());
}

#[tokio::test]
async fn unnamed_cookie_disables_sessions() {
    let mut config = Config::default();
    config.session.name.clear();
    let backend = Arc::new(RecordingBackend::default());
    let app = app(config, Some(backend.clone()));

    let resp = send(&app, request("GET", "/v1/session", None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn health_is_outside_the_session_layer() {
    let backend = Arc::new(RecordingBackend::default());
    let app = app(Config::default(), Some(backend.clone()));

    let resp = send(&app, request("GET", "/v1/health", None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(set_cookie(&resp).is_none());
    let body = json_body(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend"], "recording");
    assert!(backend.calls().is_empty());
}
