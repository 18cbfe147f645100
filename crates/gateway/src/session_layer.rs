//! Axum adapter for the session pipeline.
//!
//! [`session_middleware`] runs the request phase before the handler and the
//! response phase after it.  Handlers see the attached session as a
//! [`Session`] request extension.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use cookie::time::Duration;
use cookie::{Cookie, SameSite};

use sg_domain::config::SameSitePolicy;
use sg_sessions::{
    ContextData, CookieAttributes, Flow, Phase, Session, SessionBackend, SessionContext,
};

use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request context
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One HTTP exchange as seen by the session controller.
pub struct HttpSessionContext {
    path: String,
    cookie_headers: Vec<String>,
    backend: Option<Arc<dyn SessionBackend>>,
    data: ContextData,
    outgoing: Option<Cookie<'static>>,
}

impl HttpSessionContext {
    pub fn from_request<B>(req: &Request<B>, backend: Option<Arc<dyn SessionBackend>>) -> Self {
        let cookie_headers = req
            .headers()
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_owned)
            .collect();

        Self {
            path: req.uri().path().to_owned(),
            cookie_headers,
            backend,
            data: ContextData::new(),
            outgoing: None,
        }
    }

    pub fn data(&self) -> &ContextData {
        &self.data
    }

    /// The queued `Set-Cookie`, if the response phase produced one.
    pub fn outgoing_cookie(&self) -> Option<&Cookie<'static>> {
        self.outgoing.as_ref()
    }

    /// Append the queued `Set-Cookie` header to `headers`.
    pub fn write_headers(&self, headers: &mut HeaderMap) {
        let Some(cookie) = &self.outgoing else {
            return;
        };
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(error = %e, "session cookie is not a valid header value"),
        }
    }
}

impl SessionContext for HttpSessionContext {
    fn request_cookie(&self, name: &str) -> Option<String> {
        self.cookie_headers.iter().find_map(|header| {
            Cookie::split_parse(header.as_str())
                .flatten()
                .find(|c| c.name() == name)
                .map(|c| c.value().to_owned())
        })
    }

    fn request_path(&self) -> &str {
        &self.path
    }

    fn backend(&self) -> Option<Arc<dyn SessionBackend>> {
        self.backend.clone()
    }

    fn save_data(&mut self, key: &str, data: serde_json::Value) {
        self.data.save(key, data);
    }

    fn load_data(&self, key: &str) -> Option<serde_json::Value> {
        self.data.load(key)
    }

    fn set_response_cookie(&mut self, attrs: &CookieAttributes) {
        self.outgoing = Some(build_cookie(attrs));
    }
}

/// Render envelope cookie attributes as a `cookie::Cookie`.
pub fn build_cookie(attrs: &CookieAttributes) -> Cookie<'static> {
    let max_age = i64::try_from(attrs.max_age).unwrap_or(i64::MAX);
    let mut builder = Cookie::build((attrs.name.clone(), attrs.value.clone()))
        .path(attrs.path.clone())
        .max_age(Duration::seconds(max_age))
        .http_only(attrs.http_only)
        .secure(attrs.secure)
        .same_site(match attrs.same_site {
            SameSitePolicy::Strict => SameSite::Strict,
            SameSitePolicy::Lax => SameSite::Lax,
            SameSitePolicy::None => SameSite::None,
        });
    if !attrs.domain.is_empty() {
        builder = builder.domain(attrs.domain.clone());
    }
    builder.build()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Middleware
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Axum middleware that loads the session before the handler and persists
/// it afterwards.  Attach via `axum::middleware::from_fn_with_state`.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let mut ctx = HttpSessionContext::from_request(&req, state.backend.clone());

    if state.pipeline.run(&mut ctx, Phase::Request).await == Flow::HaltWithInternalError {
        return internal_error();
    }

    if let Some(session) = Session::attached(ctx.data()) {
        req.extensions_mut().insert(session);
    }

    let mut response = next.run(req).await;

    if state.pipeline.run(&mut ctx, Phase::Response).await == Flow::HaltWithInternalError {
        return internal_error();
    }

    ctx.write_headers(response.headers_mut());
    response
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        axum::Json(serde_json::json!({ "error": "internal server error" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sg_sessions::MemoryBackend;

    fn attrs() -> CookieAttributes {
        CookieAttributes {
            name: "sid".into(),
            value: "sg:abc".into(),
            domain: String::new(),
            path: "/".into(),
            max_age: 1800,
            http_only: true,
            secure: false,
            same_site: SameSitePolicy::Lax,
        }
    }

    #[test]
    fn cookie_rendering() {
        let rendered = build_cookie(&attrs()).to_string();
        assert!(rendered.starts_with("sid=sg:abc"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("SameSite=Lax"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("Max-Age=1800"));
        assert!(!rendered.contains("Secure"));
        assert!(!rendered.contains("Domain"));

        let mut strict = attrs();
        strict.secure = true;
        strict.http_only = false;
        strict.same_site = SameSitePolicy::Strict;
        strict.domain = "example.com".into();
        let rendered = build_cookie(&strict).to_string();
        assert!(rendered.contains("Secure"));
        assert!(rendered.contains("SameSite=Strict"));
        assert!(rendered.contains("Domain=example.com"));
        assert!(!rendered.contains("HttpOnly"));
    }

    #[test]
    fn reads_cookies_across_headers() {
        let req = Request::builder()
            .uri("/v1/session?x=1")
            .header(COOKIE, "theme=dark; lang=en")
            .header(COOKIE, "sid=sg:1; sid=sg:2")
            .body(())
            .unwrap();
        let backend: Arc<dyn SessionBackend> = Arc::new(MemoryBackend::new());
        let ctx = HttpSessionContext::from_request(&req, Some(backend));

        assert_eq!(ctx.request_path(), "/v1/session");
        assert_eq!(ctx.request_cookie("lang").as_deref(), Some("en"));
        assert_eq!(ctx.request_cookie("sid").as_deref(), Some("sg:1"));
        assert_eq!(ctx.request_cookie("missing"), None);
        assert!(ctx.has_backend());
    }

    #[test]
    fn queued_cookie_becomes_one_header() {
        let req = Request::builder().uri("/").body(()).unwrap();
        let mut ctx = HttpSessionContext::from_request(&req, None);
        let mut headers = HeaderMap::new();

        ctx.write_headers(&mut headers);
        assert!(headers.get(SET_COOKIE).is_none());

        ctx.set_response_cookie(&attrs());
        ctx.write_headers(&mut headers);
        assert_eq!(headers.get_all(SET_COOKIE).iter().count(), 1);
        assert_eq!(ctx.outgoing_cookie().map(|c| c.value()), Some("sg:abc"));
    }
}
