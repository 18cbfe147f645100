//! The per-request context the session controller talks to.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::backend::SessionBackend;
use crate::envelope::CookieAttributes;

/// Key under which the session envelope is attached to the request context.
pub const DATA_KEY: &str = "session-redis";

/// Which half of the request cycle an interceptor is being run for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Request,
    Response,
}

/// What the dispatcher should do after an interceptor returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Abort with an internal server error; no further interceptor runs.
    HaltWithInternalError,
}

/// Host-side view of one request/response exchange.
///
/// Implementations adapt a concrete transport (axum, a test double, ...).
/// Nothing here is shared between requests.
pub trait SessionContext: Send {
    /// Value of the named request cookie, if the client sent one.
    fn request_cookie(&self, name: &str) -> Option<String>;

    /// The request path, without query string.
    fn request_path(&self) -> &str;

    /// The backend reachable for this request, if any.
    fn backend(&self) -> Option<Arc<dyn SessionBackend>>;

    fn has_backend(&self) -> bool {
        self.backend().is_some()
    }

    fn save_data(&mut self, key: &str, data: Value);

    fn load_data(&self, key: &str) -> Option<Value>;

    /// Queue a `Set-Cookie` on the outgoing response.
    fn set_response_cookie(&mut self, cookie: &CookieAttributes);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Shared data bag
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Named documents attached to one request.
///
/// Cloning shares the same bag, so a host can hand a clone to application
/// handlers (see [`crate::Session`]) and still read their writes back in
/// the response phase.
#[derive(Debug, Clone, Default)]
pub struct ContextData {
    inner: Arc<Mutex<HashMap<String, Value>>>,
}

impl ContextData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save(&self, key: &str, data: Value) {
        self.inner.lock().insert(key.to_owned(), data);
    }

    pub fn load(&self, key: &str) -> Option<Value> {
        self.inner.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().contains_key(key)
    }

    /// Read the document stored under `key` without cloning it.
    pub fn with<R>(&self, key: &str, f: impl FnOnce(&Value) -> R) -> Option<R> {
        let guard = self.inner.lock();
        guard.get(key).map(f)
    }

    /// Run `f` against the document stored under `key`, if present.
    pub fn with_mut<R>(&self, key: &str, f: impl FnOnce(&mut Value) -> R) -> Option<R> {
        let mut guard = self.inner.lock();
        guard.get_mut(key).map(f)
    }
}
