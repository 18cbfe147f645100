use std::sync::Arc;

use sg_domain::config::Config;
use sg_sessions::{Pipeline, SessionBackend, SessionController};

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Interceptor chain run around every session-scoped request.
    pub pipeline: Arc<Pipeline>,
    /// Backend handed to each request context.  `None` when the backend
    /// could not be reached at startup and `backend.allow_unavailable` is
    /// set; the session layer then steps aside.
    pub backend: Option<Arc<dyn SessionBackend>>,
}

impl AppState {
    /// Wire the session controller into a fresh pipeline.
    pub fn new(config: Arc<Config>, backend: Option<Arc<dyn SessionBackend>>) -> Self {
        let controller = Arc::new(SessionController::new(config.session.clone()));
        let pipeline = Pipeline::new().with(controller);
        Self {
            config,
            pipeline: Arc::new(pipeline),
            backend,
        }
    }

    pub fn backend_kind(&self) -> &'static str {
        self.backend.as_ref().map_or("none", |b| b.kind())
    }
}
