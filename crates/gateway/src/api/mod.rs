pub mod health;
pub mod session;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::session_layer::session_middleware;
use crate::state::AppState;

/// Build the full API router.
///
/// Routes are split into **public** (no session handling) and
/// **session-scoped** (wrapped in the session middleware).
///
/// `state` is needed to wire up the middleware at build time.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/v1/health", get(health::health));

    let scoped = Router::new()
        .route(
            "/v1/session",
            get(session::get_session).put(session::update_session),
        )
        .route("/v1/session/visits", post(session::record_visit))
        .route_layer(middleware::from_fn_with_state(state, session_middleware));

    public.merge(scoped).layer(TraceLayer::new_for_http())
}
