//! Session endpoints.
//!
//! - `GET  /v1/session`: id and payload of the current session
//! - `PUT  /v1/session`: merge a JSON object into the payload
//! - `POST /v1/session/visits`: bump and return a visit counter
//!
//! All three answer `404` when the session layer stepped aside for the
//! request (cookie name unset, path outside the prefix, no backend).

use axum::extract::{Extension, Json};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use sg_sessions::{Session, SessionPayload};

/// Payload key used by the visit counter.
const VISITS_KEY: &str = "visits";

/// Build a standardized JSON error response: `{ "error": "<message>" }`.
fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

fn no_session() -> Response {
    api_error(StatusCode::NOT_FOUND, "no session for this request")
}

fn session_body(session: &Session) -> Response {
    Json(serde_json::json!({
        "id": session.id(),
        "data": session.payload(),
    }))
    .into_response()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /v1/session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn get_session(session: Option<Extension<Session>>) -> Response {
    match session {
        Some(Extension(session)) => session_body(&session),
        None => no_session(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PUT /v1/session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn update_session(
    session: Option<Extension<Session>>,
    Json(body): Json<Value>,
) -> Response {
    let Some(Extension(session)) = session else {
        return no_session();
    };
    let entries: SessionPayload = match body {
        Value::Object(map) => map,
        _ => return api_error(StatusCode::BAD_REQUEST, "body must be a JSON object"),
    };

    if let Err(e) = session.merge(entries) {
        tracing::error!(error = %e, "session update failed");
        return api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error");
    }
    session_body(&session)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/session/visits
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn record_visit(session: Option<Extension<Session>>) -> Response {
    let Some(Extension(session)) = session else {
        return no_session();
    };

    let Some(visits) = session.get::<u64>(VISITS_KEY).unwrap_or(0).checked_add(1) else {
        return api_error(StatusCode::CONFLICT, "visit counter is at its maximum");
    };
    if let Err(e) = session.insert(VISITS_KEY, visits) {
        tracing::error!(error = %e, "session update failed");
        return api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error");
    }

    Json(serde_json::json!({
        "id": session.id(),
        "visits": visits,
    }))
    .into_response()
}
