//! Two-phase session lifecycle.
//!
//! Request phase: read the cookie, `GET` the envelope, attach it (or a new
//! one) to the context.  Response phase: set the cookie from the attached
//! envelope and `SETEX` it back with the cookie's max-age as TTL.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;

use sg_domain::config::SessionConfig;
use sg_domain::trace::TraceEvent;

use crate::backend::SessionBackend;
use crate::context::{Flow, Phase, SessionContext, DATA_KEY};
use crate::envelope::{self, SessionEnvelope};
use crate::pipeline::Interceptor;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Gate & outcomes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Why the controller stepped aside for a request.  Never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoCookieName,
    PathMismatch,
    NoBackend,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCookieName => write!(f, "cookie name not configured"),
            Self::PathMismatch => write!(f, "path outside session prefix"),
            Self::NoBackend => write!(f, "no session backend"),
        }
    }
}

/// Result of the activation check run before either phase.
pub enum Gate {
    Active(Arc<dyn SessionBackend>),
    Skip(SkipReason),
}

/// Terminal state of the request phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    NewSession,
    ExistingSession,
    BackendFailure,
    CorruptSession,
    Skipped(SkipReason),
}

impl RequestOutcome {
    pub fn flow(self) -> Flow {
        match self {
            Self::BackendFailure | Self::CorruptSession => Flow::HaltWithInternalError,
            Self::NewSession | Self::ExistingSession | Self::Skipped(_) => Flow::Continue,
        }
    }
}

/// Terminal state of the response phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    Persisted,
    NothingToPersist,
    BackendFailure,
    Skipped(SkipReason),
}

impl ResponseOutcome {
    pub fn flow(self) -> Flow {
        match self {
            Self::BackendFailure => Flow::HaltWithInternalError,
            Self::Persisted | Self::NothingToPersist | Self::Skipped(_) => Flow::Continue,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Controller
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Loads and persists the session around each request.
///
/// Holds only the immutable options; all per-request state lives in the
/// [`SessionContext`], so one controller serves every request concurrently.
pub struct SessionController {
    options: SessionConfig,
}

impl SessionController {
    pub fn new(options: SessionConfig) -> Self {
        Self { options }
    }

    /// Decide whether this request is ours at all.
    ///
    /// Checked in order: cookie name configured, request path under the
    /// configured prefix (ASCII case-insensitive), backend attached.
    pub fn gate(&self, ctx: &dyn SessionContext) -> Gate {
        if self.options.name.is_empty() {
            return Gate::Skip(SkipReason::NoCookieName);
        }
        if !starts_with_ignore_ascii_case(ctx.request_path(), &self.options.path) {
            return Gate::Skip(SkipReason::PathMismatch);
        }
        match ctx.backend() {
            Some(backend) => Gate::Active(backend),
            None => Gate::Skip(SkipReason::NoBackend),
        }
    }

    /// Request phase.  Attaches an envelope document under [`DATA_KEY`]
    /// unless the outcome is a halt or a skip.
    pub async fn on_request(&self, ctx: &mut dyn SessionContext) -> RequestOutcome {
        let backend = match self.gate(ctx) {
            Gate::Active(backend) => backend,
            Gate::Skip(reason) => return RequestOutcome::Skipped(self.skip(ctx, reason)),
        };

        let session_id = match ctx.request_cookie(&self.options.name) {
            Some(id) if !id.is_empty() => id,
            _ => {
                self.attach_new_session(ctx, "no cookie");
                return RequestOutcome::NewSession;
            }
        };

        let started = Instant::now();
        let result = backend.get(&session_id).await;
        emit_backend_call(backend.as_ref(), "GET", &session_id, result.is_ok(), started);

        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "session lookup failed");
                return RequestOutcome::BackendFailure;
            }
        };

        if raw.is_empty() {
            self.attach_new_session(ctx, "no record");
            return RequestOutcome::NewSession;
        }

        let doc = match envelope::from_wire(&raw) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::error!(
                    session_id = %session_id,
                    error = %e,
                    "stored session is not valid JSON"
                );
                return RequestOutcome::CorruptSession;
            }
        };

        if envelope::is_empty_document(&doc) {
            self.attach_new_session(ctx, "empty record");
            return RequestOutcome::NewSession;
        }

        // Parseable but not an envelope: discard it rather than carry a
        // half-formed session through the request.
        if envelope::decode(&doc).is_none() {
            tracing::warn!(session_id = %session_id, "stored session has no usable envelope, replacing");
            self.attach_new_session(ctx, "partial envelope");
            return RequestOutcome::NewSession;
        }

        ctx.save_data(DATA_KEY, doc);
        TraceEvent::SessionLoaded { session_id }.emit();
        RequestOutcome::ExistingSession
    }

    /// Response phase.  Sets the cookie and writes the envelope back.
    ///
    /// A missing or undecodable attachment is not an error: there is simply
    /// nothing to persist.  A failed write halts.
    pub async fn on_response(&self, ctx: &mut dyn SessionContext) -> ResponseOutcome {
        let backend = match self.gate(ctx) {
            Gate::Active(backend) => backend,
            Gate::Skip(reason) => return ResponseOutcome::Skipped(self.skip(ctx, reason)),
        };

        let Some(doc) = ctx.load_data(DATA_KEY) else {
            return ResponseOutcome::NothingToPersist;
        };
        if envelope::is_empty_document(&doc) {
            return ResponseOutcome::NothingToPersist;
        }
        let Some(env) = SessionEnvelope::decode(&doc) else {
            tracing::debug!("attached session data is not an envelope, skipping persist");
            return ResponseOutcome::NothingToPersist;
        };

        ctx.set_response_cookie(&env.cookie);

        let wire = match envelope::to_wire(&env.encode()) {
            Ok(wire) => wire,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize session, skipping persist");
                return ResponseOutcome::NothingToPersist;
            }
        };

        let session_id = env.cookie.value.as_str();
        let ttl_secs = env.cookie.max_age;

        let started = Instant::now();
        let result = backend.set_with_expiry(session_id, ttl_secs, &wire).await;
        emit_backend_call(backend.as_ref(), "SETEX", session_id, result.is_ok(), started);

        if let Err(e) = result {
            tracing::error!(session_id = %session_id, error = %e, "session write failed");
            return ResponseOutcome::BackendFailure;
        }

        TraceEvent::SessionPersisted {
            session_id: session_id.to_owned(),
            ttl_secs,
        }
        .emit();
        ResponseOutcome::Persisted
    }

    /// A fresh envelope document built from the configured options.
    pub fn create_new_session(&self) -> Value {
        SessionEnvelope::new_session(&self.options).encode()
    }

    fn attach_new_session(&self, ctx: &mut dyn SessionContext, reason: &str) {
        let env = SessionEnvelope::new_session(&self.options);
        TraceEvent::SessionCreated {
            session_id: env.cookie.value.clone(),
            reason: reason.to_owned(),
        }
        .emit();
        ctx.save_data(DATA_KEY, env.encode());
    }

    fn skip(&self, ctx: &dyn SessionContext, reason: SkipReason) -> SkipReason {
        // Path mismatches are the normal case for most routes; keep them quiet.
        if reason != SkipReason::PathMismatch {
            TraceEvent::SessionSkipped {
                path: ctx.request_path().to_owned(),
                reason: reason.to_string(),
            }
            .emit();
        }
        reason
    }
}

#[async_trait]
impl Interceptor for SessionController {
    fn name(&self) -> &str {
        "session"
    }

    async fn call(&self, ctx: &mut dyn SessionContext, phase: Phase) -> Flow {
        match phase {
            Phase::Request => self.on_request(ctx).await.flow(),
            Phase::Response => self.on_response(ctx).await.flow(),
        }
    }
}

fn emit_backend_call(
    backend: &dyn SessionBackend,
    command: &str,
    key: &str,
    ok: bool,
    started: Instant,
) {
    TraceEvent::BackendCall {
        backend: backend.kind().to_owned(),
        command: command.to_owned(),
        key: key.to_owned(),
        ok,
        duration_ms: started.elapsed().as_millis() as u64,
    }
    .emit();
}

fn starts_with_ignore_ascii_case(path: &str, prefix: &str) -> bool {
    path.len() >= prefix.len()
        && path.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
