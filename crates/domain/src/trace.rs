use serde::Serialize;

/// Structured trace events emitted across all SessionGate crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionCreated {
        session_id: String,
        reason: String,
    },
    SessionLoaded {
        session_id: String,
    },
    SessionPersisted {
        session_id: String,
        ttl_secs: u64,
    },
    SessionSkipped {
        path: String,
        reason: String,
    },
    BackendCall {
        backend: String,
        command: String,
        key: String,
        ok: bool,
        duration_ms: u64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "sg_event");
    }
}
