use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session backend (key-value store)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,

    /// Connection URL used when `kind = "redis"`.
    #[serde(default = "d_redis_url")]
    pub redis_url: String,

    /// When the backend cannot be reached at startup, keep serving with the
    /// session layer inert instead of refusing to start.
    #[serde(default)]
    pub allow_unavailable: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            redis_url: d_redis_url(),
            allow_unavailable: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// In-process map with lazy TTL expiry.  Single-node only.
    #[default]
    Memory,
    Redis,
}

fn d_redis_url() -> String {
    "redis://127.0.0.1:6379".into()
}
