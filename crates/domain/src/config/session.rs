use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session cookie
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Cookie and identifier options for the session layer.
///
/// Supplied once when the controller is built and never re-read.  The
/// `path` field does double duty: it is the `Path` attribute of the cookie
/// and the request-path prefix that activates the layer at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Cookie name.  An empty name turns the session layer into a no-op.
    #[serde(default = "d_name")]
    pub name: String,

    /// `Domain` attribute.  Empty means host-only.
    #[serde(default)]
    pub domain: String,

    /// Cookie `Path` and request-path prefix filter.
    #[serde(default = "d_path")]
    pub path: String,

    /// Cookie `Max-Age` in seconds, also the backend record TTL.
    #[serde(default = "d_max_age")]
    pub max_age: u64,

    #[serde(default = "d_true")]
    pub http_only: bool,

    #[serde(default)]
    pub secure: bool,

    #[serde(default)]
    pub same_site: SameSitePolicy,

    /// Prepended to every generated session identifier (and so to every
    /// backend key).
    #[serde(default = "d_prefix")]
    pub prefix: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: d_name(),
            domain: String::new(),
            path: d_path(),
            max_age: d_max_age(),
            http_only: true,
            secure: false,
            same_site: SameSitePolicy::default(),
            prefix: d_prefix(),
        }
    }
}

/// `SameSite` cookie policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSitePolicy {
    Strict,
    #[default]
    Lax,
    None,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_name() -> String {
    "sid".into()
}
fn d_path() -> String {
    "/".into()
}
fn d_max_age() -> u64 {
    1800
}
fn d_true() -> bool {
    true
}
fn d_prefix() -> String {
    "sg:".into()
}
