mod backend;
mod observability;
mod server;
mod session;

pub use backend::*;
pub use observability::*;
pub use server::*;
pub use session::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest accepted `session.max_age`, in seconds (about 68 years).
pub const MAX_SESSION_MAX_AGE: u64 = i32::MAX as u64;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl ConfigError {
    fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error("server.port", "port must be greater than 0"));
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }
        if self.server.max_concurrent_requests == 0 {
            errors.push(ConfigError::error(
                "server.max_concurrent_requests",
                "max_concurrent_requests must be greater than 0",
            ));
        }

        // An unnamed cookie is legal but switches the whole layer off.
        if self.session.name.is_empty() {
            errors.push(ConfigError::warning(
                "session.name",
                "cookie name is empty; sessions are disabled",
            ));
        }
        if self.session.max_age == 0 {
            errors.push(ConfigError::error(
                "session.max_age",
                "max_age must be greater than 0 (it is also the backend TTL)",
            ));
        } else if self.session.max_age > MAX_SESSION_MAX_AGE {
            errors.push(ConfigError::error(
                "session.max_age",
                format!("max_age must be at most {MAX_SESSION_MAX_AGE} seconds"),
            ));
        }
        if !self.session.path.starts_with('/') {
            errors.push(ConfigError::warning(
                "session.path",
                "path should start with '/'; no request path will match it",
            ));
        }
        if self.session.same_site == SameSitePolicy::None && !self.session.secure {
            errors.push(ConfigError::warning(
                "session.same_site",
                "browsers reject SameSite=None cookies without Secure",
            ));
        }

        if self.backend.kind == BackendKind::Redis && self.backend.redis_url.is_empty() {
            errors.push(ConfigError::error(
                "backend.redis_url",
                "redis backend selected but redis_url is empty",
            ));
        }

        errors
    }
}
