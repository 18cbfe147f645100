//! AppState construction extracted from `main.rs`.

use std::sync::Arc;

use anyhow::Context;

use sg_domain::config::{Config, ConfigSeverity};
use sg_sessions::create_backend;

use crate::state::AppState;

/// Validate config, connect the session backend and return a fully-wired
/// [`AppState`].
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Session backend ──────────────────────────────────────────────
    let backend = match create_backend(&config.backend).await {
        Ok(backend) => Some(backend),
        Err(e) if config.backend.allow_unavailable => {
            tracing::warn!(
                error = %e,
                "session backend unavailable, serving without sessions"
            );
            None
        }
        Err(e) => {
            return Err(e).with_context(|| format!("connecting {:?} backend", config.backend.kind))
        }
    };

    let state = AppState::new(config.clone(), backend);
    tracing::info!(
        backend = state.backend_kind(),
        cookie = %config.session.name,
        path = %config.session.path,
        "session layer ready"
    );
    Ok(state)
}
