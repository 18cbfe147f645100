//! The key-value contract the session controller needs, plus the in-memory
//! and Redis implementations.

mod memory_store;
mod redis_store;

pub use memory_store::MemoryBackend;
pub use redis_store::RedisBackend;

use std::sync::Arc;

use async_trait::async_trait;
use sg_domain::config::{BackendConfig, BackendKind};
use sg_domain::error::Result;

/// Minimal asynchronous key-value store with per-key expiry.
///
/// The controller awaits every call before issuing the next one, so an
/// implementation never sees two in-flight operations from the same request.
/// Calls for different keys may complete in any order.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Short name used in logs and trace events (`"memory"`, `"redis"`).
    fn kind(&self) -> &'static str;

    /// `GET key`.  A missing record is `Ok(String::new())`, not an error.
    async fn get(&self, key: &str) -> Result<String>;

    /// `SETEX key ttl value`: unconditional overwrite, expiry restarted.
    async fn set_with_expiry(&self, key: &str, ttl_secs: u64, value: &str) -> Result<()>;
}

/// Build the backend selected by `cfg.kind`.
///
/// The Redis variant connects eagerly so that a bad URL or an unreachable
/// server is reported at startup.
pub async fn create_backend(cfg: &BackendConfig) -> Result<Arc<dyn SessionBackend>> {
    match cfg.kind {
        BackendKind::Memory => {
            tracing::info!("using in-memory session backend");
            Ok(Arc::new(MemoryBackend::new()))
        }
        BackendKind::Redis => {
            let backend = RedisBackend::connect(&cfg.redis_url).await?;
            Ok(Arc::new(backend))
        }
    }
}
