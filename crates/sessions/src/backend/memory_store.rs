use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;

use sg_domain::error::{Error, Result};

use super::SessionBackend;

/// Minimum spacing between full sweeps of expired records.
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Process-local session store.
///
/// Expired records are dropped when they are next read, and swept in bulk
/// on writes (at most once per [`SWEEP_INTERVAL`]).  Suitable for tests and
/// single-node development; records do not survive a restart.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Entry>>,
    next_sweep: Mutex<Option<Instant>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records that have not expired yet.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired record if the last sweep is old enough.
    fn sweep_expired(&self, entries: &mut HashMap<String, Entry>, now: Instant) {
        let mut next = self.next_sweep.lock();
        if next.is_some_and(|at| now < at) {
            return;
        }
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        let dropped = before - entries.len();
        if dropped > 0 {
            tracing::debug!(dropped, remaining = entries.len(), "swept expired sessions");
        }
        *next = Some(now + SWEEP_INTERVAL);
    }
}

#[async_trait]
impl SessionBackend for MemoryBackend {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<String> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return Ok(String::new()),
                Some(e) if e.expires_at > now => return Ok(e.value.clone()),
                Some(_) => {}
            }
        }

        // Expired: evict under the write lock, re-checking in case a writer
        // refreshed it in between.
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|e| e.expires_at <= now) {
            entries.remove(key);
        }
        Ok(String::new())
    }

    async fn set_with_expiry(&self, key: &str, ttl_secs: u64, value: &str) -> Result<()> {
        if ttl_secs == 0 {
            return Err(Error::backend(
                self.kind(),
                "invalid expire time in 'setex' command",
            ));
        }
        let now = Instant::now();
        let expires_at = now
            .checked_add(Duration::from_secs(ttl_secs))
            .ok_or_else(|| {
                Error::backend(self.kind(), "expire time out of range in 'setex' command")
            })?;

        let mut entries = self.entries.write();
        self.sweep_expired(&mut entries, now);
        entries.insert(
            key.to_owned(),
            Entry {
                value: value.to_owned(),
                expires_at,
            },
        );
        Ok(())
    }
}
