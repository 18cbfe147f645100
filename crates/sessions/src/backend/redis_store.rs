use async_trait::async_trait;
use redis::aio::ConnectionManager;

use sg_domain::error::{Error, Result};

use super::SessionBackend;

/// Redis-backed session store speaking plain `GET` / `SETEX`.
///
/// Wraps a [`ConnectionManager`], which multiplexes commands over one
/// connection and reconnects on its own; cloning it per call is cheap.
/// Timeouts and reconnect policy are the client's, not ours.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
}

impl RedisBackend {
    /// Open a client for `url` and establish the managed connection.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(redis_err)?;
        let conn = ConnectionManager::new(client).await.map_err(redis_err)?;
        tracing::info!("connected to redis session backend");
        Ok(Self { conn })
    }
}

#[async_trait]
impl SessionBackend for RedisBackend {
    fn kind(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<String> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(redis_err)?;
        Ok(value.unwrap_or_default())
    }

    async fn set_with_expiry(&self, key: &str, ttl_secs: u64, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let () = redis::cmd("SETEX")
            .arg(key)
            .arg(ttl_secs)
            .arg(value)
            .query_async(&mut conn)
            .await
            .map_err(redis_err)?;
        Ok(())
    }
}

fn redis_err(e: redis::RedisError) -> Error {
    Error::backend("redis", e.to_string())
}
