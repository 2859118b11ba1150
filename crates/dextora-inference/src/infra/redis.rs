//! Shared Redis connection handle
//!
//! One multiplexed connection, re-established lazily after a failure.

use std::sync::Arc;
use std::time::Duration;

use dextora_common::{DextoraError, StoreError};
use redis::{aio::MultiplexedConnection, Client};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Lazily reconnecting Redis connection
#[derive(Clone)]
pub struct RedisPool {
    client: Client,
    connection: Arc<RwLock<Option<MultiplexedConnection>>>,
}

impl RedisPool {
    /// Open a client and establish the first connection
    pub async fn connect(redis_url: &str) -> Result<Self, DextoraError> {
        let client = Client::open(redis_url)
            .map_err(|e| DextoraError::Config(format!("Failed to create Redis client: {}", e)))?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to connect to Redis: {}", e)))?;

        debug!(url = %redis_url, "Connected to Redis");
        Ok(Self {
            client,
            connection: Arc::new(RwLock::new(Some(connection))),
        })
    }

    /// Connect and `PING`, retrying up to `attempts` times with a fixed delay
    ///
    /// An invalid URL fails immediately.
    pub async fn connect_with_retry(redis_url: &str, attempts: u32, delay: Duration) -> Result<Self, DextoraError> {
        let attempts = attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = match Self::connect(redis_url).await {
                Ok(pool) => pool.ping().await.map(|_| pool).map_err(DextoraError::from),
                Err(e) => Err(e),
            };

            match result {
                Ok(pool) => {
                    if attempt > 1 {
                        info!(attempt, "Connected to Redis after retry");
                    }
                    return Ok(pool);
                }
                Err(e @ DextoraError::Config(_)) => return Err(e),
                Err(e) if attempt >= attempts => return Err(e),
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "Redis not ready, retrying in {:?}", delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Get a connection, reconnecting if the last one was dropped
    pub async fn get(&self) -> Result<MultiplexedConnection, StoreError> {
        let guard = self.connection.read().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }
        drop(guard);

        let mut guard = self.connection.write().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let connection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to reconnect to Redis: {}", e)))?;

        *guard = Some(connection.clone());
        Ok(connection)
    }

    /// Forget the current connection so the next call reconnects
    pub async fn invalidate(&self) {
        warn!("Dropping Redis connection after error");
        *self.connection.write().await = None;
    }

    /// Round-trip check used at startup
    pub async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.get().await?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Unavailable(format!("Redis PING failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_invalid_url_fails_without_retry() {
        let started = Instant::now();
        let result = RedisPool::connect_with_retry("not-a-redis-url", 5, Duration::from_secs(2)).await;

        assert!(matches!(result, Err(DextoraError::Config(_))));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_unreachable_server_retries_then_fails() {
        // nothing listens on port 1
        let started = Instant::now();
        let result = RedisPool::connect_with_retry("redis://127.0.0.1:1/", 3, Duration::from_millis(20)).await;

        assert!(matches!(result, Err(DextoraError::Store(StoreError::Unavailable(_)))));
        assert!(started.elapsed() >= Duration::from_millis(40));
    }
}
