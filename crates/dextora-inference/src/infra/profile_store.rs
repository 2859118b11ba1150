//! Durable Profile Storage
//!
//! Long-term home of each student's latent vector between sessions.

use async_trait::async_trait;
use dashmap::DashMap;
use dextora_common::{LatentVector, StoreError};
use redis::AsyncCommands;
use tracing::{debug, instrument};

use super::redis::RedisPool;

/// Trait for durable profile backends
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Load the persisted vector, `None` for an unknown student
    async fn load_profile(&self, student_id: &str) -> Result<Option<LatentVector>, StoreError>;

    /// Persist (insert or overwrite) a student's vector
    async fn save_profile(&self, student_id: &str, vector: &LatentVector) -> Result<(), StoreError>;
}

/// In-process store, used in development and tests
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: DashMap<String, LatentVector>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn load_profile(&self, student_id: &str) -> Result<Option<LatentVector>, StoreError> {
        Ok(self.profiles.get(student_id).map(|v| v.clone()))
    }

    async fn save_profile(&self, student_id: &str, vector: &LatentVector) -> Result<(), StoreError> {
        self.profiles.insert(student_id.to_string(), vector.clone());
        Ok(())
    }
}

/// Redis-backed store; keys carry no expiry
pub struct RedisProfileStore {
    pool: RedisPool,
    prefix: String,
}

impl RedisProfileStore {
    pub fn new(pool: RedisPool) -> Self {
        Self {
            pool,
            prefix: "dextora:profile".to_string(),
        }
    }

    /// Create store with custom key prefix
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    fn key(&self, student_id: &str) -> String {
        format!("{}:{}", self.prefix, student_id)
    }
}

#[async_trait]
impl ProfileStore for RedisProfileStore {
    #[instrument(skip(self))]
    async fn load_profile(&self, student_id: &str) -> Result<Option<LatentVector>, StoreError> {
        let mut conn = self.pool.get().await?;

        let blob = match conn.get::<_, Option<Vec<u8>>>(self.key(student_id)).await {
            Ok(blob) => blob,
            Err(e) => {
                self.pool.invalidate().await;
                return Err(StoreError::Backend(format!("Redis get failed: {}", e)));
            }
        };

        match blob {
            Some(bytes) => {
                let vector = LatentVector::from_bytes(&bytes).map_err(|e| StoreError::Corrupt {
                    student_id: student_id.to_string(),
                    reason: e.to_string(),
                })?;
                debug!(student_id, "Loaded durable profile");
                Ok(Some(vector))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, vector))]
    async fn save_profile(&self, student_id: &str, vector: &LatentVector) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;

        if let Err(e) = conn.set::<_, _, ()>(self.key(student_id), vector.to_bytes()).await {
            self.pool.invalidate().await;
            return Err(StoreError::Backend(format!("Redis set failed: {}", e)));
        }

        debug!(student_id, "Persisted durable profile");
        Ok(())
    }
}
