//! Vector Cache
//!
//! Live ("hot") latent vectors keyed by student, with a fixed expiry window
//! and the hydrate/dehydrate protocol against the durable profile store.
//!
//! ```text
//!   session start                 every cycle                session end
//!  ┌────────────┐  load_profile  ┌────────────┐  save_profile  ┌────────────┐
//!  │  hydrate   │ ─────────────> │ read/write │ ─────────────> │ dehydrate  │
//!  └────────────┘  (or zeros)    └────────────┘                └────────────┘
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use dextora_common::{LatentVector, StoreError, VECTOR_TTL_SECS};
use redis::AsyncCommands;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::profile_store::ProfileStore;
use super::redis::RedisPool;

/// Trait for live vector backends
#[async_trait]
pub trait LiveVectorBackend: Send + Sync {
    /// Get the live vector, `None` if absent or expired
    async fn get(&self, student_id: &str) -> Result<Option<LatentVector>, StoreError>;

    /// Replace the live vector and restart its expiry window
    async fn set(&self, student_id: &str, vector: &LatentVector, ttl: Duration) -> Result<(), StoreError>;

    /// Drop the live vector
    async fn remove(&self, student_id: &str) -> Result<(), StoreError>;

    /// Drop expired entries; backends with native expiry do nothing
    async fn purge_expired(&self) -> usize {
        0
    }
}

#[derive(Debug, Clone)]
struct CachedVector {
    vector: LatentVector,
    expires_at: Instant,
}

/// In-process backend using DashMap with lazy expiry
#[derive(Debug, Default)]
pub struct InMemoryVectorBackend {
    entries: DashMap<String, CachedVector>,
}

impl InMemoryVectorBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl LiveVectorBackend for InMemoryVectorBackend {
    async fn get(&self, student_id: &str) -> Result<Option<LatentVector>, StoreError> {
        let now = Instant::now();
        let live = self
            .entries
            .get(student_id)
            .filter(|e| now < e.expires_at)
            .map(|e| e.vector.clone());

        if live.is_none() {
            self.entries.remove_if(student_id, |_, e| now >= e.expires_at);
        }
        Ok(live)
    }

    async fn set(&self, student_id: &str, vector: &LatentVector, ttl: Duration) -> Result<(), StoreError> {
        self.entries.insert(
            student_id.to_string(),
            CachedVector {
                vector: vector.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn remove(&self, student_id: &str) -> Result<(), StoreError> {
        self.entries.remove(student_id);
        Ok(())
    }

    async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| now < e.expires_at);
        before.saturating_sub(self.entries.len())
    }
}

/// Redis backend storing the raw f32 blob under `SETEX`
pub struct RedisVectorBackend {
    pool: RedisPool,
    prefix: String,
}

impl RedisVectorBackend {
    pub fn new(pool: RedisPool) -> Self {
        Self {
            pool,
            prefix: "dextora:student".to_string(),
        }
    }

    /// Create backend with custom key prefix
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    fn key(&self, student_id: &str) -> String {
        format!("{}:{}:vector", self.prefix, student_id)
    }
}

#[async_trait]
impl LiveVectorBackend for RedisVectorBackend {
    async fn get(&self, student_id: &str) -> Result<Option<LatentVector>, StoreError> {
        let mut conn = self.pool.get().await?;

        let blob = match conn.get::<_, Option<Vec<u8>>>(self.key(student_id)).await {
            Ok(blob) => blob,
            Err(e) => {
                self.pool.invalidate().await;
                return Err(StoreError::Backend(format!("Redis get failed: {}", e)));
            }
        };

        blob.map(|bytes| {
            LatentVector::from_bytes(&bytes).map_err(|e| StoreError::Corrupt {
                student_id: student_id.to_string(),
                reason: e.to_string(),
            })
        })
        .transpose()
    }

    async fn set(&self, student_id: &str, vector: &LatentVector, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        let ttl_secs = ttl.as_secs().max(1);

        if let Err(e) = conn
            .set_ex::<_, _, ()>(self.key(student_id), vector.to_bytes(), ttl_secs)
            .await
        {
            self.pool.invalidate().await;
            return Err(StoreError::Backend(format!("Redis set failed: {}", e)));
        }
        Ok(())
    }

    async fn remove(&self, student_id: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;

        if let Err(e) = conn.del::<_, ()>(self.key(student_id)).await {
            self.pool.invalidate().await;
            return Err(StoreError::Backend(format!("Redis DEL failed: {}", e)));
        }
        Ok(())
    }
}

/// Where a hydrated vector came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HydrationSource {
    /// A live vector already existed; nothing was loaded
    Live,
    /// Loaded from the durable store
    Durable,
    /// No durable profile (or store unavailable); started from zeros
    Fresh,
}

impl HydrationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            HydrationSource::Live => "live",
            HydrationSource::Durable => "durable",
            HydrationSource::Fresh => "fresh",
        }
    }
}

/// Live vector cache in front of the durable profile store
pub struct VectorCache {
    backend: Arc<dyn LiveVectorBackend>,
    store: Arc<dyn ProfileStore>,
    ttl: Duration,
}

impl VectorCache {
    /// Create a cache with the default one-hour expiry
    pub fn new(backend: Arc<dyn LiveVectorBackend>, store: Arc<dyn ProfileStore>) -> Self {
        Self {
            backend,
            store,
            ttl: Duration::from_secs(VECTOR_TTL_SECS),
        }
    }

    /// Create cache with custom TTL
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Make sure a live vector exists; no-op when one already does
    ///
    /// A durable store failure falls back to the zero vector. Live backend
    /// errors are returned: when the lookup fails nothing is installed, so a
    /// newer live vector is never overwritten.
    #[instrument(skip(self))]
    pub async fn hydrate(&self, student_id: &str) -> Result<HydrationSource, StoreError> {
        if self.backend.get(student_id).await?.is_some() {
            return Ok(HydrationSource::Live);
        }

        let (vector, source) = match self.store.load_profile(student_id).await {
            Ok(Some(vector)) => (vector, HydrationSource::Durable),
            Ok(None) => (LatentVector::zeros(), HydrationSource::Fresh),
            Err(e) => {
                warn!(student_id, error = %e, "Durable store unavailable, starting from zero vector");
                (LatentVector::zeros(), HydrationSource::Fresh)
            }
        };

        self.backend.set(student_id, &vector, self.ttl).await?;

        match source {
            HydrationSource::Durable => info!(student_id, "Hydrated session from durable store"),
            _ => info!(student_id, "Created new session with zero vector"),
        }
        Ok(source)
    }

    /// Live vector, or zeros when there is none; never fails
    pub async fn read(&self, student_id: &str) -> LatentVector {
        match self.backend.get(student_id).await {
            Ok(Some(vector)) => vector,
            Ok(None) => LatentVector::zeros(),
            Err(e) => {
                warn!(student_id, error = %e, "Live vector read failed, using zero vector");
                LatentVector::zeros()
            }
        }
    }

    /// Replace the live vector and restart its expiry window
    #[instrument(skip(self, vector))]
    pub async fn write(&self, student_id: &str, vector: &LatentVector) -> Result<(), StoreError> {
        self.backend.set(student_id, vector, self.ttl).await?;
        debug!(student_id, magnitude = vector.magnitude(), "Cached student vector");
        Ok(())
    }

    /// Persist the live vector and drop it from the cache
    ///
    /// When there is no live vector nothing is persisted, so an expired
    /// session never overwrites the durable profile with zeros. On a store
    /// failure the live entry is kept and the error returned.
    #[instrument(skip(self))]
    pub async fn dehydrate(&self, student_id: &str) -> Result<(), StoreError> {
        let Some(vector) = self.backend.get(student_id).await? else {
            debug!(student_id, "No live vector to persist");
            return Ok(());
        };

        self.store.save_profile(student_id, &vector).await?;
        self.backend.remove(student_id).await?;

        info!(student_id, "Persisted vector to long-term storage");
        Ok(())
    }

    pub async fn contains(&self, student_id: &str) -> bool {
        matches!(self.backend.get(student_id).await, Ok(Some(_)))
    }

    /// Drop expired live entries
    pub async fn purge_expired(&self) -> usize {
        self.backend.purge_expired().await
    }
}
