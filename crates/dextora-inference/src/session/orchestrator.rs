//! Session Orchestrator
//!
//! Runs one inference cycle per telemetry batch:
//!
//! ```text
//! hydrate → encode → decode → ground → decide → route → cache write → trend
//! ```
//!
//! Everything up to `route` is side-effect free, so a cycle that fails on a
//! model or routing fault leaves the cached vector and the trend memory at
//! their last good values. Cycles of one student are serialized through
//! [`StudentLocks`]; different students never wait on each other.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dextora_common::{
    Command, DextoraError, LatentVector, ModelError, Profile, StoreError, TelemetryBatch, VECTOR_SNIPPET_LEN,
};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::trend::{TrendAlert, TrendEngine};
use crate::domain::{decoder, grounding, router};
use crate::infra::locks::StudentLocks;
use crate::infra::models::{Encoder, Policy};
use crate::infra::session_memory::SessionMemory;
use crate::infra::vector_cache::{HydrationSource, VectorCache};
use crate::metrics::InferenceMetrics;

/// Default per-call model timeout
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_millis(2000);

/// Reply to one successful cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleResponse {
    pub student_id: String,
    pub cycle_id: Uuid,
    /// The 40 decoded metrics
    pub dna: Profile,
    /// Human-readable trend report
    pub trends: String,
    /// Machine-readable alert codes
    pub alerts: Vec<TrendAlert>,
    pub action: Command,
    pub action_index: i64,
    /// Leading slots of the grounded vector
    pub vector_snippet: Vec<f32>,
    pub processed_at: DateTime<Utc>,
}

/// Error reply body: `{"error": {"kind", "message", "retryable"}}`
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReply {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl From<&DextoraError> for ErrorReply {
    fn from(err: &DextoraError) -> Self {
        Self {
            error: ErrorBody {
                kind: err.kind(),
                message: err.to_string(),
                retryable: err.is_retryable(),
            },
        }
    }
}

/// Shared, per-process cycle runner
pub struct SessionOrchestrator {
    cache: Arc<VectorCache>,
    encoder: Arc<dyn Encoder>,
    policy: Arc<dyn Policy>,
    trends: TrendEngine,
    locks: StudentLocks,
    metrics: InferenceMetrics,
    model_timeout: Duration,
}

impl SessionOrchestrator {
    pub fn new(
        cache: Arc<VectorCache>,
        encoder: Arc<dyn Encoder>,
        policy: Arc<dyn Policy>,
        memory: Arc<SessionMemory>,
        metrics: InferenceMetrics,
    ) -> Self {
        Self {
            cache,
            encoder,
            policy,
            trends: TrendEngine::new(memory),
            locks: StudentLocks::new(),
            metrics,
            model_timeout: DEFAULT_MODEL_TIMEOUT,
        }
    }

    /// Set the per-call encoder/policy timeout
    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn cache(&self) -> &Arc<VectorCache> {
        &self.cache
    }

    pub fn metrics(&self) -> &InferenceMetrics {
        &self.metrics
    }

    /// Hydrate a student's live vector at session start
    #[instrument(skip(self))]
    pub async fn open(&self, student_id: &str) -> Result<HydrationSource, StoreError> {
        let _guard = self.locks.acquire(student_id).await;
        let source = self.cache.hydrate(student_id).await?;
        self.metrics.hydrations.with_label_values(&[source.as_str()]).inc();
        Ok(source)
    }

    /// Persist and evict a student's live vector at session end
    #[instrument(skip(self))]
    pub async fn close(&self, student_id: &str) -> Result<(), StoreError> {
        let _guard = self.locks.acquire(student_id).await;
        self.cache.dehydrate(student_id).await.map_err(|e| {
            self.metrics.dehydration_failures.inc();
            error!(student_id, error = %e, "Failed to persist vector at session end");
            e
        })
    }

    /// Run one full cycle for `batch`
    #[instrument(skip(self, batch), fields(events = batch.len()))]
    pub async fn process_batch(&self, student_id: &str, batch: &TelemetryBatch) -> Result<CycleResponse, DextoraError> {
        let timer = self.metrics.cycle_duration_seconds.start_timer();
        let result = self.run_cycle(student_id, batch).await;
        timer.observe_duration();

        match &result {
            Ok(response) => {
                self.metrics.cycles_total.inc();
                debug!(
                    student_id,
                    action = response.action.action_name(),
                    trends = %response.trends,
                    "Cycle complete"
                );
            }
            Err(e) => {
                self.metrics.cycle_failures.with_label_values(&[e.kind()]).inc();
                match e {
                    DextoraError::Transport(_) => warn!(student_id, error = %e, "Rejected batch"),
                    DextoraError::Routing(_) => error!(student_id, error = %e, "Policy produced an unmapped action"),
                    _ => warn!(student_id, error = %e, retryable = e.is_retryable(), "Cycle failed"),
                }
            }
        }
        result
    }

    async fn run_cycle(&self, student_id: &str, batch: &TelemetryBatch) -> Result<CycleResponse, DextoraError> {
        batch.validate_for(student_id)?;

        let _guard = self.locks.acquire(student_id).await;

        // Re-hydrates if the live vector expired mid-session
        let source = self.cache.hydrate(student_id).await?;
        if source != HydrationSource::Live {
            info!(student_id, source = source.as_str(), "Re-hydrated expired session");
            self.metrics.hydrations.with_label_values(&[source.as_str()]).inc();
        }

        let (contexts, behaviors) = batch.sequences();
        let raw = self
            .call_model(self.encoder.name(), self.encoder.encode(&contexts, &behaviors))
            .await?;

        let profile = decoder::decode(&raw, batch);
        let grounded = grounding::ground(&profile, &raw);

        let action_index = self
            .call_model(self.policy.name(), self.policy.decide(&grounded))
            .await?;
        let action = router::route(action_index)?;

        self.cache.write(student_id, &grounded).await?;
        let report = self.trends.observe(student_id, &profile);

        Ok(CycleResponse {
            student_id: student_id.to_string(),
            cycle_id: Uuid::now_v7(),
            dna: profile,
            trends: report.to_string(),
            alerts: report.alerts().to_vec(),
            action,
            action_index,
            vector_snippet: grounded.snippet(VECTOR_SNIPPET_LEN),
            processed_at: Utc::now(),
        })
    }

    async fn call_model<T, F>(&self, model: &'static str, call: F) -> Result<T, ModelError>
    where
        F: Future<Output = Result<T, ModelError>>,
    {
        match tokio::time::timeout(self.model_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ModelError::Timeout {
                model,
                limit_ms: self.model_timeout.as_millis() as u64,
            }),
        }
    }

    /// Live vector for a student, zeros when none
    pub async fn current_vector(&self, student_id: &str) -> LatentVector {
        self.cache.read(student_id).await
    }

    /// Periodic maintenance: expired cache entries, stale trend memory and idle locks
    pub async fn sweep(&self) -> SweepReport {
        SweepReport {
            vectors: self.cache.purge_expired().await,
            profiles: self.trends.memory().purge_expired(),
            locks: self.locks.release_idle(),
        }
    }
}

/// Entries dropped by one [`SessionOrchestrator::sweep`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub vectors: usize,
    pub profiles: usize,
    pub locks: usize,
}
