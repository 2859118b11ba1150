//! Per-connection session state
//!
//! ```text
//!               frame                 reply
//! AwaitingBatch ─────> Processing ──────────> AwaitingBatch
//!       │                                           │
//!       └──────────────── close ────────────────────┴──> Closed
//! ```
//!
//! `Closed` is terminal and dehydrates the student's vector exactly once.

use std::sync::Arc;

use dextora_common::{DextoraError, TelemetryBatch, TransportError};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::orchestrator::{CycleResponse, ErrorReply, SessionOrchestrator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    AwaitingBatch,
    Processing,
    Closed,
}

/// Outbound message for one inbound frame
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Cycle(Box<CycleResponse>),
    Error(ErrorReply),
}

impl Reply {
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"error":{{"kind":"serialization","message":"{}","retryable":false}}}}"#,
                e.to_string().replace('"', "'")
            )
        })
    }
}

impl From<Result<CycleResponse, DextoraError>> for Reply {
    fn from(result: Result<CycleResponse, DextoraError>) -> Self {
        match result {
            Ok(response) => Reply::Cycle(Box::new(response)),
            Err(e) => Reply::Error(ErrorReply::from(&e)),
        }
    }
}

/// One student's connection
pub struct Session {
    student_id: String,
    state: SessionState,
    orchestrator: Arc<SessionOrchestrator>,
    cycles: u64,
}

impl Session {
    /// Start a session, hydrating the student's vector
    pub async fn open(student_id: impl Into<String>, orchestrator: Arc<SessionOrchestrator>) -> Self {
        let student_id = student_id.into();

        // Store outages already fall back to zeros inside hydrate; an error
        // here means the live backend itself is down and the first cycle retries.
        if let Err(e) = orchestrator.open(&student_id).await {
            warn!(student_id = %student_id, error = %e, "Hydration failed at session start");
        }
        orchestrator.metrics().active_sessions.inc();
        info!(student_id = %student_id, "Session opened");

        Self {
            student_id,
            state: SessionState::AwaitingBatch,
            orchestrator,
            cycles: 0,
        }
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Completed cycles, failed ones excluded
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Handle one inbound text payload
    pub async fn handle_text(&mut self, payload: &str) -> Reply {
        match TelemetryBatch::parse(payload) {
            Ok(batch) => self.handle_batch(batch).await,
            Err(e) => self.reject(e),
        }
    }

    /// Handle one inbound binary payload; must be UTF-8 JSON
    pub async fn handle_binary(&mut self, payload: &[u8]) -> Reply {
        match std::str::from_utf8(payload) {
            Ok(text) => self.handle_text(text).await,
            Err(_) => self.reject(TransportError::UnsupportedFrame("binary frame is not UTF-8".into())),
        }
    }

    /// Run a cycle for an already-parsed batch
    ///
    /// The cycle runs on its own task so that dropping this future (the
    /// connection going away) never interrupts a half-finished cycle.
    pub async fn handle_batch(&mut self, batch: TelemetryBatch) -> Reply {
        if self.state == SessionState::Closed {
            return Reply::Error(ErrorReply::from(&DextoraError::Internal("session is closed".into())));
        }

        self.state = SessionState::Processing;
        let orchestrator = self.orchestrator.clone();
        let student_id = self.student_id.clone();
        let cycle = tokio::spawn(async move { orchestrator.process_batch(&student_id, &batch).await });

        let result = match cycle.await {
            Ok(result) => result,
            Err(e) => Err(DextoraError::Internal(format!("cycle task failed: {}", e))),
        };
        self.state = SessionState::AwaitingBatch;

        if result.is_ok() {
            self.cycles += 1;
        }
        Reply::from(result)
    }

    fn reject(&self, err: TransportError) -> Reply {
        let err = DextoraError::from(err);
        self.orchestrator
            .metrics()
            .cycle_failures
            .with_label_values(&[err.kind()])
            .inc();
        debug!(student_id = %self.student_id, error = %err, "Rejected frame");
        Reply::Error(ErrorReply::from(&err))
    }

    /// End the session; later calls are no-ops
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;
        self.orchestrator.metrics().active_sessions.dec();

        // failure is logged by the orchestrator and never reaches the client
        let _ = self.orchestrator.close(&self.student_id).await;
        info!(student_id = %self.student_id, cycles = self.cycles, "Session closed");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        // Dropped without close(): finish the session in the background
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let orchestrator = self.orchestrator.clone();
            let student_id = std::mem::take(&mut self.student_id);
            orchestrator.metrics().active_sessions.dec();
            handle.spawn(async move {
                let _ = orchestrator.close(&student_id).await;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::models::{HashingEncoder, PriorityPolicy};
    use crate::infra::profile_store::InMemoryProfileStore;
    use crate::infra::session_memory::SessionMemory;
    use crate::infra::vector_cache::{InMemoryVectorBackend, VectorCache};
    use crate::metrics::InferenceMetrics;

    fn orchestrator() -> Arc<SessionOrchestrator> {
        let cache = VectorCache::new(
            Arc::new(InMemoryVectorBackend::new()),
            Arc::new(InMemoryProfileStore::new()),
        );
        Arc::new(SessionOrchestrator::new(
            Arc::new(cache),
            Arc::new(HashingEncoder::new()),
            Arc::new(PriorityPolicy),
            Arc::new(SessionMemory::new()),
            InferenceMetrics::new().unwrap(),
        ))
    }

    const PAYLOAD: &str = r#"{"telemetry_batch":[{"event_type":"click","context_id":101,"behavior_id":1,"timestamp":1700000000.0,"metadata":{"intensity":0.4,"duration_ms":45000,"tab_switches":0}}]}"#;

    #[tokio::test]
    async fn test_open_hydrates_and_counts() {
        let orch = orchestrator();
        let session = Session::open("STU_1", orch.clone()).await;

        assert_eq!(session.state(), SessionState::AwaitingBatch);
        assert!(orch.cache().contains("STU_1").await);
        assert_eq!(orch.metrics().active_sessions.get(), 1);
    }

    #[tokio::test]
    async fn test_text_frame_runs_cycle() {
        let mut session = Session::open("STU_1", orchestrator()).await;
        let reply = session.handle_text(PAYLOAD).await;

        assert!(!reply.is_error());
        assert_eq!(session.cycles(), 1);
        assert_eq!(session.state(), SessionState::AwaitingBatch);

        let json: serde_json::Value = serde_json::from_str(&reply.to_json()).unwrap();
        assert_eq!(json["student_id"], "STU_1");
        assert_eq!(json["dna"].as_object().unwrap().len(), 40);
    }

    #[tokio::test]
    async fn test_malformed_frame_keeps_session_open() {
        let mut session = Session::open("STU_1", orchestrator()).await;
        let reply = session.handle_text("{not json").await;

        assert!(reply.is_error());
        let json: serde_json::Value = serde_json::from_str(&reply.to_json()).unwrap();
        assert_eq!(json["error"]["kind"], "transport");
        assert_eq!(session.state(), SessionState::AwaitingBatch);

        assert!(!session.handle_text(PAYLOAD).await.is_error());
    }

    #[tokio::test]
    async fn test_binary_frames() {
        let mut session = Session::open("STU_1", orchestrator()).await;

        assert!(!session.handle_binary(PAYLOAD.as_bytes()).await.is_error());
        assert!(session.handle_binary(&[0xff, 0xfe]).await.is_error());
    }

    #[tokio::test]
    async fn test_close_is_terminal_and_idempotent() {
        let orch = orchestrator();
        let mut session = Session::open("STU_1", orch.clone()).await;
        session.handle_text(PAYLOAD).await;

        session.close().await;
        session.close().await;

        assert_eq!(session.state(), SessionState::Closed);
        assert!(!orch.cache().contains("STU_1").await);
        assert_eq!(orch.metrics().active_sessions.get(), 0);
        assert!(session.handle_text(PAYLOAD).await.is_error());
    }
}
