//! Error types for the DEXTORA engine
//!
//! Provides a unified error type and the per-cycle fault taxonomy:
//! transport, model, durable store and action routing.

use thiserror::Error;

/// Result type alias using DextoraError
pub type Result<T> = std::result::Result<T, DextoraError>;

/// Unified error type for DEXTORA operations
#[derive(Debug, Error)]
pub enum DextoraError {
    // Inbound payload errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    // Encoder / policy errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    // Cache and durable store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // Policy and router disagree on the action space
    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DextoraError {
    /// Short, stable identifier of the fault class, used in error replies and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            DextoraError::Transport(_) => "transport",
            DextoraError::Model(_) => "model",
            DextoraError::Store(_) => "store",
            DextoraError::Routing(_) => "routing",
            DextoraError::Config(_) => "config",
            DextoraError::Serialization(_) => "serialization",
            DextoraError::Internal(_) => "internal",
        }
    }

    /// Whether the client may resend the same batch and expect a different outcome
    pub fn is_retryable(&self) -> bool {
        match self {
            DextoraError::Model(e) => e.is_retryable(),
            DextoraError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Malformed or incomplete inbound batches
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Malformed batch payload: {0}")]
    Malformed(String),

    #[error("Batch contains no events")]
    EmptyBatch,

    #[error("Batch is tagged for student {payload} but the session belongs to {session}")]
    StudentMismatch { session: String, payload: String },

    #[error("Unsupported frame: {0}")]
    UnsupportedFrame(String),
}

/// Encoder and policy failures
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{model} timed out after {limit_ms}ms")]
    Timeout { model: &'static str, limit_ms: u64 },

    #[error("{model} inference failed: {reason}")]
    Inference { model: &'static str, reason: String },

    #[error("Invalid model input: {0}")]
    InvalidInput(String),

    #[error("Invalid latent vector: expected {expected} dimensions, got {actual}")]
    Dimension { expected: usize, actual: usize },
}

impl ModelError {
    /// Failures and timeouts are transient; rejected input fails the same way every time
    pub fn is_retryable(&self) -> bool {
        matches!(self, ModelError::Timeout { .. } | ModelError::Inference { .. })
    }
}

/// Live cache and durable store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt vector for {student_id}: {reason}")]
    Corrupt { student_id: String, reason: String },

    #[error("Storage error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, StoreError::Corrupt { .. })
    }
}

/// Mismatch between the policy's action space and the router table
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("Action index {0} has no mapped command")]
    UnmappedAction(i64),
}

// Implement From for common external error types
impl From<serde_json::Error> for DextoraError {
    fn from(err: serde_json::Error) -> Self {
        DextoraError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for DextoraError {
    fn from(err: std::io::Error) -> Self {
        DextoraError::Internal(err.to_string())
    }
}

impl From<anyhow::Error> for DextoraError {
    fn from(err: anyhow::Error) -> Self {
        DextoraError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DextoraError::Routing(RoutingError::UnmappedAction(7));
        assert!(err.to_string().contains("Action index 7"));
    }

    #[test]
    fn test_timeout_display() {
        let err = ModelError::Timeout {
            model: "encoder",
            limit_ms: 2000,
        };
        assert_eq!(err.to_string(), "encoder timed out after 2000ms");
    }

    #[test]
    fn test_retryable_classes() {
        let model: DextoraError = ModelError::Inference {
            model: "encoder",
            reason: "oom".into(),
        }
        .into();
        let store: DextoraError = StoreError::Unavailable("down".into()).into();
        let transport: DextoraError = TransportError::EmptyBatch.into();
        let routing: DextoraError = RoutingError::UnmappedAction(9).into();

        assert!(model.is_retryable());
        assert!(store.is_retryable());
        assert!(!transport.is_retryable());
        assert!(!routing.is_retryable());
        assert_eq!(routing.kind(), "routing");
        assert_eq!(transport.kind(), "transport");
    }

    #[test]
    fn test_deterministic_faults_not_retryable() {
        let invalid: DextoraError = ModelError::InvalidInput("context id 5000 outside vocabulary".into()).into();
        let dimension: DextoraError = ModelError::Dimension {
            expected: 128,
            actual: 64,
        }
        .into();
        let corrupt: DextoraError = StoreError::Corrupt {
            student_id: "STU_1".into(),
            reason: "short blob".into(),
        }
        .into();
        let timeout: DextoraError = ModelError::Timeout {
            model: "policy",
            limit_ms: 2000,
        }
        .into();

        assert!(!invalid.is_retryable());
        assert!(!dimension.is_retryable());
        assert!(!corrupt.is_retryable());
        assert!(timeout.is_retryable());
        assert_eq!(invalid.kind(), "model");
    }
}
