//! # DEXTORA Common
//!
//! Shared types and errors for the DEXTORA real-time intervention engine.
//!
//! ## Core Types
//!
//! - [`LatentVector`]: 128-float encoded cognitive/affective state of a student
//! - [`TelemetryBatch`]/[`TelemetryEvent`]: behavioral samples from the client
//! - [`Profile`]: the 40 named, human-interpretable metrics ("DNA")
//! - [`Command`]: the intervention instruction returned to the client
//!
//! ## Errors
//!
//! - [`DextoraError`]: unified error with transport, model, store and routing variants

pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{DextoraError, ModelError, Result, RoutingError, StoreError, TransportError};
pub use types::{
    command::{Command, Intervention},
    latent::LatentVector,
    profile::{metric_index, Profile, METRIC_LABELS},
    telemetry::{EngagementMetrics, EventMetadata, EventTimestamp, Intensity, TelemetryBatch, TelemetryEvent},
};

/// DEXTORA version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Dimension of the latent personality vector
pub const LATENT_DIM: usize = 128;

/// Number of metrics in a decoded profile
pub const METRIC_COUNT: usize = 40;

/// Latent slot grounded from the Mastery score
pub const MASTERY_SLOT: usize = 0;

/// Latent slot grounded from the Frustration score
pub const FRUSTRATION_SLOT: usize = 10;

/// Latent slot grounded from the Attention_Span score
pub const ATTENTION_SLOT: usize = 20;

/// Number of leading vector slots echoed back for diagnostics
pub const VECTOR_SNIPPET_LEN: usize = 5;

/// Live vector expiry in seconds (1-hour session timeout)
pub const VECTOR_TTL_SECS: u64 = 3600;

/// Neutral intensity assumed when an event carries none
pub const NEUTRAL_INTENSITY: f64 = 0.5;
