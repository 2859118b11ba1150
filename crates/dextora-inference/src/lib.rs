//! # DEXTORA Inference
//!
//! Real-time pedagogical intervention engine. A client streams behavioral
//! telemetry for a student; each batch is encoded into a 128-float latent
//! vector, decoded into 40 interpretable metrics, grounded back into the
//! vector, compared with the previous batch, and answered with an
//! intervention command.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 /ws/:student_id (axum)                   │
//! │                          │                               │
//! │  ┌───────────────────────┴──────────────────────────┐    │
//! │  │               SessionOrchestrator                │    │
//! │  │  encode → decode → ground → decide → route       │    │
//! │  └──┬──────────────┬──────────────┬─────────────┬───┘    │
//! │     │              │              │             │        │
//! │  ┌──┴──────┐  ┌────┴─────┐  ┌─────┴────┐  ┌─────┴─────┐  │
//! │  │ Vector  │  │ Encoder/ │  │  Trend   │  │  Action   │  │
//! │  │ Cache   │  │ Policy   │  │  Engine  │  │  Router   │  │
//! │  └──┬──────┘  └──────────┘  └──────────┘  └───────────┘  │
//! │     │                                                    │
//! │  ┌──┴───────────────┐                                    │
//! │  │  ProfileStore    │  (in-memory or Redis)              │
//! │  └──────────────────┘                                    │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod domain;
pub mod infra;
pub mod metrics;
pub mod session;

// Re-export core types
pub use domain::decoder::{decode, BatchAggregates};
pub use domain::grounding::{ground, GROUNDED_SLOTS};
pub use domain::router::{route, PriorityRule, RewardState};
pub use domain::trend::{TrendAlert, TrendEngine, TrendReport};

// Re-export infrastructure
pub use infra::models::{Encoder, HashingEncoder, Policy, PriorityPolicy};
pub use infra::profile_store::{InMemoryProfileStore, ProfileStore, RedisProfileStore};
pub use infra::session_memory::SessionMemory;
pub use infra::vector_cache::{HydrationSource, InMemoryVectorBackend, LiveVectorBackend, RedisVectorBackend, VectorCache};

pub use config::InferenceConfig;
pub use metrics::InferenceMetrics;
pub use session::{CycleResponse, ErrorReply, Reply, Session, SessionOrchestrator, SessionState};
