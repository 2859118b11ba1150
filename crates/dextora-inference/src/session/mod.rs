//! Session layer: the per-batch cycle and per-connection state

pub mod orchestrator;
pub mod state;

pub use orchestrator::{CycleResponse, ErrorReply, SessionOrchestrator, SweepReport};
pub use state::{Reply, Session, SessionState};
