//! Domain logic: decoding, grounding, trends and action routing

pub mod decoder;
pub mod grounding;
pub mod router;
pub mod trend;
