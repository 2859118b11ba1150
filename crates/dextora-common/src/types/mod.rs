//! Core data types for the DEXTORA engine

pub mod command;
pub mod latent;
pub mod profile;
pub mod telemetry;
