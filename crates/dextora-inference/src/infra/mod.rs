//! Infrastructure: caches, durable storage, model backends and locking

pub mod locks;
pub mod models;
pub mod profile_store;
pub mod redis;
pub mod session_memory;
pub mod vector_cache;
