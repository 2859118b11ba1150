//! Inference service configuration
//!
//! Layered: built-in defaults, then an optional file named by
//! `DEXTORA_CONFIG`, then `DEXTORA__SECTION__KEY` environment variables,
//! then the platform `PORT` variable.

use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::infra::models::{BEHAVIOR_VOCAB, CONTEXT_VOCAB};

/// Inference service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Service host
    pub host: String,
    /// Service port
    pub port: u16,
    /// Live vector cache
    pub cache: CacheSettings,
    /// Durable profile store
    pub store: StoreSettings,
    /// Encoder and policy
    pub models: ModelSettings,
    /// Trend session memory
    pub memory: MemorySettings,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cache: CacheSettings::default(),
            store: StoreSettings::default(),
            models: ModelSettings::default(),
            memory: MemorySettings::default(),
        }
    }
}

impl InferenceConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let file = std::env::var("DEXTORA_CONFIG").ok();
        let mut cfg = Self::build(file.as_deref(), None)?;

        // Platform-assigned port wins
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(p) = port.parse::<u16>() {
                cfg.port = p;
            }
        }

        Ok(cfg)
    }

    /// Merge defaults, an optional config file and an optional inline TOML
    /// document, then `DEXTORA__*` environment variables
    pub fn build(path: Option<&str>, inline_toml: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&Self::default()).context("Failed to seed config defaults")?);

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(true));
        }
        if let Some(doc) = inline_toml {
            builder = builder.add_source(File::from_str(doc, FileFormat::Toml));
        }

        builder
            .add_source(
                Environment::with_prefix("DEXTORA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }
}

/// Live vector cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Redis URL; in-process cache when absent
    pub redis_url: Option<String>,
    /// Key prefix for Redis entries
    pub key_prefix: String,
    /// Live vector expiry in seconds
    pub ttl_secs: u64,
    /// Interval of the expired-entry sweeper in seconds
    pub sweep_interval_secs: u64,
    /// Startup connection retries
    pub connect: ConnectRetry,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            key_prefix: "dextora:student".to_string(),
            ttl_secs: dextora_common::VECTOR_TTL_SECS,
            sweep_interval_secs: 60,
            connect: ConnectRetry::default(),
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// Durable profile store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Redis URL; in-process store when absent
    pub redis_url: Option<String>,
    /// Key prefix for Redis entries
    pub key_prefix: String,
    /// Startup connection retries
    pub connect: ConnectRetry,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            key_prefix: "dextora:profile".to_string(),
            connect: ConnectRetry::default(),
        }
    }
}

/// Bounded retry of the first Redis connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectRetry {
    /// Total attempts, including the first
    pub attempts: u32,
    /// Pause between attempts in milliseconds
    pub delay_ms: u64,
}

impl Default for ConnectRetry {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay_ms: 2000,
        }
    }
}

impl ConnectRetry {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Encoder and policy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Per-call timeout for encoder and policy in milliseconds
    pub timeout_ms: u64,
    /// Context vocabulary size of the local encoder
    pub context_vocab: i64,
    /// Behavior vocabulary size of the local encoder
    pub behavior_vocab: i64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 2000,
            context_vocab: CONTEXT_VOCAB,
            behavior_vocab: BEHAVIOR_VOCAB,
        }
    }
}

impl ModelSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Trend session memory settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    /// Drop a student's previous profile after this many idle seconds;
    /// kept for the life of the process when unset
    pub ttl_secs: Option<u64>,
}

impl MemorySettings {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}
