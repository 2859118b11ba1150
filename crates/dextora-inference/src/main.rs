//! DEXTORA Inference Service Binary

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use prometheus::Registry;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dextora_common::VERSION;
use dextora_inference::{
    api::{self, AppState},
    config::InferenceConfig,
    infra::redis::RedisPool,
    session::SweepReport,
    HashingEncoder, InMemoryProfileStore, InMemoryVectorBackend, InferenceMetrics, LiveVectorBackend,
    PriorityPolicy, ProfileStore, RedisProfileStore, RedisVectorBackend, SessionMemory, SessionOrchestrator,
    VectorCache,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("Starting DEXTORA Inference Service v{}", VERSION);

    let config = InferenceConfig::load()?;
    info!("Loaded configuration: {:?}", config);

    // Durable store
    let store: Arc<dyn ProfileStore> = match &config.store.redis_url {
        Some(url) => {
            let retry = &config.store.connect;
            let pool = RedisPool::connect_with_retry(url, retry.attempts, retry.delay()).await?;
            info!("Durable profile store: redis ({})", config.store.key_prefix);
            Arc::new(RedisProfileStore::new(pool).with_prefix(&config.store.key_prefix))
        }
        None => {
            warn!("No durable store configured, profiles live only for this process");
            Arc::new(InMemoryProfileStore::new())
        }
    };

    // Live vector cache
    let backend: Arc<dyn LiveVectorBackend> = match &config.cache.redis_url {
        Some(url) => {
            let retry = &config.cache.connect;
            let pool = RedisPool::connect_with_retry(url, retry.attempts, retry.delay()).await?;
            info!("Live vector cache: redis ({})", config.cache.key_prefix);
            Arc::new(RedisVectorBackend::new(pool).with_prefix(&config.cache.key_prefix))
        }
        None => {
            info!("Live vector cache: in-process");
            Arc::new(InMemoryVectorBackend::new())
        }
    };
    let cache = VectorCache::new(backend, store).with_ttl(config.cache.ttl());

    // Models
    let encoder = HashingEncoder::new().with_vocab(config.models.context_vocab, config.models.behavior_vocab);
    info!(
        "Models: hashing encoder (vocab {}/{}), priority policy, timeout {}ms",
        config.models.context_vocab, config.models.behavior_vocab, config.models.timeout_ms
    );

    // Metrics
    let registry = Arc::new(Registry::new());
    let metrics = InferenceMetrics::new()?;
    metrics.register(&registry)?;

    let orchestrator = Arc::new(
        SessionOrchestrator::new(
            Arc::new(cache),
            Arc::new(encoder),
            Arc::new(PriorityPolicy),
            Arc::new(SessionMemory::with_ttl(config.memory.ttl())),
            metrics,
        )
        .with_model_timeout(config.models.timeout()),
    );

    // Background sweeper
    let sweeper = {
        let orchestrator = orchestrator.clone();
        let every = config.cache.sweep_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let report = orchestrator.sweep().await;
                if report != SweepReport::default() {
                    debug!(
                        vectors = report.vectors,
                        profiles = report.profiles,
                        locks = report.locks,
                        "Swept expired entries"
                    );
                }
            }
        })
    };

    let app = api::router(AppState::new(orchestrator, registry));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("DEXTORA listening on {}", addr);
    info!("Endpoints: /health, /metrics, /ws/:student_id");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("Shutting down DEXTORA Inference Service");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("DEXTORA_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
