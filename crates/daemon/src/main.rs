//! Judge coordinator daemon: HTTP surface plus the autoscaler loop.

mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use judge_api_http::{build_router, AppState};
use judge_core::application::{
    shutdown_channel, Autoscaler, AutoscalerConfig, ClaimDispatcher, JobLifecycle,
};
use judge_core::port::event_bus::NullEventBus;
use judge_core::port::time_provider::SystemTimeProvider;
use judge_core::port::token_provider::RandomTokenProvider;
use judge_core::port::{
    ApiKeyStore, CallbackPoster, EventBus, JobStore, ProblemStore, SubmissionStore, TimeProvider,
    TokenProvider,
};
use judge_infra_net::{DigitalOceanCloud, HttpCallbackPoster, RedisEventBus};
use judge_infra_sqlite::{
    create_pool, run_migrations, SqliteApiKeyStore, SqliteJobStore, SqliteProblemStore,
    SqliteSubmissionStore,
};

use config::JudgeConfig;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging: pretty for development, JSON when requested
    let log_format = std::env::var("JUDGE_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("judge=info,tower_http=info"))
        .context("Failed to create env filter")?;

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    info!("Judge coordinator v{} starting", VERSION);

    // Configuration
    let app_root = std::env::current_dir()?;
    let testing = std::env::var("JUDGE_TESTING").ok().as_deref() == Some("1");
    let config = JudgeConfig::load(&app_root, testing)?;
    tracing::debug!(
        secret_key_bytes = config.secret_key.len(),
        "Secret key loaded"
    );

    // Database
    info!(database_uri = %config.database_uri, "Initializing database");
    let pool = create_pool(&config.database_uri, &config.pool)
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // Dependency wiring
    let clock: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let tokens: Arc<dyn TokenProvider> = Arc::new(RandomTokenProvider);
    let jobs: Arc<dyn JobStore> = Arc::new(SqliteJobStore::new(pool.clone()));
    let submissions: Arc<dyn SubmissionStore> = Arc::new(SqliteSubmissionStore::new(pool.clone()));
    let problems: Arc<dyn ProblemStore> = Arc::new(SqliteProblemStore::new(pool.clone()));
    let api_keys: Arc<dyn ApiKeyStore> = Arc::new(SqliteApiKeyStore::new(pool.clone()));

    let events: Arc<dyn EventBus> = if config.enable_events && !config.redis_uri.is_empty() {
        info!(redis_uri = %config.redis_uri, "Connecting event fan-out");
        Arc::new(
            RedisEventBus::connect(&config.redis_uri)
                .await
                .map_err(|e| anyhow::anyhow!("Redis connect failed: {}", e))?,
        )
    } else {
        info!("Event fan-out disabled");
        Arc::new(NullEventBus)
    };

    let callbacks: Arc<dyn CallbackPoster> = Arc::new(
        HttpCallbackPoster::new().map_err(|e| anyhow::anyhow!("HTTP client failed: {}", e))?,
    );

    let lifecycle = Arc::new(JobLifecycle::new(
        jobs.clone(),
        submissions.clone(),
        problems.clone(),
        events.clone(),
        callbacks,
        clock.clone(),
    ));
    let dispatcher = Arc::new(ClaimDispatcher::new(
        jobs.clone(),
        submissions.clone(),
        events.clone(),
        tokens.clone(),
        clock.clone(),
    ));

    // Autoscaler (needs a cloud credential; without one the fleet is yours
    // to manage by hand)
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let autoscaler_handle = match &config.digitalocean_api_token {
        Some(token) => {
            info!("Starting autoscaler");
            let cloud = Arc::new(DigitalOceanCloud::new(token.clone()));
            let autoscaler = Autoscaler::new(
                jobs.clone(),
                api_keys.clone(),
                cloud,
                tokens.clone(),
                clock.clone(),
                AutoscalerConfig::new(config.judge_url.clone()),
            );
            Some(tokio::spawn(autoscaler.run(shutdown_rx)))
        }
        None => {
            warn!("DIGITALOCEAN_API_TOKEN not set; autoscaler disabled");
            None
        }
    };

    // HTTP server
    let state = AppState {
        lifecycle,
        dispatcher,
        problems,
        api_keys,
        tokens,
        clock,
    };
    let app = build_router(state);

    info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    // Graceful shutdown
    shutdown_tx.shutdown();
    if let Some(handle) = autoscaler_handle {
        let _ = tokio::time::timeout(std::time::Duration::from_secs(5), handle).await;
    }

    info!("Shutdown complete");
    Ok(())
}
