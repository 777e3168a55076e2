//! Farebox Backend Service
//!
//! Main entry point for the Farebox seat reservation backend. This service
//! provides:
//! - The reservation state machine (holds, settlement, cancellation)
//! - Deferred expiry reverts for abandoned holds
//! - Best-effort capacity pushes to the search index

use farebox_backend::cache::{HoldCache, InMemoryHoldCache, RedisHoldCache};
use farebox_backend::config::AppConfig;
use farebox_backend::database::{create_pool, run_migrations};
use farebox_backend::error::{AppError, AppResult};
use farebox_backend::services::SearchIndexClient;
use farebox_backend::AppState;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        AppError::Config(e)
    })?;

    // Initialize tracing/logging with config
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("farebox_backend={},sqlx=warn", config.log_level).into()
            }),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║           Farebox Backend Service Starting               ║");
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!("Hold grace period: {} minutes", config.reservation.grace_minutes);

    // =========================================================================
    // DATABASE SETUP
    // =========================================================================
    info!("Connecting to database...");

    let pool = create_pool(&config.database).await.map_err(|e| {
        error!("Failed to create database pool: {}", e);
        AppError::Database(e)
    })?;

    info!("Database connection pool created successfully");
    info!("Max connections: {}", config.database.max_connections);

    // Run migrations
    info!("Running database migrations...");
    run_migrations(&pool, None).await.map_err(|e| {
        error!("Database migration failed: {}", e);
        AppError::Database(e)
    })?;

    info!("Database migrations completed successfully");

    // =========================================================================
    // COLLABORATORS
    // =========================================================================

    // Hold cache. Redis is the normal deployment; without it, payments would
    // reject every hold, so a single-process run falls back to the
    // process-local cache.
    let hold_cache: Arc<dyn HoldCache> = match RedisHoldCache::connect(&config.redis.url).await {
        Ok(cache) => {
            info!("✓ Hold cache connected: {}", config.redis.url);
            Arc::new(cache)
        }
        Err(e) => {
            warn!(
                "Could not connect to Redis ({}); falling back to the process-local hold cache",
                e
            );
            Arc::new(InMemoryHoldCache::new())
        }
    };

    // Search index collaborator (optional, best-effort)
    let search_index = SearchIndexClient::from_config(&config.search);
    match &search_index {
        Some(_) => info!("✓ Search index updates enabled"),
        None => info!("Search index updates disabled (SEARCH_INDEX_URL not set)"),
    }

    // =========================================================================
    // CORE SERVICES INITIALIZATION
    // =========================================================================
    info!("Initializing core services...");

    let app_state = Arc::new(AppState::new(pool, hold_cache, search_index, &config));
    info!("✓ Application state initialized");

    // Re-arm expiry checks for holds created before this process started.
    match app_state.reservations.rearm_pending_holds().await {
        Ok(count) => info!("✓ Expiry sweep armed {} pending hold(s)", count),
        Err(e) => warn!("Startup expiry sweep failed: {}", e),
    }

    // =========================================================================
    // READY
    // =========================================================================
    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║           Farebox Backend Service Ready!                 ║");
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Press Ctrl+C to shutdown gracefully");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| AppError::Message(format!("Failed to listen for shutdown signal: {}", e)))?;

    info!("Shutdown signal received, shutting down gracefully...");
    info!("Farebox backend service shutdown complete");
    Ok(())
}
