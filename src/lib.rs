//! Farebox Backend Library
//!
//! This module exposes the backend components for use by tests and other
//! consumers. The core is the seat reservation and payment consistency
//! engine: row-locked Postgres transactions as the source of truth, a TTL'd
//! Redis mirror of in-flight holds, and a deferred revert task per hold.

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod policy;
pub mod scheduler;
pub mod services;
pub mod store;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult, ConflictReason};

use cache::HoldCache;
use database::Database;
use scheduler::TokioScheduler;
use services::{ExpiryWorker, ReservationService, SearchIndexClient};
use std::sync::Arc;
use store::{PostgresSeatStore, SeatStore};

/// Application state containing the store, collaborators and services
pub struct AppState {
    pub database: Database,
    pub store: Arc<PostgresSeatStore>,
    pub hold_cache: Arc<dyn HoldCache>,
    pub scheduler: Arc<TokioScheduler>,
    pub reservations: Arc<ReservationService>,
}

impl AppState {
    /// Create a new AppState with initialized services. All collaborators
    /// are injected here; nothing in the engine reaches for globals.
    pub fn new(
        pool: sqlx::PgPool,
        hold_cache: Arc<dyn HoldCache>,
        search_index: Option<Arc<SearchIndexClient>>,
        config: &AppConfig,
    ) -> Self {
        let database = Database::new(pool.clone());
        let store = Arc::new(PostgresSeatStore::new(pool));

        let worker = Arc::new(ExpiryWorker::new(
            store.clone() as Arc<dyn SeatStore>,
            config.reservation.clone(),
            search_index.clone(),
        ));
        let scheduler = Arc::new(TokioScheduler::new(worker));

        let reservations = Arc::new(ReservationService::new(
            store.clone() as Arc<dyn SeatStore>,
            hold_cache.clone(),
            scheduler.clone(),
            search_index,
            config.reservation.clone(),
        ));

        Self {
            database,
            store,
            hold_cache,
            scheduler,
            reservations,
        }
    }
}
