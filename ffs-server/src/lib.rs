//! ffs-server library - FindFavouriteSong tournament service
//!
//! Narrows a playlist down to one favourite through pairwise decisions. All
//! bracket state lives in SQLite; requests share nothing but the pool.

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod bracket;
pub mod db;
pub mod error;

pub use bracket::Bracket;
pub use error::{Error, Result};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    pub bracket: Bracket,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            bracket: Bracket::new(db.clone()),
            db,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::tournament_routes())
        .merge(api::statistics_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
