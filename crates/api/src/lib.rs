//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST routes for committing, reading and deleting transactions
//! - Account tag routes
//! - Health and version endpoints

pub mod routes;

use axum::Router;
use sea_orm::DatabaseConnection;
use tally_db::{DeletePolicy, TransactionRepository};
use tally_shared::config::LedgerConfig;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Commit coordinator, deletion path and entity registry.
    pub ledger: TransactionRepository,
}

impl AppState {
    /// Builds the state around an open ledger store.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: &LedgerConfig) -> Self {
        Self {
            ledger: TransactionRepository::new(db)
                .with_delete_policy(DeletePolicy::from_config(config)),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
