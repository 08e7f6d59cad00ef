//! Warehouse stock ledger backend
//!
//! Append-only inflow/outflow ledger per (material, unit) pair with stock
//! classification, reporting and a bearer-token protected HTTP API.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod store;

pub use config::Config;

use services::{LedgerService, ReferenceService};
use store::DynEventStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: DynEventStore,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: DynEventStore, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn ledger(&self) -> LedgerService {
        LedgerService::new(self.store.clone(), self.config.ledger.clone())
    }

    pub fn references(&self) -> ReferenceService {
        ReferenceService::new(self.store.clone())
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Stock Ledger API v1"
}
