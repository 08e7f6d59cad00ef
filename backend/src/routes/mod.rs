//! Route definitions for the stock ledger API

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes. Everything except the health check requires a bearer token.
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .nest("/inflows", inflow_routes())
        .nest("/outflows", outflow_routes())
        .route(
            "/returns/outstanding",
            get(handlers::list_outstanding_returns),
        )
        .nest("/stock", stock_routes())
        .route("/alerts/low-stock", get(handlers::low_stock_alerts))
        .route("/reports", get(handlers::get_report))
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/activity", get(handlers::get_activity_feed))
        .nest("/materials", material_routes())
        .nest("/units", unit_routes())
        .nest("/projects", project_routes())
        .nest("/categories", category_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        .merge(protected)
}

/// Inflow routes (protected)
fn inflow_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_inflows).post(handlers::record_inflow),
        )
        .route(
            "/:id",
            get(handlers::get_inflow)
                .patch(handlers::update_inflow)
                .delete(handlers::delete_inflow),
        )
}

/// Outflow routes (protected)
fn outflow_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_outflows).post(handlers::record_outflow),
        )
        .route(
            "/:id",
            get(handlers::get_outflow)
                .patch(handlers::update_outflow)
                .delete(handlers::delete_outflow),
        )
        .route("/:id/return", post(handlers::mark_returned))
}

/// Stock level routes (protected)
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stock))
        .route("/:material_id", get(handlers::get_material_stock))
}

/// Material routes (protected)
fn material_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_materials).post(handlers::create_material),
        )
        .route("/:id", delete(handlers::deactivate_material))
        .route("/:id/units", get(handlers::list_material_units))
        .route("/:id/units/:unit_id", put(handlers::bind_material_unit))
}

fn unit_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_units).post(handlers::create_unit))
        .route("/:id", delete(handlers::deactivate_unit))
}

fn project_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_projects).post(handlers::create_project),
        )
        .route("/:id", delete(handlers::deactivate_project))
}

fn category_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route("/:id", delete(handlers::deactivate_category))
}
