//! HTTP handlers for stock movements and stock levels

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::{
    DateRange, EventFilter, EventKind, EventPatch, InflowEvent, InflowPatch, LedgerEvent,
    NewInflow, NewOutflow, OutflowEvent, OutflowPatch, OutstandingReturn, StockSnapshot,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentActor;
use crate::services::SnapshotView;
use crate::AppState;

/// Query parameters for event listings
#[derive(Debug, Default, Deserialize)]
pub struct EventQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub material_id: Option<Uuid>,
    pub unit_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
}

impl From<EventQuery> for EventFilter {
    fn from(query: EventQuery) -> Self {
        EventFilter {
            range: DateRange::new(query.from, query.to),
            material_id: query.material_id,
            unit_id: query.unit_id,
            project_id: query.project_id,
        }
    }
}

/// Narrows a material's stock to one unit ledger
#[derive(Debug, Default, Deserialize)]
pub struct StockQuery {
    pub unit_id: Option<Uuid>,
}

// ============================================================================
// Inflows
// ============================================================================

/// Record an inflow
pub async fn record_inflow(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(input): Json<NewInflow>,
) -> AppResult<(StatusCode, Json<InflowEvent>)> {
    let event = state.ledger().record_inflow(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn list_inflows(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<EventQuery>,
) -> AppResult<Json<Vec<LedgerEvent>>> {
    let events = state
        .ledger()
        .list_events(&actor, EventKind::Inflow, query.into())
        .await?;
    Ok(Json(events))
}

pub async fn get_inflow(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<LedgerEvent>> {
    let event = state.ledger().get_event(&actor, EventKind::Inflow, id).await?;
    Ok(Json(event))
}

pub async fn update_inflow(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(patch): Json<InflowPatch>,
) -> AppResult<Json<LedgerEvent>> {
    let event = state
        .ledger()
        .update_event(&actor, id, EventPatch::Inflow(patch))
        .await?;
    Ok(Json(event))
}

pub async fn delete_inflow(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state
        .ledger()
        .delete_event(&actor, EventKind::Inflow, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Outflows
// ============================================================================

/// Record an outflow; 422 when stock is insufficient
pub async fn record_outflow(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(input): Json<NewOutflow>,
) -> AppResult<(StatusCode, Json<OutflowEvent>)> {
    let event = state.ledger().record_outflow(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn list_outflows(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<EventQuery>,
) -> AppResult<Json<Vec<LedgerEvent>>> {
    let events = state
        .ledger()
        .list_events(&actor, EventKind::Outflow, query.into())
        .await?;
    Ok(Json(events))
}

pub async fn get_outflow(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<LedgerEvent>> {
    let event = state
        .ledger()
        .get_event(&actor, EventKind::Outflow, id)
        .await?;
    Ok(Json(event))
}

pub async fn update_outflow(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(patch): Json<OutflowPatch>,
) -> AppResult<Json<LedgerEvent>> {
    let event = state
        .ledger()
        .update_event(&actor, id, EventPatch::Outflow(patch))
        .await?;
    Ok(Json(event))
}

pub async fn delete_outflow(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state
        .ledger()
        .delete_event(&actor, EventKind::Outflow, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Mark a borrowed outflow as returned
pub async fn mark_returned(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<OutflowEvent>> {
    let event = state.ledger().mark_returned(&actor, id).await?;
    Ok(Json(event))
}

pub async fn list_outstanding_returns(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> AppResult<Json<Vec<OutstandingReturn>>> {
    let returns = state.ledger().list_outstanding_returns(&actor).await?;
    Ok(Json(returns))
}

// ============================================================================
// Stock
// ============================================================================

/// Snapshots of every active material
pub async fn list_stock(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> AppResult<Json<SnapshotView>> {
    let view = state.ledger().get_stock_snapshot(&actor, None, None).await?;
    Ok(Json(view))
}

pub async fn get_material_stock(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(material_id): Path<Uuid>,
    Query(query): Query<StockQuery>,
) -> AppResult<Json<SnapshotView>> {
    let view = state
        .ledger()
        .get_stock_snapshot(&actor, Some(material_id), query.unit_id)
        .await?;
    Ok(Json(view))
}

pub async fn low_stock_alerts(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> AppResult<Json<Vec<StockSnapshot>>> {
    let alerts = state.ledger().get_low_stock_alerts(&actor).await?;
    Ok(Json(alerts))
}
