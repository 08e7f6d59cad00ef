//! Reference data handlers: materials, units, projects and categories

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{Material, MaterialUnit, NewMaterial, NewReference, ReferenceKind};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentActor;
use crate::services::ReferenceRecord;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BindUnitRequest {
    pub conversion_factor: Decimal,
}

// ============================================================================
// Materials
// ============================================================================

pub async fn create_material(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(input): Json<NewMaterial>,
) -> AppResult<(StatusCode, Json<Material>)> {
    let material = state.references().create_material(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(material)))
}

pub async fn list_materials(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> AppResult<Json<Vec<Material>>> {
    let materials = state.references().list_materials(&actor).await?;
    Ok(Json(materials))
}

pub async fn deactivate_material(
    state: State<AppState>,
    actor: CurrentActor,
    path: Path<Uuid>,
) -> AppResult<StatusCode> {
    deactivate(state, actor, path, ReferenceKind::Material).await
}

pub async fn list_material_units(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(material_id): Path<Uuid>,
) -> AppResult<Json<Vec<MaterialUnit>>> {
    let units = state
        .references()
        .list_material_units(&actor, material_id)
        .await?;
    Ok(Json(units))
}

/// Create or replace the alternate unit binding for a material
pub async fn bind_material_unit(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((material_id, unit_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<BindUnitRequest>,
) -> AppResult<Json<MaterialUnit>> {
    let binding = state
        .references()
        .bind_material_unit(&actor, material_id, unit_id, input.conversion_factor)
        .await?;
    Ok(Json(binding))
}

// ============================================================================
// Units, projects and categories
// ============================================================================

async fn create(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(input): Json<NewReference>,
    kind: ReferenceKind,
) -> AppResult<(StatusCode, Json<ReferenceRecord>)> {
    let record = state
        .references()
        .create_reference(&actor, kind, input)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn list(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    kind: ReferenceKind,
) -> AppResult<Json<Vec<ReferenceRecord>>> {
    let records = state.references().list_references(&actor, kind).await?;
    Ok(Json(records))
}

async fn deactivate(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    kind: ReferenceKind,
) -> AppResult<StatusCode> {
    state.references().deactivate(&actor, kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_unit(
    state: State<AppState>,
    actor: CurrentActor,
    input: Json<NewReference>,
) -> AppResult<(StatusCode, Json<ReferenceRecord>)> {
    create(state, actor, input, ReferenceKind::Unit).await
}

pub async fn list_units(
    state: State<AppState>,
    actor: CurrentActor,
) -> AppResult<Json<Vec<ReferenceRecord>>> {
    list(state, actor, ReferenceKind::Unit).await
}

pub async fn deactivate_unit(
    state: State<AppState>,
    actor: CurrentActor,
    path: Path<Uuid>,
) -> AppResult<StatusCode> {
    deactivate(state, actor, path, ReferenceKind::Unit).await
}

pub async fn create_project(
    state: State<AppState>,
    actor: CurrentActor,
    input: Json<NewReference>,
) -> AppResult<(StatusCode, Json<ReferenceRecord>)> {
    create(state, actor, input, ReferenceKind::Project).await
}

pub async fn list_projects(
    state: State<AppState>,
    actor: CurrentActor,
) -> AppResult<Json<Vec<ReferenceRecord>>> {
    list(state, actor, ReferenceKind::Project).await
}

pub async fn deactivate_project(
    state: State<AppState>,
    actor: CurrentActor,
    path: Path<Uuid>,
) -> AppResult<StatusCode> {
    deactivate(state, actor, path, ReferenceKind::Project).await
}

pub async fn create_category(
    state: State<AppState>,
    actor: CurrentActor,
    input: Json<NewReference>,
) -> AppResult<(StatusCode, Json<ReferenceRecord>)> {
    create(state, actor, input, ReferenceKind::Category).await
}

pub async fn list_categories(
    state: State<AppState>,
    actor: CurrentActor,
) -> AppResult<Json<Vec<ReferenceRecord>>> {
    list(state, actor, ReferenceKind::Category).await
}

pub async fn deactivate_category(
    state: State<AppState>,
    actor: CurrentActor,
    path: Path<Uuid>,
) -> AppResult<StatusCode> {
    deactivate(state, actor, path, ReferenceKind::Category).await
}
