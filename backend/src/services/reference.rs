//! Reference data guards: unique names and safe deactivation

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    validate_min_stock_level, validate_required_text, Actor, Material, MaterialUnit,
    NamedEntity, NewMaterial, NewReference, ReferenceKind, Unit,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::{Deactivation, DynEventStore};

/// A created or listed unit, project or category
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReferenceRecord {
    Unit(Unit),
    Named(NamedEntity),
}

/// Creates and retires the entities the ledger groups by
#[derive(Clone)]
pub struct ReferenceService {
    store: DynEventStore,
}

impl ReferenceService {
    pub fn new(store: DynEventStore) -> Self {
        Self { store }
    }

    async fn ensure_name_free(&self, kind: ReferenceKind, name: &str) -> AppResult<()> {
        if self.store.name_taken(kind, name).await? {
            tracing::warn!(entity = %kind, name, "duplicate name rejected");
            return Err(AppError::DuplicateName {
                entity: kind,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Register a material under an active category
    #[tracing::instrument(skip(self, actor, input), fields(actor = %actor.user_id))]
    pub async fn create_material(&self, actor: &Actor, input: NewMaterial) -> AppResult<Material> {
        validate_required_text(&input.name).map_err(|msg| AppError::validation("name", msg))?;
        let min_stock_level = input.min_stock_level.unwrap_or(Decimal::ZERO);
        validate_min_stock_level(min_stock_level)
            .map_err(|msg| AppError::validation("min_stock_level", msg))?;

        let category = self
            .store
            .named(ReferenceKind::Category, input.category_id)
            .await?
            .filter(|c| c.is_active)
            .ok_or_else(|| AppError::not_found(ReferenceKind::Category))?;

        let name = input.name.trim().to_string();
        self.ensure_name_free(ReferenceKind::Material, &name).await?;

        let material = Material {
            id: Uuid::new_v4(),
            name,
            category_id: category.id,
            min_stock_level,
            is_active: true,
            created_at: Utc::now(),
        };
        self.store.insert_material(&material).await?;

        tracing::info!(material_id = %material.id, name = %material.name, "material created");
        Ok(material)
    }

    /// Register a unit, project or category
    #[tracing::instrument(skip(self, actor, input), fields(actor = %actor.user_id))]
    pub async fn create_reference(
        &self,
        actor: &Actor,
        kind: ReferenceKind,
        input: NewReference,
    ) -> AppResult<ReferenceRecord> {
        validate_required_text(&input.name).map_err(|msg| AppError::validation("name", msg))?;
        let name = input.name.trim().to_string();

        let record = match kind {
            ReferenceKind::Material => {
                return Err(AppError::validation(
                    "kind",
                    "Materials are created with a category and minimum stock level",
                ));
            }
            ReferenceKind::Unit => {
                let abbreviation = input
                    .abbreviation
                    .as_deref()
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .ok_or_else(|| AppError::validation("abbreviation", "Value is required"))?
                    .to_string();
                self.ensure_name_free(kind, &name).await?;
                let unit = Unit {
                    id: Uuid::new_v4(),
                    name,
                    abbreviation,
                    is_active: true,
                };
                self.store.insert_unit(&unit).await?;
                ReferenceRecord::Unit(unit)
            }
            ReferenceKind::Project | ReferenceKind::Category => {
                self.ensure_name_free(kind, &name).await?;
                let entity = NamedEntity {
                    id: Uuid::new_v4(),
                    name,
                    is_active: true,
                };
                self.store.insert_named(kind, &entity).await?;
                ReferenceRecord::Named(entity)
            }
        };

        tracing::info!(entity = %kind, "reference created");
        Ok(record)
    }

    /// List materials, including deactivated ones
    pub async fn list_materials(&self, _actor: &Actor) -> AppResult<Vec<Material>> {
        self.store.list_materials().await
    }

    pub async fn list_references(
        &self,
        _actor: &Actor,
        kind: ReferenceKind,
    ) -> AppResult<Vec<ReferenceRecord>> {
        let records = match kind {
            ReferenceKind::Material => {
                return Err(AppError::validation("kind", "Use the material listing"));
            }
            ReferenceKind::Unit => self
                .store
                .list_units()
                .await?
                .into_iter()
                .map(ReferenceRecord::Unit)
                .collect(),
            ReferenceKind::Project | ReferenceKind::Category => self
                .store
                .list_named(kind)
                .await?
                .into_iter()
                .map(ReferenceRecord::Named)
                .collect(),
        };
        Ok(records)
    }

    /// Bind an alternate unit to a material. The factor is stored, never applied.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn bind_material_unit(
        &self,
        actor: &Actor,
        material_id: Uuid,
        unit_id: Uuid,
        conversion_factor: Decimal,
    ) -> AppResult<MaterialUnit> {
        if conversion_factor <= Decimal::ZERO {
            return Err(AppError::validation(
                "conversion_factor",
                "Conversion factor must be positive",
            ));
        }
        self.store
            .material(material_id)
            .await?
            .ok_or_else(|| AppError::not_found(ReferenceKind::Material))?;
        self.store
            .unit(unit_id)
            .await?
            .ok_or_else(|| AppError::not_found(ReferenceKind::Unit))?;

        let binding = MaterialUnit {
            material_id,
            unit_id,
            conversion_factor,
        };
        self.store.upsert_material_unit(&binding).await?;
        Ok(binding)
    }

    pub async fn list_material_units(
        &self,
        _actor: &Actor,
        material_id: Uuid,
    ) -> AppResult<Vec<MaterialUnit>> {
        self.store
            .material(material_id)
            .await?
            .ok_or_else(|| AppError::not_found(ReferenceKind::Material))?;
        self.store.material_units(material_id).await
    }

    /// Soft-delete an entity that nothing references any more
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn deactivate(&self, actor: &Actor, kind: ReferenceKind, id: Uuid) -> AppResult<()> {
        let name = self.entity_name(kind, id).await?;
        match self.store.deactivate(kind, id).await? {
            Deactivation::Deactivated => {
                tracing::info!(entity = %kind, %id, "reference deactivated");
                Ok(())
            }
            Deactivation::Blocked(dependents) => {
                tracing::warn!(entity = %kind, %id, blockers = %dependents.describe(), "deactivation blocked");
                Err(AppError::ReferentialIntegrity {
                    entity: kind,
                    name,
                    dependents,
                })
            }
            Deactivation::Missing => Err(AppError::not_found(kind)),
        }
    }

    async fn entity_name(&self, kind: ReferenceKind, id: Uuid) -> AppResult<String> {
        let name = match kind {
            ReferenceKind::Material => self.store.material(id).await?.map(|m| m.name),
            ReferenceKind::Unit => self.store.unit(id).await?.map(|u| u.name),
            ReferenceKind::Project | ReferenceKind::Category => {
                self.store.named(kind, id).await?.map(|e| e.name)
            }
        };
        name.ok_or_else(|| AppError::not_found(kind))
    }
}
