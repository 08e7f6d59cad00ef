//! Reference data lookups used to label ledger output

use std::collections::HashMap;

use shared::{Material, NamedEntity, ReferenceKind, Unit};
use uuid::Uuid;

use crate::error::AppResult;
use crate::store::EventStore;

const UNKNOWN: &str = "Unknown";

/// Materials, units, projects and categories keyed by id
#[derive(Debug, Clone, Default)]
pub struct ReferenceDirectory {
    pub materials: HashMap<Uuid, Material>,
    pub units: HashMap<Uuid, Unit>,
    pub projects: HashMap<Uuid, NamedEntity>,
    pub categories: HashMap<Uuid, NamedEntity>,
}

impl ReferenceDirectory {
    pub async fn load(store: &dyn EventStore) -> AppResult<Self> {
        let by_id = |entities: Vec<NamedEntity>| {
            entities
                .into_iter()
                .map(|e| (e.id, e))
                .collect::<HashMap<_, _>>()
        };

        Ok(Self {
            materials: store
                .list_materials()
                .await?
                .into_iter()
                .map(|m| (m.id, m))
                .collect(),
            units: store
                .list_units()
                .await?
                .into_iter()
                .map(|u| (u.id, u))
                .collect(),
            projects: by_id(store.list_named(ReferenceKind::Project).await?),
            categories: by_id(store.list_named(ReferenceKind::Category).await?),
        })
    }

    pub fn material_name(&self, id: Uuid) -> String {
        self.materials
            .get(&id)
            .map_or_else(|| UNKNOWN.to_string(), |m| m.name.clone())
    }

    pub fn unit_abbreviation(&self, id: Uuid) -> String {
        self.units
            .get(&id)
            .map_or_else(String::new, |u| u.abbreviation.clone())
    }

    pub fn project_name(&self, id: Uuid) -> String {
        self.projects
            .get(&id)
            .map_or_else(|| UNKNOWN.to_string(), |p| p.name.clone())
    }

    pub fn category_name(&self, id: Uuid) -> String {
        self.categories
            .get(&id)
            .map_or_else(|| UNKNOWN.to_string(), |c| c.name.clone())
    }
}
