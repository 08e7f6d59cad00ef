//! Shared fixtures for the ledger integration tests

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    Actor, InflowEvent, Material, NamedEntity, NewInflow, NewMaterial, NewOutflow, NewReference,
    OutflowEvent, ReferenceKind, Unit,
};
use stockledger_backend::{
    config::{LedgerConfig, StoreBackend},
    error::AppResult,
    services::{LedgerService, ReferenceRecord, ReferenceService},
    store::{DynEventStore, InMemoryEventStore},
};
use uuid::Uuid;

// Helper to create Decimal from string
pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

pub fn ledger_config() -> LedgerConfig {
    LedgerConfig {
        store: StoreBackend::Memory,
        ..LedgerConfig::default()
    }
}

pub fn actor() -> Actor {
    Actor {
        user_id: Uuid::new_v4(),
        name: "Warehouse Clerk".to_string(),
    }
}

/// An in-memory ledger seeded with one category, project and unit
pub struct Fixture {
    pub store: DynEventStore,
    pub ledger: LedgerService,
    pub references: ReferenceService,
    pub actor: Actor,
    pub category: NamedEntity,
    pub project: NamedEntity,
    pub unit: Unit,
}

impl Fixture {
    pub async fn new() -> Self {
        let store: DynEventStore = Arc::new(InMemoryEventStore::default());
        let references = ReferenceService::new(store.clone());
        let actor = actor();

        let category = named(
            references
                .create_reference(&actor, ReferenceKind::Category, reference("Building"))
                .await
                .unwrap(),
        );
        let project = named(
            references
                .create_reference(&actor, ReferenceKind::Project, reference("North Wing"))
                .await
                .unwrap(),
        );
        let unit = match references
            .create_reference(
                &actor,
                ReferenceKind::Unit,
                NewReference {
                    name: "Kilogram".to_string(),
                    abbreviation: Some("kg".to_string()),
                },
            )
            .await
            .unwrap()
        {
            ReferenceRecord::Unit(unit) => unit,
            other => panic!("expected unit, got {:?}", other),
        };

        Self {
            ledger: LedgerService::new(store.clone(), ledger_config()),
            store,
            references,
            actor,
            category,
            project,
            unit,
        }
    }

    pub async fn material(&self, name: &str, min_stock_level: &str) -> Material {
        self.references
            .create_material(
                &self.actor,
                NewMaterial {
                    name: name.to_string(),
                    category_id: self.category.id,
                    min_stock_level: Some(dec(min_stock_level)),
                },
            )
            .await
            .unwrap()
    }

    pub async fn project(&self, name: &str) -> NamedEntity {
        named(
            self.references
                .create_reference(&self.actor, ReferenceKind::Project, reference(name))
                .await
                .unwrap(),
        )
    }

    pub fn new_inflow(&self, material_id: Uuid, quantity: &str) -> NewInflow {
        NewInflow {
            material_id,
            unit_id: self.unit.id,
            project_id: self.project.id,
            quantity: dec(quantity),
            unit_price: None,
            delivery_date: Utc::now(),
            received_by: "Somchai".to_string(),
            supplier_name: "Acme Supply".to_string(),
            purpose: String::new(),
            batch_number: None,
            expiry_date: None,
        }
    }

    pub fn new_outflow(&self, material_id: Uuid, quantity: &str) -> NewOutflow {
        NewOutflow {
            material_id,
            unit_id: self.unit.id,
            project_id: self.project.id,
            quantity: dec(quantity),
            unit_price: None,
            release_date: Utc::now(),
            authorized_by: "Site Manager".to_string(),
            received_by: "Crew Lead".to_string(),
            purpose: String::new(),
            return_date: None,
        }
    }

    pub async fn receive(&self, material_id: Uuid, quantity: &str) -> InflowEvent {
        self.ledger
            .record_inflow(&self.actor, self.new_inflow(material_id, quantity))
            .await
            .unwrap()
    }

    pub async fn release(&self, material_id: Uuid, quantity: &str) -> AppResult<OutflowEvent> {
        self.ledger
            .record_outflow(&self.actor, self.new_outflow(material_id, quantity))
            .await
    }
}

pub fn reference(name: &str) -> NewReference {
    NewReference {
        name: name.to_string(),
        abbreviation: None,
    }
}

pub fn named(record: ReferenceRecord) -> NamedEntity {
    match record {
        ReferenceRecord::Named(entity) => entity,
        other => panic!("expected named entity, got {:?}", other),
    }
}
