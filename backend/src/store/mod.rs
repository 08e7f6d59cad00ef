//! Durable storage of inflow and outflow records and the reference data they point at
//!
//! Stores perform no business validation. Writes that move stock go through a
//! [`MaterialTx`], which holds an exclusive per-material lock from the moment it
//! is opened until it is committed or dropped. Everything read through the
//! transaction is therefore stable with respect to other writers of the same
//! material, while reads and writes for other materials proceed unblocked.

mod memory;
mod postgres;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    Dependents, EventFilter, InflowEvent, Material, MaterialUnit, NamedEntity, OutflowEvent,
    ReferenceKind, StockTotals, Unit,
};
use uuid::Uuid;

use crate::error::AppResult;

pub use memory::InMemoryEventStore;
pub use postgres::PgEventStore;

/// Events and stock totals read from one consistent snapshot
#[derive(Debug, Clone, Default)]
pub struct LedgerView {
    pub inflows: Vec<InflowEvent>,
    pub outflows: Vec<OutflowEvent>,
    /// Full-history totals per material, across all units
    pub stock: HashMap<Uuid, StockTotals>,
}

/// Outcome of an atomic deactivation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deactivation {
    Deactivated,
    /// Left active because records still point at it
    Blocked(Dependents),
    Missing,
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Check that the backing storage is reachable
    async fn ping(&self) -> AppResult<()>;

    // Reference data

    async fn material(&self, id: Uuid) -> AppResult<Option<Material>>;

    /// All materials, active or not, ordered by name
    async fn list_materials(&self) -> AppResult<Vec<Material>>;

    async fn unit(&self, id: Uuid) -> AppResult<Option<Unit>>;

    async fn list_units(&self) -> AppResult<Vec<Unit>>;

    /// Projects and categories
    async fn named(&self, kind: ReferenceKind, id: Uuid) -> AppResult<Option<NamedEntity>>;

    async fn list_named(&self, kind: ReferenceKind) -> AppResult<Vec<NamedEntity>>;

    async fn material_units(&self, material_id: Uuid) -> AppResult<Vec<MaterialUnit>>;

    /// Fails with `NotFound` when the category is missing or inactive at insert time
    async fn insert_material(&self, material: &Material) -> AppResult<()>;

    async fn insert_unit(&self, unit: &Unit) -> AppResult<()>;

    async fn insert_named(&self, kind: ReferenceKind, entity: &NamedEntity) -> AppResult<()>;

    async fn upsert_material_unit(&self, binding: &MaterialUnit) -> AppResult<()>;

    /// Whether an entity of `kind` already uses `name` (trimmed, case-insensitive)
    async fn name_taken(&self, kind: ReferenceKind, name: &str) -> AppResult<bool>;

    /// Count dependents and flip `is_active` off as one step.
    ///
    /// Holds the entity's row lock (the material lock for materials) for the
    /// duration, so no event can start pointing at it between the count and
    /// the update.
    async fn deactivate(&self, kind: ReferenceKind, id: Uuid) -> AppResult<Deactivation>;

    // Events

    async fn inflow(&self, id: Uuid) -> AppResult<Option<InflowEvent>>;

    async fn outflow(&self, id: Uuid) -> AppResult<Option<OutflowEvent>>;

    /// Inflows matching the filter, newest delivery date first
    async fn list_inflows(&self, filter: &EventFilter) -> AppResult<Vec<InflowEvent>>;

    /// Outflows matching the filter, newest release date first
    async fn list_outflows(&self, filter: &EventFilter) -> AppResult<Vec<OutflowEvent>>;

    /// Most recently created inflows
    async fn recent_inflows(&self, limit: usize) -> AppResult<Vec<InflowEvent>>;

    /// Most recently created outflows
    async fn recent_outflows(&self, limit: usize) -> AppResult<Vec<OutflowEvent>>;

    /// Totals for one material, optionally restricted to one unit ledger
    async fn stock_totals(&self, material_id: Uuid, unit_id: Option<Uuid>)
        -> AppResult<StockTotals>;

    /// Totals for every material with at least one event, in a single grouped pass
    async fn all_stock_totals(&self) -> AppResult<HashMap<Uuid, StockTotals>>;

    /// Filtered events plus full-history totals, all from one snapshot
    async fn read_ledger(&self, filter: &EventFilter) -> AppResult<LedgerView>;

    /// Open a write transaction holding the material's lock.
    ///
    /// Fails with `NotFound` when the material does not exist.
    async fn begin_material(&self, material_id: Uuid) -> AppResult<Box<dyn MaterialTx>>;
}

/// Unit of work scoped to one locked material
#[async_trait]
pub trait MaterialTx: Send {
    /// The locked material row
    fn material(&self) -> &Material;

    /// Pin a unit or project for the rest of the transaction.
    ///
    /// Returns false when it is missing or inactive. A pinned entity cannot be
    /// deactivated until the transaction ends.
    async fn hold_reference(&mut self, kind: ReferenceKind, id: Uuid) -> AppResult<bool>;

    /// Committed totals for the locked material
    async fn stock_totals(&mut self, unit_id: Option<Uuid>) -> AppResult<StockTotals>;

    async fn inflow(&mut self, id: Uuid) -> AppResult<Option<InflowEvent>>;

    async fn outflow(&mut self, id: Uuid) -> AppResult<Option<OutflowEvent>>;

    async fn insert_inflow(&mut self, event: &InflowEvent) -> AppResult<()>;

    async fn insert_outflow(&mut self, event: &OutflowEvent) -> AppResult<()>;

    async fn update_inflow(&mut self, event: &InflowEvent) -> AppResult<()>;

    async fn update_outflow(&mut self, event: &OutflowEvent) -> AppResult<()>;

    async fn delete_inflow(&mut self, id: Uuid) -> AppResult<bool>;

    async fn delete_outflow(&mut self, id: Uuid) -> AppResult<bool>;

    /// Make the staged writes visible and release the lock
    async fn commit(self: Box<Self>) -> AppResult<()>;
}

/// Shared handle to a store
pub type DynEventStore = Arc<dyn EventStore>;
