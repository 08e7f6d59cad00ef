//! In-memory event store
//!
//! Used by tests and by the `memory` store backend for local runs. Reference
//! data and events live behind one `RwLock`; stock-moving writes additionally
//! take a per-material async mutex and stage their changes until commit.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use shared::{
    names_collide, Dependents, EventFilter, InflowEvent, Material, MaterialUnit, NamedEntity,
    OutflowEvent, ReferenceKind, StockTotals, Unit,
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{Deactivation, EventStore, LedgerView, MaterialTx};
use crate::error::{AppError, AppResult};

#[derive(Debug, Default)]
struct State {
    materials: HashMap<Uuid, Material>,
    units: HashMap<Uuid, Unit>,
    projects: HashMap<Uuid, NamedEntity>,
    categories: HashMap<Uuid, NamedEntity>,
    material_units: HashMap<(Uuid, Uuid), MaterialUnit>,
    inflows: HashMap<Uuid, InflowEvent>,
    outflows: HashMap<Uuid, OutflowEvent>,
}

impl State {
    fn named(&self, kind: ReferenceKind) -> AppResult<&HashMap<Uuid, NamedEntity>> {
        match kind {
            ReferenceKind::Project => Ok(&self.projects),
            ReferenceKind::Category => Ok(&self.categories),
            ReferenceKind::Material | ReferenceKind::Unit => Err(not_named(kind)),
        }
    }

    fn named_mut(&mut self, kind: ReferenceKind) -> AppResult<&mut HashMap<Uuid, NamedEntity>> {
        match kind {
            ReferenceKind::Project => Ok(&mut self.projects),
            ReferenceKind::Category => Ok(&mut self.categories),
            ReferenceKind::Material | ReferenceKind::Unit => Err(not_named(kind)),
        }
    }

    fn name_taken(&self, kind: ReferenceKind, name: &str) -> bool {
        match kind {
            ReferenceKind::Material => self.materials.values().any(|m| names_collide(&m.name, name)),
            ReferenceKind::Unit => self.units.values().any(|u| names_collide(&u.name, name)),
            ReferenceKind::Project => self.projects.values().any(|e| names_collide(&e.name, name)),
            ReferenceKind::Category => {
                self.categories.values().any(|e| names_collide(&e.name, name))
            }
        }
    }

    /// `None` when no entity of `kind` has this id
    fn is_active(&self, kind: ReferenceKind, id: Uuid) -> Option<bool> {
        match kind {
            ReferenceKind::Material => self.materials.get(&id).map(|m| m.is_active),
            ReferenceKind::Unit => self.units.get(&id).map(|u| u.is_active),
            ReferenceKind::Project => self.projects.get(&id).map(|e| e.is_active),
            ReferenceKind::Category => self.categories.get(&id).map(|e| e.is_active),
        }
    }

    fn deactivate(&mut self, kind: ReferenceKind, id: Uuid) {
        let flag = match kind {
            ReferenceKind::Material => self.materials.get_mut(&id).map(|m| &mut m.is_active),
            ReferenceKind::Unit => self.units.get_mut(&id).map(|u| &mut u.is_active),
            ReferenceKind::Project => self.projects.get_mut(&id).map(|e| &mut e.is_active),
            ReferenceKind::Category => self.categories.get_mut(&id).map(|e| &mut e.is_active),
        };
        if let Some(flag) = flag {
            *flag = false;
        }
    }

    fn dependents(&self, kind: ReferenceKind, id: Uuid) -> Dependents {
        let count = |n: usize| n as i64;
        let events = |key: fn(Uuid, Uuid, Uuid) -> Uuid| Dependents {
            inflows: count(
                self.inflows
                    .values()
                    .filter(|e| key(e.material_id, e.unit_id, e.project_id) == id)
                    .count(),
            ),
            outflows: count(
                self.outflows
                    .values()
                    .filter(|e| key(e.material_id, e.unit_id, e.project_id) == id)
                    .count(),
            ),
            materials: 0,
        };
        match kind {
            ReferenceKind::Category => Dependents {
                materials: count(
                    self.materials
                        .values()
                        .filter(|m| m.category_id == id && m.is_active)
                        .count(),
                ),
                ..Dependents::default()
            },
            ReferenceKind::Material => events(|material, _, _| material),
            ReferenceKind::Unit => events(|_, unit, _| unit),
            ReferenceKind::Project => events(|_, _, project| project),
        }
    }

    fn stock_totals(&self, material_id: Uuid, unit_id: Option<Uuid>) -> AppResult<StockTotals> {
        let in_ledger = |m: Uuid, u: Uuid| m == material_id && unit_id.map_or(true, |id| id == u);
        let totals = StockTotals::from_events(
            self.inflows
                .values()
                .filter(|e| in_ledger(e.material_id, e.unit_id)),
            self.outflows
                .values()
                .filter(|e| in_ledger(e.material_id, e.unit_id)),
        )?;
        Ok(totals)
    }

    fn all_stock_totals(&self) -> AppResult<HashMap<Uuid, StockTotals>> {
        let mut totals: HashMap<Uuid, StockTotals> = HashMap::new();
        for event in self.inflows.values() {
            totals
                .entry(event.material_id)
                .or_default()
                .add_inflow(event.quantity)?;
        }
        for event in self.outflows.values() {
            totals
                .entry(event.material_id)
                .or_default()
                .add_outflow(event.quantity)?;
        }
        Ok(totals)
    }

    fn inflows(&self, filter: &EventFilter) -> Vec<InflowEvent> {
        let mut events: Vec<InflowEvent> = self
            .inflows
            .values()
            .filter(|e| filter.matches_inflow(e))
            .cloned()
            .collect();
        events.sort_by(|a, b| {
            b.delivery_date
                .cmp(&a.delivery_date)
                .then(b.created_at.cmp(&a.created_at))
        });
        events
    }

    fn outflows(&self, filter: &EventFilter) -> Vec<OutflowEvent> {
        let mut events: Vec<OutflowEvent> = self
            .outflows
            .values()
            .filter(|e| filter.matches_outflow(e))
            .cloned()
            .collect();
        events.sort_by(|a, b| {
            b.release_date
                .cmp(&a.release_date)
                .then(b.created_at.cmp(&a.created_at))
        });
        events
    }
}

fn not_named(kind: ReferenceKind) -> AppError {
    AppError::Internal(format!("{} is not a named entity", kind))
}

/// Process-local event store
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    state: Arc<RwLock<State>>,
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> AppResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| AppError::Internal("store lock poisoned".to_string()))
    }

    fn write(&self) -> AppResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| AppError::Internal("store lock poisoned".to_string()))
    }

    fn material_lock(&self, material_id: Uuid) -> AppResult<Arc<AsyncMutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| AppError::Internal("lock table poisoned".to_string()))?;
        Ok(locks.entry(material_id).or_default().clone())
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn ping(&self) -> AppResult<()> {
        self.read().map(|_| ())
    }

    async fn material(&self, id: Uuid) -> AppResult<Option<Material>> {
        Ok(self.read()?.materials.get(&id).cloned())
    }

    async fn list_materials(&self) -> AppResult<Vec<Material>> {
        let mut materials: Vec<Material> = self.read()?.materials.values().cloned().collect();
        materials.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(materials)
    }

    async fn unit(&self, id: Uuid) -> AppResult<Option<Unit>> {
        Ok(self.read()?.units.get(&id).cloned())
    }

    async fn list_units(&self) -> AppResult<Vec<Unit>> {
        let mut units: Vec<Unit> = self.read()?.units.values().cloned().collect();
        units.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(units)
    }

    async fn named(&self, kind: ReferenceKind, id: Uuid) -> AppResult<Option<NamedEntity>> {
        Ok(self.read()?.named(kind)?.get(&id).cloned())
    }

    async fn list_named(&self, kind: ReferenceKind) -> AppResult<Vec<NamedEntity>> {
        let mut entities: Vec<NamedEntity> = self.read()?.named(kind)?.values().cloned().collect();
        entities.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entities)
    }

    async fn material_units(&self, material_id: Uuid) -> AppResult<Vec<MaterialUnit>> {
        Ok(self
            .read()?
            .material_units
            .values()
            .filter(|b| b.material_id == material_id)
            .cloned()
            .collect())
    }

    async fn insert_material(&self, material: &Material) -> AppResult<()> {
        let mut state = self.write()?;
        if state.is_active(ReferenceKind::Category, material.category_id) != Some(true) {
            return Err(AppError::not_found(ReferenceKind::Category));
        }
        if state.name_taken(ReferenceKind::Material, &material.name) {
            return Err(AppError::DuplicateName {
                entity: ReferenceKind::Material,
                name: material.name.clone(),
            });
        }
        state.materials.insert(material.id, material.clone());
        Ok(())
    }

    async fn insert_unit(&self, unit: &Unit) -> AppResult<()> {
        let mut state = self.write()?;
        if state.name_taken(ReferenceKind::Unit, &unit.name) {
            return Err(AppError::DuplicateName {
                entity: ReferenceKind::Unit,
                name: unit.name.clone(),
            });
        }
        state.units.insert(unit.id, unit.clone());
        Ok(())
    }

    async fn insert_named(&self, kind: ReferenceKind, entity: &NamedEntity) -> AppResult<()> {
        let mut state = self.write()?;
        if state.name_taken(kind, &entity.name) {
            return Err(AppError::DuplicateName {
                entity: kind,
                name: entity.name.clone(),
            });
        }
        state.named_mut(kind)?.insert(entity.id, entity.clone());
        Ok(())
    }

    async fn upsert_material_unit(&self, binding: &MaterialUnit) -> AppResult<()> {
        self.write()?
            .material_units
            .insert((binding.material_id, binding.unit_id), binding.clone());
        Ok(())
    }

    async fn name_taken(&self, kind: ReferenceKind, name: &str) -> AppResult<bool> {
        Ok(self.read()?.name_taken(kind, name))
    }

    async fn deactivate(&self, kind: ReferenceKind, id: Uuid) -> AppResult<Deactivation> {
        // Material events hold the material lock from check to commit
        let _material_guard = match kind {
            ReferenceKind::Material => Some(self.material_lock(id)?.lock_owned().await),
            _ => None,
        };

        let mut state = self.write()?;
        if state.is_active(kind, id).is_none() {
            return Ok(Deactivation::Missing);
        }
        let dependents = state.dependents(kind, id);
        if !dependents.is_empty() {
            return Ok(Deactivation::Blocked(dependents));
        }
        state.deactivate(kind, id);
        Ok(Deactivation::Deactivated)
    }

    async fn inflow(&self, id: Uuid) -> AppResult<Option<InflowEvent>> {
        Ok(self.read()?.inflows.get(&id).cloned())
    }

    async fn outflow(&self, id: Uuid) -> AppResult<Option<OutflowEvent>> {
        Ok(self.read()?.outflows.get(&id).cloned())
    }

    async fn list_inflows(&self, filter: &EventFilter) -> AppResult<Vec<InflowEvent>> {
        Ok(self.read()?.inflows(filter))
    }

    async fn list_outflows(&self, filter: &EventFilter) -> AppResult<Vec<OutflowEvent>> {
        Ok(self.read()?.outflows(filter))
    }

    async fn recent_inflows(&self, limit: usize) -> AppResult<Vec<InflowEvent>> {
        let mut events: Vec<InflowEvent> = self.read()?.inflows.values().cloned().collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        events.truncate(limit);
        Ok(events)
    }

    async fn recent_outflows(&self, limit: usize) -> AppResult<Vec<OutflowEvent>> {
        let mut events: Vec<OutflowEvent> = self.read()?.outflows.values().cloned().collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        events.truncate(limit);
        Ok(events)
    }

    async fn stock_totals(
        &self,
        material_id: Uuid,
        unit_id: Option<Uuid>,
    ) -> AppResult<StockTotals> {
        self.read()?.stock_totals(material_id, unit_id)
    }

    async fn all_stock_totals(&self) -> AppResult<HashMap<Uuid, StockTotals>> {
        self.read()?.all_stock_totals()
    }

    async fn read_ledger(&self, filter: &EventFilter) -> AppResult<LedgerView> {
        let state = self.read()?;
        Ok(LedgerView {
            inflows: state.inflows(filter),
            outflows: state.outflows(filter),
            stock: state.all_stock_totals()?,
        })
    }

    async fn begin_material(&self, material_id: Uuid) -> AppResult<Box<dyn MaterialTx>> {
        let guard = self.material_lock(material_id)?.lock_owned().await;
        let material = self
            .read()?
            .materials
            .get(&material_id)
            .cloned()
            .ok_or_else(|| AppError::not_found(ReferenceKind::Material))?;

        Ok(Box::new(MemoryMaterialTx {
            state: Arc::clone(&self.state),
            material,
            held: Vec::new(),
            staged: Vec::new(),
            _guard: guard,
        }))
    }
}

#[derive(Debug)]
enum Staged {
    PutInflow(InflowEvent),
    PutOutflow(OutflowEvent),
    DeleteInflow(Uuid),
    DeleteOutflow(Uuid),
}

/// Material transaction over the in-memory state.
///
/// Reads see committed state only; writes are applied together on commit.
/// Held references are re-checked under the write lock at commit.
struct MemoryMaterialTx {
    state: Arc<RwLock<State>>,
    material: Material,
    held: Vec<(ReferenceKind, Uuid)>,
    staged: Vec<Staged>,
    _guard: OwnedMutexGuard<()>,
}

impl MemoryMaterialTx {
    fn read(&self) -> AppResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| AppError::Internal("store lock poisoned".to_string()))
    }
}

#[async_trait]
impl MaterialTx for MemoryMaterialTx {
    fn material(&self) -> &Material {
        &self.material
    }

    async fn hold_reference(&mut self, kind: ReferenceKind, id: Uuid) -> AppResult<bool> {
        let active = self.read()?.is_active(kind, id) == Some(true);
        if active {
            self.held.push((kind, id));
        }
        Ok(active)
    }

    async fn stock_totals(&mut self, unit_id: Option<Uuid>) -> AppResult<StockTotals> {
        self.read()?.stock_totals(self.material.id, unit_id)
    }

    async fn inflow(&mut self, id: Uuid) -> AppResult<Option<InflowEvent>> {
        let material_id = self.material.id;
        Ok(self
            .read()?
            .inflows
            .get(&id)
            .filter(|e| e.material_id == material_id)
            .cloned())
    }

    async fn outflow(&mut self, id: Uuid) -> AppResult<Option<OutflowEvent>> {
        let material_id = self.material.id;
        Ok(self
            .read()?
            .outflows
            .get(&id)
            .filter(|e| e.material_id == material_id)
            .cloned())
    }

    async fn insert_inflow(&mut self, event: &InflowEvent) -> AppResult<()> {
        self.staged.push(Staged::PutInflow(event.clone()));
        Ok(())
    }

    async fn insert_outflow(&mut self, event: &OutflowEvent) -> AppResult<()> {
        self.staged.push(Staged::PutOutflow(event.clone()));
        Ok(())
    }

    async fn update_inflow(&mut self, event: &InflowEvent) -> AppResult<()> {
        self.staged.push(Staged::PutInflow(event.clone()));
        Ok(())
    }

    async fn update_outflow(&mut self, event: &OutflowEvent) -> AppResult<()> {
        self.staged.push(Staged::PutOutflow(event.clone()));
        Ok(())
    }

    async fn delete_inflow(&mut self, id: Uuid) -> AppResult<bool> {
        let exists = self.inflow(id).await?.is_some();
        if exists {
            self.staged.push(Staged::DeleteInflow(id));
        }
        Ok(exists)
    }

    async fn delete_outflow(&mut self, id: Uuid) -> AppResult<bool> {
        let exists = self.outflow(id).await?.is_some();
        if exists {
            self.staged.push(Staged::DeleteOutflow(id));
        }
        Ok(exists)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryMaterialTx {
            state,
            held,
            staged,
            _guard,
            ..
        } = *self;

        let mut state = state
            .write()
            .map_err(|_| AppError::Internal("store lock poisoned".to_string()))?;
        if let Some((kind, _)) = held
            .iter()
            .find(|(kind, id)| state.is_active(*kind, *id) != Some(true))
        {
            return Err(AppError::not_found(*kind));
        }
        for change in staged {
            match change {
                Staged::PutInflow(event) => {
                    state.inflows.insert(event.id, event);
                }
                Staged::PutOutflow(event) => {
                    state.outflows.insert(event.id, event);
                }
                Staged::DeleteInflow(id) => {
                    state.inflows.remove(&id);
                }
                Staged::DeleteOutflow(id) => {
                    state.outflows.remove(&id);
                }
            }
        }
        Ok(())
    }
}
