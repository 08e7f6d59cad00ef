//! Stock aggregation
//!
//! Current stock is never stored. It is recomputed from the full event history
//! on every read: `current = Σ inflow − Σ outflow`, per material or per
//! (material, unit) ledger. Unit ledgers are independent and never converted.

use std::collections::HashMap;

use shared::{Material, ReferenceKind, StockSnapshot, StockTotals};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::DynEventStore;

/// Derives stock figures from the event store
#[derive(Clone)]
pub struct StockAggregator {
    store: DynEventStore,
}

impl StockAggregator {
    pub fn new(store: DynEventStore) -> Self {
        Self { store }
    }

    /// Totals for one material, or one of its unit ledgers
    pub async fn compute_stock(
        &self,
        material_id: Uuid,
        unit_id: Option<Uuid>,
    ) -> AppResult<StockTotals> {
        self.store.stock_totals(material_id, unit_id).await
    }

    /// Snapshot of a single material, across all its units or for one unit ledger
    pub async fn snapshot(
        &self,
        material_id: Uuid,
        unit_id: Option<Uuid>,
    ) -> AppResult<StockSnapshot> {
        let material = self
            .store
            .material(material_id)
            .await?
            .ok_or_else(|| AppError::not_found(ReferenceKind::Material))?;
        if let Some(unit_id) = unit_id {
            self.store
                .unit(unit_id)
                .await?
                .ok_or_else(|| AppError::not_found(ReferenceKind::Unit))?;
        }
        let totals = self.compute_stock(material_id, unit_id).await?;
        Ok(StockSnapshot::new(&material, unit_id, totals))
    }

    /// Snapshots for every active material from one grouped totals query
    pub async fn compute_all_stock(&self) -> AppResult<Vec<StockSnapshot>> {
        let materials = self.store.list_materials().await?;
        let totals = self.store.all_stock_totals().await?;
        Ok(active_snapshots(&materials, &totals))
    }
}

/// Pair active materials with their totals; materials without events have zero stock
pub fn active_snapshots(
    materials: &[Material],
    totals: &HashMap<Uuid, StockTotals>,
) -> Vec<StockSnapshot> {
    materials
        .iter()
        .filter(|m| m.is_active)
        .map(|m| {
            let material_totals = totals.get(&m.id).copied().unwrap_or_default();
            StockSnapshot::new(m, None, material_totals)
        })
        .collect()
}
