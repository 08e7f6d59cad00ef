//! Derived stock figures and stock health classification

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{InflowEvent, Material, OutflowEvent};
use crate::types::AmountOverflow;

/// Running totals for one material (or one material/unit pair)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockTotals {
    pub total_inflow: Decimal,
    pub total_outflow: Decimal,
}

impl StockTotals {
    pub fn new(total_inflow: Decimal, total_outflow: Decimal) -> Self {
        Self {
            total_inflow,
            total_outflow,
        }
    }

    /// Sum the quantities of the given events
    pub fn from_events<'a>(
        inflows: impl IntoIterator<Item = &'a InflowEvent>,
        outflows: impl IntoIterator<Item = &'a OutflowEvent>,
    ) -> Result<Self, AmountOverflow> {
        let mut totals = Self::default();
        for event in inflows {
            totals.add_inflow(event.quantity)?;
        }
        for event in outflows {
            totals.add_outflow(event.quantity)?;
        }
        Ok(totals)
    }

    pub fn current_stock(&self) -> Decimal {
        self.total_inflow - self.total_outflow
    }

    pub fn add_inflow(&mut self, quantity: Decimal) -> Result<(), AmountOverflow> {
        self.total_inflow = self.total_inflow.checked_add(quantity).ok_or(AmountOverflow {
            field: "total_inflow",
        })?;
        Ok(())
    }

    pub fn add_outflow(&mut self, quantity: Decimal) -> Result<(), AmountOverflow> {
        self.total_outflow = self.total_outflow.checked_add(quantity).ok_or(AmountOverflow {
            field: "total_outflow",
        })?;
        Ok(())
    }
}

/// Stock health label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    /// Whether the material should surface in low-stock alerting
    pub fn needs_attention(&self) -> bool {
        !matches!(self, StockStatus::InStock)
    }
}

/// Classify current stock against a minimum level.
///
/// Zero or negative stock is always out of stock. Stock equal to the minimum
/// level counts as low. A minimum of zero means no threshold is configured.
pub fn classify_stock(current_stock: Decimal, min_stock_level: Decimal) -> StockStatus {
    if current_stock <= Decimal::ZERO {
        StockStatus::OutOfStock
    } else if min_stock_level > Decimal::ZERO && current_stock <= min_stock_level {
        StockStatus::LowStock
    } else {
        StockStatus::InStock
    }
}

/// Whether stock sits comfortably above its minimum (`factor` × minimum)
pub fn is_efficient_stock(current_stock: Decimal, min_stock_level: Decimal, factor: Decimal) -> bool {
    if min_stock_level > Decimal::ZERO {
        current_stock >= min_stock_level * factor
    } else {
        true
    }
}

/// Derived, never persisted view of a material's stock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub material_id: Uuid,
    pub material_name: String,
    pub category_id: Uuid,
    /// Set when the snapshot covers a single unit ledger
    pub unit_id: Option<Uuid>,
    pub total_inflow: Decimal,
    pub total_outflow: Decimal,
    pub current_stock: Decimal,
    pub min_stock_level: Decimal,
    pub status: StockStatus,
}

impl StockSnapshot {
    pub fn new(material: &Material, unit_id: Option<Uuid>, totals: StockTotals) -> Self {
        let current_stock = totals.current_stock();
        Self {
            material_id: material.id,
            material_name: material.name.clone(),
            category_id: material.category_id,
            unit_id,
            total_inflow: totals.total_inflow,
            total_outflow: totals.total_outflow,
            current_stock,
            min_stock_level: material.min_stock_level,
            status: classify_stock(current_stock, material.min_stock_level),
        }
    }
}
