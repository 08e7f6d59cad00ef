//! Reference data the ledger reads: materials, units, projects, categories

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stocked material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: Uuid,
    pub name: String,
    pub category_id: Uuid,
    /// Minimum stock level; zero means no threshold configured
    pub min_stock_level: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Unit of measure, display only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: Uuid,
    pub name: String,
    pub abbreviation: String,
    pub is_active: bool,
}

/// Alternate unit binding for a material.
///
/// `conversion_factor` is stored for reference only. Stock is never converted
/// between units; every (material, unit) pair keeps its own ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialUnit {
    pub material_id: Uuid,
    pub unit_id: Uuid,
    pub conversion_factor: Decimal,
}

/// Named grouping entity (projects and categories share this shape)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEntity {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
}

pub type Project = NamedEntity;
pub type Category = NamedEntity;

/// Input for registering a material
#[derive(Debug, Clone, Deserialize)]
pub struct NewMaterial {
    pub name: String,
    pub category_id: Uuid,
    pub min_stock_level: Option<Decimal>,
}

/// Input for registering a unit, project or category
#[derive(Debug, Clone, Deserialize)]
pub struct NewReference {
    pub name: String,
    /// Only meaningful for units
    pub abbreviation: Option<String>,
}

/// Records that still point at a reference entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependents {
    pub inflows: i64,
    pub outflows: i64,
    pub materials: i64,
}

impl Dependents {
    pub fn is_empty(&self) -> bool {
        self.inflows == 0 && self.outflows == 0 && self.materials == 0
    }

    /// Human readable description of the blocking relationship
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if self.inflows > 0 {
            parts.push(format!("{} inflow record(s)", self.inflows));
        }
        if self.outflows > 0 {
            parts.push(format!("{} outflow record(s)", self.outflows));
        }
        if self.materials > 0 {
            parts.push(format!("{} active material(s)", self.materials));
        }
        parts.join(", ")
    }
}

/// Names are compared trimmed and case-insensitively
pub fn names_collide(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependents_describe() {
        let deps = Dependents {
            inflows: 3,
            outflows: 1,
            materials: 0,
        };
        assert!(!deps.is_empty());
        assert_eq!(deps.describe(), "3 inflow record(s), 1 outflow record(s)");
        assert!(Dependents::default().is_empty());
    }

    #[test]
    fn test_names_collide_ignores_case_and_padding() {
        assert!(names_collide("Cement", "  cement "));
        assert!(names_collide("REBAR 12mm", "rebar 12MM"));
        assert!(!names_collide("Rebar 12mm", "Rebar 16mm"));
    }
}
