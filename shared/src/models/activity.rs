//! Activity feed records

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::EventKind;

/// One line of the merged inflow/outflow activity stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub material_id: Uuid,
    pub material_name: String,
    pub quantity: Decimal,
    pub unit_abbreviation: String,
    pub project_name: String,
    /// Delivery date for inflows, release date for outflows
    pub date: DateTime<Utc>,
    /// Receiver for inflows, authorizer for outflows
    pub person: String,
    pub created_at: DateTime<Utc>,
}
