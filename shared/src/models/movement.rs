//! Stock movement records: inflows (receipts) and outflows (releases)

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{AmountOverflow, DateRange, EventKind};

/// A receipt of material into the warehouse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InflowEvent {
    pub id: Uuid,
    pub material_id: Uuid,
    pub unit_id: Uuid,
    pub project_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
    pub total_value: Option<Decimal>,
    pub delivery_date: DateTime<Utc>,
    pub received_by: String,
    pub supplier_name: String,
    pub purpose: String,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A release of material out of the warehouse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutflowEvent {
    pub id: Uuid,
    pub material_id: Uuid,
    pub unit_id: Uuid,
    pub project_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
    pub total_value: Option<Decimal>,
    pub release_date: DateTime<Utc>,
    pub authorized_by: String,
    pub received_by: String,
    pub purpose: String,
    pub return_date: Option<DateTime<Utc>>,
    pub is_returned: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for recording an inflow
#[derive(Debug, Clone, Deserialize)]
pub struct NewInflow {
    pub material_id: Uuid,
    pub unit_id: Uuid,
    pub project_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
    pub delivery_date: DateTime<Utc>,
    pub received_by: String,
    #[serde(default)]
    pub supplier_name: String,
    #[serde(default)]
    pub purpose: String,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

/// Input for recording an outflow
#[derive(Debug, Clone, Deserialize)]
pub struct NewOutflow {
    pub material_id: Uuid,
    pub unit_id: Uuid,
    pub project_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
    pub release_date: DateTime<Utc>,
    pub authorized_by: String,
    pub received_by: String,
    #[serde(default)]
    pub purpose: String,
    pub return_date: Option<DateTime<Utc>>,
}

/// Partial update of an inflow. Material and unit are part of the record's
/// identity and cannot be patched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InflowPatch {
    pub project_id: Option<Uuid>,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub received_by: Option<String>,
    pub supplier_name: Option<String>,
    pub purpose: Option<String>,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

/// Partial update of an outflow
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutflowPatch {
    pub project_id: Option<Uuid>,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub release_date: Option<DateTime<Utc>>,
    pub authorized_by: Option<String>,
    pub received_by: Option<String>,
    pub purpose: Option<String>,
    pub return_date: Option<DateTime<Utc>>,
}

/// Patch for either event kind
#[derive(Debug, Clone)]
pub enum EventPatch {
    Inflow(InflowPatch),
    Outflow(OutflowPatch),
}

impl EventPatch {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPatch::Inflow(_) => EventKind::Inflow,
            EventPatch::Outflow(_) => EventKind::Outflow,
        }
    }
}

/// Either event kind, as returned by kind-generic operations
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LedgerEvent {
    Inflow(InflowEvent),
    Outflow(OutflowEvent),
}

/// Exclusive upper bound of a stored `NUMERIC(24, 8)` movement value
const TOTAL_VALUE_LIMIT: i64 = 10_000_000_000_000_000;

/// Value of a movement when a unit price is known
pub fn total_value(
    quantity: Decimal,
    unit_price: Option<Decimal>,
) -> Result<Option<Decimal>, AmountOverflow> {
    let Some(price) = unit_price else {
        return Ok(None);
    };
    quantity
        .checked_mul(price)
        .filter(|value| value.abs() < Decimal::from(TOTAL_VALUE_LIMIT))
        .map(Some)
        .ok_or(AmountOverflow {
            field: "total_value",
        })
}

impl InflowEvent {
    pub fn new(
        input: NewInflow,
        created_by: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Self, AmountOverflow> {
        Ok(Self {
            id: Uuid::new_v4(),
            material_id: input.material_id,
            unit_id: input.unit_id,
            project_id: input.project_id,
            total_value: total_value(input.quantity, input.unit_price)?,
            quantity: input.quantity,
            unit_price: input.unit_price,
            delivery_date: input.delivery_date,
            received_by: input.received_by.trim().to_string(),
            supplier_name: input.supplier_name.trim().to_string(),
            purpose: input.purpose.trim().to_string(),
            batch_number: input.batch_number,
            expiry_date: input.expiry_date,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a patch in place, keeping `total_value` in step with quantity and price.
    /// Nothing changes when the new value is out of range.
    pub fn apply(&mut self, patch: InflowPatch, now: DateTime<Utc>) -> Result<(), AmountOverflow> {
        self.total_value = total_value(
            patch.quantity.unwrap_or(self.quantity),
            patch.unit_price.or(self.unit_price),
        )?;
        if let Some(project_id) = patch.project_id {
            self.project_id = project_id;
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(unit_price) = patch.unit_price {
            self.unit_price = Some(unit_price);
        }
        if let Some(date) = patch.delivery_date {
            self.delivery_date = date;
        }
        if let Some(received_by) = patch.received_by {
            self.received_by = received_by.trim().to_string();
        }
        if let Some(supplier_name) = patch.supplier_name {
            self.supplier_name = supplier_name.trim().to_string();
        }
        if let Some(purpose) = patch.purpose {
            self.purpose = purpose.trim().to_string();
        }
        if let Some(batch_number) = patch.batch_number {
            self.batch_number = Some(batch_number);
        }
        if let Some(expiry_date) = patch.expiry_date {
            self.expiry_date = Some(expiry_date);
        }
        self.updated_at = now;
        Ok(())
    }
}

impl OutflowEvent {
    pub fn new(
        input: NewOutflow,
        created_by: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Self, AmountOverflow> {
        Ok(Self {
            id: Uuid::new_v4(),
            material_id: input.material_id,
            unit_id: input.unit_id,
            project_id: input.project_id,
            total_value: total_value(input.quantity, input.unit_price)?,
            quantity: input.quantity,
            unit_price: input.unit_price,
            release_date: input.release_date,
            authorized_by: input.authorized_by.trim().to_string(),
            received_by: input.received_by.trim().to_string(),
            purpose: input.purpose.trim().to_string(),
            return_date: input.return_date,
            is_returned: false,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, patch: OutflowPatch, now: DateTime<Utc>) -> Result<(), AmountOverflow> {
        self.total_value = total_value(
            patch.quantity.unwrap_or(self.quantity),
            patch.unit_price.or(self.unit_price),
        )?;
        if let Some(project_id) = patch.project_id {
            self.project_id = project_id;
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(unit_price) = patch.unit_price {
            self.unit_price = Some(unit_price);
        }
        if let Some(date) = patch.release_date {
            self.release_date = date;
        }
        if let Some(authorized_by) = patch.authorized_by {
            self.authorized_by = authorized_by.trim().to_string();
        }
        if let Some(received_by) = patch.received_by {
            self.received_by = received_by.trim().to_string();
        }
        if let Some(purpose) = patch.purpose {
            self.purpose = purpose.trim().to_string();
        }
        if let Some(return_date) = patch.return_date {
            self.return_date = Some(return_date);
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn return_status(&self, now: DateTime<Utc>) -> ReturnStatus {
        ReturnStatus::of(self.return_date, self.is_returned, now)
    }
}

/// Return tracking state of an outflow.
///
/// `PendingReturn` becomes `OverdueReturn` purely by the passage of time;
/// only an explicit "mark returned" write reaches `Returned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    Released,
    PendingReturn,
    OverdueReturn,
    Returned,
}

impl ReturnStatus {
    pub fn of(return_date: Option<DateTime<Utc>>, is_returned: bool, now: DateTime<Utc>) -> Self {
        if is_returned {
            return ReturnStatus::Returned;
        }
        match return_date {
            None => ReturnStatus::Released,
            Some(due) if due >= now => ReturnStatus::PendingReturn,
            Some(_) => ReturnStatus::OverdueReturn,
        }
    }

    /// Whether an explicit "mark returned" write is allowed from this state
    pub fn can_mark_returned(&self) -> bool {
        matches!(self, ReturnStatus::PendingReturn | ReturnStatus::OverdueReturn)
    }
}

/// Filter for event listings
#[derive(Debug, Clone, Copy, Default)]
pub struct EventFilter {
    pub range: DateRange,
    pub material_id: Option<Uuid>,
    pub unit_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
}

impl EventFilter {
    pub fn in_range(range: DateRange) -> Self {
        Self {
            range,
            ..Self::default()
        }
    }

    pub fn matches_inflow(&self, event: &InflowEvent) -> bool {
        self.matches(
            event.material_id,
            event.unit_id,
            event.project_id,
            event.delivery_date,
        )
    }

    pub fn matches_outflow(&self, event: &OutflowEvent) -> bool {
        self.matches(
            event.material_id,
            event.unit_id,
            event.project_id,
            event.release_date,
        )
    }

    fn matches(&self, material_id: Uuid, unit_id: Uuid, project_id: Uuid, date: DateTime<Utc>) -> bool {
        self.material_id.map_or(true, |id| id == material_id)
            && self.unit_id.map_or(true, |id| id == unit_id)
            && self.project_id.map_or(true, |id| id == project_id)
            && self.range.contains(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn outflow(return_date: Option<DateTime<Utc>>, is_returned: bool) -> OutflowEvent {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let mut event = OutflowEvent::new(
            NewOutflow {
                material_id: Uuid::new_v4(),
                unit_id: Uuid::new_v4(),
                project_id: Uuid::new_v4(),
                quantity: dec("4"),
                unit_price: None,
                release_date: now,
                authorized_by: "Site Lead".into(),
                received_by: "Crew A".into(),
                purpose: String::new(),
                return_date,
            },
            Uuid::new_v4(),
            now,
        )
        .unwrap();
        event.is_returned = is_returned;
        event
    }

    #[test]
    fn test_total_value_requires_unit_price() {
        assert_eq!(
            total_value(dec("12.5"), Some(dec("4.00"))),
            Ok(Some(dec("50.000")))
        );
        assert_eq!(total_value(dec("12.5"), None), Ok(None));
    }

    #[test]
    fn test_total_value_out_of_range_is_an_error() {
        let huge = dec("99999999999999.9999");
        let err = total_value(huge, Some(huge)).unwrap_err();
        assert_eq!(err.field, "total_value");
        // Would overflow the decimal itself, not only the column
        assert!(total_value(dec("100000000000000000000"), Some(dec("10000000000"))).is_err());
        // Largest values still inside the column
        assert_eq!(
            total_value(dec("1000000"), Some(dec("9999999999.9999"))),
            Ok(Some(dec("9999999999999900")))
        );
    }

    #[test]
    fn test_return_status_transitions() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        assert_eq!(outflow(None, false).return_status(now), ReturnStatus::Released);
        assert_eq!(
            outflow(Some(now + Duration::days(2)), false).return_status(now),
            ReturnStatus::PendingReturn
        );
        assert_eq!(
            outflow(Some(now), false).return_status(now),
            ReturnStatus::PendingReturn
        );
        assert_eq!(
            outflow(Some(now - Duration::days(1)), false).return_status(now),
            ReturnStatus::OverdueReturn
        );
        assert_eq!(
            outflow(Some(now - Duration::days(1)), true).return_status(now),
            ReturnStatus::Returned
        );
    }

    #[test]
    fn test_pending_becomes_overdue_with_time() {
        let due = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let event = outflow(Some(due), false);
        assert_eq!(event.return_status(due - Duration::hours(1)), ReturnStatus::PendingReturn);
        assert_eq!(event.return_status(due + Duration::hours(1)), ReturnStatus::OverdueReturn);
        assert!(ReturnStatus::OverdueReturn.can_mark_returned());
        assert!(!ReturnStatus::Released.can_mark_returned());
        assert!(!ReturnStatus::Returned.can_mark_returned());
    }

    #[test]
    fn test_patch_recomputes_total_value() {
        let now = Utc::now();
        let mut event = outflow(None, false);
        event
            .apply(
                OutflowPatch {
                    quantity: Some(dec("10")),
                    unit_price: Some(dec("2.5")),
                    ..OutflowPatch::default()
                },
                now,
            )
            .unwrap();
        assert_eq!(event.quantity, dec("10"));
        assert_eq!(event.total_value, Some(dec("25.0")));
        assert_eq!(event.updated_at, now);
    }

    #[test]
    fn test_out_of_range_patch_leaves_event_unchanged() {
        let mut event = outflow(None, false);
        let before = event.clone();
        let result = event.apply(
            OutflowPatch {
                quantity: Some(dec("99999999999999")),
                unit_price: Some(dec("99999999999999")),
                purpose: Some("bulk".to_string()),
                ..OutflowPatch::default()
            },
            Utc::now(),
        );
        assert!(result.is_err());
        assert_eq!(event, before);
    }
}
