//! Validation utilities for ledger inputs
//!
//! Shape checks applied at the boundary before any input reaches the ledger.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::{InflowPatch, NewInflow, NewOutflow, OutflowPatch};

/// Quantities carry at most this many fractional digits
pub const MAX_QUANTITY_SCALE: u32 = 4;

/// Largest quantity or unit price a `NUMERIC(18, 4)` column holds
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_808_348_671, 232_830_643, 0, false, 4);

/// Longest accepted free-text field
pub const MAX_TEXT_LEN: usize = 255;

/// A failed field check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldError {
    fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

// ============================================================================
// Field Validations
// ============================================================================

/// Validate that a movement quantity is strictly positive
pub fn validate_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be positive");
    }
    if quantity > MAX_AMOUNT {
        return Err("Quantity is too large");
    }
    if quantity.normalize().scale() > MAX_QUANTITY_SCALE {
        return Err("Quantity has too many decimal places");
    }
    Ok(())
}

/// Validate an optional unit price (zero is allowed for donated stock)
pub fn validate_unit_price(unit_price: Option<Decimal>) -> Result<(), &'static str> {
    match unit_price {
        Some(price) if price < Decimal::ZERO => Err("Unit price cannot be negative"),
        Some(price) if price > MAX_AMOUNT => Err("Unit price is too large"),
        Some(price) if price.normalize().scale() > MAX_QUANTITY_SCALE => {
            Err("Unit price has too many decimal places")
        }
        _ => Ok(()),
    }
}

/// Validate a minimum stock level
pub fn validate_min_stock_level(level: Decimal) -> Result<(), &'static str> {
    if level < Decimal::ZERO {
        return Err("Minimum stock level cannot be negative");
    }
    Ok(())
}

/// Validate a required person/name field
pub fn validate_required_text(value: &str) -> Result<(), &'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("Value is required");
    }
    validate_optional_text(trimmed)
}

/// Validate an optional free-text field
pub fn validate_optional_text(value: &str) -> Result<(), &'static str> {
    if value.chars().count() > MAX_TEXT_LEN {
        return Err("Value is too long");
    }
    Ok(())
}

/// Validate that a return date does not precede the release date
pub fn validate_return_date(
    release_date: DateTime<Utc>,
    return_date: Option<DateTime<Utc>>,
) -> Result<(), &'static str> {
    match return_date {
        Some(due) if due < release_date => Err("Return date cannot be before release date"),
        _ => Ok(()),
    }
}

// ============================================================================
// Input Validations
// ============================================================================

fn check(field: &'static str, result: Result<(), &'static str>) -> Result<(), FieldError> {
    result.map_err(|message| FieldError::new(field, message))
}

/// Validate an inflow before it is recorded
pub fn validate_new_inflow(input: &NewInflow) -> Result<(), FieldError> {
    check("quantity", validate_quantity(input.quantity))?;
    check("unit_price", validate_unit_price(input.unit_price))?;
    check("received_by", validate_required_text(&input.received_by))?;
    check("supplier_name", validate_optional_text(&input.supplier_name))?;
    check("purpose", validate_optional_text(&input.purpose))?;
    if let Some(batch) = &input.batch_number {
        check("batch_number", validate_optional_text(batch))?;
    }
    Ok(())
}

/// Validate an outflow before it is recorded
pub fn validate_new_outflow(input: &NewOutflow) -> Result<(), FieldError> {
    check("quantity", validate_quantity(input.quantity))?;
    check("unit_price", validate_unit_price(input.unit_price))?;
    check("authorized_by", validate_required_text(&input.authorized_by))?;
    check("received_by", validate_required_text(&input.received_by))?;
    check("purpose", validate_optional_text(&input.purpose))?;
    check(
        "return_date",
        validate_return_date(input.release_date, input.return_date),
    )?;
    Ok(())
}

/// Validate the fields present in an inflow patch
pub fn validate_inflow_patch(patch: &InflowPatch) -> Result<(), FieldError> {
    if let Some(quantity) = patch.quantity {
        check("quantity", validate_quantity(quantity))?;
    }
    check("unit_price", validate_unit_price(patch.unit_price))?;
    if let Some(received_by) = &patch.received_by {
        check("received_by", validate_required_text(received_by))?;
    }
    if let Some(supplier_name) = &patch.supplier_name {
        check("supplier_name", validate_optional_text(supplier_name))?;
    }
    if let Some(purpose) = &patch.purpose {
        check("purpose", validate_optional_text(purpose))?;
    }
    Ok(())
}

/// Validate the fields present in an outflow patch
pub fn validate_outflow_patch(patch: &OutflowPatch) -> Result<(), FieldError> {
    if let Some(quantity) = patch.quantity {
        check("quantity", validate_quantity(quantity))?;
    }
    check("unit_price", validate_unit_price(patch.unit_price))?;
    if let Some(authorized_by) = &patch.authorized_by {
        check("authorized_by", validate_required_text(authorized_by))?;
    }
    if let Some(received_by) = &patch.received_by {
        check("received_by", validate_required_text(received_by))?;
    }
    if let Some(purpose) = &patch.purpose {
        check("purpose", validate_optional_text(purpose))?;
    }
    Ok(())
}
