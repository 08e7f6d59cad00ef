//! Availability checks for stock-reducing writes
//!
//! Every check runs inside an open [`MaterialTx`], so the stock it reads cannot
//! change before the write that depends on it commits.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::MaterialTx;
use shared::ReferenceKind;

/// Reject `requested` when it exceeds `available`
pub fn check_availability(
    material_name: &str,
    available: Decimal,
    requested: Decimal,
) -> AppResult<()> {
    if requested > available {
        return Err(AppError::InsufficientStock {
            material_name: material_name.to_string(),
            available,
            requested,
        });
    }
    Ok(())
}

/// Authorizes outflows and other stock-reducing edits
#[derive(Debug, Clone, Copy, Default)]
pub struct AvailabilityValidator;

impl AvailabilityValidator {
    pub fn new() -> Self {
        Self
    }

    /// Authorize a new outflow of `requested` from the (material, unit) ledger.
    ///
    /// Returns the stock that was available.
    pub async fn authorize(
        &self,
        tx: &mut dyn MaterialTx,
        unit_id: Uuid,
        requested: Decimal,
    ) -> AppResult<Decimal> {
        self.authorize_with_credit(tx, unit_id, requested, Decimal::ZERO)
            .await
    }

    /// Authorize an outflow edit. `credit` is the quantity the edited outflow
    /// already holds, which is returned to the pool before the check.
    pub async fn authorize_with_credit(
        &self,
        tx: &mut dyn MaterialTx,
        unit_id: Uuid,
        requested: Decimal,
        credit: Decimal,
    ) -> AppResult<Decimal> {
        if !tx.material().is_active {
            return Err(AppError::not_found(ReferenceKind::Material));
        }

        let totals = tx.stock_totals(Some(unit_id)).await?;
        let available = totals.current_stock() + credit;
        check_availability(&tx.material().name, available, requested)?;
        Ok(available)
    }

    /// Ensure that taking `removed` inflow quantity out of the ledger leaves it
    /// non-negative (inflow decreases and deletions).
    pub async fn ensure_retractable(
        &self,
        tx: &mut dyn MaterialTx,
        unit_id: Uuid,
        removed: Decimal,
    ) -> AppResult<()> {
        if removed <= Decimal::ZERO {
            return Ok(());
        }
        let totals = tx.stock_totals(Some(unit_id)).await?;
        check_availability(&tx.material().name, totals.current_stock(), removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outflow_above_stock_is_rejected_with_numbers() {
        let err = check_availability("Cement", Decimal::from(125), Decimal::from(200)).unwrap_err();
        match err {
            AppError::InsufficientStock {
                material_name,
                available,
                requested,
            } => {
                assert_eq!(material_name, "Cement");
                assert_eq!(available, Decimal::from(125));
                assert_eq!(requested, Decimal::from(200));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_outflow_of_exact_stock_is_allowed() {
        assert!(check_availability("Cement", Decimal::from(125), Decimal::from(125)).is_ok());
        assert!(check_availability("Cement", Decimal::ZERO, Decimal::new(1, 2)).is_err());
    }
}
