//! Stock health classification

use rust_decimal::Decimal;
use serde::Serialize;
use shared::{fleet_health_percent, is_efficient_stock, StockSnapshot, StockStatus};

/// Counts of materials per stock health label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockHealthSummary {
    pub material_count: i64,
    pub in_stock_count: i64,
    pub low_stock_count: i64,
    pub out_of_stock_count: i64,
    pub efficient_count: i64,
    pub health_percent: Decimal,
}

/// Labels materials against their minimum stock levels
#[derive(Debug, Clone, Copy)]
pub struct ThresholdClassifier {
    efficiency_factor: Decimal,
}

impl ThresholdClassifier {
    pub fn new(efficiency_factor: Decimal) -> Self {
        Self { efficiency_factor }
    }

    pub fn is_efficient(&self, snapshot: &StockSnapshot) -> bool {
        is_efficient_stock(
            snapshot.current_stock,
            snapshot.min_stock_level,
            self.efficiency_factor,
        )
    }

    /// Percentage of materials not out of stock
    pub fn fleet_health(&self, snapshots: &[StockSnapshot]) -> Decimal {
        fleet_health_percent(snapshots)
    }

    pub fn summarize(&self, snapshots: &[StockSnapshot]) -> StockHealthSummary {
        let count = |status: StockStatus| {
            snapshots.iter().filter(|s| s.status == status).count() as i64
        };
        StockHealthSummary {
            material_count: snapshots.len() as i64,
            in_stock_count: count(StockStatus::InStock),
            low_stock_count: count(StockStatus::LowStock),
            out_of_stock_count: count(StockStatus::OutOfStock),
            efficient_count: snapshots.iter().filter(|s| self.is_efficient(s)).count() as i64,
            health_percent: self.fleet_health(snapshots),
        }
    }

    /// Materials that are low or out of stock, emptiest first
    pub fn low_stock_alerts(&self, snapshots: &[StockSnapshot]) -> Vec<StockSnapshot> {
        let mut alerts: Vec<StockSnapshot> = snapshots
            .iter()
            .filter(|s| s.status.needs_attention())
            .cloned()
            .collect();
        alerts.sort_by(|a, b| {
            severity(b.status)
                .cmp(&severity(a.status))
                .then(a.current_stock.cmp(&b.current_stock))
                .then_with(|| a.material_name.cmp(&b.material_name))
        });
        alerts
    }
}

fn severity(status: StockStatus) -> u8 {
    match status {
        StockStatus::OutOfStock => 2,
        StockStatus::LowStock => 1,
        StockStatus::InStock => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Material, StockTotals};
    use std::str::FromStr;
    use uuid::Uuid;

    fn snapshot(name: &str, current: &str, min: &str) -> StockSnapshot {
        let material = Material {
            id: Uuid::new_v4(),
            name: name.to_string(),
            category_id: Uuid::new_v4(),
            min_stock_level: Decimal::from_str(min).unwrap(),
            is_active: true,
            created_at: chrono::Utc::now(),
        };
        StockSnapshot::new(
            &material,
            None,
            StockTotals::new(Decimal::from_str(current).unwrap(), Decimal::ZERO),
        )
    }

    #[test]
    fn test_summary_counts_and_health() {
        let classifier = ThresholdClassifier::new(Decimal::new(12, 1));
        let snapshots = vec![
            snapshot("Cement", "15", "20"),
            snapshot("Sand", "0", "20"),
            snapshot("Gravel", "50", "20"),
            snapshot("Tiles", "24", "20"),
        ];
        let summary = classifier.summarize(&snapshots);
        assert_eq!(summary.material_count, 4);
        assert_eq!(summary.low_stock_count, 1);
        assert_eq!(summary.out_of_stock_count, 1);
        assert_eq!(summary.in_stock_count, 2);
        assert_eq!(summary.efficient_count, 2);
        assert_eq!(summary.health_percent, Decimal::from(75));
    }

    #[test]
    fn test_health_of_empty_fleet_is_zero() {
        let classifier = ThresholdClassifier::new(Decimal::new(12, 1));
        assert_eq!(classifier.fleet_health(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_alerts_put_out_of_stock_first() {
        let classifier = ThresholdClassifier::new(Decimal::new(12, 1));
        let snapshots = vec![
            snapshot("Cement", "15", "20"),
            snapshot("Gravel", "50", "20"),
            snapshot("Sand", "0", "20"),
            snapshot("Bricks", "5", "20"),
        ];
        let names: Vec<String> = classifier
            .low_stock_alerts(&snapshots)
            .into_iter()
            .map(|s| s.material_name)
            .collect();
        assert_eq!(names, vec!["Sand", "Bricks", "Cement"]);
    }
}
