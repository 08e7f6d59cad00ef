//! Report rows and the arithmetic behind them

use chrono::{DateTime, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ReturnStatus, StockSnapshot, StockStatus};
use crate::types::ReportPeriod;

/// Per-category stock summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryReportRow {
    pub category_id: Uuid,
    pub category_name: String,
    pub total_stock: Decimal,
    pub material_count: i64,
    pub low_stock_count: i64,
    pub out_of_stock_count: i64,
    pub efficient_count: i64,
    pub efficiency_percent: Decimal,
    pub activity_count: i64,
}

/// Per-project movement summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectReportRow {
    pub project_id: Uuid,
    pub project_name: String,
    pub inflow_count: i64,
    pub inflow_quantity: Decimal,
    pub inflow_value: Decimal,
    pub outflow_count: i64,
    pub outflow_quantity: Decimal,
    pub outflow_value: Decimal,
    pub activity_count: i64,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Per-material movement summary ("top movers")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialReportRow {
    pub material_id: Uuid,
    pub material_name: String,
    pub activity_count: i64,
    pub inflow_quantity: Decimal,
    pub outflow_quantity: Decimal,
    pub net_quantity: Decimal,
    pub current_stock: Decimal,
    pub turnover_rate: Decimal,
}

/// Activity bucket for one ISO weekday
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayReportRow {
    pub weekday: Weekday,
    pub activities: i64,
    pub inflows: i64,
    pub outflows: i64,
    pub percentage: Decimal,
}

/// Rows of a dimension report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "dimension", content = "rows", rename_all = "lowercase")]
pub enum ReportRows {
    Category(Vec<CategoryReportRow>),
    Project(Vec<ProjectReportRow>),
    Material(Vec<MaterialReportRow>),
    Weekday(Vec<WeekdayReportRow>),
}

/// A dimension report for one window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub period: ReportPeriod,
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub rows: ReportRows,
}

/// Change of one metric between the current and the previous window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendDelta {
    pub current: Decimal,
    pub previous: Decimal,
    pub percent_change: Decimal,
}

impl TrendDelta {
    pub fn new(current: Decimal, previous: Decimal) -> Self {
        Self {
            current,
            previous,
            percent_change: percent_change(current, previous),
        }
    }
}

/// Trend deltas between two adjacent windows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub window_days: i64,
    pub inflow_count: TrendDelta,
    pub outflow_count: TrendDelta,
    pub activity_count: TrendDelta,
    pub inflow_quantity: TrendDelta,
    pub outflow_quantity: TrendDelta,
}

/// A low-stock material ranked by how urgently it needs restocking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalStockAlert {
    pub snapshot: StockSnapshot,
    pub recent_activity_count: i64,
    pub deficit: Decimal,
    pub criticality_score: Decimal,
}

/// Outflow awaiting return, with its computed state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutstandingReturn {
    pub outflow: super::OutflowEvent,
    pub material_name: String,
    pub status: ReturnStatus,
}

/// Headline figures for one window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub period: ReportPeriod,
    pub generated_at: DateTime<Utc>,
    pub inflow_count: i64,
    pub inflow_quantity: Decimal,
    pub inflow_value: Decimal,
    pub outflow_count: i64,
    pub outflow_quantity: Decimal,
    pub outflow_value: Decimal,
    pub material_count: i64,
    pub low_stock_count: i64,
    pub out_of_stock_count: i64,
    pub health_percent: Decimal,
    pub trends: TrendReport,
    pub critical_alerts: Vec<CriticalStockAlert>,
}

fn hundred() -> Decimal {
    Decimal::ONE_HUNDRED
}

/// `part / whole × 100`, rounded to two places; zero when `whole` is zero
pub fn percentage(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        Decimal::ZERO
    } else {
        (part / whole * hundred()).round_dp(2)
    }
}

/// Share of materials that are not out of stock
pub fn fleet_health_percent(snapshots: &[StockSnapshot]) -> Decimal {
    let healthy = snapshots
        .iter()
        .filter(|s| s.status != StockStatus::OutOfStock)
        .count();
    percentage(Decimal::from(healthy), Decimal::from(snapshots.len()))
}

/// Total outflow divided by current stock, with stock floored at one.
///
/// A ratio of stock-equivalents moved, not a rate over time.
pub fn turnover_rate(total_outflow: Decimal, current_stock: Decimal) -> Decimal {
    total_outflow / current_stock.max(Decimal::ONE)
}

/// Recent activity weighted by how far stock sits below its minimum
pub fn criticality_score(
    recent_activity_count: i64,
    min_stock_level: Decimal,
    current_stock: Decimal,
) -> Decimal {
    Decimal::from(recent_activity_count) * stock_deficit(min_stock_level, current_stock)
}

pub fn stock_deficit(min_stock_level: Decimal, current_stock: Decimal) -> Decimal {
    (min_stock_level - current_stock).max(Decimal::ZERO)
}

/// Percent change from `previous` to `current`.
///
/// With no previous activity any current activity counts as a 100% rise.
pub fn percent_change(current: Decimal, previous: Decimal) -> Decimal {
    if previous.is_zero() {
        if current > Decimal::ZERO {
            hundred()
        } else {
            Decimal::ZERO
        }
    } else {
        ((current - previous) / previous * hundred()).round_dp(2)
    }
}

/// Monday-first bucket index (Monday = 0, Sunday = 6)
pub fn weekday_index(weekday: Weekday) -> usize {
    weekday.num_days_from_monday() as usize
}

pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];
