//! Time-windowed reports over the ledger
//!
//! Events are filtered by their domain date (delivery date for inflows, release
//! date for outflows) and grouped by category, project, material or weekday.
//! Groupings are keyed by entity id in ordered maps; names are display only.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Duration, Utc};
use rust_decimal::Decimal;
use shared::{
    criticality_score, percentage, stock_deficit, turnover_rate, weekday_index, CategoryReportRow,
    CriticalStockAlert, Dashboard, DateRange, EventFilter, InflowEvent, Material,
    MaterialReportRow, OutflowEvent, ProjectReportRow, Report, ReportDimension, ReportPeriod,
    ReportRows, StockSnapshot, StockTotals, TrendDelta, TrendReport, WeekdayReportRow, WEEKDAYS,
};
use uuid::Uuid;

use super::classifier::ThresholdClassifier;
use super::directory::ReferenceDirectory;
use super::stock::active_snapshots;
use crate::config::LedgerConfig;
use crate::error::AppResult;
use crate::store::DynEventStore;

// ============================================================================
// Aggregation
// ============================================================================

/// Number of in-window events per material
pub fn activity_by_material(
    inflows: &[InflowEvent],
    outflows: &[OutflowEvent],
) -> HashMap<Uuid, i64> {
    let mut activity: HashMap<Uuid, i64> = HashMap::new();
    let materials = inflows
        .iter()
        .map(|e| e.material_id)
        .chain(outflows.iter().map(|e| e.material_id));
    for material_id in materials {
        *activity.entry(material_id).or_default() += 1;
    }
    activity
}

/// Stock and activity per category, largest total stock first
pub fn category_rows(
    snapshots: &[StockSnapshot],
    activity: &HashMap<Uuid, i64>,
    directory: &ReferenceDirectory,
    classifier: &ThresholdClassifier,
) -> Vec<CategoryReportRow> {
    let empty_row = |category_id: Uuid| CategoryReportRow {
        category_id,
        category_name: directory.category_name(category_id),
        total_stock: Decimal::ZERO,
        material_count: 0,
        low_stock_count: 0,
        out_of_stock_count: 0,
        efficient_count: 0,
        efficiency_percent: Decimal::ZERO,
        activity_count: 0,
    };

    let mut rows: BTreeMap<Uuid, CategoryReportRow> = directory
        .categories
        .values()
        .filter(|c| c.is_active)
        .map(|c| (c.id, empty_row(c.id)))
        .collect();

    for snapshot in snapshots {
        let row = rows
            .entry(snapshot.category_id)
            .or_insert_with(|| empty_row(snapshot.category_id));
        row.total_stock += snapshot.current_stock;
        row.material_count += 1;
        match snapshot.status {
            shared::StockStatus::LowStock => row.low_stock_count += 1,
            shared::StockStatus::OutOfStock => row.out_of_stock_count += 1,
            shared::StockStatus::InStock => {}
        }
        if classifier.is_efficient(snapshot) {
            row.efficient_count += 1;
        }
    }

    for (material_id, count) in activity {
        if let Some(material) = directory.materials.get(material_id) {
            rows.entry(material.category_id)
                .or_insert_with(|| empty_row(material.category_id))
                .activity_count += count;
        }
    }

    let mut rows: Vec<CategoryReportRow> = rows
        .into_values()
        .map(|mut row| {
            row.efficiency_percent = percentage(
                Decimal::from(row.efficient_count),
                Decimal::from(row.material_count),
            );
            row
        })
        .collect();
    rows.sort_by(|a, b| {
        b.total_stock
            .cmp(&a.total_stock)
            .then_with(|| a.category_name.cmp(&b.category_name))
    });
    rows
}

/// Movement totals per project, busiest first
pub fn project_rows(
    inflows: &[InflowEvent],
    outflows: &[OutflowEvent],
    directory: &ReferenceDirectory,
) -> Vec<ProjectReportRow> {
    let empty_row = |project_id: Uuid| ProjectReportRow {
        project_id,
        project_name: directory.project_name(project_id),
        inflow_count: 0,
        inflow_quantity: Decimal::ZERO,
        inflow_value: Decimal::ZERO,
        outflow_count: 0,
        outflow_quantity: Decimal::ZERO,
        outflow_value: Decimal::ZERO,
        activity_count: 0,
        last_activity: None,
    };

    let mut rows: BTreeMap<Uuid, ProjectReportRow> = directory
        .projects
        .values()
        .filter(|p| p.is_active)
        .map(|p| (p.id, empty_row(p.id)))
        .collect();

    fn touch(row: &mut ProjectReportRow, created_at: DateTime<Utc>) {
        row.activity_count += 1;
        row.last_activity = Some(row.last_activity.map_or(created_at, |t| t.max(created_at)));
    }

    for event in inflows {
        let row = rows
            .entry(event.project_id)
            .or_insert_with(|| empty_row(event.project_id));
        row.inflow_count += 1;
        row.inflow_quantity += event.quantity;
        row.inflow_value += event.total_value.unwrap_or_default();
        touch(row, event.created_at);
    }
    for event in outflows {
        let row = rows
            .entry(event.project_id)
            .or_insert_with(|| empty_row(event.project_id));
        row.outflow_count += 1;
        row.outflow_quantity += event.quantity;
        row.outflow_value += event.total_value.unwrap_or_default();
        touch(row, event.created_at);
    }

    let mut rows: Vec<ProjectReportRow> = rows.into_values().collect();
    rows.sort_by(|a, b| {
        b.activity_count
            .cmp(&a.activity_count)
            .then_with(|| a.project_name.cmp(&b.project_name))
    });
    rows
}

/// Top movers: materials with in-window activity, busiest first, at most `limit`
pub fn material_rows(
    inflows: &[InflowEvent],
    outflows: &[OutflowEvent],
    stock: &HashMap<Uuid, StockTotals>,
    directory: &ReferenceDirectory,
    limit: usize,
) -> Vec<MaterialReportRow> {
    let mut rows: BTreeMap<Uuid, MaterialReportRow> = BTreeMap::new();
    let empty_row = |material_id: Uuid| {
        let totals = stock.get(&material_id).copied().unwrap_or_default();
        MaterialReportRow {
            material_id,
            material_name: directory.material_name(material_id),
            activity_count: 0,
            inflow_quantity: Decimal::ZERO,
            outflow_quantity: Decimal::ZERO,
            net_quantity: Decimal::ZERO,
            current_stock: totals.current_stock(),
            turnover_rate: turnover_rate(totals.total_outflow, totals.current_stock()).round_dp(2),
        }
    };

    for event in inflows {
        let row = rows
            .entry(event.material_id)
            .or_insert_with(|| empty_row(event.material_id));
        row.activity_count += 1;
        row.inflow_quantity += event.quantity;
    }
    for event in outflows {
        let row = rows
            .entry(event.material_id)
            .or_insert_with(|| empty_row(event.material_id));
        row.activity_count += 1;
        row.outflow_quantity += event.quantity;
    }

    let mut rows: Vec<MaterialReportRow> = rows
        .into_values()
        .map(|mut row| {
            row.net_quantity = row.inflow_quantity - row.outflow_quantity;
            row
        })
        .collect();
    rows.sort_by(|a, b| {
        b.activity_count
            .cmp(&a.activity_count)
            .then_with(|| a.material_name.cmp(&b.material_name))
    });
    rows.truncate(limit);
    rows
}

/// Seven Monday-first buckets; percentage is relative to the busiest day
pub fn weekday_rows(inflows: &[InflowEvent], outflows: &[OutflowEvent]) -> Vec<WeekdayReportRow> {
    let mut inflow_counts = [0i64; 7];
    let mut outflow_counts = [0i64; 7];
    for event in inflows {
        inflow_counts[weekday_index(event.delivery_date.weekday())] += 1;
    }
    for event in outflows {
        outflow_counts[weekday_index(event.release_date.weekday())] += 1;
    }

    let busiest = (0..7)
        .map(|i| inflow_counts[i] + outflow_counts[i])
        .max()
        .unwrap_or(0);

    WEEKDAYS
        .iter()
        .enumerate()
        .map(|(i, weekday)| {
            let activities = inflow_counts[i] + outflow_counts[i];
            WeekdayReportRow {
                weekday: *weekday,
                activities,
                inflows: inflow_counts[i],
                outflows: outflow_counts[i],
                percentage: percentage(Decimal::from(activities), Decimal::from(busiest)),
            }
        })
        .collect()
}

#[derive(Debug, Default, Clone, Copy)]
struct WindowTotals {
    inflow_count: i64,
    outflow_count: i64,
    inflow_quantity: Decimal,
    outflow_quantity: Decimal,
}

fn window_totals(
    inflows: &[InflowEvent],
    outflows: &[OutflowEvent],
    range: DateRange,
) -> WindowTotals {
    let mut totals = WindowTotals::default();
    for event in inflows.iter().filter(|e| range.contains(e.delivery_date)) {
        totals.inflow_count += 1;
        totals.inflow_quantity += event.quantity;
    }
    for event in outflows.iter().filter(|e| range.contains(e.release_date)) {
        totals.outflow_count += 1;
        totals.outflow_quantity += event.quantity;
    }
    totals
}

/// Compare the window ending at `now` with the window before it
pub fn trend_report(
    inflows: &[InflowEvent],
    outflows: &[OutflowEvent],
    now: DateTime<Utc>,
    window_days: i64,
) -> TrendReport {
    let window = Duration::days(window_days);
    let current = window_totals(
        inflows,
        outflows,
        DateRange::new(Some(now - window), Some(now)),
    );
    // Previous window excludes its upper bound, which belongs to the current one
    let previous_end = now - window - Duration::nanoseconds(1);
    let previous = window_totals(
        inflows,
        outflows,
        DateRange::new(Some(now - window - window), Some(previous_end)),
    );

    let delta = |c: i64, p: i64| TrendDelta::new(Decimal::from(c), Decimal::from(p));
    TrendReport {
        window_days,
        inflow_count: delta(current.inflow_count, previous.inflow_count),
        outflow_count: delta(current.outflow_count, previous.outflow_count),
        activity_count: delta(
            current.inflow_count + current.outflow_count,
            previous.inflow_count + previous.outflow_count,
        ),
        inflow_quantity: TrendDelta::new(current.inflow_quantity, previous.inflow_quantity),
        outflow_quantity: TrendDelta::new(current.outflow_quantity, previous.outflow_quantity),
    }
}

/// Low and out-of-stock materials ranked by criticality score, at most `limit`
pub fn critical_alerts(
    snapshots: &[StockSnapshot],
    activity: &HashMap<Uuid, i64>,
    limit: usize,
) -> Vec<CriticalStockAlert> {
    let mut alerts: Vec<CriticalStockAlert> = snapshots
        .iter()
        .filter(|s| s.status.needs_attention())
        .map(|s| {
            let recent = activity.get(&s.material_id).copied().unwrap_or(0);
            CriticalStockAlert {
                snapshot: s.clone(),
                recent_activity_count: recent,
                deficit: stock_deficit(s.min_stock_level, s.current_stock),
                criticality_score: criticality_score(recent, s.min_stock_level, s.current_stock),
            }
        })
        .collect();
    alerts.sort_by(|a, b| {
        b.criticality_score
            .cmp(&a.criticality_score)
            .then(b.deficit.cmp(&a.deficit))
            .then_with(|| a.snapshot.material_name.cmp(&b.snapshot.material_name))
    });
    alerts.truncate(limit);
    alerts
}

// ============================================================================
// Service
// ============================================================================

/// Builds reports and the dashboard from one consistent ledger read
#[derive(Clone)]
pub struct ReportAggregator {
    store: DynEventStore,
    classifier: ThresholdClassifier,
    config: LedgerConfig,
}

impl ReportAggregator {
    pub fn new(store: DynEventStore, config: LedgerConfig) -> Self {
        Self {
            store,
            classifier: ThresholdClassifier::new(config.efficiency_factor),
            config,
        }
    }

    pub async fn report(
        &self,
        period: ReportPeriod,
        dimension: ReportDimension,
        now: DateTime<Utc>,
    ) -> AppResult<Report> {
        let filter = EventFilter::in_range(DateRange::new(period.cutoff(now), None));
        let view = self.store.read_ledger(&filter).await?;
        let directory = ReferenceDirectory::load(self.store.as_ref()).await?;

        let rows = match dimension {
            ReportDimension::Category => {
                let snapshots = active_snapshots(&materials_of(&directory), &view.stock);
                let activity = activity_by_material(&view.inflows, &view.outflows);
                ReportRows::Category(category_rows(
                    &snapshots,
                    &activity,
                    &directory,
                    &self.classifier,
                ))
            }
            ReportDimension::Project => {
                ReportRows::Project(project_rows(&view.inflows, &view.outflows, &directory))
            }
            ReportDimension::Material => ReportRows::Material(material_rows(
                &view.inflows,
                &view.outflows,
                &view.stock,
                &directory,
                self.config.top_movers_limit,
            )),
            ReportDimension::Weekday => {
                ReportRows::Weekday(weekday_rows(&view.inflows, &view.outflows))
            }
        };

        Ok(Report {
            period,
            generated_at: now,
            rows,
        })
    }

    pub async fn dashboard(&self, period: ReportPeriod, now: DateTime<Utc>) -> AppResult<Dashboard> {
        // Read wide enough to cover both the period and the two trend windows
        let trend_start = now - Duration::days(self.config.trend_window_days * 2);
        let from = period.cutoff(now).map(|cutoff| cutoff.min(trend_start));
        let view = self
            .store
            .read_ledger(&EventFilter::in_range(DateRange::new(from, None)))
            .await?;
        let directory = ReferenceDirectory::load(self.store.as_ref()).await?;

        let inflows: Vec<InflowEvent> = view
            .inflows
            .iter()
            .filter(|e| period.contains(e.delivery_date, now))
            .cloned()
            .collect();
        let outflows: Vec<OutflowEvent> = view
            .outflows
            .iter()
            .filter(|e| period.contains(e.release_date, now))
            .cloned()
            .collect();

        let snapshots = active_snapshots(&materials_of(&directory), &view.stock);
        let summary = self.classifier.summarize(&snapshots);
        let activity = activity_by_material(&inflows, &outflows);

        let value = |total: Option<Decimal>| total.unwrap_or_default();
        Ok(Dashboard {
            period,
            generated_at: now,
            inflow_count: inflows.len() as i64,
            inflow_quantity: inflows.iter().map(|e| e.quantity).sum(),
            inflow_value: inflows.iter().map(|e| value(e.total_value)).sum(),
            outflow_count: outflows.len() as i64,
            outflow_quantity: outflows.iter().map(|e| e.quantity).sum(),
            outflow_value: outflows.iter().map(|e| value(e.total_value)).sum(),
            material_count: summary.material_count,
            low_stock_count: summary.low_stock_count,
            out_of_stock_count: summary.out_of_stock_count,
            health_percent: summary.health_percent,
            trends: trend_report(
                &view.inflows,
                &view.outflows,
                now,
                self.config.trend_window_days,
            ),
            critical_alerts: critical_alerts(
                &snapshots,
                &activity,
                self.config.critical_alert_limit,
            ),
        })
    }
}

fn materials_of(directory: &ReferenceDirectory) -> Vec<Material> {
    let mut materials: Vec<Material> = directory.materials.values().cloned().collect();
    materials.sort_by(|a, b| a.name.cmp(&b.name));
    materials
}
