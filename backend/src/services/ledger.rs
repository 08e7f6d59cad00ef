//! Ledger boundary operations
//!
//! Every stock-moving write runs in a [`MaterialTx`](crate::store::MaterialTx)
//! holding the material's lock: the availability check and the write it guards
//! commit together or not at all. Reads are lock-free.

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{
    validate_inflow_patch, validate_new_inflow, validate_new_outflow, validate_outflow_patch,
    validate_return_date, ActivityRecord, Actor, Dashboard, EventFilter, EventKind, EventPatch,
    InflowEvent, LedgerEvent, NewInflow, NewOutflow, OutflowEvent, OutstandingReturn,
    ReferenceKind, Report, ReportDimension, ReportPeriod, ReturnStatus, StockSnapshot,
};
use uuid::Uuid;

use super::activity::ActivityFeed;
use super::availability::AvailabilityValidator;
use super::classifier::ThresholdClassifier;
use super::directory::ReferenceDirectory;
use super::reporting::ReportAggregator;
use super::stock::StockAggregator;
use crate::config::LedgerConfig;
use crate::error::{AppError, AppResult};
use crate::store::{DynEventStore, MaterialTx};

/// One material's snapshot, or every active material's
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SnapshotView {
    Single(StockSnapshot),
    All(Vec<StockSnapshot>),
}

/// Records stock movements and answers questions about them
#[derive(Clone)]
pub struct LedgerService {
    store: DynEventStore,
    config: LedgerConfig,
    stock: StockAggregator,
    validator: AvailabilityValidator,
    classifier: ThresholdClassifier,
    reports: ReportAggregator,
    feed: ActivityFeed,
}

impl LedgerService {
    pub fn new(store: DynEventStore, config: LedgerConfig) -> Self {
        Self {
            stock: StockAggregator::new(store.clone()),
            validator: AvailabilityValidator::new(),
            classifier: ThresholdClassifier::new(config.efficiency_factor),
            reports: ReportAggregator::new(store.clone(), config.clone()),
            feed: ActivityFeed::new(store.clone()),
            store,
            config,
        }
    }

    /// Unit and project must exist and be active to receive new events. Both
    /// stay pinned until the transaction ends.
    async fn ensure_usable(
        tx: &mut dyn MaterialTx,
        unit_id: Uuid,
        project_id: Uuid,
    ) -> AppResult<()> {
        Self::hold(tx, ReferenceKind::Unit, unit_id).await?;
        Self::hold(tx, ReferenceKind::Project, project_id).await
    }

    async fn hold(tx: &mut dyn MaterialTx, kind: ReferenceKind, id: Uuid) -> AppResult<()> {
        if tx.hold_reference(kind, id).await? {
            Ok(())
        } else {
            Err(AppError::not_found(kind))
        }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Record a receipt of material
    #[tracing::instrument(
        skip(self, actor, input),
        fields(actor = %actor.user_id, material_id = %input.material_id, quantity = %input.quantity)
    )]
    pub async fn record_inflow(&self, actor: &Actor, input: NewInflow) -> AppResult<InflowEvent> {
        validate_new_inflow(&input)?;
        let event = InflowEvent::new(input, actor.user_id, Utc::now())?;

        let mut tx = self.store.begin_material(event.material_id).await?;
        if !tx.material().is_active {
            return Err(AppError::not_found(ReferenceKind::Material));
        }
        Self::ensure_usable(tx.as_mut(), event.unit_id, event.project_id).await?;

        tx.insert_inflow(&event).await?;
        tx.commit().await?;

        tracing::info!(inflow_id = %event.id, "inflow recorded");
        Ok(event)
    }

    /// Record a release of material, refusing to overdraw its unit ledger
    #[tracing::instrument(
        skip(self, actor, input),
        fields(actor = %actor.user_id, material_id = %input.material_id, quantity = %input.quantity)
    )]
    pub async fn record_outflow(&self, actor: &Actor, input: NewOutflow) -> AppResult<OutflowEvent> {
        validate_new_outflow(&input)?;
        let event = OutflowEvent::new(input, actor.user_id, Utc::now())?;

        let mut tx = self.store.begin_material(event.material_id).await?;
        Self::ensure_usable(tx.as_mut(), event.unit_id, event.project_id).await?;
        if let Err(err) = self
            .validator
            .authorize(tx.as_mut(), event.unit_id, event.quantity)
            .await
        {
            tracing::warn!(error = %err, "outflow rejected");
            return Err(err);
        }

        tx.insert_outflow(&event).await?;
        tx.commit().await?;

        tracing::info!(outflow_id = %event.id, "outflow recorded");
        Ok(event)
    }

    /// Apply a partial update. Quantity changes are re-validated against stock.
    #[tracing::instrument(skip(self, actor, patch), fields(actor = %actor.user_id, kind = %patch.kind()))]
    pub async fn update_event(
        &self,
        actor: &Actor,
        id: Uuid,
        patch: EventPatch,
    ) -> AppResult<LedgerEvent> {
        let now = Utc::now();
        match patch {
            EventPatch::Inflow(patch) => {
                validate_inflow_patch(&patch)?;
                let material_id = self.event_material(EventKind::Inflow, id).await?;

                let mut tx = self.store.begin_material(material_id).await?;
                let mut event = tx
                    .inflow(id)
                    .await?
                    .ok_or_else(|| event_not_found(EventKind::Inflow))?;
                if let Some(project_id) = patch.project_id {
                    Self::hold(tx.as_mut(), ReferenceKind::Project, project_id).await?;
                }

                let old_quantity = event.quantity;
                event.apply(patch, now)?;
                self.validator
                    .ensure_retractable(tx.as_mut(), event.unit_id, old_quantity - event.quantity)
                    .await
                    .map_err(log_rejection)?;

                tx.update_inflow(&event).await?;
                tx.commit().await?;
                tracing::info!(inflow_id = %event.id, "inflow updated");
                Ok(LedgerEvent::Inflow(event))
            }
            EventPatch::Outflow(patch) => {
                validate_outflow_patch(&patch)?;
                let material_id = self.event_material(EventKind::Outflow, id).await?;

                let mut tx = self.store.begin_material(material_id).await?;
                let mut event = tx
                    .outflow(id)
                    .await?
                    .ok_or_else(|| event_not_found(EventKind::Outflow))?;
                if let Some(project_id) = patch.project_id {
                    Self::hold(tx.as_mut(), ReferenceKind::Project, project_id).await?;
                }

                let old_quantity = event.quantity;
                event.apply(patch, now)?;
                validate_return_date(event.release_date, event.return_date)
                    .map_err(|msg| AppError::validation("return_date", msg))?;
                if event.quantity > old_quantity {
                    self.validator
                        .authorize_with_credit(
                            tx.as_mut(),
                            event.unit_id,
                            event.quantity,
                            old_quantity,
                        )
                        .await
                        .map_err(log_rejection)?;
                }

                tx.update_outflow(&event).await?;
                tx.commit().await?;
                tracing::info!(outflow_id = %event.id, "outflow updated");
                Ok(LedgerEvent::Outflow(event))
            }
        }
    }

    /// Hard-delete an event. Deleting an inflow may not leave its ledger negative.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn delete_event(&self, actor: &Actor, kind: EventKind, id: Uuid) -> AppResult<()> {
        let material_id = self.event_material(kind, id).await?;
        let mut tx = self.store.begin_material(material_id).await?;

        let deleted = match kind {
            EventKind::Inflow => match tx.inflow(id).await? {
                Some(event) => {
                    self.validator
                        .ensure_retractable(tx.as_mut(), event.unit_id, event.quantity)
                        .await
                        .map_err(log_rejection)?;
                    tx.delete_inflow(id).await?
                }
                None => false,
            },
            EventKind::Outflow => tx.delete_outflow(id).await?,
        };
        if !deleted {
            return Err(event_not_found(kind));
        }

        tx.commit().await?;
        tracing::info!(%id, "{} deleted", kind);
        Ok(())
    }

    /// Close an outflow's return loop. Only pending or overdue returns qualify.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn mark_returned(&self, actor: &Actor, outflow_id: Uuid) -> AppResult<OutflowEvent> {
        let material_id = self.event_material(EventKind::Outflow, outflow_id).await?;
        let mut tx = self.store.begin_material(material_id).await?;
        let mut event = tx
            .outflow(outflow_id)
            .await?
            .ok_or_else(|| event_not_found(EventKind::Outflow))?;

        let now = Utc::now();
        match event.return_status(now) {
            ReturnStatus::Released => {
                return Err(AppError::validation(
                    "return_date",
                    "Outflow has no return date to be returned against",
                ));
            }
            ReturnStatus::Returned => {
                return Err(AppError::validation(
                    "is_returned",
                    "Outflow is already marked returned",
                ));
            }
            ReturnStatus::PendingReturn | ReturnStatus::OverdueReturn => {}
        }

        event.is_returned = true;
        event.updated_at = now;
        tx.update_outflow(&event).await?;
        tx.commit().await?;

        tracing::info!(%outflow_id, "outflow marked returned");
        Ok(event)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn get_event(&self, _actor: &Actor, kind: EventKind, id: Uuid) -> AppResult<LedgerEvent> {
        let event = match kind {
            EventKind::Inflow => self.store.inflow(id).await?.map(LedgerEvent::Inflow),
            EventKind::Outflow => self.store.outflow(id).await?.map(LedgerEvent::Outflow),
        };
        event.ok_or_else(|| event_not_found(kind))
    }

    /// Events of one kind matching the filter, newest domain date first
    pub async fn list_events(
        &self,
        _actor: &Actor,
        kind: EventKind,
        filter: EventFilter,
    ) -> AppResult<Vec<LedgerEvent>> {
        let events = match kind {
            EventKind::Inflow => self
                .store
                .list_inflows(&filter)
                .await?
                .into_iter()
                .map(LedgerEvent::Inflow)
                .collect(),
            EventKind::Outflow => self
                .store
                .list_outflows(&filter)
                .await?
                .into_iter()
                .map(LedgerEvent::Outflow)
                .collect(),
        };
        Ok(events)
    }

    /// Snapshot of one material, or of every active material when `material_id`
    /// is absent. A `unit_id` narrows a single material to that unit's ledger.
    pub async fn get_stock_snapshot(
        &self,
        _actor: &Actor,
        material_id: Option<Uuid>,
        unit_id: Option<Uuid>,
    ) -> AppResult<SnapshotView> {
        match (material_id, unit_id) {
            (Some(id), unit_id) => {
                let snapshot = self.stock.snapshot(id, unit_id).await?;
                Ok(SnapshotView::Single(snapshot))
            }
            (None, None) => Ok(SnapshotView::All(self.stock.compute_all_stock().await?)),
            (None, Some(_)) => Err(AppError::validation(
                "unit_id",
                "A unit ledger is read per material",
            )),
        }
    }

    /// Low and out-of-stock materials, emptiest first
    pub async fn get_low_stock_alerts(&self, _actor: &Actor) -> AppResult<Vec<StockSnapshot>> {
        let snapshots = self.stock.compute_all_stock().await?;
        Ok(self.classifier.low_stock_alerts(&snapshots))
    }

    #[tracing::instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn get_report(
        &self,
        actor: &Actor,
        period: ReportPeriod,
        dimension: ReportDimension,
    ) -> AppResult<Report> {
        self.reports.report(period, dimension, Utc::now()).await
    }

    #[tracing::instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn get_dashboard(&self, actor: &Actor, period: ReportPeriod) -> AppResult<Dashboard> {
        self.reports.dashboard(period, Utc::now()).await
    }

    /// Merged recent activity. `None` uses the configured default length;
    /// requests above the configured maximum are capped.
    pub async fn get_activity_feed(
        &self,
        _actor: &Actor,
        limit: Option<usize>,
    ) -> AppResult<Vec<ActivityRecord>> {
        let limit = limit
            .unwrap_or(self.config.activity_feed_limit)
            .min(self.config.max_activity_feed_limit);
        self.feed.recent(limit).await
    }

    /// Outflows awaiting return, overdue first, then by due date
    pub async fn list_outstanding_returns(&self, _actor: &Actor) -> AppResult<Vec<OutstandingReturn>> {
        let now = Utc::now();
        let outflows = self.store.list_outflows(&EventFilter::default()).await?;
        let directory = ReferenceDirectory::load(self.store.as_ref()).await?;
        Ok(outstanding_returns(outflows, &directory, now))
    }

    async fn event_material(&self, kind: EventKind, id: Uuid) -> AppResult<Uuid> {
        let material_id = match kind {
            EventKind::Inflow => self.store.inflow(id).await?.map(|e| e.material_id),
            EventKind::Outflow => self.store.outflow(id).await?.map(|e| e.material_id),
        };
        material_id.ok_or_else(|| event_not_found(kind))
    }
}

fn event_not_found(kind: EventKind) -> AppError {
    match kind {
        EventKind::Inflow => AppError::NotFound("Inflow".to_string()),
        EventKind::Outflow => AppError::NotFound("Outflow".to_string()),
    }
}

fn log_rejection(err: AppError) -> AppError {
    tracing::warn!(error = %err, "edit rejected");
    err
}

/// Pending and overdue returns with their computed state
pub fn outstanding_returns(
    outflows: Vec<OutflowEvent>,
    directory: &ReferenceDirectory,
    now: DateTime<Utc>,
) -> Vec<OutstandingReturn> {
    let mut open: Vec<OutstandingReturn> = outflows
        .into_iter()
        .filter_map(|outflow| {
            let status = outflow.return_status(now);
            status.can_mark_returned().then(|| OutstandingReturn {
                material_name: directory.material_name(outflow.material_id),
                outflow,
                status,
            })
        })
        .collect();

    let rank = |status: ReturnStatus| match status {
        ReturnStatus::OverdueReturn => 0,
        _ => 1,
    };
    open.sort_by(|a, b| {
        rank(a.status)
            .cmp(&rank(b.status))
            .then(a.outflow.return_date.cmp(&b.outflow.return_date))
    });
    open
}
