//! Merged inflow/outflow activity stream

use shared::{ActivityRecord, EventKind, InflowEvent, OutflowEvent};

use super::directory::ReferenceDirectory;
use crate::error::AppResult;
use crate::store::DynEventStore;

/// Merge both event kinds into one stream, newest first, at most `limit` long
pub fn merge_activity(
    inflows: &[InflowEvent],
    outflows: &[OutflowEvent],
    directory: &ReferenceDirectory,
    limit: usize,
) -> Vec<ActivityRecord> {
    let inflow_records = inflows.iter().map(|e| ActivityRecord {
        id: e.id,
        kind: EventKind::Inflow,
        material_id: e.material_id,
        material_name: directory.material_name(e.material_id),
        quantity: e.quantity,
        unit_abbreviation: directory.unit_abbreviation(e.unit_id),
        project_name: directory.project_name(e.project_id),
        date: e.delivery_date,
        person: e.received_by.clone(),
        created_at: e.created_at,
    });
    let outflow_records = outflows.iter().map(|e| ActivityRecord {
        id: e.id,
        kind: EventKind::Outflow,
        material_id: e.material_id,
        material_name: directory.material_name(e.material_id),
        quantity: e.quantity,
        unit_abbreviation: directory.unit_abbreviation(e.unit_id),
        project_name: directory.project_name(e.project_id),
        date: e.release_date,
        person: e.authorized_by.clone(),
        created_at: e.created_at,
    });

    let mut records: Vec<ActivityRecord> = inflow_records.chain(outflow_records).collect();
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    records.truncate(limit);
    records
}

/// Recent activity across the whole ledger
#[derive(Clone)]
pub struct ActivityFeed {
    store: DynEventStore,
}

impl ActivityFeed {
    pub fn new(store: DynEventStore) -> Self {
        Self { store }
    }

    pub async fn recent(&self, limit: usize) -> AppResult<Vec<ActivityRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        // The newest `limit` of the merged stream are among the newest `limit` of each kind
        let inflows = self.store.recent_inflows(limit).await?;
        let outflows = self.store.recent_outflows(limit).await?;
        let directory = ReferenceDirectory::load(self.store.as_ref()).await?;
        Ok(merge_activity(&inflows, &outflows, &directory, limit))
    }
}
