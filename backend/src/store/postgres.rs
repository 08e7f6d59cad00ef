//! PostgreSQL event store
//!
//! Writes lock the material row with `SELECT ... FOR UPDATE` so that the
//! availability check and the insert happen under one lock. The unit and
//! project an event points at are held `FOR SHARE` until commit, and
//! deactivation takes the row `FOR UPDATE`, so the two serialize. Report reads run in
//! a `REPEATABLE READ READ ONLY` transaction so every figure comes from the
//! same snapshot.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{
    Dependents, EventFilter, InflowEvent, Material, MaterialUnit, NamedEntity, OutflowEvent,
    ReferenceKind, StockTotals, Unit,
};
use sqlx::{postgres::PgPool, Executor, FromRow, Postgres, Transaction};
use uuid::Uuid;

use super::{Deactivation, EventStore, LedgerView, MaterialTx};
use crate::error::{AppError, AppResult};

const INFLOW_COLUMNS: &str = "id, material_id, unit_id, project_id, quantity, unit_price, \
     total_value, delivery_date, received_by, supplier_name, purpose, batch_number, \
     expiry_date, created_by, created_at, updated_at";

const OUTFLOW_COLUMNS: &str = "id, material_id, unit_id, project_id, quantity, unit_price, \
     total_value, release_date, authorized_by, received_by, purpose, return_date, \
     is_returned, created_by, created_at, updated_at";

const MATERIAL_COLUMNS: &str = "id, name, category_id, min_stock_level, is_active, created_at";

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, FromRow)]
struct MaterialRow {
    id: Uuid,
    name: String,
    category_id: Uuid,
    min_stock_level: Decimal,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<MaterialRow> for Material {
    fn from(row: MaterialRow) -> Self {
        Material {
            id: row.id,
            name: row.name,
            category_id: row.category_id,
            min_stock_level: row.min_stock_level,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct UnitRow {
    id: Uuid,
    name: String,
    abbreviation: String,
    is_active: bool,
}

impl From<UnitRow> for Unit {
    fn from(row: UnitRow) -> Self {
        Unit {
            id: row.id,
            name: row.name,
            abbreviation: row.abbreviation,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, FromRow)]
struct NamedRow {
    id: Uuid,
    name: String,
    is_active: bool,
}

impl From<NamedRow> for NamedEntity {
    fn from(row: NamedRow) -> Self {
        NamedEntity {
            id: row.id,
            name: row.name,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, FromRow)]
struct MaterialUnitRow {
    material_id: Uuid,
    unit_id: Uuid,
    conversion_factor: Decimal,
}

#[derive(Debug, FromRow)]
struct InflowRow {
    id: Uuid,
    material_id: Uuid,
    unit_id: Uuid,
    project_id: Uuid,
    quantity: Decimal,
    unit_price: Option<Decimal>,
    total_value: Option<Decimal>,
    delivery_date: DateTime<Utc>,
    received_by: String,
    supplier_name: String,
    purpose: String,
    batch_number: Option<String>,
    expiry_date: Option<NaiveDate>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<InflowRow> for InflowEvent {
    fn from(row: InflowRow) -> Self {
        InflowEvent {
            id: row.id,
            material_id: row.material_id,
            unit_id: row.unit_id,
            project_id: row.project_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_value: row.total_value,
            delivery_date: row.delivery_date,
            received_by: row.received_by,
            supplier_name: row.supplier_name,
            purpose: row.purpose,
            batch_number: row.batch_number,
            expiry_date: row.expiry_date,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct OutflowRow {
    id: Uuid,
    material_id: Uuid,
    unit_id: Uuid,
    project_id: Uuid,
    quantity: Decimal,
    unit_price: Option<Decimal>,
    total_value: Option<Decimal>,
    release_date: DateTime<Utc>,
    authorized_by: String,
    received_by: String,
    purpose: String,
    return_date: Option<DateTime<Utc>>,
    is_returned: bool,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OutflowRow> for OutflowEvent {
    fn from(row: OutflowRow) -> Self {
        OutflowEvent {
            id: row.id,
            material_id: row.material_id,
            unit_id: row.unit_id,
            project_id: row.project_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_value: row.total_value,
            release_date: row.release_date,
            authorized_by: row.authorized_by,
            received_by: row.received_by,
            purpose: row.purpose,
            return_date: row.return_date,
            is_returned: row.is_returned,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct TotalsRow {
    total_inflow: Decimal,
    total_outflow: Decimal,
}

#[derive(Debug, FromRow)]
struct MaterialTotalsRow {
    material_id: Uuid,
    total_inflow: Decimal,
    total_outflow: Decimal,
}

// ============================================================================
// Shared queries
// ============================================================================

fn table(kind: ReferenceKind) -> &'static str {
    match kind {
        ReferenceKind::Material => "materials",
        ReferenceKind::Unit => "units",
        ReferenceKind::Project => "projects",
        ReferenceKind::Category => "categories",
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map_or(false, |code| code == "23505")
}

fn duplicate_or(kind: ReferenceKind, name: &str) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
    move |err| {
        if is_unique_violation(&err) {
            AppError::DuplicateName {
                entity: kind,
                name: name.to_string(),
            }
        } else {
            AppError::DatabaseError(err)
        }
    }
}

async fn fetch_inflows<'e, E>(executor: E, filter: &EventFilter) -> Result<Vec<InflowEvent>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        r#"
        SELECT {INFLOW_COLUMNS}
        FROM inflows
        WHERE ($1::uuid IS NULL OR material_id = $1)
          AND ($2::uuid IS NULL OR unit_id = $2)
          AND ($3::uuid IS NULL OR project_id = $3)
          AND ($4::timestamptz IS NULL OR delivery_date >= $4)
          AND ($5::timestamptz IS NULL OR delivery_date <= $5)
        ORDER BY delivery_date DESC, created_at DESC
        "#
    );
    let rows = sqlx::query_as::<_, InflowRow>(&sql)
        .bind(filter.material_id)
        .bind(filter.unit_id)
        .bind(filter.project_id)
        .bind(filter.range.from)
        .bind(filter.range.to)
        .fetch_all(executor)
        .await?;
    Ok(rows.into_iter().map(InflowEvent::from).collect())
}

async fn fetch_outflows<'e, E>(
    executor: E,
    filter: &EventFilter,
) -> Result<Vec<OutflowEvent>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        r#"
        SELECT {OUTFLOW_COLUMNS}
        FROM outflows
        WHERE ($1::uuid IS NULL OR material_id = $1)
          AND ($2::uuid IS NULL OR unit_id = $2)
          AND ($3::uuid IS NULL OR project_id = $3)
          AND ($4::timestamptz IS NULL OR release_date >= $4)
          AND ($5::timestamptz IS NULL OR release_date <= $5)
        ORDER BY release_date DESC, created_at DESC
        "#
    );
    let rows = sqlx::query_as::<_, OutflowRow>(&sql)
        .bind(filter.material_id)
        .bind(filter.unit_id)
        .bind(filter.project_id)
        .bind(filter.range.from)
        .bind(filter.range.to)
        .fetch_all(executor)
        .await?;
    Ok(rows.into_iter().map(OutflowEvent::from).collect())
}

async fn fetch_stock_totals<'e, E>(
    executor: E,
    material_id: Uuid,
    unit_id: Option<Uuid>,
) -> Result<StockTotals, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let row = sqlx::query_as::<_, TotalsRow>(
        r#"
        SELECT
            COALESCE((SELECT SUM(quantity) FROM inflows
                      WHERE material_id = $1 AND ($2::uuid IS NULL OR unit_id = $2)), 0) AS total_inflow,
            COALESCE((SELECT SUM(quantity) FROM outflows
                      WHERE material_id = $1 AND ($2::uuid IS NULL OR unit_id = $2)), 0) AS total_outflow
        "#,
    )
    .bind(material_id)
    .bind(unit_id)
    .fetch_one(executor)
    .await?;
    Ok(StockTotals::new(row.total_inflow, row.total_outflow))
}

async fn fetch_all_stock_totals<'e, E>(executor: E) -> Result<HashMap<Uuid, StockTotals>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let rows = sqlx::query_as::<_, MaterialTotalsRow>(
        r#"
        SELECT material_id,
               COALESCE(SUM(quantity) FILTER (WHERE direction = 'in'), 0) AS total_inflow,
               COALESCE(SUM(quantity) FILTER (WHERE direction = 'out'), 0) AS total_outflow
        FROM (
            SELECT material_id, quantity, 'in' AS direction FROM inflows
            UNION ALL
            SELECT material_id, quantity, 'out' AS direction FROM outflows
        ) movements
        GROUP BY material_id
        "#,
    )
    .fetch_all(executor)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            (
                row.material_id,
                StockTotals::new(row.total_inflow, row.total_outflow),
            )
        })
        .collect())
}

async fn fetch_dependents<'e, E>(
    executor: E,
    kind: ReferenceKind,
    id: Uuid,
) -> Result<Dependents, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let column = match kind {
        ReferenceKind::Material => "material_id",
        ReferenceKind::Unit => "unit_id",
        ReferenceKind::Project => "project_id",
        ReferenceKind::Category => {
            let materials = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM materials WHERE category_id = $1 AND is_active",
            )
            .bind(id)
            .fetch_one(executor)
            .await?;
            return Ok(Dependents {
                materials,
                ..Dependents::default()
            });
        }
    };

    let sql = format!(
        r#"
        SELECT
            (SELECT COUNT(*) FROM inflows WHERE {column} = $1) AS inflows,
            (SELECT COUNT(*) FROM outflows WHERE {column} = $1) AS outflows
        "#
    );
    let (inflows, outflows) = sqlx::query_as::<_, (i64, i64)>(&sql)
        .bind(id)
        .fetch_one(executor)
        .await?;

    Ok(Dependents {
        inflows,
        outflows,
        materials: 0,
    })
}

// ============================================================================
// Store
// ============================================================================

/// Event store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgEventStore {
    db: PgPool,
}

impl PgEventStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    async fn material(&self, id: Uuid) -> AppResult<Option<Material>> {
        let sql = format!("SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = $1");
        let row = sqlx::query_as::<_, MaterialRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(Material::from))
    }

    async fn list_materials(&self) -> AppResult<Vec<Material>> {
        let sql = format!("SELECT {MATERIAL_COLUMNS} FROM materials ORDER BY name");
        let rows = sqlx::query_as::<_, MaterialRow>(&sql)
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Material::from).collect())
    }

    async fn unit(&self, id: Uuid) -> AppResult<Option<Unit>> {
        let row = sqlx::query_as::<_, UnitRow>(
            "SELECT id, name, abbreviation, is_active FROM units WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Unit::from))
    }

    async fn list_units(&self) -> AppResult<Vec<Unit>> {
        let rows = sqlx::query_as::<_, UnitRow>(
            "SELECT id, name, abbreviation, is_active FROM units ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Unit::from).collect())
    }

    async fn named(&self, kind: ReferenceKind, id: Uuid) -> AppResult<Option<NamedEntity>> {
        let sql = format!(
            "SELECT id, name, is_active FROM {} WHERE id = $1",
            table(kind)
        );
        let row = sqlx::query_as::<_, NamedRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(NamedEntity::from))
    }

    async fn list_named(&self, kind: ReferenceKind) -> AppResult<Vec<NamedEntity>> {
        let sql = format!("SELECT id, name, is_active FROM {} ORDER BY name", table(kind));
        let rows = sqlx::query_as::<_, NamedRow>(&sql)
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(NamedEntity::from).collect())
    }

    async fn material_units(&self, material_id: Uuid) -> AppResult<Vec<MaterialUnit>> {
        let rows = sqlx::query_as::<_, MaterialUnitRow>(
            r#"
            SELECT material_id, unit_id, conversion_factor
            FROM material_units
            WHERE material_id = $1
            "#,
        )
        .bind(material_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| MaterialUnit {
                material_id: row.material_id,
                unit_id: row.unit_id,
                conversion_factor: row.conversion_factor,
            })
            .collect())
    }

    async fn insert_material(&self, material: &Material) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        let category_active = sqlx::query_scalar::<_, bool>(
            "SELECT is_active FROM categories WHERE id = $1 FOR SHARE",
        )
        .bind(material.category_id)
        .fetch_optional(&mut *tx)
        .await?;
        if category_active != Some(true) {
            return Err(AppError::not_found(ReferenceKind::Category));
        }

        sqlx::query(
            r#"
            INSERT INTO materials (id, name, category_id, min_stock_level, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(material.id)
        .bind(&material.name)
        .bind(material.category_id)
        .bind(material.min_stock_level)
        .bind(material.is_active)
        .bind(material.created_at)
        .execute(&mut *tx)
        .await
        .map_err(duplicate_or(ReferenceKind::Material, &material.name))?;
        tx.commit().await?;
        Ok(())
    }

    async fn insert_unit(&self, unit: &Unit) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO units (id, name, abbreviation, is_active) VALUES ($1, $2, $3, $4)",
        )
        .bind(unit.id)
        .bind(&unit.name)
        .bind(&unit.abbreviation)
        .bind(unit.is_active)
        .execute(&self.db)
        .await
        .map_err(duplicate_or(ReferenceKind::Unit, &unit.name))?;
        Ok(())
    }

    async fn insert_named(&self, kind: ReferenceKind, entity: &NamedEntity) -> AppResult<()> {
        let sql = format!(
            "INSERT INTO {} (id, name, is_active) VALUES ($1, $2, $3)",
            table(kind)
        );
        sqlx::query(&sql)
            .bind(entity.id)
            .bind(&entity.name)
            .bind(entity.is_active)
            .execute(&self.db)
            .await
            .map_err(duplicate_or(kind, &entity.name))?;
        Ok(())
    }

    async fn upsert_material_unit(&self, binding: &MaterialUnit) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO material_units (material_id, unit_id, conversion_factor)
            VALUES ($1, $2, $3)
            ON CONFLICT (material_id, unit_id)
            DO UPDATE SET conversion_factor = EXCLUDED.conversion_factor
            "#,
        )
        .bind(binding.material_id)
        .bind(binding.unit_id)
        .bind(binding.conversion_factor)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn name_taken(&self, kind: ReferenceKind, name: &str) -> AppResult<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE LOWER(TRIM(name)) = LOWER(TRIM($1)))",
            table(kind)
        );
        let taken = sqlx::query_scalar::<_, bool>(&sql)
            .bind(name)
            .fetch_one(&self.db)
            .await?;
        Ok(taken)
    }

    async fn deactivate(&self, kind: ReferenceKind, id: Uuid) -> AppResult<Deactivation> {
        let mut tx = self.db.begin().await?;
        let sql = format!("SELECT id FROM {} WHERE id = $1 FOR UPDATE", table(kind));
        let locked = sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Ok(Deactivation::Missing);
        }

        let dependents = fetch_dependents(&mut *tx, kind, id).await?;
        if !dependents.is_empty() {
            return Ok(Deactivation::Blocked(dependents));
        }

        let sql = format!("UPDATE {} SET is_active = FALSE WHERE id = $1", table(kind));
        sqlx::query(&sql).bind(id).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(Deactivation::Deactivated)
    }

    async fn inflow(&self, id: Uuid) -> AppResult<Option<InflowEvent>> {
        let sql = format!("SELECT {INFLOW_COLUMNS} FROM inflows WHERE id = $1");
        let row = sqlx::query_as::<_, InflowRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(InflowEvent::from))
    }

    async fn outflow(&self, id: Uuid) -> AppResult<Option<OutflowEvent>> {
        let sql = format!("SELECT {OUTFLOW_COLUMNS} FROM outflows WHERE id = $1");
        let row = sqlx::query_as::<_, OutflowRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(OutflowEvent::from))
    }

    async fn list_inflows(&self, filter: &EventFilter) -> AppResult<Vec<InflowEvent>> {
        Ok(fetch_inflows(&self.db, filter).await?)
    }

    async fn list_outflows(&self, filter: &EventFilter) -> AppResult<Vec<OutflowEvent>> {
        Ok(fetch_outflows(&self.db, filter).await?)
    }

    async fn recent_inflows(&self, limit: usize) -> AppResult<Vec<InflowEvent>> {
        let sql = format!(
            "SELECT {INFLOW_COLUMNS} FROM inflows ORDER BY created_at DESC LIMIT $1"
        );
        let rows = sqlx::query_as::<_, InflowRow>(&sql)
            .bind(limit as i64)
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(InflowEvent::from).collect())
    }

    async fn recent_outflows(&self, limit: usize) -> AppResult<Vec<OutflowEvent>> {
        let sql = format!(
            "SELECT {OUTFLOW_COLUMNS} FROM outflows ORDER BY created_at DESC LIMIT $1"
        );
        let rows = sqlx::query_as::<_, OutflowRow>(&sql)
            .bind(limit as i64)
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(OutflowEvent::from).collect())
    }

    async fn stock_totals(
        &self,
        material_id: Uuid,
        unit_id: Option<Uuid>,
    ) -> AppResult<StockTotals> {
        Ok(fetch_stock_totals(&self.db, material_id, unit_id).await?)
    }

    async fn all_stock_totals(&self) -> AppResult<HashMap<Uuid, StockTotals>> {
        Ok(fetch_all_stock_totals(&self.db).await?)
    }

    async fn read_ledger(&self, filter: &EventFilter) -> AppResult<LedgerView> {
        let mut tx = self.db.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let inflows = fetch_inflows(&mut *tx, filter).await?;
        let outflows = fetch_outflows(&mut *tx, filter).await?;
        let stock = fetch_all_stock_totals(&mut *tx).await?;
        tx.commit().await?;

        Ok(LedgerView {
            inflows,
            outflows,
            stock,
        })
    }

    async fn begin_material(&self, material_id: Uuid) -> AppResult<Box<dyn MaterialTx>> {
        let mut tx = self.db.begin().await?;
        let sql = format!("SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = $1 FOR UPDATE");
        let material = sqlx::query_as::<_, MaterialRow>(&sql)
            .bind(material_id)
            .fetch_optional(&mut *tx)
            .await?
            .map(Material::from)
            .ok_or_else(|| AppError::not_found(ReferenceKind::Material))?;

        Ok(Box::new(PgMaterialTx { tx, material }))
    }
}

// ============================================================================
// Material transaction
// ============================================================================

/// Open transaction holding the material row lock until commit or drop
struct PgMaterialTx {
    tx: Transaction<'static, Postgres>,
    material: Material,
}

#[async_trait]
impl MaterialTx for PgMaterialTx {
    fn material(&self) -> &Material {
        &self.material
    }

    async fn hold_reference(&mut self, kind: ReferenceKind, id: Uuid) -> AppResult<bool> {
        let sql = format!("SELECT is_active FROM {} WHERE id = $1 FOR SHARE", table(kind));
        let active = sqlx::query_scalar::<_, bool>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(active == Some(true))
    }

    async fn stock_totals(&mut self, unit_id: Option<Uuid>) -> AppResult<StockTotals> {
        Ok(fetch_stock_totals(&mut *self.tx, self.material.id, unit_id).await?)
    }

    async fn inflow(&mut self, id: Uuid) -> AppResult<Option<InflowEvent>> {
        let sql = format!(
            "SELECT {INFLOW_COLUMNS} FROM inflows WHERE id = $1 AND material_id = $2"
        );
        let row = sqlx::query_as::<_, InflowRow>(&sql)
            .bind(id)
            .bind(self.material.id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(InflowEvent::from))
    }

    async fn outflow(&mut self, id: Uuid) -> AppResult<Option<OutflowEvent>> {
        let sql = format!(
            "SELECT {OUTFLOW_COLUMNS} FROM outflows WHERE id = $1 AND material_id = $2"
        );
        let row = sqlx::query_as::<_, OutflowRow>(&sql)
            .bind(id)
            .bind(self.material.id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(OutflowEvent::from))
    }

    async fn insert_inflow(&mut self, event: &InflowEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inflows (
                id, material_id, unit_id, project_id, quantity, unit_price, total_value,
                delivery_date, received_by, supplier_name, purpose, batch_number,
                expiry_date, created_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(event.id)
        .bind(event.material_id)
        .bind(event.unit_id)
        .bind(event.project_id)
        .bind(event.quantity)
        .bind(event.unit_price)
        .bind(event.total_value)
        .bind(event.delivery_date)
        .bind(&event.received_by)
        .bind(&event.supplier_name)
        .bind(&event.purpose)
        .bind(&event.batch_number)
        .bind(event.expiry_date)
        .bind(event.created_by)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_outflow(&mut self, event: &OutflowEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO outflows (
                id, material_id, unit_id, project_id, quantity, unit_price, total_value,
                release_date, authorized_by, received_by, purpose, return_date,
                is_returned, created_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(event.id)
        .bind(event.material_id)
        .bind(event.unit_id)
        .bind(event.project_id)
        .bind(event.quantity)
        .bind(event.unit_price)
        .bind(event.total_value)
        .bind(event.release_date)
        .bind(&event.authorized_by)
        .bind(&event.received_by)
        .bind(&event.purpose)
        .bind(event.return_date)
        .bind(event.is_returned)
        .bind(event.created_by)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_inflow(&mut self, event: &InflowEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE inflows
            SET project_id = $2, quantity = $3, unit_price = $4, total_value = $5,
                delivery_date = $6, received_by = $7, supplier_name = $8, purpose = $9,
                batch_number = $10, expiry_date = $11, updated_at = $12
            WHERE id = $1
            "#,
        )
        .bind(event.id)
        .bind(event.project_id)
        .bind(event.quantity)
        .bind(event.unit_price)
        .bind(event.total_value)
        .bind(event.delivery_date)
        .bind(&event.received_by)
        .bind(&event.supplier_name)
        .bind(&event.purpose)
        .bind(&event.batch_number)
        .bind(event.expiry_date)
        .bind(event.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_outflow(&mut self, event: &OutflowEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE outflows
            SET project_id = $2, quantity = $3, unit_price = $4, total_value = $5,
                release_date = $6, authorized_by = $7, received_by = $8, purpose = $9,
                return_date = $10, is_returned = $11, updated_at = $12
            WHERE id = $1
            "#,
        )
        .bind(event.id)
        .bind(event.project_id)
        .bind(event.quantity)
        .bind(event.unit_price)
        .bind(event.total_value)
        .bind(event.release_date)
        .bind(&event.authorized_by)
        .bind(&event.received_by)
        .bind(&event.purpose)
        .bind(event.return_date)
        .bind(event.is_returned)
        .bind(event.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_inflow(&mut self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM inflows WHERE id = $1 AND material_id = $2")
            .bind(id)
            .bind(self.material.id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_outflow(&mut self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM outflows WHERE id = $1 AND material_id = $2")
            .bind(id)
            .bind(self.material.id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
