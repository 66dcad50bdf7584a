//! Postgres-backed store.
//!
//! Each unit of work wraps one SQLx transaction. Aggregate roots are locked
//! with `SELECT ... FOR UPDATE`, so concurrent writers touching the same
//! filament, order or job serialize on the row lock. Totals are computed with
//! `SUM` aggregates over indexed foreign keys.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Constraint(<constraint name>)` |
//! | Database (check violation) | `23514` | `Constraint(<constraint name>)` |
//! | Database (foreign key violation) | `23503` | `Constraint(<constraint name>)` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / Io / decoding | N/A | `Backend` |
//!
//! Schema: `crates/infra/migrations/0001_init.sql`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use printworks_core::{
    ColorId, FilamentId, FilamentTransactionId, MaterialId, OrderId, OrderItemId, PrintJobId,
    PrinterId, ProductId, WorkspaceId,
};
use printworks_inventory::{Filament, FilamentTransaction, LedgerTotals, TransactionKind};
use printworks_production::{PrintJob, PrintJobStatus};
use printworks_products::Product;
use printworks_sales::{ItemAttributes, Order, OrderItem};

use super::{Store, StoreError, StoreResult, UnitOfWork};

/// Postgres implementation of [`Store`].
///
/// `Send + Sync`; clones share the same connection pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the bundled schema migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("migration failed: {e}")))
    }
}

#[async_trait]
impl Store for PostgresStore {
    #[instrument(skip(self), err)]
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

const FILAMENT_COLUMNS: &str = "filament_id, workspace_id, material_id, color_id, name, code, \
     current_stock_grams, safety_stock_grams, reorder_point_grams, cost_per_gram, is_available, \
     created_at, updated_at";

const LEDGER_COLUMNS: &str = "t.transaction_id, t.filament_id, t.kind, t.quantity_grams, \
     t.print_job_id, t.previous_stock, t.new_stock, t.reason, t.notes, t.created_by, t.created_at";

const ORDER_COLUMNS: &str = "order_id, workspace_id, order_number, customer_name, currency, \
     total_cost, external_total_cost, totals_locked, external_id, created_at, updated_at";

const ITEM_COLUMNS: &str = "i.order_item_id, i.order_id, i.product_id, i.quantity, i.unit_price, \
     i.total_price, i.is_personalized, i.attributes, i.external_id, i.created_at, i.updated_at";

const JOB_COLUMNS: &str = "job_id, workspace_id, order_item_id, product_id, component_label, \
     printer_id, filament_id, status, priority, estimated_print_minutes, material_used_grams, \
     failure_reason, notes, created_at, started_at, finished_at, updated_at";

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn insert_product(&mut self, product: &Product) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products
                (product_id, workspace_id, sku, title, price, is_personalized, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.workspace_id.as_uuid())
        .bind(product.sku.as_deref())
        .bind(&product.title)
        .bind(product.price)
        .bind(product.is_personalized)
        .bind(product.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(())
    }

    async fn get_product(
        &mut self,
        workspace_id: WorkspaceId,
        product_id: ProductId,
    ) -> StoreResult<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT product_id, workspace_id, sku, title, price, is_personalized, created_at
            FROM products
            WHERE product_id = $1 AND workspace_id = $2
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(workspace_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?;

        row.as_ref().map(product_from_row).transpose()
    }

    async fn insert_filament(&mut self, filament: &Filament) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO filaments ({FILAMENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
        ))
        .bind(filament.id.as_uuid())
        .bind(filament.workspace_id.as_uuid())
        .bind(filament.material_id.as_uuid())
        .bind(filament.color_id.as_uuid())
        .bind(&filament.name)
        .bind(filament.code.as_deref())
        .bind(filament.current_stock_grams)
        .bind(filament.safety_stock_grams)
        .bind(filament.reorder_point_grams)
        .bind(filament.cost_per_gram)
        .bind(filament.is_available)
        .bind(filament.created_at)
        .bind(filament.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_filament", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(workspace_id = %workspace_id, filament_id = %filament_id), err)]
    async fn lock_filament(
        &mut self,
        workspace_id: WorkspaceId,
        filament_id: FilamentId,
    ) -> StoreResult<Option<Filament>> {
        let row = sqlx::query(&format!(
            "SELECT {FILAMENT_COLUMNS} FROM filaments \
             WHERE filament_id = $1 AND workspace_id = $2 FOR UPDATE"
        ))
        .bind(filament_id.as_uuid())
        .bind(workspace_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_filament", e))?;

        row.as_ref().map(filament_from_row).transpose()
    }

    async fn update_filament_stock(
        &mut self,
        filament_id: FilamentId,
        stock_grams: Decimal,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE filaments SET current_stock_grams = $2, updated_at = $3 WHERE filament_id = $1",
        )
        .bind(filament_id.as_uuid())
        .bind(stock_grams)
        .bind(at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_filament_stock", e))?;
        expect_one_row(result.rows_affected(), "filament")
    }

    async fn insert_ledger_row(&mut self, row: &FilamentTransaction) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO filament_transactions
                (transaction_id, filament_id, kind, quantity_grams, print_job_id,
                 previous_stock, new_stock, reason, notes, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(row.id.as_uuid())
        .bind(row.filament_id.as_uuid())
        .bind(row.kind.as_str())
        .bind(row.quantity_grams)
        .bind(row.print_job_id.map(Uuid::from))
        .bind(row.previous_stock)
        .bind(row.new_stock)
        .bind(&row.reason)
        .bind(&row.notes)
        .bind(&row.created_by)
        .bind(row.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_ledger_row", e))?;
        Ok(())
    }

    async fn get_ledger_row(
        &mut self,
        workspace_id: WorkspaceId,
        transaction_id: FilamentTransactionId,
    ) -> StoreResult<Option<FilamentTransaction>> {
        let row = sqlx::query(&format!(
            "SELECT {LEDGER_COLUMNS} FROM filament_transactions t \
             JOIN filaments f ON f.filament_id = t.filament_id \
             WHERE t.transaction_id = $1 AND f.workspace_id = $2"
        ))
        .bind(transaction_id.as_uuid())
        .bind(workspace_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("get_ledger_row", e))?;

        row.as_ref().map(ledger_from_row).transpose()
    }

    async fn delete_ledger_row(
        &mut self,
        transaction_id: FilamentTransactionId,
    ) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM filament_transactions WHERE transaction_id = $1")
            .bind(transaction_id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_ledger_row", e))?;
        expect_one_row(result.rows_affected(), "ledger transaction")
    }

    async fn set_ledger_snapshot(
        &mut self,
        transaction_id: FilamentTransactionId,
        previous_stock: Decimal,
        new_stock: Decimal,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE filament_transactions SET previous_stock = $2, new_stock = $3 \
             WHERE transaction_id = $1",
        )
        .bind(transaction_id.as_uuid())
        .bind(previous_stock)
        .bind(new_stock)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("set_ledger_snapshot", e))?;
        expect_one_row(result.rows_affected(), "ledger transaction")
    }

    async fn ledger_totals(&mut self, filament_id: FilamentId) -> StoreResult<LedgerTotals> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(quantity_grams) FILTER (WHERE kind IN ('in', 'adjustment')), 0)
                    AS inbound,
                COALESCE(SUM(quantity_grams) FILTER (WHERE kind IN ('out', 'waste')), 0)
                    AS outbound
            FROM filament_transactions
            WHERE filament_id = $1
            "#,
        )
        .bind(filament_id.as_uuid())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("ledger_totals", e))?;

        Ok(LedgerTotals {
            inbound: get(&row, "inbound")?,
            outbound: get(&row, "outbound")?,
        })
    }

    async fn insert_order(&mut self, order: &Order) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(order.id.as_uuid())
        .bind(order.workspace_id.as_uuid())
        .bind(&order.order_number)
        .bind(&order.customer_name)
        .bind(&order.currency)
        .bind(order.total_cost)
        .bind(order.external_total_cost)
        .bind(order.totals_locked)
        .bind(order.external_id.as_deref())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(workspace_id = %workspace_id, order_id = %order_id), err)]
    async fn lock_order(
        &mut self,
        workspace_id: WorkspaceId,
        order_id: OrderId,
    ) -> StoreResult<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE order_id = $1 AND workspace_id = $2 FOR UPDATE"
        ))
        .bind(order_id.as_uuid())
        .bind(workspace_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_order", e))?;

        row.as_ref().map(order_from_row).transpose()
    }

    async fn save_order_totals(&mut self, order: &Order) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET total_cost = $2, external_total_cost = $3, totals_locked = $4, updated_at = $5
            WHERE order_id = $1
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.total_cost)
        .bind(order.external_total_cost)
        .bind(order.totals_locked)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("save_order_totals", e))?;
        expect_one_row(result.rows_affected(), "order")
    }

    async fn get_order_item(
        &mut self,
        workspace_id: WorkspaceId,
        item_id: OrderItemId,
    ) -> StoreResult<Option<OrderItem>> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items i \
             JOIN orders o ON o.order_id = i.order_id \
             WHERE i.order_item_id = $1 AND o.workspace_id = $2"
        ))
        .bind(item_id.as_uuid())
        .bind(workspace_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("get_order_item", e))?;

        row.as_ref().map(item_from_row).transpose()
    }

    async fn upsert_order_item(&mut self, item: &OrderItem) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO order_items
                (order_item_id, order_id, product_id, quantity, unit_price, total_price,
                 is_personalized, attributes, attributes_key, external_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (order_item_id) DO UPDATE SET
                product_id = EXCLUDED.product_id,
                quantity = EXCLUDED.quantity,
                unit_price = EXCLUDED.unit_price,
                total_price = EXCLUDED.total_price,
                is_personalized = EXCLUDED.is_personalized,
                attributes = EXCLUDED.attributes,
                attributes_key = EXCLUDED.attributes_key,
                external_id = EXCLUDED.external_id,
                updated_at = EXCLUDED.updated_at
            WHERE order_items.order_id = EXCLUDED.order_id
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(item.order_id.as_uuid())
        .bind(item.product_id.as_uuid())
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.total_price)
        .bind(item.is_personalized)
        .bind(item.attributes.to_json())
        .bind(item.attributes.canonical_key())
        .bind(item.external_id.as_deref())
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("upsert_order_item", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Constraint(format!(
                "order item {} belongs to another order",
                item.id
            )));
        }
        Ok(())
    }

    async fn delete_order_item(&mut self, item_id: OrderItemId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM order_items WHERE order_item_id = $1")
            .bind(item_id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_order_item", e))?;
        expect_one_row(result.rows_affected(), "order item")
    }

    async fn sum_item_totals(&mut self, order_id: OrderId) -> StoreResult<Decimal> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(total_price), 0) AS total FROM order_items WHERE order_id = $1",
        )
        .bind(order_id.as_uuid())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("sum_item_totals", e))?;
        get(&row, "total")
    }

    async fn insert_print_job(&mut self, job: &PrintJob) -> StoreResult<()> {
        let minutes = minutes_to_db(job.estimated_print_minutes)?;
        sqlx::query(&format!(
            "INSERT INTO print_jobs ({JOB_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)"
        ))
        .bind(job.id.as_uuid())
        .bind(job.workspace_id.as_uuid())
        .bind(job.order_item_id.as_uuid())
        .bind(job.product_id.as_uuid())
        .bind(&job.component_label)
        .bind(job.printer_id.map(Uuid::from))
        .bind(job.filament_id.map(Uuid::from))
        .bind(job.status.as_str())
        .bind(job.priority)
        .bind(minutes)
        .bind(job.material_used_grams)
        .bind(&job.failure_reason)
        .bind(&job.notes)
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.finished_at)
        .bind(job.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_print_job", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(workspace_id = %workspace_id, job_id = %job_id), err)]
    async fn lock_print_job(
        &mut self,
        workspace_id: WorkspaceId,
        job_id: PrintJobId,
    ) -> StoreResult<Option<PrintJob>> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM print_jobs \
             WHERE job_id = $1 AND workspace_id = $2 FOR UPDATE"
        ))
        .bind(job_id.as_uuid())
        .bind(workspace_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_print_job", e))?;

        row.as_ref().map(job_from_row).transpose()
    }

    async fn save_print_job(&mut self, job: &PrintJob) -> StoreResult<()> {
        let minutes = minutes_to_db(job.estimated_print_minutes)?;
        let result = sqlx::query(
            r#"
            UPDATE print_jobs SET
                printer_id = $3, filament_id = $4, status = $5, priority = $6,
                estimated_print_minutes = $7, material_used_grams = $8, failure_reason = $9,
                notes = $10, started_at = $11, finished_at = $12, updated_at = $13
            WHERE job_id = $1 AND workspace_id = $2
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(job.workspace_id.as_uuid())
        .bind(job.printer_id.map(Uuid::from))
        .bind(job.filament_id.map(Uuid::from))
        .bind(job.status.as_str())
        .bind(job.priority)
        .bind(minutes)
        .bind(job.material_used_grams)
        .bind(&job.failure_reason)
        .bind(&job.notes)
        .bind(job.started_at)
        .bind(job.finished_at)
        .bind(job.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("save_print_job", e))?;
        expect_one_row(result.rows_affected(), "print job")
    }

    async fn list_print_jobs(&mut self, workspace_id: WorkspaceId) -> StoreResult<Vec<PrintJob>> {
        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM print_jobs WHERE workspace_id = $1"
        ))
        .bind(workspace_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("list_print_jobs", e))?;

        rows.iter().map(job_from_row).collect()
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }
}

fn expect_one_row(affected: u64, entity: &'static str) -> StoreResult<()> {
    if affected == 0 {
        return Err(StoreError::NotFound(entity));
    }
    Ok(())
}

fn minutes_to_db(minutes: Option<u32>) -> StoreResult<Option<i32>> {
    minutes
        .map(i32::try_from)
        .transpose()
        .map_err(|_| StoreError::Constraint("estimated_print_minutes out of range".to_string()))
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::Backend(format!("failed to decode column {column}: {e}")))
}

fn product_from_row(row: &PgRow) -> StoreResult<Product> {
    Ok(Product {
        id: ProductId::from_uuid(get(row, "product_id")?),
        workspace_id: WorkspaceId::from_uuid(get(row, "workspace_id")?),
        sku: get(row, "sku")?,
        title: get(row, "title")?,
        price: get(row, "price")?,
        is_personalized: get(row, "is_personalized")?,
        created_at: get(row, "created_at")?,
    })
}

fn filament_from_row(row: &PgRow) -> StoreResult<Filament> {
    Ok(Filament {
        id: FilamentId::from_uuid(get(row, "filament_id")?),
        workspace_id: WorkspaceId::from_uuid(get(row, "workspace_id")?),
        material_id: MaterialId::from_uuid(get(row, "material_id")?),
        color_id: ColorId::from_uuid(get(row, "color_id")?),
        name: get(row, "name")?,
        code: get(row, "code")?,
        current_stock_grams: get(row, "current_stock_grams")?,
        safety_stock_grams: get(row, "safety_stock_grams")?,
        reorder_point_grams: get(row, "reorder_point_grams")?,
        cost_per_gram: get(row, "cost_per_gram")?,
        is_available: get(row, "is_available")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

fn ledger_from_row(row: &PgRow) -> StoreResult<FilamentTransaction> {
    let kind: String = get(row, "kind")?;
    let kind: TransactionKind = kind
        .parse()
        .map_err(|e| StoreError::Backend(format!("bad ledger kind: {e}")))?;
    let print_job_id: Option<Uuid> = get(row, "print_job_id")?;

    Ok(FilamentTransaction {
        id: FilamentTransactionId::from_uuid(get(row, "transaction_id")?),
        filament_id: FilamentId::from_uuid(get(row, "filament_id")?),
        kind,
        quantity_grams: get(row, "quantity_grams")?,
        print_job_id: print_job_id.map(PrintJobId::from_uuid),
        previous_stock: get(row, "previous_stock")?,
        new_stock: get(row, "new_stock")?,
        reason: get(row, "reason")?,
        notes: get(row, "notes")?,
        created_by: get(row, "created_by")?,
        created_at: get(row, "created_at")?,
    })
}

fn order_from_row(row: &PgRow) -> StoreResult<Order> {
    Ok(Order {
        id: OrderId::from_uuid(get(row, "order_id")?),
        workspace_id: WorkspaceId::from_uuid(get(row, "workspace_id")?),
        order_number: get(row, "order_number")?,
        customer_name: get(row, "customer_name")?,
        currency: get(row, "currency")?,
        total_cost: get(row, "total_cost")?,
        external_total_cost: get(row, "external_total_cost")?,
        totals_locked: get(row, "totals_locked")?,
        external_id: get(row, "external_id")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

fn item_from_row(row: &PgRow) -> StoreResult<OrderItem> {
    let attributes: serde_json::Value = get(row, "attributes")?;
    let attributes = ItemAttributes::from_json(Some(attributes))
        .map_err(|e| StoreError::Backend(format!("bad item attributes: {e}")))?;

    Ok(OrderItem {
        id: OrderItemId::from_uuid(get(row, "order_item_id")?),
        order_id: OrderId::from_uuid(get(row, "order_id")?),
        product_id: ProductId::from_uuid(get(row, "product_id")?),
        quantity: get(row, "quantity")?,
        unit_price: get(row, "unit_price")?,
        total_price: get(row, "total_price")?,
        is_personalized: get(row, "is_personalized")?,
        attributes,
        external_id: get(row, "external_id")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

fn job_from_row(row: &PgRow) -> StoreResult<PrintJob> {
    let status: String = get(row, "status")?;
    let status: PrintJobStatus = status
        .parse()
        .map_err(|e| StoreError::Backend(format!("bad job status: {e}")))?;
    let minutes: Option<i32> = get(row, "estimated_print_minutes")?;
    let printer_id: Option<Uuid> = get(row, "printer_id")?;
    let filament_id: Option<Uuid> = get(row, "filament_id")?;

    Ok(PrintJob {
        id: PrintJobId::from_uuid(get(row, "job_id")?),
        workspace_id: WorkspaceId::from_uuid(get(row, "workspace_id")?),
        order_item_id: OrderItemId::from_uuid(get(row, "order_item_id")?),
        product_id: ProductId::from_uuid(get(row, "product_id")?),
        component_label: get(row, "component_label")?,
        printer_id: printer_id.map(PrinterId::from_uuid),
        filament_id: filament_id.map(FilamentId::from_uuid),
        status,
        priority: get(row, "priority")?,
        estimated_print_minutes: minutes.and_then(|m| u32::try_from(m).ok()),
        material_used_grams: get(row, "material_used_grams")?,
        failure_reason: get(row, "failure_reason")?,
        notes: get(row, "notes")?,
        created_at: get(row, "created_at")?,
        started_at: get(row, "started_at")?,
        finished_at: get(row, "finished_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

/// Map SQLx errors to `StoreError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let constraint = db_err.constraint().map(str::to_string);
            match db_err.code().as_deref() {
                Some("23505" | "23514" | "23503") => StoreError::Constraint(
                    constraint.unwrap_or_else(|| format!("{operation}: {}", db_err.message())),
                ),
                _ => StoreError::Backend(format!(
                    "database error in {operation}: {}",
                    db_err.message()
                )),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Backend(format!("{operation} failed: {other}")),
    }
}
