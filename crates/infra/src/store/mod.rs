//! Transactional storage boundary.
//!
//! Engine operations open one [`UnitOfWork`] per call, lock the aggregate root
//! they mutate (filament, order or print job), write the triggering row, run
//! the recomputation, and commit. Dropping a unit of work without committing
//! rolls it back, so a failed operation leaves no partial state.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use printworks_core::{
    DomainError, FilamentId, FilamentTransactionId, OrderId, OrderItemId, PrintJobId, ProductId, WorkspaceId,
};
use printworks_inventory::{Filament, FilamentTransaction, LedgerTotals};
use printworks_production::PrintJob;
use printworks_products::Product;
use printworks_sales::{Order, OrderItem};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Names of the uniqueness constraints both adapters enforce.
///
/// These match the constraint names in `migrations/0001_init.sql`.
pub mod constraints {
    pub const PRODUCT_SKU: &str = "products_workspace_sku_key";
    pub const FILAMENT_CODE: &str = "filaments_workspace_code_key";
    pub const ORDER_NUMBER: &str = "orders_workspace_order_number_key";
    pub const ORDER_EXTERNAL_ID: &str = "orders_workspace_external_id_key";
    pub const ORDER_ITEM_IDENTITY: &str = "order_items_identity_key";
    pub const ORDER_ITEM_EXTERNAL_ID: &str = "order_items_order_external_id_key";
    pub const PRIMARY_KEY: &str = "primary_key";
}

/// Storage operation error.
///
/// These are **infrastructure errors** (constraints, isolation, backend
/// failures) as opposed to domain errors (validation, invariants).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness or check constraint rejected the write.
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// A referenced row does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A write referenced a row owned by another workspace.
    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    /// An aggregate read from storage failed a domain check.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Connection, decoding or other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Factory for units of work.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>>;
}

#[async_trait]
impl<S> Store for Arc<S>
where
    S: Store + ?Sized,
{
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        (**self).begin().await
    }
}

/// One atomic transaction against the back-office tables.
///
/// Lookups taking a `WorkspaceId` return `None` for rows owned by another
/// workspace. `lock_*` methods hold a row lock until commit or rollback.
#[async_trait]
pub trait UnitOfWork: Send {
    // -- catalog --------------------------------------------------------------

    async fn insert_product(&mut self, product: &Product) -> StoreResult<()>;

    async fn get_product(
        &mut self,
        workspace_id: WorkspaceId,
        product_id: ProductId,
    ) -> StoreResult<Option<Product>>;

    // -- inventory ------------------------------------------------------------

    async fn insert_filament(&mut self, filament: &Filament) -> StoreResult<()>;

    async fn lock_filament(
        &mut self,
        workspace_id: WorkspaceId,
        filament_id: FilamentId,
    ) -> StoreResult<Option<Filament>>;

    async fn update_filament_stock(
        &mut self,
        filament_id: FilamentId,
        stock_grams: Decimal,
        at: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn insert_ledger_row(&mut self, row: &FilamentTransaction) -> StoreResult<()>;

    async fn get_ledger_row(
        &mut self,
        workspace_id: WorkspaceId,
        transaction_id: FilamentTransactionId,
    ) -> StoreResult<Option<FilamentTransaction>>;

    async fn delete_ledger_row(&mut self, transaction_id: FilamentTransactionId)
    -> StoreResult<()>;

    async fn set_ledger_snapshot(
        &mut self,
        transaction_id: FilamentTransactionId,
        previous_stock: Decimal,
        new_stock: Decimal,
    ) -> StoreResult<()>;

    /// Aggregate the filament's full ledger (indexed by filament).
    async fn ledger_totals(&mut self, filament_id: FilamentId) -> StoreResult<LedgerTotals>;

    // -- orders ---------------------------------------------------------------

    async fn insert_order(&mut self, order: &Order) -> StoreResult<()>;

    async fn lock_order(
        &mut self,
        workspace_id: WorkspaceId,
        order_id: OrderId,
    ) -> StoreResult<Option<Order>>;

    /// Persist `total_cost`, `external_total_cost`, `totals_locked`, `updated_at`.
    async fn save_order_totals(&mut self, order: &Order) -> StoreResult<()>;

    async fn get_order_item(
        &mut self,
        workspace_id: WorkspaceId,
        item_id: OrderItemId,
    ) -> StoreResult<Option<OrderItem>>;

    /// Insert or replace a line, enforcing line identity uniqueness.
    async fn upsert_order_item(&mut self, item: &OrderItem) -> StoreResult<()>;

    async fn delete_order_item(&mut self, item_id: OrderItemId) -> StoreResult<()>;

    /// Σ total_price over the order's lines (unresolved lines count as zero).
    async fn sum_item_totals(&mut self, order_id: OrderId) -> StoreResult<Decimal>;

    // -- production -----------------------------------------------------------

    async fn insert_print_job(&mut self, job: &PrintJob) -> StoreResult<()>;

    async fn lock_print_job(
        &mut self,
        workspace_id: WorkspaceId,
        job_id: PrintJobId,
    ) -> StoreResult<Option<PrintJob>>;

    async fn save_print_job(&mut self, job: &PrintJob) -> StoreResult<()>;

    async fn list_print_jobs(&mut self, workspace_id: WorkspaceId) -> StoreResult<Vec<PrintJob>>;

    // -- lifecycle ------------------------------------------------------------

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
