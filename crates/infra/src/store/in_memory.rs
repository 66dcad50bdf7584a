//! In-memory store for tests/dev.
//!
//! A single async mutex serializes units of work. A unit of work writes to the
//! locked tables directly and keeps an undo log holding the prior value of
//! every row it touched. Commit discards the log; dropping an uncommitted unit
//! of work replays it. Not optimized for large datasets.

use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use printworks_core::{
    FilamentId, FilamentTransactionId, OrderId, OrderItemId, PrintJobId, ProductId, WorkspaceId,
    WorkspaceScoped,
};
use printworks_inventory::{Filament, FilamentTransaction, LedgerTotals};
use printworks_production::PrintJob;
use printworks_products::Product;
use printworks_sales::{Order, OrderItem, order_total};

use super::{Store, StoreError, StoreResult, UnitOfWork, constraints};

#[derive(Debug, Default)]
struct Tables {
    products: HashMap<ProductId, Product>,
    filaments: HashMap<FilamentId, Filament>,
    ledger: HashMap<FilamentTransactionId, FilamentTransaction>,
    ledger_by_filament: HashMap<FilamentId, BTreeSet<FilamentTransactionId>>,
    orders: HashMap<OrderId, Order>,
    items: HashMap<OrderItemId, OrderItem>,
    items_by_order: HashMap<OrderId, BTreeSet<OrderItemId>>,
    jobs: HashMap<PrintJobId, PrintJob>,
}

fn scoped<K, E>(rows: &HashMap<K, E>, workspace_id: WorkspaceId, id: &K) -> Option<E>
where
    K: Eq + Hash,
    E: WorkspaceScoped + Clone,
{
    rows.get(id)
        .filter(|row| row.is_owned_by(workspace_id))
        .cloned()
}

/// Prior state of every row a unit of work wrote, captured on first write.
///
/// `None` means the row did not exist.
#[derive(Debug, Default)]
struct UndoLog {
    products: HashMap<ProductId, Option<Product>>,
    filaments: HashMap<FilamentId, Option<Filament>>,
    ledger: HashMap<FilamentTransactionId, Option<FilamentTransaction>>,
    ledger_by_filament: HashMap<FilamentId, Option<BTreeSet<FilamentTransactionId>>>,
    orders: HashMap<OrderId, Option<Order>>,
    items: HashMap<OrderItemId, Option<OrderItem>>,
    items_by_order: HashMap<OrderId, Option<BTreeSet<OrderItemId>>>,
    jobs: HashMap<PrintJobId, Option<PrintJob>>,
}

fn remember<K, V>(undo: &mut HashMap<K, Option<V>>, live: &HashMap<K, V>, key: K)
where
    K: Eq + Hash + Copy,
    V: Clone,
{
    undo.entry(key).or_insert_with(|| live.get(&key).cloned());
}

fn restore<K, V>(live: &mut HashMap<K, V>, undo: HashMap<K, Option<V>>)
where
    K: Eq + Hash,
{
    for (key, prior) in undo {
        match prior {
            Some(row) => {
                live.insert(key, row);
            }
            None => {
                live.remove(&key);
            }
        }
    }
}

impl UndoLog {
    fn roll_back(self, t: &mut Tables) {
        restore(&mut t.products, self.products);
        restore(&mut t.filaments, self.filaments);
        restore(&mut t.ledger, self.ledger);
        restore(&mut t.ledger_by_filament, self.ledger_by_filament);
        restore(&mut t.orders, self.orders);
        restore(&mut t.items, self.items);
        restore(&mut t.items_by_order, self.items_by_order);
        restore(&mut t.jobs, self.jobs);
    }
}

fn violated(constraint: &str) -> StoreError {
    StoreError::Constraint(constraint.to_string())
}

impl Tables {
    fn order_items(&self, order_id: OrderId) -> impl Iterator<Item = &OrderItem> {
        self.items_by_order
            .get(&order_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.items.get(id))
    }

    fn order_workspace(&self, order_id: OrderId) -> Option<WorkspaceId> {
        self.orders.get(&order_id).map(|o| o.workspace_id)
    }
}

/// In-memory implementation of [`Store`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let tables = Arc::clone(&self.tables).lock_owned().await;
        Ok(Box::new(InMemoryUnitOfWork {
            tables,
            undo: UndoLog::default(),
        }))
    }
}

struct InMemoryUnitOfWork {
    tables: OwnedMutexGuard<Tables>,
    undo: UndoLog,
}

impl Drop for InMemoryUnitOfWork {
    fn drop(&mut self) {
        std::mem::take(&mut self.undo).roll_back(&mut self.tables);
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn insert_product(&mut self, product: &Product) -> StoreResult<()> {
        let t = &mut *self.tables;
        if t.products.contains_key(&product.id) {
            return Err(violated(constraints::PRIMARY_KEY));
        }
        if let Some(sku) = &product.sku {
            let taken = t.products.values().any(|p| {
                p.workspace_id == product.workspace_id && p.sku.as_deref() == Some(sku.as_str())
            });
            if taken {
                return Err(violated(constraints::PRODUCT_SKU));
            }
        }
        remember(&mut self.undo.products, &t.products, product.id);
        t.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn get_product(
        &mut self,
        workspace_id: WorkspaceId,
        product_id: ProductId,
    ) -> StoreResult<Option<Product>> {
        Ok(scoped(&self.tables.products, workspace_id, &product_id))
    }

    async fn insert_filament(&mut self, filament: &Filament) -> StoreResult<()> {
        let t = &mut *self.tables;
        if t.filaments.contains_key(&filament.id) {
            return Err(violated(constraints::PRIMARY_KEY));
        }
        if let Some(code) = &filament.code {
            let taken = t.filaments.values().any(|f| {
                f.workspace_id == filament.workspace_id && f.code.as_deref() == Some(code.as_str())
            });
            if taken {
                return Err(violated(constraints::FILAMENT_CODE));
            }
        }
        remember(&mut self.undo.filaments, &t.filaments, filament.id);
        t.filaments.insert(filament.id, filament.clone());
        Ok(())
    }

    async fn lock_filament(
        &mut self,
        workspace_id: WorkspaceId,
        filament_id: FilamentId,
    ) -> StoreResult<Option<Filament>> {
        // The store-wide mutex already serializes writers.
        Ok(scoped(&self.tables.filaments, workspace_id, &filament_id))
    }

    async fn update_filament_stock(
        &mut self,
        filament_id: FilamentId,
        stock_grams: Decimal,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let t = &mut *self.tables;
        remember(&mut self.undo.filaments, &t.filaments, filament_id);
        let filament = t
            .filaments
            .get_mut(&filament_id)
            .ok_or(StoreError::NotFound("filament"))?;
        filament.current_stock_grams = stock_grams;
        filament.updated_at = at;
        Ok(())
    }

    async fn insert_ledger_row(&mut self, row: &FilamentTransaction) -> StoreResult<()> {
        let t = &mut *self.tables;
        if !t.filaments.contains_key(&row.filament_id) {
            return Err(StoreError::NotFound("filament"));
        }
        if t.ledger.contains_key(&row.id) {
            return Err(violated(constraints::PRIMARY_KEY));
        }
        remember(&mut self.undo.ledger, &t.ledger, row.id);
        remember(&mut self.undo.ledger_by_filament, &t.ledger_by_filament, row.filament_id);
        t.ledger.insert(row.id, row.clone());
        t.ledger_by_filament
            .entry(row.filament_id)
            .or_default()
            .insert(row.id);
        Ok(())
    }

    async fn get_ledger_row(
        &mut self,
        workspace_id: WorkspaceId,
        transaction_id: FilamentTransactionId,
    ) -> StoreResult<Option<FilamentTransaction>> {
        let t = &*self.tables;
        Ok(t.ledger
            .get(&transaction_id)
            .filter(|row| {
                t.filaments
                    .get(&row.filament_id)
                    .is_some_and(|f| f.is_owned_by(workspace_id))
            })
            .cloned())
    }

    async fn delete_ledger_row(
        &mut self,
        transaction_id: FilamentTransactionId,
    ) -> StoreResult<()> {
        let t = &mut *self.tables;
        remember(&mut self.undo.ledger, &t.ledger, transaction_id);
        let row = t
            .ledger
            .remove(&transaction_id)
            .ok_or(StoreError::NotFound("ledger transaction"))?;
        remember(&mut self.undo.ledger_by_filament, &t.ledger_by_filament, row.filament_id);
        if let Some(ids) = t.ledger_by_filament.get_mut(&row.filament_id) {
            ids.remove(&transaction_id);
        }
        Ok(())
    }

    async fn set_ledger_snapshot(
        &mut self,
        transaction_id: FilamentTransactionId,
        previous_stock: Decimal,
        new_stock: Decimal,
    ) -> StoreResult<()> {
        let t = &mut *self.tables;
        remember(&mut self.undo.ledger, &t.ledger, transaction_id);
        let row = t
            .ledger
            .get_mut(&transaction_id)
            .ok_or(StoreError::NotFound("ledger transaction"))?;
        row.previous_stock = Some(previous_stock);
        row.new_stock = Some(new_stock);
        Ok(())
    }

    async fn ledger_totals(&mut self, filament_id: FilamentId) -> StoreResult<LedgerTotals> {
        let t = &*self.tables;
        let rows = t
            .ledger_by_filament
            .get(&filament_id)
            .into_iter()
            .flatten()
            .filter_map(|id| t.ledger.get(id));
        Ok(LedgerTotals::from_transactions(rows)?)
    }

    async fn insert_order(&mut self, order: &Order) -> StoreResult<()> {
        let t = &mut *self.tables;
        if t.orders.contains_key(&order.id) {
            return Err(violated(constraints::PRIMARY_KEY));
        }
        for existing in t.orders.values() {
            if existing.workspace_id != order.workspace_id {
                continue;
            }
            if existing.order_number == order.order_number {
                return Err(violated(constraints::ORDER_NUMBER));
            }
            if order.external_id.is_some() && existing.external_id == order.external_id {
                return Err(violated(constraints::ORDER_EXTERNAL_ID));
            }
        }
        remember(&mut self.undo.orders, &t.orders, order.id);
        t.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn lock_order(
        &mut self,
        workspace_id: WorkspaceId,
        order_id: OrderId,
    ) -> StoreResult<Option<Order>> {
        Ok(scoped(&self.tables.orders, workspace_id, &order_id))
    }

    async fn save_order_totals(&mut self, order: &Order) -> StoreResult<()> {
        let t = &mut *self.tables;
        remember(&mut self.undo.orders, &t.orders, order.id);
        let stored = t
            .orders
            .get_mut(&order.id)
            .ok_or(StoreError::NotFound("order"))?;
        stored.total_cost = order.total_cost;
        stored.external_total_cost = order.external_total_cost;
        stored.totals_locked = order.totals_locked;
        stored.updated_at = order.updated_at;
        Ok(())
    }

    async fn get_order_item(
        &mut self,
        workspace_id: WorkspaceId,
        item_id: OrderItemId,
    ) -> StoreResult<Option<OrderItem>> {
        let t = &*self.tables;
        Ok(t.items
            .get(&item_id)
            .filter(|item| t.order_workspace(item.order_id) == Some(workspace_id))
            .cloned())
    }

    async fn upsert_order_item(&mut self, item: &OrderItem) -> StoreResult<()> {
        let t = &mut *self.tables;
        if !t.orders.contains_key(&item.order_id) {
            return Err(StoreError::NotFound("order"));
        }
        if let Some(previous) = t.items.get(&item.id) {
            if previous.order_id != item.order_id {
                return Err(violated(constraints::PRIMARY_KEY));
            }
        }

        let identity = item.identity();
        for sibling in t.order_items(item.order_id).filter(|s| s.id != item.id) {
            if sibling.identity() == identity {
                return Err(violated(constraints::ORDER_ITEM_IDENTITY));
            }
            if item.external_id.is_some() && sibling.external_id == item.external_id {
                return Err(violated(constraints::ORDER_ITEM_EXTERNAL_ID));
            }
        }

        remember(&mut self.undo.items, &t.items, item.id);
        remember(&mut self.undo.items_by_order, &t.items_by_order, item.order_id);
        t.items.insert(item.id, item.clone());
        t.items_by_order
            .entry(item.order_id)
            .or_default()
            .insert(item.id);
        Ok(())
    }

    async fn delete_order_item(&mut self, item_id: OrderItemId) -> StoreResult<()> {
        let t = &mut *self.tables;
        remember(&mut self.undo.items, &t.items, item_id);
        let item = t
            .items
            .remove(&item_id)
            .ok_or(StoreError::NotFound("order item"))?;
        remember(&mut self.undo.items_by_order, &t.items_by_order, item.order_id);
        if let Some(ids) = t.items_by_order.get_mut(&item.order_id) {
            ids.remove(&item_id);
        }
        Ok(())
    }

    async fn sum_item_totals(&mut self, order_id: OrderId) -> StoreResult<Decimal> {
        Ok(order_total(self.tables.order_items(order_id))?)
    }

    async fn insert_print_job(&mut self, job: &PrintJob) -> StoreResult<()> {
        let t = &mut *self.tables;
        if t.jobs.contains_key(&job.id) {
            return Err(violated(constraints::PRIMARY_KEY));
        }
        if !t.items.contains_key(&job.order_item_id) {
            return Err(StoreError::NotFound("order item"));
        }
        remember(&mut self.undo.jobs, &t.jobs, job.id);
        t.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn lock_print_job(
        &mut self,
        workspace_id: WorkspaceId,
        job_id: PrintJobId,
    ) -> StoreResult<Option<PrintJob>> {
        Ok(scoped(&self.tables.jobs, workspace_id, &job_id))
    }

    async fn save_print_job(&mut self, job: &PrintJob) -> StoreResult<()> {
        let t = &mut *self.tables;
        let stored = t.jobs.get(&job.id).ok_or(StoreError::NotFound("print job"))?;
        if stored.workspace_id != job.workspace_id {
            return Err(StoreError::TenantIsolation(format!(
                "print job {} belongs to another workspace",
                job.id
            )));
        }
        remember(&mut self.undo.jobs, &t.jobs, job.id);
        t.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn list_print_jobs(&mut self, workspace_id: WorkspaceId) -> StoreResult<Vec<PrintJob>> {
        Ok(self
            .tables
            .jobs
            .values()
            .filter(|job| job.is_owned_by(workspace_id))
            .cloned()
            .collect())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut uow = self;
        uow.undo = UndoLog::default();
        Ok(())
    }
}
