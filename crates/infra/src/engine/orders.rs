//! Order and order-line operations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, instrument};

use printworks_core::{OrderId, OrderItemId, WorkspaceId};
use printworks_sales::{CreateOrder, Order, OrderItem, PricingContext, UpsertOrderItem};

use super::Engine;
use crate::error::{EngineError, EngineResult};
use crate::store::{Store, UnitOfWork};

/// Outcome of an item upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItemUpserted {
    /// The stored line after the pricing rule ran.
    pub item: OrderItem,
    /// The order's total after the write (unchanged if totals are locked).
    pub order_total: Decimal,
}

/// Recompute and persist the total of an order row the caller has locked.
///
/// Totals owned by an integration (`totals_locked`) are returned unchanged.
async fn settle_order_total(
    uow: &mut dyn UnitOfWork,
    mut order: Order,
    at: DateTime<Utc>,
) -> EngineResult<Decimal> {
    if order.totals_locked {
        debug!(order_id = %order.id, "order totals locked; skipping recomputation");
        return Ok(order.total_cost);
    }

    let aggregate = uow.sum_item_totals(order.id).await?;
    order.apply_item_total(aggregate, at)?;
    uow.save_order_totals(&order).await?;
    info!(order_id = %order.id, total_cost = %order.total_cost, "order total recomputed");
    Ok(order.total_cost)
}

async fn lock_order(
    uow: &mut dyn UnitOfWork,
    workspace_id: WorkspaceId,
    order_id: OrderId,
) -> EngineResult<Order> {
    uow.lock_order(workspace_id, order_id)
        .await?
        .ok_or(EngineError::NotFound("order"))
}

impl<S: Store> Engine<S> {
    #[instrument(skip(self, cmd), fields(workspace_id = %workspace_id, order_id = %cmd.order_id), err)]
    pub async fn create_order(
        &self,
        workspace_id: WorkspaceId,
        cmd: CreateOrder,
    ) -> EngineResult<Order> {
        let order = Order::create(workspace_id, &cmd)?;

        let mut uow = self.store.begin().await?;
        uow.insert_order(&order).await?;
        uow.commit().await?;

        info!(order_id = %order.id, order_number = %order.order_number, "order created");
        Ok(order)
    }

    /// Create or replace an order line, then recompute the order total.
    ///
    /// On update the command is the full desired state of the line; the
    /// pricing rule runs again on it.
    #[instrument(
        skip(self, cmd),
        fields(
            workspace_id = %workspace_id,
            order_id = %cmd.order_id,
            product_id = %cmd.product_id,
            item_id = ?cmd.item_id
        ),
        err
    )]
    pub async fn upsert_order_item(
        &self,
        workspace_id: WorkspaceId,
        cmd: UpsertOrderItem,
    ) -> EngineResult<OrderItemUpserted> {
        cmd.validate()?;

        let mut uow = self.store.begin().await?;
        let order = lock_order(&mut *uow, workspace_id, cmd.order_id).await?;
        let product = uow
            .get_product(workspace_id, cmd.product_id)
            .await?
            .ok_or(EngineError::NotFound("product"))?;

        let existing = match cmd.item_id {
            Some(item_id) => uow.get_order_item(workspace_id, item_id).await?,
            None => None,
        };

        let ctx = PricingContext {
            order_totals_locked: order.totals_locked,
            product_price: product.price,
        };
        let item = OrderItem::resolve(&cmd, existing.as_ref(), ctx)?;
        uow.upsert_order_item(&item).await?;

        let order_total = settle_order_total(&mut *uow, order, cmd.occurred_at).await?;
        uow.commit().await?;

        Ok(OrderItemUpserted { item, order_total })
    }

    /// Remove an order line; returns the order's total afterwards.
    #[instrument(skip(self), fields(workspace_id = %workspace_id, item_id = %item_id), err)]
    pub async fn delete_order_item(
        &self,
        workspace_id: WorkspaceId,
        item_id: OrderItemId,
    ) -> EngineResult<Decimal> {
        let mut uow = self.store.begin().await?;
        let item = uow
            .get_order_item(workspace_id, item_id)
            .await?
            .ok_or(EngineError::NotFound("order item"))?;
        let order = lock_order(&mut *uow, workspace_id, item.order_id).await?;

        uow.delete_order_item(item_id).await?;
        let total = settle_order_total(&mut *uow, order, Utc::now()).await?;
        uow.commit().await?;
        Ok(total)
    }

    #[instrument(skip(self), fields(workspace_id = %workspace_id, order_id = %order_id), err)]
    pub async fn recompute_order_total(
        &self,
        workspace_id: WorkspaceId,
        order_id: OrderId,
    ) -> EngineResult<Decimal> {
        let mut uow = self.store.begin().await?;
        let order = lock_order(&mut *uow, workspace_id, order_id).await?;
        let total = settle_order_total(&mut *uow, order, Utc::now()).await?;
        uow.commit().await?;
        Ok(total)
    }

    /// Hand the order total over to an integration.
    ///
    /// Item mutations stop changing the total until it is unlocked.
    #[instrument(skip(self), fields(workspace_id = %workspace_id, order_id = %order_id), err)]
    pub async fn lock_order_totals(
        &self,
        workspace_id: WorkspaceId,
        order_id: OrderId,
        external_total: Decimal,
    ) -> EngineResult<Order> {
        let mut uow = self.store.begin().await?;
        let mut order = lock_order(&mut *uow, workspace_id, order_id).await?;
        order.lock_totals(external_total, Utc::now())?;
        uow.save_order_totals(&order).await?;
        uow.commit().await?;

        info!(order_id = %order.id, total_cost = %order.total_cost, "order totals locked");
        Ok(order)
    }

    /// Take the total back from the integration and recompute it from items.
    #[instrument(skip(self), fields(workspace_id = %workspace_id, order_id = %order_id), err)]
    pub async fn unlock_order_totals(
        &self,
        workspace_id: WorkspaceId,
        order_id: OrderId,
    ) -> EngineResult<Order> {
        let now = Utc::now();
        let mut uow = self.store.begin().await?;
        let mut order = lock_order(&mut *uow, workspace_id, order_id).await?;
        order.unlock_totals(now);
        order.total_cost = settle_order_total(&mut *uow, order.clone(), now).await?;
        uow.commit().await?;
        Ok(order)
    }
}
