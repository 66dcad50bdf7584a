//! Customer orders domain module.
//!
//! This crate contains the order/line-item records, the line pricing rule,
//! and the item-total aggregation that keeps unlocked orders consistent. It is
//! pure domain logic (no IO, no storage).

pub mod item;
pub mod order;
pub mod pricing;

pub use item::{ItemAttributes, LineIdentity, OrderItem, UpsertOrderItem};
pub use order::{CreateOrder, DEFAULT_CURRENCY, Order, order_total};
pub use pricing::{
    LinePricing, MONEY_DECIMAL_PLACES, PricingContext, resolve_line_pricing, round_half_up,
};
