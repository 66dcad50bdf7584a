//! Line-item pricing rule.
//!
//! Runs once per item write, before the item is persisted:
//!
//! 1. a locally entered line with no unit price takes the product's list price
//!    (unless the order's totals are owned by an external system);
//! 2. a line with no total gets `round_half_up(unit_price × quantity, 2)`.
//!
//! Supplied prices are never overwritten, so marketplace lines keep the
//! amounts their integration wrote. A derived total that does not fit the
//! money column rejects the write.

use rust_decimal::{Decimal, RoundingStrategy};

use printworks_core::{DecimalColumn, DomainError, DomainResult};

/// Money scale for line and order totals.
pub const MONEY_DECIMAL_PLACES: u32 = 2;

/// Round to `dp` places, ties away from zero (half-up for non-negative money).
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Facts about the parent order and product the rule needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingContext {
    pub order_totals_locked: bool,
    pub product_price: Option<Decimal>,
}

/// Resolved `(unit_price, total_price)` for a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePricing {
    pub unit_price: Option<Decimal>,
    pub total_price: Option<Decimal>,
}

/// Apply the pricing rule to the caller-supplied prices.
pub fn resolve_line_pricing(
    quantity: Decimal,
    unit_price: Option<Decimal>,
    total_price: Option<Decimal>,
    ctx: PricingContext,
) -> DomainResult<LinePricing> {
    let unit_price = match unit_price {
        Some(p) => Some(p),
        None if !ctx.order_totals_locked => ctx.product_price,
        None => None,
    };

    let total_price = match (total_price, unit_price) {
        (Some(t), _) => Some(t),
        (None, Some(unit)) => {
            let raw = unit
                .checked_mul(quantity)
                .ok_or_else(|| DomainError::validation("total_price", "line total overflows"))?;
            let total = round_half_up(raw, MONEY_DECIMAL_PLACES);
            Some(DecimalColumn::MONEY.check("total_price", total)?)
        }
        (None, None) => None,
    };

    Ok(LinePricing {
        unit_price,
        total_price,
    })
}
