use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use printworks_core::{
    DecimalColumn, DomainError, DomainResult, Entity, OrderId, WorkspaceId, WorkspaceScoped,
};

use crate::item::OrderItem;

/// Currency used when an order does not name one.
pub const DEFAULT_CURRENCY: &str = "TND";

/// Customer order, workspace-scoped.
///
/// `total_cost` is derived from the items unless `totals_locked` is set, in
/// which case an external integration owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub workspace_id: WorkspaceId,
    /// Unique per workspace.
    pub order_number: String,
    pub customer_name: String,
    pub currency: String,
    pub total_cost: Decimal,
    /// Audit copy of the total an integration supplied when it locked the order.
    pub external_total_cost: Option<Decimal>,
    pub totals_locked: bool,
    pub external_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> OrderId {
        self.id
    }
}

impl WorkspaceScoped for Order {
    fn workspace_id(&self) -> WorkspaceId {
        self.workspace_id
    }
}

/// Command: CreateOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrder {
    pub order_id: OrderId,
    pub order_number: String,
    pub customer_name: String,
    pub currency: Option<String>,
    pub external_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Sum of line totals. Lines whose total is still unresolved count as zero.
pub fn order_total<'a>(items: impl IntoIterator<Item = &'a OrderItem>) -> DomainResult<Decimal> {
    DecimalColumn::MONEY.checked_sum(
        "total_cost",
        items.into_iter().filter_map(|item| item.total_price),
    )
}

impl Order {
    /// Validate a creation command and build an unlocked order with a zero total.
    pub fn create(workspace_id: WorkspaceId, cmd: &CreateOrder) -> DomainResult<Self> {
        let order_number = cmd.order_number.trim();
        if order_number.is_empty() {
            return Err(DomainError::validation("order_number", "cannot be empty"));
        }

        let currency = cmd
            .currency
            .as_deref()
            .map(str::trim)
            .unwrap_or(DEFAULT_CURRENCY)
            .to_ascii_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(DomainError::validation(
                "currency",
                "must be a three-letter ISO code",
            ));
        }

        Ok(Self {
            id: cmd.order_id,
            workspace_id,
            order_number: order_number.to_string(),
            customer_name: cmd.customer_name.trim().to_string(),
            currency,
            total_cost: Decimal::ZERO,
            external_total_cost: None,
            totals_locked: false,
            external_id: cmd.external_id.clone(),
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        })
    }

    /// Store a freshly aggregated item total.
    ///
    /// Returns `false` (and changes nothing) when the totals are locked.
    pub fn apply_item_total(&mut self, aggregate: Decimal, at: DateTime<Utc>) -> DomainResult<bool> {
        if self.totals_locked {
            return Ok(false);
        }
        self.total_cost = DecimalColumn::MONEY.check("total_cost", aggregate)?;
        self.updated_at = at;
        Ok(true)
    }

    /// Hand the total over to an external system.
    pub fn lock_totals(&mut self, external_total: Decimal, at: DateTime<Utc>) -> DomainResult<()> {
        if external_total < Decimal::ZERO {
            return Err(DomainError::validation("external_total_cost", "must be >= 0"));
        }
        DecimalColumn::MONEY.check("external_total_cost", external_total)?;
        self.total_cost = external_total;
        self.external_total_cost = Some(external_total);
        self.totals_locked = true;
        self.updated_at = at;
        Ok(())
    }

    /// Take the total back; the caller must recompute it from the items.
    pub fn unlock_totals(&mut self, at: DateTime<Utc>) {
        self.totals_locked = false;
        self.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::UpsertOrderItem;
    use crate::pricing::PricingContext;
    use printworks_core::ProductId;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn create_cmd(number: &str) -> CreateOrder {
        CreateOrder {
            order_id: OrderId::new(),
            order_number: number.to_string(),
            customer_name: "Salma".to_string(),
            currency: None,
            external_id: None,
            occurred_at: Utc::now(),
        }
    }

    fn line(order_id: OrderId, qty: Decimal, unit: Option<Decimal>) -> OrderItem {
        let mut cmd = UpsertOrderItem::new(order_id, ProductId::new(), qty, Utc::now());
        cmd.unit_price = unit;
        OrderItem::resolve(
            &cmd,
            None,
            PricingContext {
                order_totals_locked: false,
                product_price: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn create_defaults_currency_and_zero_total() {
        let order = Order::create(WorkspaceId::new(), &create_cmd("WEB-1001")).unwrap();
        assert_eq!(order.currency, "TND");
        assert_eq!(order.total_cost, Decimal::ZERO);
        assert!(!order.totals_locked);
    }

    #[test]
    fn blank_order_number_is_rejected() {
        let err = Order::create(WorkspaceId::new(), &create_cmd("  ")).unwrap_err();
        assert_eq!(err.field(), Some("order_number"));
    }

    #[test]
    fn malformed_currency_is_rejected() {
        let mut cmd = create_cmd("WEB-1");
        cmd.currency = Some("EURO".to_string());
        assert!(Order::create(WorkspaceId::new(), &cmd).is_err());
    }

    #[test]
    fn total_ignores_unresolved_lines() {
        let order_id = OrderId::new();
        let items = vec![
            line(order_id, dec!(2), Some(dec!(10))),
            line(order_id, dec!(1), None),
            line(order_id, dec!(3), Some(dec!(10.005))),
        ];
        assert_eq!(order_total(&items).unwrap(), dec!(50.02));
    }

    #[test]
    fn locked_order_ignores_item_totals() {
        let mut order = Order::create(WorkspaceId::new(), &create_cmd("ETSY-7")).unwrap();
        order.lock_totals(dec!(99.90), Utc::now()).unwrap();
        assert!(!order.apply_item_total(dec!(12), Utc::now()).unwrap());
        assert_eq!(order.total_cost, dec!(99.90));
        assert_eq!(order.external_total_cost, Some(dec!(99.90)));
    }

    #[test]
    fn unlock_allows_recomputation_again() {
        let mut order = Order::create(WorkspaceId::new(), &create_cmd("ETSY-8")).unwrap();
        order.lock_totals(dec!(40), Utc::now()).unwrap();
        order.unlock_totals(Utc::now());
        assert!(order.apply_item_total(dec!(12), Utc::now()).unwrap());
        assert_eq!(order.total_cost, dec!(12));
        assert_eq!(order.external_total_cost, Some(dec!(40)));
    }

    #[test]
    fn negative_external_total_is_rejected() {
        let mut order = Order::create(WorkspaceId::new(), &create_cmd("SHOP-1")).unwrap();
        assert!(order.lock_totals(dec!(-1), Utc::now()).is_err());
        assert!(!order.totals_locked);
    }

    #[test]
    fn external_total_must_fit_money_column() {
        let mut order = Order::create(WorkspaceId::new(), &create_cmd("SHOP-2")).unwrap();
        for total in [dec!(10.001), dec!(10000000000)] {
            let err = order.lock_totals(total, Utc::now()).unwrap_err();
            assert_eq!(err.field(), Some("external_total_cost"));
        }
        assert!(!order.totals_locked);
    }

    #[test]
    fn aggregate_beyond_money_column_is_rejected() {
        let mut order = Order::create(WorkspaceId::new(), &create_cmd("SHOP-3")).unwrap();
        let err = order.apply_item_total(dec!(12000000000), Utc::now()).unwrap_err();
        assert_eq!(err.field(), Some("total_cost"));
        assert_eq!(order.total_cost, Decimal::ZERO);
    }

    #[test]
    fn overflowing_line_sum_errors_instead_of_panicking() {
        let order_id = OrderId::new();
        let mut a = line(order_id, dec!(1), Some(dec!(1)));
        let mut b = line(order_id, dec!(1), Some(dec!(1)));
        a.total_price = Some(Decimal::MAX);
        b.total_price = Some(Decimal::MAX);
        let err = order_total([&a, &b]).unwrap_err();
        assert_eq!(err.field(), Some("total_cost"));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: the order total is the sum of the rounded line totals,
        /// and re-aggregating the same lines yields the same value.
        #[test]
        fn total_is_sum_of_line_totals(
            lines in prop::collection::vec((1i64..10_000i64, 0i64..1_000_000i64), 0..20)
        ) {
            let order_id = OrderId::new();
            let items: Vec<_> = lines
                .iter()
                .map(|(qty_milli, unit_milli)| {
                    line(order_id, Decimal::new(*qty_milli, 3), Some(Decimal::new(*unit_milli, 3)))
                })
                .collect();

            let expected: Decimal = items.iter().map(|i| i.total_price.unwrap()).sum();
            let mut order = Order::create(WorkspaceId::new(), &create_cmd("P-1")).unwrap();

            let total = order_total(&items).unwrap();
            prop_assert!(order.apply_item_total(total, Utc::now()).unwrap());
            prop_assert_eq!(order.total_cost, expected);
            prop_assert_eq!(total, order_total(items.iter().rev()).unwrap());
        }
    }
}
