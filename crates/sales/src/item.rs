use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use printworks_core::{
    DecimalColumn, DomainError, DomainResult, Entity, OrderId, OrderItemId, ProductId,
};

use crate::pricing::{PricingContext, resolve_line_pricing};

/// Free-form line attributes (size, engraving text, ...). Always an object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemAttributes(Map<String, JsonValue>);

impl ItemAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize caller input: absent or `null` becomes `{}`, anything other
    /// than an object is rejected.
    pub fn from_json(value: Option<JsonValue>) -> DomainResult<Self> {
        match value {
            None | Some(JsonValue::Null) => Ok(Self::default()),
            Some(JsonValue::Object(map)) => Ok(Self(map)),
            Some(_) => Err(DomainError::validation("attributes", "must be a JSON object")),
        }
    }

    pub fn as_map(&self) -> &Map<String, JsonValue> {
        &self.0
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(self.0.clone())
    }

    /// Canonical, key-order-independent serialization used as a dedup key.
    ///
    /// Object keys are emitted sorted at every depth, arrays keep their order,
    /// strings use JSON escaping. Two attribute bags get the same key iff they
    /// hold the same structure.
    pub fn canonical_key(&self) -> String {
        let mut out = String::new();
        write_canonical_object(&self.0, &mut out);
        out
    }
}

fn write_canonical(value: &JsonValue, out: &mut String) {
    match value {
        JsonValue::Null => out.push_str("null"),
        JsonValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        JsonValue::Number(n) => out.push_str(&n.to_string()),
        JsonValue::String(s) => write_canonical_str(s, out),
        JsonValue::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        JsonValue::Object(map) => write_canonical_object(map, out),
    }
}

fn write_canonical_object(map: &Map<String, JsonValue>, out: &mut String) {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();

    out.push('{');
    for (idx, key) in keys.into_iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        write_canonical_str(key, out);
        out.push(':');
        write_canonical(&map[key.as_str()], out);
    }
    out.push('}');
}

fn write_canonical_str(s: &str, out: &mut String) {
    out.push_str(&JsonValue::String(s.to_string()).to_string());
}

/// Order line item. Owned by its order (workspace is transitive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
    pub total_price: Option<Decimal>,
    pub is_personalized: bool,
    pub attributes: ItemAttributes,
    /// Marketplace line id; unique per order when present.
    pub external_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for OrderItem {
    type Id = OrderItemId;

    fn id(&self) -> OrderItemId {
        self.id
    }
}

/// Uniqueness key of a line within its order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineIdentity {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub is_personalized: bool,
    pub attributes_key: String,
}

impl OrderItem {
    pub fn identity(&self) -> LineIdentity {
        LineIdentity {
            order_id: self.order_id,
            product_id: self.product_id,
            is_personalized: self.is_personalized,
            attributes_key: self.attributes.canonical_key(),
        }
    }
}

/// Command: UpsertOrderItem.
///
/// `item_id = None` creates a line; `Some` replaces the stored line with this
/// state. Either way the pricing rule runs on the command's prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsertOrderItem {
    pub item_id: Option<OrderItemId>,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
    pub total_price: Option<Decimal>,
    pub is_personalized: bool,
    pub attributes: Option<JsonValue>,
    pub external_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl UpsertOrderItem {
    /// New locally entered line with prices left to the pricing rule.
    pub fn new(
        order_id: OrderId,
        product_id: ProductId,
        quantity: Decimal,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            item_id: None,
            order_id,
            product_id,
            quantity,
            unit_price: None,
            total_price: None,
            is_personalized: false,
            attributes: None,
            external_id: None,
            occurred_at,
        }
    }

    /// Field checks that run before anything is looked up or recomputed.
    ///
    /// Every amount must be stored exactly by its column, so the line the
    /// caller gets back is the line that was persisted.
    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity <= Decimal::ZERO {
            return Err(DomainError::validation("quantity", "quantity must be > 0"));
        }
        DecimalColumn::QUANTITY.check("quantity", self.quantity)?;
        if let Some(unit) = self.unit_price {
            if unit < Decimal::ZERO {
                return Err(DomainError::validation("unit_price", "must be >= 0"));
            }
            DecimalColumn::UNIT_PRICE.check("unit_price", unit)?;
        }
        if let Some(total) = self.total_price {
            DecimalColumn::MONEY.check("total_price", total)?;
        }
        Ok(())
    }
}

impl OrderItem {
    /// Validate the command, run the pricing rule and build the line.
    ///
    /// `existing` is the stored line when the command updates one; its id and
    /// creation time are kept.
    pub fn resolve(
        cmd: &UpsertOrderItem,
        existing: Option<&OrderItem>,
        ctx: PricingContext,
    ) -> DomainResult<Self> {
        cmd.validate()?;
        let attributes = ItemAttributes::from_json(cmd.attributes.clone())?;

        if let Some(prev) = existing {
            if prev.order_id != cmd.order_id {
                return Err(DomainError::invariant("order item cannot move between orders"));
            }
        }

        let pricing = resolve_line_pricing(cmd.quantity, cmd.unit_price, cmd.total_price, ctx)?;

        let (id, created_at) = match existing {
            Some(prev) => (prev.id, prev.created_at),
            None => (cmd.item_id.unwrap_or_default(), cmd.occurred_at),
        };

        Ok(Self {
            id,
            order_id: cmd.order_id,
            product_id: cmd.product_id,
            quantity: cmd.quantity,
            unit_price: pricing.unit_price,
            total_price: pricing.total_price,
            is_personalized: cmd.is_personalized,
            attributes,
            external_id: cmd.external_id.clone(),
            created_at,
            updated_at: cmd.occurred_at,
        })
    }
}
