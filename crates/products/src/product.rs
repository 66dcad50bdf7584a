use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use printworks_core::{
    DecimalColumn, DomainError, DomainResult, Entity, ProductId, WorkspaceId, WorkspaceScoped,
};

/// Catalog product, workspace-scoped.
///
/// Only the fields the pricing rule reads are modeled; the rest of the catalog
/// is plain storage owned by the surrounding CRUD layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub workspace_id: WorkspaceId,
    /// Unique per workspace when present.
    pub sku: Option<String>,
    pub title: String,
    /// Current list price. `None` leaves defaulted line prices unresolved.
    pub price: Option<Decimal>,
    pub is_personalized: bool,
    pub created_at: DateTime<Utc>,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }
}

impl WorkspaceScoped for Product {
    fn workspace_id(&self) -> WorkspaceId {
        self.workspace_id
    }
}

/// Command: RegisterProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterProduct {
    pub product_id: ProductId,
    pub sku: Option<String>,
    pub title: String,
    pub price: Option<Decimal>,
    pub is_personalized: bool,
    pub occurred_at: DateTime<Utc>,
}

impl Product {
    /// Validate a registration command and build the record.
    pub fn register(workspace_id: WorkspaceId, cmd: &RegisterProduct) -> DomainResult<Self> {
        if cmd.title.trim().is_empty() {
            return Err(DomainError::validation("title", "cannot be empty"));
        }
        if let Some(price) = cmd.price {
            if price < Decimal::ZERO {
                return Err(DomainError::validation("price", "must be >= 0"));
            }
            DecimalColumn::MONEY.check("price", price)?;
        }
        let sku = cmd
            .sku
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            id: cmd.product_id,
            workspace_id,
            sku,
            title: cmd.title.trim().to_string(),
            price: cmd.price,
            is_personalized: cmd.is_personalized,
            created_at: cmd.occurred_at,
        })
    }
}
