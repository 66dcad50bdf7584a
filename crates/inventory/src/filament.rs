use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use printworks_core::{
    ColorId, DecimalColumn, DomainError, DomainResult, Entity, FilamentId, MaterialId, WorkspaceId,
    WorkspaceScoped,
};

/// Safety stock applied when registration does not specify one.
pub const DEFAULT_SAFETY_STOCK_GRAMS: Decimal = Decimal::from_parts(500, 0, 0, false, 0);

/// Reorder point applied when registration does not specify one.
pub const DEFAULT_REORDER_POINT_GRAMS: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// Filament spool inventory unit (material + color + name), workspace-scoped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filament {
    pub id: FilamentId,
    pub workspace_id: WorkspaceId,
    pub material_id: MaterialId,
    pub color_id: ColorId,
    pub name: String,
    pub code: Option<String>,
    /// Materialized ledger sum. Only the recomputation engine writes this.
    pub current_stock_grams: Decimal,
    pub safety_stock_grams: Decimal,
    pub reorder_point_grams: Decimal,
    pub cost_per_gram: Option<Decimal>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Filament {
    type Id = FilamentId;

    fn id(&self) -> FilamentId {
        self.id
    }
}

impl WorkspaceScoped for Filament {
    fn workspace_id(&self) -> WorkspaceId {
        self.workspace_id
    }
}

/// Stock level classification against the filament's thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    /// Above the reorder point.
    Healthy,
    /// At or below the reorder point, above safety stock.
    Reorder,
    /// At or below safety stock.
    Critical,
}

/// Command: RegisterFilament.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterFilament {
    pub filament_id: FilamentId,
    pub material_id: MaterialId,
    pub color_id: ColorId,
    pub name: String,
    pub code: Option<String>,
    pub safety_stock_grams: Option<Decimal>,
    pub reorder_point_grams: Option<Decimal>,
    pub cost_per_gram: Option<Decimal>,
    pub occurred_at: DateTime<Utc>,
}

impl Filament {
    /// Validate a registration command and build a filament with an empty ledger.
    pub fn register(workspace_id: WorkspaceId, cmd: &RegisterFilament) -> DomainResult<Self> {
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name", "cannot be empty"));
        }

        let safety = cmd.safety_stock_grams.unwrap_or(DEFAULT_SAFETY_STOCK_GRAMS);
        let reorder = cmd.reorder_point_grams.unwrap_or(DEFAULT_REORDER_POINT_GRAMS);
        if safety < Decimal::ZERO {
            return Err(DomainError::validation("safety_stock_grams", "must be >= 0"));
        }
        if reorder < Decimal::ZERO {
            return Err(DomainError::validation("reorder_point_grams", "must be >= 0"));
        }
        DecimalColumn::QUANTITY.check("safety_stock_grams", safety)?;
        DecimalColumn::QUANTITY.check("reorder_point_grams", reorder)?;
        if let Some(cost) = cmd.cost_per_gram {
            if cost < Decimal::ZERO {
                return Err(DomainError::validation("cost_per_gram", "must be >= 0"));
            }
            DecimalColumn::COST_PER_GRAM.check("cost_per_gram", cost)?;
        }

        Ok(Self {
            id: cmd.filament_id,
            workspace_id,
            material_id: cmd.material_id,
            color_id: cmd.color_id,
            name: cmd.name.trim().to_string(),
            code: cmd.code.clone(),
            current_stock_grams: Decimal::ZERO,
            safety_stock_grams: safety,
            reorder_point_grams: reorder,
            cost_per_gram: cmd.cost_per_gram,
            is_available: true,
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        })
    }

    pub fn stock_status(&self) -> StockStatus {
        classify_stock(
            self.current_stock_grams,
            self.safety_stock_grams,
            self.reorder_point_grams,
        )
    }
}

/// Classify a stock level. Safety stock wins when thresholds overlap.
pub fn classify_stock(stock: Decimal, safety: Decimal, reorder_point: Decimal) -> StockStatus {
    if stock <= safety {
        StockStatus::Critical
    } else if stock <= reorder_point {
        StockStatus::Reorder
    } else {
        StockStatus::Healthy
    }
}
