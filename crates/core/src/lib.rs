//! `printworks-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod decimal;
pub mod entity;
pub mod error;
pub mod id;

pub use decimal::DecimalColumn;
pub use entity::{Entity, WorkspaceScoped};
pub use error::{DomainError, DomainResult, FieldError};
pub use id::{
    ColorId, FilamentId, FilamentTransactionId, MaterialId, OrderId, OrderItemId, PrintJobId,
    PrinterId, ProductId, WorkspaceId,
};
