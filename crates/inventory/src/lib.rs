//! Filament inventory domain module.
//!
//! This crate contains the filament record, its signed movement ledger, and
//! the full-reaggregation rule that derives stock from that ledger. It is
//! pure domain logic (no IO, no storage).

pub mod filament;
pub mod ledger;

pub use filament::{
    DEFAULT_REORDER_POINT_GRAMS, DEFAULT_SAFETY_STOCK_GRAMS, Filament, RegisterFilament,
    StockStatus, classify_stock,
};
pub use ledger::{FilamentTransaction, LedgerTotals, RecordLedgerTransaction, TransactionKind};
