//! Write-path orchestration.
//!
//! Every mutating operation runs the same pipeline inside one unit of work:
//!
//! ```text
//! Command
//!   ↓
//! 1. Validate (pure domain, before any store access)
//!   ↓
//! 2. Begin unit of work, lock the aggregate root (filament / order / job)
//!   ↓
//! 3. Write the triggering row
//!   ↓
//! 4. Recompute the derived value from the full child set
//!   ↓
//! 5. Persist the derived value, commit
//! ```
//!
//! Returning early on any error drops the unit of work, which rolls it back.
//! Derived values (filament stock, order totals) are therefore never observed
//! out of step with their rows.

use crate::store::Store;

mod catalog;
mod inventory;
mod orders;
mod production;

pub use inventory::StockRecomputed;
pub use orders::OrderItemUpserted;
pub use production::PrintJobTransitioned;

/// Operation surface over a [`Store`].
///
/// All operations are scoped to a workspace: rows owned by another workspace
/// are reported as not found.
#[derive(Debug, Clone)]
pub struct Engine<S> {
    store: S,
}

impl<S: Store> Engine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
