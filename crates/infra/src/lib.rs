//! Infrastructure layer: stores, configuration and the engine operations.
//!
//! Domain crates decide; this crate sequences their decisions inside
//! transactional units of work and keeps derived values (filament stock,
//! order totals) consistent with the rows they are computed from.

pub mod config;
pub mod engine;
pub mod error;
pub mod store;

pub use config::StoreConfig;
pub use engine::{Engine, OrderItemUpserted, PrintJobTransitioned, StockRecomputed};
pub use error::{EngineError, EngineResult};
pub use store::{InMemoryStore, PostgresStore, Store, StoreError, StoreResult, UnitOfWork};
