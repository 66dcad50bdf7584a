//! Production (print job) domain module.
//!
//! This crate contains the print-job lifecycle and the stateless ordering
//! policy a dispatcher uses to pick the next job. There is no scheduler loop
//! here; transitions are driven by operators and integrations.

pub mod job;
pub mod queue;

pub use job::{
    CreatePrintJob, JobTransition, MaterialConsumption, PrintJob, PrintJobStatus, can_transition,
};
pub use queue::{DispatchKey, dispatch_key, next_dispatchable, sort_for_dispatch, status_rank};
