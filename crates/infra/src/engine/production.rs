//! Print job operations and queue queries.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument};

use printworks_core::{FilamentId, PrintJobId, WorkspaceId};
use printworks_inventory::{RecordLedgerTransaction, TransactionKind};
use printworks_production::{
    CreatePrintJob, JobTransition, PrintJob, next_dispatchable, sort_for_dispatch,
};

use super::Engine;
use super::inventory::{StockRecomputed, append_ledger_row};
use crate::error::{EngineError, EngineResult};
use crate::store::{Store, UnitOfWork};

/// Outcome of a job transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrintJobTransitioned {
    pub job: PrintJob,
    /// Filament stock after the consumption the transition recorded, if any.
    pub stock: Option<StockRecomputed>,
}

async fn ensure_filament(
    uow: &mut dyn UnitOfWork,
    workspace_id: WorkspaceId,
    filament_id: Option<FilamentId>,
) -> EngineResult<()> {
    if let Some(filament_id) = filament_id {
        uow.lock_filament(workspace_id, filament_id)
            .await?
            .ok_or(EngineError::NotFound("filament"))?;
    }
    Ok(())
}

impl<S: Store> Engine<S> {
    /// Create a pending job for an order line of this workspace.
    ///
    /// The job prints the line's own product.
    #[instrument(
        skip(self, cmd),
        fields(workspace_id = %workspace_id, job_id = %cmd.job_id, order_item_id = %cmd.order_item_id),
        err
    )]
    pub async fn create_print_job(
        &self,
        workspace_id: WorkspaceId,
        cmd: CreatePrintJob,
    ) -> EngineResult<PrintJob> {
        let job = PrintJob::create(workspace_id, &cmd)?;

        let mut uow = self.store.begin().await?;
        let item = uow
            .get_order_item(workspace_id, cmd.order_item_id)
            .await?
            .ok_or(EngineError::NotFound("order item"))?;
        if item.product_id != cmd.product_id {
            return Err(EngineError::InvariantViolation(format!(
                "job product {} does not match order item product {}",
                cmd.product_id, item.product_id
            )));
        }
        uow.get_product(workspace_id, cmd.product_id)
            .await?
            .ok_or(EngineError::NotFound("product"))?;
        ensure_filament(&mut *uow, workspace_id, cmd.filament_id).await?;

        uow.insert_print_job(&job).await?;
        uow.commit().await?;

        info!(job_id = %job.id, priority = job.priority, "print job created");
        Ok(job)
    }

    /// Apply a lifecycle step.
    ///
    /// Completing or failing a job that used filament records an `out` or
    /// `waste` ledger row in the same unit of work, so the spool's stock moves
    /// together with the status.
    #[instrument(skip(self, transition), fields(workspace_id = %workspace_id, job_id = %job_id, target = %transition.target()), err)]
    pub async fn transition_print_job(
        &self,
        workspace_id: WorkspaceId,
        job_id: PrintJobId,
        transition: JobTransition,
    ) -> EngineResult<PrintJobTransitioned> {
        let now = Utc::now();
        let mut uow = self.store.begin().await?;
        let mut job = uow
            .lock_print_job(workspace_id, job_id)
            .await?
            .ok_or(EngineError::NotFound("print job"))?;

        if let JobTransition::Start { filament_id, .. } = &transition {
            ensure_filament(&mut *uow, workspace_id, *filament_id).await?;
        }

        let from = job.status;
        let consumption = job.transition(&transition, now)?;
        uow.save_print_job(&job).await?;

        let stock = match consumption {
            Some(used) => {
                let kind = if used.wasted {
                    TransactionKind::Waste
                } else {
                    TransactionKind::Out
                };
                let mut cmd = RecordLedgerTransaction::new(used.filament_id, kind, used.grams, now);
                cmd.print_job_id = Some(job.id);
                cmd.reason = if used.wasted {
                    format!("failed print: {}", job.failure_reason)
                } else {
                    "print completed".to_string()
                };
                Some(append_ledger_row(&mut *uow, workspace_id, &cmd).await?)
            }
            None => None,
        };

        uow.commit().await?;

        info!(job_id = %job.id, from = %from, to = %job.status, "print job transitioned");
        Ok(PrintJobTransitioned { job, stock })
    }

    #[instrument(skip(self), fields(workspace_id = %workspace_id, job_id = %job_id), err)]
    pub async fn reprioritize_print_job(
        &self,
        workspace_id: WorkspaceId,
        job_id: PrintJobId,
        priority: i32,
    ) -> EngineResult<PrintJob> {
        let mut uow = self.store.begin().await?;
        let mut job = uow
            .lock_print_job(workspace_id, job_id)
            .await?
            .ok_or(EngineError::NotFound("print job"))?;
        job.reprioritize(priority, Utc::now())?;
        uow.save_print_job(&job).await?;
        uow.commit().await?;
        Ok(job)
    }

    /// The job a dispatcher should start next. Read only.
    #[instrument(skip(self), fields(workspace_id = %workspace_id), err)]
    pub async fn next_dispatchable_job(
        &self,
        workspace_id: WorkspaceId,
    ) -> EngineResult<Option<PrintJob>> {
        let mut uow = self.store.begin().await?;
        let jobs = uow.list_print_jobs(workspace_id).await?;
        Ok(next_dispatchable(&jobs).cloned())
    }

    /// All of the workspace's jobs in dispatch order. Read only.
    #[instrument(skip(self), fields(workspace_id = %workspace_id), err)]
    pub async fn dispatch_queue(&self, workspace_id: WorkspaceId) -> EngineResult<Vec<PrintJob>> {
        let mut uow = self.store.begin().await?;
        let mut jobs = uow.list_print_jobs(workspace_id).await?;
        sort_for_dispatch(&mut jobs);
        Ok(jobs)
    }
}
