//! Filament ledger operations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument, warn};

use printworks_core::{FilamentId, FilamentTransactionId, WorkspaceId};
use printworks_inventory::{
    Filament, FilamentTransaction, RecordLedgerTransaction, RegisterFilament, StockStatus,
};

use super::Engine;
use crate::error::{EngineError, EngineResult};
use crate::store::{Store, UnitOfWork};

/// Outcome of a stock recomputation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockRecomputed {
    pub filament_id: FilamentId,
    pub stock_grams: Decimal,
    pub status: StockStatus,
    /// The ledger row the operation wrote, with its stock snapshots filled.
    pub transaction: Option<FilamentTransaction>,
}

impl StockRecomputed {
    fn of(filament: &Filament, transaction: Option<FilamentTransaction>) -> Self {
        Self {
            filament_id: filament.id,
            stock_grams: filament.current_stock_grams,
            status: filament.stock_status(),
            transaction,
        }
    }
}

/// Re-aggregate the locked filament's full ledger and persist the result.
pub(crate) async fn recompute_locked(
    uow: &mut dyn UnitOfWork,
    mut filament: Filament,
    at: DateTime<Utc>,
) -> EngineResult<Filament> {
    let totals = uow.ledger_totals(filament.id).await?;
    let stock = totals.checked_stock()?;
    uow.update_filament_stock(filament.id, stock, at).await?;

    filament.current_stock_grams = stock;
    filament.updated_at = at;

    let status = filament.stock_status();
    match status {
        StockStatus::Healthy => info!(
            filament_id = %filament.id,
            stock_grams = %stock,
            "filament stock recomputed"
        ),
        StockStatus::Reorder | StockStatus::Critical => warn!(
            filament_id = %filament.id,
            stock_grams = %stock,
            safety_stock_grams = %filament.safety_stock_grams,
            reorder_point_grams = %filament.reorder_point_grams,
            status = ?status,
            "filament stock low"
        ),
    }
    Ok(filament)
}

/// Append a ledger row to a filament inside an open unit of work.
///
/// Validation runs before the filament is touched.
pub(crate) async fn append_ledger_row(
    uow: &mut dyn UnitOfWork,
    workspace_id: WorkspaceId,
    cmd: &RecordLedgerTransaction,
) -> EngineResult<StockRecomputed> {
    let mut row = FilamentTransaction::record(cmd)?;

    // Lock order is job, then filament.
    if let Some(job_id) = cmd.print_job_id {
        uow.lock_print_job(workspace_id, job_id)
            .await?
            .ok_or(EngineError::NotFound("print job"))?;
    }

    let filament = uow
        .lock_filament(workspace_id, cmd.filament_id)
        .await?
        .ok_or(EngineError::NotFound("filament"))?;

    let previous = filament.current_stock_grams;
    uow.insert_ledger_row(&row).await?;
    let filament = recompute_locked(&mut *uow, filament, cmd.occurred_at).await?;
    uow.set_ledger_snapshot(row.id, previous, filament.current_stock_grams)
        .await?;

    row.previous_stock = Some(previous);
    row.new_stock = Some(filament.current_stock_grams);

    Ok(StockRecomputed::of(&filament, Some(row)))
}

impl<S: Store> Engine<S> {
    #[instrument(skip(self, cmd), fields(workspace_id = %workspace_id, filament_id = %cmd.filament_id), err)]
    pub async fn register_filament(
        &self,
        workspace_id: WorkspaceId,
        cmd: RegisterFilament,
    ) -> EngineResult<Filament> {
        let filament = Filament::register(workspace_id, &cmd)?;

        let mut uow = self.store.begin().await?;
        uow.insert_filament(&filament).await?;
        uow.commit().await?;

        info!(filament_id = %filament.id, name = %filament.name, "filament registered");
        Ok(filament)
    }

    /// Record a stock movement and recompute the filament's stock.
    #[instrument(
        skip(self, cmd),
        fields(
            workspace_id = %workspace_id,
            filament_id = %cmd.filament_id,
            kind = %cmd.kind,
            quantity_grams = %cmd.quantity_grams
        ),
        err
    )]
    pub async fn record_ledger_transaction(
        &self,
        workspace_id: WorkspaceId,
        cmd: RecordLedgerTransaction,
    ) -> EngineResult<StockRecomputed> {
        // Reject before opening a unit of work.
        FilamentTransaction::record(&cmd)?;

        let mut uow = self.store.begin().await?;
        let outcome = append_ledger_row(&mut *uow, workspace_id, &cmd).await?;
        uow.commit().await?;
        Ok(outcome)
    }

    /// Remove a ledger row and recompute the filament's stock.
    #[instrument(skip(self), fields(workspace_id = %workspace_id, transaction_id = %transaction_id), err)]
    pub async fn delete_ledger_transaction(
        &self,
        workspace_id: WorkspaceId,
        transaction_id: FilamentTransactionId,
    ) -> EngineResult<StockRecomputed> {
        let mut uow = self.store.begin().await?;

        let row = uow
            .get_ledger_row(workspace_id, transaction_id)
            .await?
            .ok_or(EngineError::NotFound("ledger transaction"))?;
        let filament = uow
            .lock_filament(workspace_id, row.filament_id)
            .await?
            .ok_or(EngineError::NotFound("filament"))?;

        uow.delete_ledger_row(transaction_id).await?;
        let filament = recompute_locked(&mut *uow, filament, Utc::now()).await?;
        uow.commit().await?;

        Ok(StockRecomputed::of(&filament, None))
    }

    /// Recompute stock from the ledger without writing a movement.
    #[instrument(skip(self), fields(workspace_id = %workspace_id, filament_id = %filament_id), err)]
    pub async fn recompute_filament_stock(
        &self,
        workspace_id: WorkspaceId,
        filament_id: FilamentId,
    ) -> EngineResult<StockRecomputed> {
        let mut uow = self.store.begin().await?;
        let filament = uow
            .lock_filament(workspace_id, filament_id)
            .await?
            .ok_or(EngineError::NotFound("filament"))?;

        let filament = recompute_locked(&mut *uow, filament, Utc::now()).await?;
        uow.commit().await?;

        Ok(StockRecomputed::of(&filament, None))
    }
}
