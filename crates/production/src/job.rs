use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use printworks_core::{
    DecimalColumn, DomainError, DomainResult, Entity, FilamentId, OrderItemId, PrintJobId,
    PrinterId, ProductId, WorkspaceId, WorkspaceScoped,
};

/// Print job lifecycle.
///
/// `pending → queued → printing → {completed | failed}`; `cancelled` is
/// reachable from every non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrintJobStatus {
    Pending,
    Queued,
    Printing,
    Completed,
    Failed,
    Cancelled,
}

impl PrintJobStatus {
    pub const ALL: [PrintJobStatus; 6] = [
        PrintJobStatus::Pending,
        PrintJobStatus::Queued,
        PrintJobStatus::Printing,
        PrintJobStatus::Completed,
        PrintJobStatus::Failed,
        PrintJobStatus::Cancelled,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PrintJobStatus::Completed | PrintJobStatus::Failed | PrintJobStatus::Cancelled
        )
    }

    /// Waiting for a printer (eligible for dispatch).
    pub fn is_dispatchable(self) -> bool {
        matches!(self, PrintJobStatus::Pending | PrintJobStatus::Queued)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PrintJobStatus::Pending => "pending",
            PrintJobStatus::Queued => "queued",
            PrintJobStatus::Printing => "printing",
            PrintJobStatus::Completed => "completed",
            PrintJobStatus::Failed => "failed",
            PrintJobStatus::Cancelled => "cancelled",
        }
    }
}

impl core::fmt::Display for PrintJobStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrintJobStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrintJobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::validation("status", format!("unknown job status '{s}'")))
    }
}

/// Unit of production work for one order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: PrintJobId,
    pub workspace_id: WorkspaceId,
    pub order_item_id: OrderItemId,
    pub product_id: ProductId,
    pub component_label: String,
    pub printer_id: Option<PrinterId>,
    pub filament_id: Option<FilamentId>,
    pub status: PrintJobStatus,
    /// Higher is more urgent. Always >= 1.
    pub priority: i32,
    pub estimated_print_minutes: Option<u32>,
    pub material_used_grams: Option<Decimal>,
    pub failure_reason: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for PrintJob {
    type Id = PrintJobId;

    fn id(&self) -> PrintJobId {
        self.id
    }
}

impl WorkspaceScoped for PrintJob {
    fn workspace_id(&self) -> WorkspaceId {
        self.workspace_id
    }
}

/// Command: CreatePrintJob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePrintJob {
    pub job_id: PrintJobId,
    pub order_item_id: OrderItemId,
    pub product_id: ProductId,
    pub component_label: String,
    pub priority: i32,
    pub filament_id: Option<FilamentId>,
    pub estimated_print_minutes: Option<u32>,
    pub notes: String,
    pub occurred_at: DateTime<Utc>,
}

/// Externally driven state change of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum JobTransition {
    Queue,
    Start {
        printer_id: Option<PrinterId>,
        filament_id: Option<FilamentId>,
    },
    Complete {
        material_used_grams: Option<Decimal>,
    },
    Fail {
        reason: String,
        material_used_grams: Option<Decimal>,
    },
    Cancel,
}

impl JobTransition {
    pub fn target(&self) -> PrintJobStatus {
        match self {
            JobTransition::Queue => PrintJobStatus::Queued,
            JobTransition::Start { .. } => PrintJobStatus::Printing,
            JobTransition::Complete { .. } => PrintJobStatus::Completed,
            JobTransition::Fail { .. } => PrintJobStatus::Failed,
            JobTransition::Cancel => PrintJobStatus::Cancelled,
        }
    }
}

/// Filament a finished job drew from the spool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialConsumption {
    pub filament_id: FilamentId,
    pub grams: Decimal,
    /// The material went into a failed print.
    pub wasted: bool,
}

/// True if `from → to` is an allowed lifecycle step.
pub fn can_transition(from: PrintJobStatus, to: PrintJobStatus) -> bool {
    use PrintJobStatus::*;
    matches!(
        (from, to),
        (Pending, Queued)
            | (Queued, Printing)
            | (Printing, Completed)
            | (Printing, Failed)
            | (Pending | Queued | Printing, Cancelled)
    )
}

fn ensure_priority(priority: i32) -> DomainResult<()> {
    if priority < 1 {
        return Err(DomainError::validation("priority", "priority must be >= 1"));
    }
    Ok(())
}

impl PrintJob {
    pub fn create(workspace_id: WorkspaceId, cmd: &CreatePrintJob) -> DomainResult<Self> {
        ensure_priority(cmd.priority)?;

        Ok(Self {
            id: cmd.job_id,
            workspace_id,
            order_item_id: cmd.order_item_id,
            product_id: cmd.product_id,
            component_label: cmd.component_label.clone(),
            printer_id: None,
            filament_id: cmd.filament_id,
            status: PrintJobStatus::Pending,
            priority: cmd.priority,
            estimated_print_minutes: cmd.estimated_print_minutes,
            material_used_grams: None,
            failure_reason: String::new(),
            notes: cmd.notes.clone(),
            created_at: cmd.occurred_at,
            started_at: None,
            finished_at: None,
            updated_at: cmd.occurred_at,
        })
    }

    pub fn reprioritize(&mut self, priority: i32, at: DateTime<Utc>) -> DomainResult<()> {
        ensure_priority(priority)?;
        if self.status.is_terminal() {
            return Err(DomainError::invariant(format!(
                "cannot reprioritize a {} job",
                self.status
            )));
        }
        self.priority = priority;
        self.updated_at = at;
        Ok(())
    }

    /// Apply a lifecycle step.
    ///
    /// Returns the filament consumption the step implies, if any: completing or
    /// failing a job with an assigned filament and positive material usage.
    pub fn transition(
        &mut self,
        transition: &JobTransition,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<MaterialConsumption>> {
        let target = transition.target();
        if !can_transition(self.status, target) {
            return Err(DomainError::invariant(format!(
                "illegal job transition {} -> {}",
                self.status, target
            )));
        }

        let used = match transition {
            JobTransition::Complete {
                material_used_grams,
            }
            | JobTransition::Fail {
                material_used_grams,
                ..
            } => *material_used_grams,
            _ => None,
        };
        if let Some(grams) = used {
            if grams < Decimal::ZERO {
                return Err(DomainError::validation("material_used_grams", "must be >= 0"));
            }
            DecimalColumn::QUANTITY.check("material_used_grams", grams)?;
            self.material_used_grams = Some(grams);
        }

        match transition {
            JobTransition::Start {
                printer_id,
                filament_id,
            } => {
                if printer_id.is_some() {
                    self.printer_id = *printer_id;
                }
                if filament_id.is_some() {
                    self.filament_id = *filament_id;
                }
                self.started_at = Some(at);
            }
            JobTransition::Fail { reason, .. } => {
                self.failure_reason = reason.clone();
            }
            JobTransition::Queue | JobTransition::Complete { .. } | JobTransition::Cancel => {}
        }

        if target.is_terminal() {
            self.finished_at = Some(at);
        }
        self.status = target;
        self.updated_at = at;

        let consumption = match (self.filament_id, used) {
            (Some(filament_id), Some(grams)) if grams > Decimal::ZERO => Some(MaterialConsumption {
                filament_id,
                grams,
                wasted: target == PrintJobStatus::Failed,
            }),
            _ => None,
        };
        Ok(consumption)
    }
}
