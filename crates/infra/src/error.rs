use thiserror::Error;

use printworks_core::{DomainError, FieldError};

use crate::store::StoreError;

/// Error returned by engine operations.
///
/// Any error aborts the operation's unit of work; nothing it wrote survives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(FieldError),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// A uniqueness/check constraint rejected the write (constraint name).
    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("store error: {0}")]
    Store(String),
}

impl EngineError {
    /// Offending field for validation failures.
    pub fn field(&self) -> Option<&str> {
        match self {
            EngineError::Validation(err) => Some(err.field.as_str()),
            _ => None,
        }
    }

    pub fn is_constraint(&self) -> bool {
        matches!(self, EngineError::Constraint(_))
    }
}

impl From<DomainError> for EngineError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(err) => EngineError::Validation(err),
            DomainError::InvariantViolation(msg) => EngineError::InvariantViolation(msg),
            DomainError::InvalidId(msg) => EngineError::Validation(FieldError {
                field: "id".to_string(),
                message: msg,
            }),
            DomainError::NotFound(entity) => EngineError::NotFound(entity),
            DomainError::Conflict(msg) => EngineError::Constraint(msg),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Constraint(name) => EngineError::Constraint(name),
            StoreError::NotFound(entity) => EngineError::NotFound(entity),
            StoreError::TenantIsolation(msg) => EngineError::TenantIsolation(msg),
            StoreError::Domain(err) => err.into(),
            StoreError::Backend(msg) => EngineError::Store(msg),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
