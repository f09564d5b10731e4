//! Error types for the join planner

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlanError>;

#[derive(Error, Debug)]
pub enum PlanError {
    /// Broken logical-plan invariant. Always a bug upstream, never a user error.
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PlanError {
    /// Shorthand for an internal invariant violation.
    pub fn internal(msg: impl Into<String>) -> Self {
        PlanError::Internal(msg.into())
    }

    /// True for errors that indicate a planner bug rather than bad input.
    pub fn is_internal(&self) -> bool {
        matches!(self, PlanError::Internal(_))
    }
}

impl From<serde_json::Error> for PlanError {
    fn from(err: serde_json::Error) -> Self {
        PlanError::Serialization(err.to_string())
    }
}
