use thiserror::Error;

use eon_catalog::FixedPointError;
use eon_config::ConfigError;
use eon_ledger::LedgerError;

/// Every failure the pipeline can surface. Errors propagate unmodified from
/// their origin; nothing here is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A stage ran before the deployment it depends on exists.
    #[error("state error: {0}")]
    State(String),

    /// A bootstrap-time invariant check failed.
    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<FixedPointError> for ReconcileError {
    fn from(e: FixedPointError) -> Self {
        ReconcileError::Config(e.into())
    }
}

impl ReconcileError {
    pub(crate) fn state(msg: impl Into<String>) -> Self {
        ReconcileError::State(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
