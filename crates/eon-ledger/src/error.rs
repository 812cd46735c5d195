use thiserror::Error;

use crate::Address;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The call or transaction was rejected by the contract.
    #[error("{method} on {to} reverted: {reason}")]
    Revert {
        to: Address,
        method: String,
        reason: String,
    },

    #[error("no contract at {0}")]
    NoContract(Address),

    #[error("no compiled artifact for contract {0}")]
    UnknownArtifact(String),

    #[error("decode failed: expected {expected}, got {actual}")]
    Decode {
        expected: &'static str,
        actual: &'static str,
    },

    /// RPC / transport failure. Never retried here.
    #[error("transport: {0}")]
    Transport(String),

    #[error("deployment registry: {0}")]
    Registry(String),
}

impl LedgerError {
    pub fn revert(to: Address, method: impl Into<String>, reason: impl Into<String>) -> Self {
        LedgerError::Revert {
            to,
            method: method.into(),
            reason: reason.into(),
        }
    }
}
