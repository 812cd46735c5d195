//! eon-ledger
//!
//! Boundary between the reconciliation pipeline and a chain. Defines only
//! capabilities and value types; no concrete chain client lives here.
//!
//! - `Ledger`: reads, transactions, contract and proxy creation
//! - `contracts`: typed handles (token, feed, comptroller, market, oracle)
//! - `DeploymentRegistry`: persisted logical-name → deployment map

mod abi;
mod address;
pub mod contracts;
mod error;
mod ledger;
mod registry;

pub use abi::{AbiValue, Call};
pub use address::{Address, AddressParseError};
pub use error::LedgerError;
pub use ledger::{Artifact, Created, Ledger, TxReceipt};
pub use registry::{DeploymentRecord, DeploymentRegistry, JsonFileRegistry, MemoryRegistry};
