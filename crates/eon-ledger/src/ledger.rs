use serde::{Deserialize, Serialize};

use crate::{AbiValue, Address, Call, LedgerError};

/// Compiled contract as the ledger would deploy it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub contract: String,
    /// Hex digest of the deployable bytecode.
    pub bytecode_digest: String,
}

/// Confirmation of a state-changing transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub hash: String,
    pub block: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub address: Address,
    pub receipt: TxReceipt,
}

/// Chain capabilities consumed by the pipeline.
///
/// Every method suspends until the read returns or the transaction is
/// confirmed. Implementations must not retry; transport failures surface as
/// [`LedgerError::Transport`].
#[async_trait::async_trait]
pub trait Ledger: Send + Sync {
    /// Short identifier for logs (e.g. `paper`).
    fn kind(&self) -> &'static str;

    /// Account that signs deployments.
    async fn deployer(&self) -> Result<Address, LedgerError>;

    /// Account that owns proxies and rate models.
    async fn owner(&self) -> Result<Address, LedgerError>;

    async fn artifact(&self, contract: &str) -> Result<Artifact, LedgerError>;

    /// Deploy `contract` with constructor `args`.
    async fn create(
        &self,
        from: Address,
        contract: &str,
        args: &[AbiValue],
    ) -> Result<Created, LedgerError>;

    /// Deploy a transparent proxy over `implementation`, administered by
    /// `admin`, and run `init` in the proxy's storage.
    async fn create_proxy(
        &self,
        from: Address,
        implementation: Address,
        admin: Address,
        init: &Call,
    ) -> Result<Created, LedgerError>;

    /// Point an existing proxy at a new implementation. Storage is kept.
    async fn upgrade_proxy(
        &self,
        from: Address,
        proxy: Address,
        implementation: Address,
    ) -> Result<TxReceipt, LedgerError>;

    async fn proxy_implementation(&self, proxy: Address) -> Result<Address, LedgerError>;

    /// Read-only call.
    async fn call(&self, to: Address, call: &Call) -> Result<AbiValue, LedgerError>;

    /// Submit a transaction and await its confirmation.
    async fn send(&self, from: Address, to: Address, call: &Call) -> Result<TxReceipt, LedgerError>;
}
