//! Deterministic in-process "paper" chain.
//!
//! Implements [`Ledger`] over a [`PaperChain`] held behind an async mutex.
//! Serves local/ephemeral execution (the `eon` binary persists it to a JSON
//! state file between invocations) and every pipeline test.
//!
//! Accounts: `account(0)` is both deployer and owner. Other indices are
//! plain users for supply/borrow fixtures.

use std::path::Path;
use tokio::sync::Mutex;
use tracing::debug;

use eon_ledger::{AbiValue, Address, Artifact, Call, Created, Ledger, LedgerError, TxReceipt};

mod chain;
pub mod state;

pub use chain::{account, PaperChain};
pub use state::{TxEntry, LOCKED_FIRST_MINT};

#[derive(Debug, Default)]
pub struct PaperLedger {
    chain: Mutex<PaperChain>,
}

impl PaperLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_chain(chain: PaperChain) -> Self {
        Self {
            chain: Mutex::new(chain),
        }
    }

    /// Load chain state from `path`; a missing file is a fresh chain.
    pub async fn open(path: &Path) -> Result<Self, LedgerError> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => {
                return Err(LedgerError::Transport(format!(
                    "read paper state {}: {e}",
                    path.display()
                )))
            }
        };
        let chain: PaperChain = serde_json::from_str(&raw).map_err(|e| {
            LedgerError::Transport(format!("invalid paper state {}: {e}", path.display()))
        })?;
        Ok(Self::from_chain(chain))
    }

    pub async fn save(&self, path: &Path) -> Result<(), LedgerError> {
        let io = |op: &str, e: std::io::Error| {
            LedgerError::Transport(format!("{op} paper state {}: {e}", path.display()))
        };
        let body = {
            let chain = self.chain.lock().await;
            serde_json::to_string(&*chain)
                .map_err(|e| LedgerError::Transport(format!("serialize paper state: {e}")))?
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await.map_err(|e| io("create dir for", e))?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await.map_err(|e| io("write", e))?;
        tokio::fs::rename(&tmp, path).await.map_err(|e| io("rename", e))
    }

    pub async fn snapshot(&self) -> PaperChain {
        self.chain.lock().await.clone()
    }

    pub async fn tx_count(&self) -> usize {
        self.chain.lock().await.txs().len()
    }

    pub async fn txs(&self) -> Vec<TxEntry> {
        self.chain.lock().await.txs().to_vec()
    }

    /// Simulate a recompile of `contract`: its artifact digest changes.
    pub async fn set_artifact_version(&self, contract: &str, version: u32) {
        self.chain.lock().await.set_artifact_version(contract, version);
    }

    pub async fn install_token(&self, address: Address, name: &str, symbol: &str, decimals: u8) {
        self.chain
            .lock()
            .await
            .install_token(address, name, symbol, decimals);
    }

    pub async fn install_aggregator(&self, address: Address, decimals: u8, answer: u128) {
        self.chain
            .lock()
            .await
            .install_aggregator(address, decimals, answer);
    }

    pub async fn install_simple_feed(&self, address: Address) {
        self.chain.lock().await.install_simple_feed(address);
    }

    pub async fn set_simple_price(&self, feed: Address, asset: Address, price: u128) -> Result<(), LedgerError> {
        self.chain.lock().await.set_simple_price(feed, asset, price)
    }

    pub async fn set_aggregator_answer(&self, feed: Address, answer: u128) -> Result<(), LedgerError> {
        self.chain.lock().await.set_aggregator_answer(feed, answer)
    }

    pub async fn mint_token(&self, token: Address, to: Address, amount: u128) -> Result<(), LedgerError> {
        self.chain.lock().await.mint_token(token, to, amount)
    }

    /// Deposit underlying into a market; returns the supplier's new shares.
    pub async fn supply(&self, supplier: Address, market: Address, amount: u128) -> Result<u128, LedgerError> {
        let shares = self.chain.lock().await.supply(supplier, market, amount)?;
        debug!(%supplier, %market, amount, shares, "paper supply");
        Ok(shares)
    }

    pub async fn borrow(&self, borrower: Address, market: Address, amount: u128) -> Result<(), LedgerError> {
        self.chain.lock().await.borrow(borrower, market, amount)
    }
}

#[async_trait::async_trait]
impl Ledger for PaperLedger {
    fn kind(&self) -> &'static str {
        "paper"
    }

    async fn deployer(&self) -> Result<Address, LedgerError> {
        Ok(account(0))
    }

    async fn owner(&self) -> Result<Address, LedgerError> {
        Ok(account(0))
    }

    async fn artifact(&self, contract: &str) -> Result<Artifact, LedgerError> {
        self.chain.lock().await.artifact(contract)
    }

    async fn create(
        &self,
        from: Address,
        contract: &str,
        args: &[AbiValue],
    ) -> Result<Created, LedgerError> {
        let (address, receipt) = self.chain.lock().await.create(from, contract, args)?;
        debug!(contract, %address, block = receipt.block, "paper create");
        Ok(Created { address, receipt })
    }

    async fn create_proxy(
        &self,
        from: Address,
        implementation: Address,
        admin: Address,
        init: &Call,
    ) -> Result<Created, LedgerError> {
        let (address, receipt) = self
            .chain
            .lock()
            .await
            .create_proxy(from, implementation, admin, init)?;
        debug!(%implementation, %address, "paper proxy");
        Ok(Created { address, receipt })
    }

    async fn upgrade_proxy(
        &self,
        from: Address,
        proxy: Address,
        implementation: Address,
    ) -> Result<TxReceipt, LedgerError> {
        self.chain
            .lock()
            .await
            .upgrade_proxy(from, proxy, implementation)
    }

    async fn proxy_implementation(&self, proxy: Address) -> Result<Address, LedgerError> {
        self.chain.lock().await.proxy_implementation(proxy)
    }

    async fn call(&self, to: Address, call: &Call) -> Result<AbiValue, LedgerError> {
        self.chain.lock().await.view(to, call)
    }

    async fn send(&self, from: Address, to: Address, call: &Call) -> Result<TxReceipt, LedgerError> {
        let receipt = self.chain.lock().await.send(from, to, call)?;
        debug!(%to, method = %call.method, block = receipt.block, "paper tx");
        Ok(receipt)
    }
}
