//! Deployment registry: logical name → deployment record.
//!
//! The registry is the only source of truth for idempotency decisions. It is
//! read before every provisioning decision and never cached by callers.
//! Records are created or replaced, never deleted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{Address, LedgerError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub address: Address,
    /// Logic contract behind a proxy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<Address>,
    /// `true` when the write that produced this record created a contract.
    #[serde(default)]
    pub newly_deployed: bool,
    pub contract: String,
    /// sha256 over (bytecode digest, constructor arguments). On a `_Proxy`
    /// record, sha256 over the initializer call the proxy was created with.
    pub content_hash: String,
}

#[async_trait::async_trait]
pub trait DeploymentRegistry: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<DeploymentRecord>, LedgerError>;

    async fn put(&self, name: &str, record: DeploymentRecord) -> Result<(), LedgerError>;

    /// Every record, keyed and ordered by logical name.
    async fn all(&self) -> Result<BTreeMap<String, DeploymentRecord>, LedgerError>;
}

/// In-process registry for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    records: Mutex<BTreeMap<String, DeploymentRecord>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl DeploymentRegistry for MemoryRegistry {
    async fn get(&self, name: &str) -> Result<Option<DeploymentRecord>, LedgerError> {
        Ok(self.records.lock().await.get(name).cloned())
    }

    async fn put(&self, name: &str, record: DeploymentRecord) -> Result<(), LedgerError> {
        self.records.lock().await.insert(name.to_string(), record);
        Ok(())
    }

    async fn all(&self) -> Result<BTreeMap<String, DeploymentRecord>, LedgerError> {
        Ok(self.records.lock().await.clone())
    }
}

/// One pretty-printed JSON object per network, keyed by logical name.
///
/// Every call goes to disk. Writes land in a sibling temp file first and are
/// renamed over the target, so a crash never leaves a torn registry.
#[derive(Debug, Clone)]
pub struct JsonFileRegistry {
    path: PathBuf,
}

impl JsonFileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, DeploymentRecord>, LedgerError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(io_err(&self.path, "read", e)),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|e| {
            LedgerError::Registry(format!("{}: invalid json: {e}", self.path.display()))
        })
    }

    async fn store(&self, records: &BTreeMap<String, DeploymentRecord>) -> Result<(), LedgerError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| io_err(dir, "create dir", e))?;
        }

        let mut body = serde_json::to_string_pretty(records)
            .map_err(|e| LedgerError::Registry(format!("serialize: {e}")))?;
        body.push('\n');

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| io_err(&tmp, "write", e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| io_err(&self.path, "rename", e))
    }
}

fn io_err(path: &Path, op: &str, e: std::io::Error) -> LedgerError {
    LedgerError::Registry(format!("{op} {}: {e}", path.display()))
}

#[async_trait::async_trait]
impl DeploymentRegistry for JsonFileRegistry {
    async fn get(&self, name: &str) -> Result<Option<DeploymentRecord>, LedgerError> {
        Ok(self.load().await?.remove(name))
    }

    async fn put(&self, name: &str, record: DeploymentRecord) -> Result<(), LedgerError> {
        let mut records = self.load().await?;
        debug!(key = name, address = %record.address, path = %self.path.display(), "registry put");
        records.insert(name.to_string(), record);
        self.store(&records).await
    }

    async fn all(&self) -> Result<BTreeMap<String, DeploymentRecord>, LedgerError> {
        self.load().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(byte: u8) -> DeploymentRecord {
        DeploymentRecord {
            address: Address::from_bytes([byte; 20]),
            implementation: None,
            newly_deployed: true,
            contract: "JumpRateModelV4".to_string(),
            content_hash: "00".repeat(32),
        }
    }

    #[tokio::test]
    async fn memory_registry_replaces_records() {
        let r = MemoryRegistry::new();
        assert_eq!(r.get("StableRateModel").await.unwrap(), None);
        r.put("StableRateModel", record(1)).await.unwrap();
        r.put("StableRateModel", record(2)).await.unwrap();
        let all = r.all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all["StableRateModel"].address, Address::from_bytes([2; 20]));
    }

    #[test]
    fn implementation_is_omitted_when_absent() {
        let j = serde_json::to_string(&record(1)).unwrap();
        assert!(!j.contains("implementation"));
    }
}
