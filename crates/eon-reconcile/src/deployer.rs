//! Content-addressed deployment.
//!
//! A logical name is (re)deployed only when the sha256 of its artifact digest
//! plus encoded constructor arguments differs from the hash recorded in the
//! registry. A satisfied deployment performs no write, so reruns leave the
//! registry byte-identical.

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use eon_ledger::{AbiValue, Address, Artifact, Call, DeploymentRecord, DeploymentRegistry, Ledger};

use crate::error::{ReconcileError, Result};

/// Registry suffix of a proxied contract's logic record.
pub const IMPLEMENTATION_SUFFIX: &str = "_Implementation";
/// Registry suffix of a proxied contract's proxy record.
pub const PROXY_SUFFIX: &str = "_Proxy";
pub const PROXY_CONTRACT: &str = "TransparentUpgradeableProxy";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeployOutcome {
    /// No record existed; the contract was created.
    Deployed,
    /// A record existed but its content changed; a new contract (or a new
    /// implementation behind the same proxy) now backs the name.
    Upgraded,
    /// The record already matches; nothing was sent.
    Ignored,
}

impl DeployOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployOutcome::Deployed => "DEPLOYED",
            DeployOutcome::Upgraded => "UPGRADED",
            DeployOutcome::Ignored => "IGNORED",
        }
    }

    pub fn changed(&self) -> bool {
        !matches!(self, DeployOutcome::Ignored)
    }
}

impl std::fmt::Display for DeployOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deployment {
    pub name: String,
    pub address: Address,
    pub outcome: DeployOutcome,
    /// Address the name pointed at before an upgrade.
    pub previous: Option<Address>,
}

/// sha256(artifact digest ‖ canonical encoding of `args`), hex.
pub fn content_hash(artifact: &Artifact, args: &[AbiValue]) -> String {
    let mut buf = Vec::with_capacity(64 + args.len() * 32);
    buf.extend_from_slice(artifact.contract.as_bytes());
    buf.push(0);
    buf.extend_from_slice(artifact.bytecode_digest.as_bytes());
    buf.push(0);
    for a in args {
        a.encode_into(&mut buf);
    }
    hex::encode(Sha256::digest(&buf))
}

/// sha256 of an initializer's method name and encoded arguments, hex.
/// Recorded on a proxy so later runs can tell when the arguments its
/// storage was initialized with no longer match the current ones.
pub fn init_hash(init: &Call) -> String {
    let mut buf = Vec::with_capacity(32 + init.args.len() * 32);
    buf.extend_from_slice(init.method.as_bytes());
    buf.push(0);
    for a in &init.args {
        a.encode_into(&mut buf);
    }
    hex::encode(Sha256::digest(&buf))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyDeployment {
    #[serde(flatten)]
    pub deployment: Deployment,
    /// The initializer arguments differ from the ones the proxy was created with.
    pub init_drift: bool,
}

/// Registry-aware deployment front end over a [`Ledger`].
#[derive(Clone, Copy)]
pub struct Deployer<'a> {
    ledger: &'a dyn Ledger,
    registry: &'a dyn DeploymentRegistry,
}

impl<'a> Deployer<'a> {
    pub fn new(ledger: &'a dyn Ledger, registry: &'a dyn DeploymentRegistry) -> Self {
        Self { ledger, registry }
    }

    pub fn ledger(&self) -> &'a dyn Ledger {
        self.ledger
    }

    pub fn registry(&self) -> &'a dyn DeploymentRegistry {
        self.registry
    }

    pub async fn existing(&self, name: &str) -> Result<Option<DeploymentRecord>> {
        Ok(self.registry.get(name).await?)
    }

    /// The record for `name`, or a `StateError` naming what is missing.
    pub async fn require(&self, name: &str, what: &str) -> Result<DeploymentRecord> {
        self.existing(name)
            .await?
            .ok_or_else(|| ReconcileError::state(format!("there is no deployed {what} ({name})")))
    }

    async fn create(&self, name: &str, contract: &str, args: &[AbiValue], content_hash: String) -> Result<DeploymentRecord> {
        let from = self.ledger.deployer().await?;
        let created = self.ledger.create(from, contract, args).await?;
        let record = DeploymentRecord {
            address: created.address,
            implementation: None,
            newly_deployed: true,
            contract: contract.to_string(),
            content_hash,
        };
        self.registry.put(name, record.clone()).await?;
        info!(name, contract, address = %created.address, tx = %created.receipt.hash, "deployed");
        Ok(record)
    }

    /// Deploy `name` unless its recorded content hash already matches.
    pub async fn deploy(&self, name: &str, contract: &str, args: &[AbiValue]) -> Result<Deployment> {
        let artifact = self.ledger.artifact(contract).await?;
        let hash = content_hash(&artifact, args);
        let current = self.existing(name).await?;

        if let Some(rec) = &current {
            if rec.contract == contract && rec.content_hash == hash {
                return Ok(Deployment {
                    name: name.to_string(),
                    address: rec.address,
                    outcome: DeployOutcome::Ignored,
                    previous: None,
                });
            }
        }

        let record = self.create(name, contract, args, hash).await?;
        Ok(Deployment {
            name: name.to_string(),
            address: record.address,
            outcome: if current.is_some() {
                DeployOutcome::Upgraded
            } else {
                DeployOutcome::Deployed
            },
            previous: current.map(|r| r.address),
        })
    }

    /// Deploy `name` only if no record exists at all. Used for contracts that
    /// have no upgrade path.
    pub async fn deploy_once(&self, name: &str, contract: &str, args: &[AbiValue]) -> Result<Deployment> {
        if let Some(rec) = self.existing(name).await? {
            return Ok(Deployment {
                name: name.to_string(),
                address: rec.address,
                outcome: DeployOutcome::Ignored,
                previous: None,
            });
        }
        let artifact = self.ledger.artifact(contract).await?;
        let record = self.create(name, contract, args, content_hash(&artifact, args)).await?;
        Ok(Deployment {
            name: name.to_string(),
            address: record.address,
            outcome: DeployOutcome::Deployed,
            previous: None,
        })
    }

    /// Proxied deployment of `contract` under `name`.
    ///
    /// The implementation is content-addressed under `<name>_Implementation`.
    /// First call creates the proxy (administered by `admin`), runs `init` in
    /// its storage and records [`init_hash`] of `init` on `<name>_Proxy`.
    /// Later calls repoint the proxy when the implementation it runs differs
    /// from the current one. `init` is never re-run and the proxy address
    /// never changes; a changed `init` is only reported as drift.
    pub async fn deploy_proxy(
        &self,
        name: &str,
        contract: &str,
        admin: Address,
        init: &Call,
    ) -> Result<ProxyDeployment> {
        let implementation = self
            .deploy(&format!("{name}{IMPLEMENTATION_SUFFIX}"), contract, &[])
            .await?;
        let impl_hash = content_hash(&self.ledger.artifact(contract).await?, &[]);
        let proxy_name = format!("{name}{PROXY_SUFFIX}");
        let wanted_init = init_hash(init);

        let Some(mut record) = self.existing(name).await? else {
            let from = self.ledger.deployer().await?;
            let created = self
                .ledger
                .create_proxy(from, implementation.address, admin, init)
                .await?;

            self.registry
                .put(
                    &proxy_name,
                    DeploymentRecord {
                        address: created.address,
                        implementation: None,
                        newly_deployed: true,
                        contract: PROXY_CONTRACT.to_string(),
                        content_hash: wanted_init,
                    },
                )
                .await?;
            self.registry
                .put(
                    name,
                    DeploymentRecord {
                        address: created.address,
                        implementation: Some(implementation.address),
                        newly_deployed: true,
                        contract: contract.to_string(),
                        content_hash: impl_hash,
                    },
                )
                .await?;
            info!(name, proxy = %created.address, implementation = %implementation.address, "proxy deployed");
            return Ok(ProxyDeployment {
                deployment: Deployment {
                    name: name.to_string(),
                    address: created.address,
                    outcome: DeployOutcome::Deployed,
                    previous: None,
                },
                init_drift: false,
            });
        };

        let init_drift = match self.existing(&proxy_name).await? {
            Some(proxy) => proxy.content_hash != wanted_init,
            None => false,
        };
        if init_drift {
            warn!(
                name,
                proxy = %record.address,
                "initializer arguments changed since the proxy was created; proxy storage is not re-initialized"
            );
        }

        let running = self.ledger.proxy_implementation(record.address).await?;
        if running == implementation.address && record.implementation == Some(running) {
            return Ok(ProxyDeployment {
                deployment: Deployment {
                    name: name.to_string(),
                    address: record.address,
                    outcome: DeployOutcome::Ignored,
                    previous: None,
                },
                init_drift,
            });
        }

        if running != implementation.address {
            self.ledger
                .upgrade_proxy(admin, record.address, implementation.address)
                .await?;
        }
        record.implementation = Some(implementation.address);
        record.content_hash = impl_hash;
        record.newly_deployed = true;
        self.registry.put(name, record.clone()).await?;
        info!(
            name,
            proxy = %record.address,
            implementation = %implementation.address,
            previous = %running,
            "proxy upgraded"
        );
        Ok(ProxyDeployment {
            deployment: Deployment {
                name: name.to_string(),
                address: record.address,
                outcome: DeployOutcome::Upgraded,
                previous: Some(running),
            },
            init_drift,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(digest: &str) -> Artifact {
        Artifact {
            contract: "JumpRateModelV4".to_string(),
            bytecode_digest: digest.to_string(),
        }
    }

    #[test]
    fn hash_covers_code_and_args() {
        let a = content_hash(&artifact("aa"), &[AbiValue::Uint(1)]);
        assert_eq!(a, content_hash(&artifact("aa"), &[AbiValue::Uint(1)]));
        assert_ne!(a, content_hash(&artifact("ab"), &[AbiValue::Uint(1)]));
        assert_ne!(a, content_hash(&artifact("aa"), &[AbiValue::Uint(2)]));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn init_hash_covers_method_and_args() {
        let a = init_hash(&Call::new("proxyInitialize").arg(1u128));
        assert_eq!(a, init_hash(&Call::new("proxyInitialize").arg(1u128)));
        assert_ne!(a, init_hash(&Call::new("proxyInitialize").arg(2u128)));
        assert_ne!(a, init_hash(&Call::new("initialize").arg(1u128)));
    }

    #[test]
    fn outcome_wire_names() {
        assert_eq!(DeployOutcome::Ignored.to_string(), "IGNORED");
        assert!(DeployOutcome::Upgraded.changed());
        assert!(!DeployOutcome::Ignored.changed());
    }
}
