//! Comptroller stages: deploy, activate, init, reward distributor.
//!
//! `Unitroller` holds the comptroller's storage and is deployed exactly once.
//! `Comptroller` is the logic contract and is content-addressed; activating a
//! new one is the two-step `_setPendingImplementation` + `_become` handshake.

use serde::Serialize;
use tracing::info;

use eon_catalog::Mantissa;
use eon_config::ComptrollerSettings;
use eon_ledger::contracts::{Comptroller, ComptrollerImplementation};
use eon_ledger::Address;

use crate::deployer::{DeployOutcome, Deployer, Deployment};
use crate::error::Result;
use crate::sync::ParamSync;

pub const UNITROLLER: &str = "Unitroller";
pub const COMPTROLLER: &str = "Comptroller";
/// Deployed outside this pipeline; only wired into the comptroller here.
pub const REWARD_DISTRIBUTOR: &str = "RewardDistributor";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComptrollerDeployReport {
    pub unitroller: Deployment,
    pub implementation: Deployment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    pub unitroller: Address,
    pub implementation: Address,
    /// Implementation active before this stage ran.
    pub previous: Address,
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewardDistributorReport {
    pub distributor: Address,
    pub previous: Address,
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComptrollerInitReport {
    pub close_factor: ParamSync,
    pub liquidation_incentive: ParamSync,
}

pub async fn deploy_comptroller(deployer: &Deployer<'_>) -> Result<ComptrollerDeployReport> {
    let unitroller = deployer.deploy_once(UNITROLLER, UNITROLLER, &[]).await?;
    let implementation = deployer.deploy(COMPTROLLER, COMPTROLLER, &[]).await?;

    match implementation.outcome {
        DeployOutcome::Deployed => {
            info!(address = %implementation.address, "comptroller deployed")
        }
        DeployOutcome::Upgraded => info!(
            address = %implementation.address,
            previous = ?implementation.previous,
            "new comptroller contract deployed"
        ),
        DeployOutcome::Ignored => info!(
            address = %implementation.address,
            "comptroller contract is up-to-date, nothing was deployed"
        ),
    }
    Ok(ComptrollerDeployReport {
        unitroller,
        implementation,
    })
}

/// Address of the comptroller as markets see it (the `Unitroller`).
pub async fn comptroller_address(deployer: &Deployer<'_>) -> Result<Address> {
    Ok(deployer
        .require(UNITROLLER, "unitroller contract (comptroller proxy)")
        .await?
        .address)
}

pub async fn activate_implementation(deployer: &Deployer<'_>) -> Result<ActivationReport> {
    let implementation = deployer.require(COMPTROLLER, "comptroller contract").await?.address;
    let unitroller = comptroller_address(deployer).await?;

    let ledger = deployer.ledger();
    let proxy = Comptroller::at(ledger, unitroller);
    let previous = proxy.comptroller_implementation().await?;
    if previous == implementation {
        info!(%implementation, "comptroller implementation is already set");
        return Ok(ActivationReport {
            unitroller,
            implementation,
            previous,
            changed: false,
        });
    }

    let from = ledger.deployer().await?;
    proxy.set_pending_implementation(from, implementation).await?;
    ComptrollerImplementation::at(ledger, implementation)
        .become_implementation(from, unitroller)
        .await?;
    info!(%implementation, %previous, "comptroller implementation set");
    Ok(ActivationReport {
        unitroller,
        implementation,
        previous,
        changed: true,
    })
}

/// Sync close factor and liquidation incentive, each only when it differs.
pub async fn init_comptroller(deployer: &Deployer<'_>, settings: &ComptrollerSettings) -> Result<ComptrollerInitReport> {
    let close = Mantissa::parse(&settings.close_factor).map_err(|e| e.for_field("comptroller.close_factor"))?;
    let incentive = Mantissa::parse(&settings.liquidation_incentive)
        .map_err(|e| e.for_field("comptroller.liquidation_incentive"))?;

    let ledger = deployer.ledger();
    let comptroller = Comptroller::at(ledger, comptroller_address(deployer).await?);
    let from = ledger.deployer().await?;

    let current = comptroller.close_factor().await?;
    let close_factor = if current == close.raw() {
        info!(close_factor = %close, "close factor is already set");
        ParamSync::Unchanged
    } else {
        comptroller.set_close_factor(from, close.raw()).await?;
        info!(old = current, new = %close, "close factor set");
        ParamSync::Updated {
            old: current,
            new: close.raw(),
        }
    };

    let current = comptroller.liquidation_incentive().await?;
    let liquidation_incentive = if current == incentive.raw() {
        info!(liquidation_incentive = %incentive, "liquidation incentive is already set");
        ParamSync::Unchanged
    } else {
        comptroller.set_liquidation_incentive(from, incentive.raw()).await?;
        info!(old = current, new = %incentive, "liquidation incentive set");
        ParamSync::Updated {
            old: current,
            new: incentive.raw(),
        }
    };

    Ok(ComptrollerInitReport {
        close_factor,
        liquidation_incentive,
    })
}

/// Point the comptroller at the recorded `RewardDistributor`, if it is not
/// already.
pub async fn init_reward_distributor(deployer: &Deployer<'_>) -> Result<RewardDistributorReport> {
    let distributor = deployer.require(REWARD_DISTRIBUTOR, "reward distributor").await?.address;
    let ledger = deployer.ledger();
    let comptroller = Comptroller::at(ledger, comptroller_address(deployer).await?);

    let previous = comptroller.reward_distributor().await?;
    if previous == distributor {
        info!(%distributor, "reward distributor wasn't changed");
        return Ok(RewardDistributorReport {
            distributor,
            previous,
            changed: false,
        });
    }

    info!(from = %previous, to = %distributor, "setting reward distributor");
    let from = ledger.deployer().await?;
    comptroller.set_reward_distributor(from, distributor).await?;
    Ok(RewardDistributorReport {
        distributor,
        previous,
        changed: true,
    })
}
