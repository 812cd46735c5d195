//! Rate Model Provisioner.
//!
//! One `JumpRateModelV4` per variant, keyed by the variant's logical name.
//! Strictly deploy-once: an existing record is never replaced, even if the
//! network's block time changed since.

use serde::Serialize;
use tracing::info;

use eon_catalog::{RateModelParams, RateModelVariant, RATE_MODEL_CONTRACT};
use eon_ledger::{AbiValue, Address};

use crate::deployer::{DeployOutcome, Deployer};
use crate::error::{ReconcileError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateModelReport {
    pub variant: RateModelVariant,
    pub name: String,
    pub address: Address,
    pub outcome: DeployOutcome,
    pub params: RateModelParams,
}

/// `[blocksPerYear, base, multiplier, jumpMultiplier, kink, owner, name]`.
pub fn rate_model_args(params: &RateModelParams, owner: Address, name: &str) -> Vec<AbiValue> {
    vec![
        AbiValue::from(params.blocks_per_year),
        AbiValue::from(params.base_per_block.raw()),
        AbiValue::from(params.multiplier_per_block.raw()),
        AbiValue::from(params.jump_multiplier_per_block.raw()),
        AbiValue::from(params.kink.raw()),
        AbiValue::from(owner),
        AbiValue::from(name),
    ]
}

pub async fn deploy_rate_models(deployer: &Deployer<'_>, seconds_per_block: &str) -> Result<Vec<RateModelReport>> {
    let owner = deployer.ledger().owner().await?;
    let mut out = Vec::with_capacity(RateModelVariant::ALL.len());

    for variant in RateModelVariant::ALL {
        let name = variant.logical_name();
        let params = variant.params(seconds_per_block)?;
        let d = deployer
            .deploy_once(name, RATE_MODEL_CONTRACT, &rate_model_args(&params, owner, name))
            .await?;
        if d.outcome.changed() {
            info!(
                variant = %variant,
                address = %d.address,
                base = %params.base_per_block,
                multiplier = %params.multiplier_per_block,
                jump = %params.jump_multiplier_per_block,
                "rate model deployed"
            );
        } else {
            info!(variant = %variant, address = %d.address, "rate model already deployed");
        }
        out.push(RateModelReport {
            variant,
            name: name.to_string(),
            address: d.address,
            outcome: d.outcome,
            params,
        });
    }
    Ok(out)
}

/// Address of the deployed model for `variant`.
pub async fn rate_model_address(deployer: &Deployer<'_>, variant: RateModelVariant) -> Result<Address> {
    deployer
        .existing(variant.logical_name())
        .await?
        .map(|r| r.address)
        .ok_or_else(|| {
            ReconcileError::state(format!(
                "rate model {} is not deployed (run rate-models/deploy first)",
                variant.logical_name()
            ))
        })
}

