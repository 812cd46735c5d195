//! Market Provisioner.
//!
//! One proxied `CErc20Upgradable` per resolved market. The initializer
//! carries the derived exchange-rate mantissa; upgrades keep the proxy
//! address and storage.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

use eon_catalog::{exchange_rate_mantissa, is_market_deployment, MarketCatalog, MARKET_CONTRACT};
use eon_config::ConfigError;
use eon_ledger::contracts::{Erc20, Market};
use eon_ledger::{Address, Call};

use crate::comptroller::comptroller_address;
use crate::deployer::{DeployOutcome, Deployer};
use crate::error::{ReconcileError, Result};
use crate::rate_models::rate_model_address;
use crate::resolve::MarketConfigResolved;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketDeployReport {
    pub symbol: String,
    pub address: Address,
    pub outcome: DeployOutcome,
    /// The catalog's initializer arguments (exchange rate, rate model, names)
    /// no longer match the ones the live market was initialized with.
    pub init_drift: bool,
}

/// `initialExchangeRate × 10^(underlyingDecimals + 18 − marketDecimals)`.
pub fn initial_exchange_rate_mantissa(m: &MarketConfigResolved) -> Result<u128> {
    exchange_rate_mantissa(&m.config.initial_exchange_rate, m.underlying.decimals, m.config.decimals)
        .map_err(|e| e.for_field(format!("{}.initial_exchange_rate", m.key())).into())
}

/// `proxyInitialize(underlying, comptroller, rateModel, exchangeRate, name,
/// symbol, decimals, admin)`.
pub async fn market_init_call(deployer: &Deployer<'_>, m: &MarketConfigResolved) -> Result<Call> {
    let comptroller = comptroller_address(deployer).await?;
    let rate_model = rate_model_address(deployer, m.config.interest_rate_model).await?;
    let owner = deployer.ledger().owner().await?;
    Ok(Call::new("proxyInitialize")
        .arg(m.underlying.address)
        .arg(comptroller)
        .arg(rate_model)
        .arg(initial_exchange_rate_mantissa(m)?)
        .arg(m.name.as_str())
        .arg(m.symbol.as_str())
        .arg(m.config.decimals)
        .arg(owner))
}

pub async fn deploy_market(deployer: &Deployer<'_>, m: &MarketConfigResolved) -> Result<MarketDeployReport> {
    let init = market_init_call(deployer, m).await?;
    let owner = deployer.ledger().owner().await?;
    let proxied = deployer
        .deploy_proxy(&m.deployment_name(), MARKET_CONTRACT, owner, &init)
        .await?;
    let d = proxied.deployment;

    let symbol = m.key();
    match d.outcome {
        DeployOutcome::Deployed => info!(symbol, address = %d.address, "market (cToken) was deployed"),
        DeployOutcome::Upgraded => info!(symbol, proxy = %d.address, "market (cToken) was upgraded"),
        DeployOutcome::Ignored => info!(symbol, address = %d.address, "market (cToken) has up-to-date implementation"),
    }
    if proxied.init_drift {
        warn!(symbol, address = %d.address, "market initializer drifted from the catalog; redeploy under a new name to apply it");
    }
    Ok(MarketDeployReport {
        symbol: symbol.to_string(),
        address: d.address,
        outcome: d.outcome,
        init_drift: proxied.init_drift,
    })
}

/// Deploy or upgrade every market, in catalog order.
pub async fn deploy_markets(deployer: &Deployer<'_>, markets: &[MarketConfigResolved]) -> Result<Vec<MarketDeployReport>> {
    let mut out = Vec::with_capacity(markets.len());
    for m in markets {
        out.push(deploy_market(deployer, m).await?);
    }
    Ok(out)
}

/// Deployed market addresses keyed by underlying symbol.
///
/// Every market record in the registry must point at a market whose
/// underlying symbol is in the catalog; anything else means the registry and
/// the catalog have drifted apart.
pub async fn market_addresses(deployer: &Deployer<'_>, catalog: &MarketCatalog) -> Result<BTreeMap<String, Address>> {
    let ledger = deployer.ledger();
    let mut out = BTreeMap::new();
    for (name, record) in deployer.registry().all().await? {
        if !is_market_deployment(&name) {
            continue;
        }
        let underlying = Market::at(ledger, record.address).underlying().await?;
        let symbol = Erc20::at(ledger, underlying).symbol().await?;
        if !catalog.contains(&symbol) {
            return Err(ConfigError::UnknownMarket(symbol).into());
        }
        out.insert(symbol, record.address);
    }
    Ok(out)
}

/// Deployed address of the market for `symbol`.
pub fn require_market(addresses: &BTreeMap<String, Address>, symbol: &str) -> Result<Address> {
    addresses.get(symbol).copied().ok_or_else(|| {
        ReconcileError::state(format!(
            "market {symbol} is not deployed (run markets/deploy first)"
        ))
    })
}
