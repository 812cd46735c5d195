//! Orchestrator.
//!
//! Runs stages strictly in sequence against one ledger and one deployment
//! registry. Every stage is idempotent; a failure aborts the remaining
//! stages with no rollback, and re-running the whole pipeline resumes where
//! the failure left off.
//!
//! Market resolution is cached for the duration of one `run` call only.
//! Every run re-queries the chain, so catalog/chain drift introduced between
//! runs is caught by the next one.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

use eon_catalog::{blocks_per_year, MarketCatalog};
use eon_config::{ConfigError, NetworkName, Settings};
use eon_ledger::{Address, DeploymentRegistry, Ledger};

use crate::comptroller::{
    activate_implementation, comptroller_address, deploy_comptroller, init_comptroller, init_reward_distributor,
    ActivationReport, ComptrollerDeployReport, ComptrollerInitReport, RewardDistributorReport,
};
use crate::deployer::{Deployer, Deployment};
use crate::error::Result;
use crate::markets::{deploy_markets, market_addresses, require_market, MarketDeployReport};
use crate::oracle::{activate_oracle, check_prices, deploy_oracle, OracleActivation, PriceCheck};
use crate::rate_models::{deploy_rate_models, RateModelReport};
use crate::rates::{market_rates, MarketRates};
use crate::registrar::{support_markets, RegistrationReport};
use crate::resolve::{resolve_markets, MarketConfigResolved};
use crate::stages::{validate_order, Stage};
use crate::sync::{sync_market, MarketSyncReport, SyncPolicy};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StageReport {
    RateModels(Vec<RateModelReport>),
    ComptrollerDeployed(ComptrollerDeployReport),
    ImplementationActivated(ActivationReport),
    Markets(Vec<MarketDeployReport>),
    OracleDeployed(Deployment),
    OracleActivated(OracleActivation),
    Registered(RegistrationReport),
    Synced(Vec<MarketSyncReport>),
    ComptrollerInitialized(ComptrollerInitReport),
    PricesChecked(Vec<PriceCheck>),
    Rates(Vec<MarketRates>),
    RewardDistributorSet(RewardDistributorReport),
}

pub struct Pipeline {
    ledger: Arc<dyn Ledger>,
    registry: Arc<dyn DeploymentRegistry>,
    network: Option<NetworkName>,
    catalog: Option<MarketCatalog>,
    settings: Settings,
    expected_prices: BTreeMap<String, String>,
}

/// State shared by the stages of a single `run`.
#[derive(Default)]
struct RunScope {
    resolved: OnceCell<Vec<MarketConfigResolved>>,
}

impl Pipeline {
    /// Uses the built-in catalog of `network`. A networkless pipeline can
    /// still run the comptroller stages.
    pub fn new(
        ledger: Arc<dyn Ledger>,
        registry: Arc<dyn DeploymentRegistry>,
        network: Option<NetworkName>,
        settings: Settings,
    ) -> Self {
        Self {
            ledger,
            registry,
            network,
            catalog: network.map(MarketCatalog::builtin),
            settings,
            expected_prices: BTreeMap::new(),
        }
    }

    /// Replace the built-in catalog. It must describe the pipeline's network.
    pub fn with_catalog(mut self, catalog: MarketCatalog) -> Result<Self> {
        let network = self.network()?;
        if catalog.network() != network {
            return Err(ConfigError::InvalidCatalog(format!(
                "catalog is for {}, pipeline targets {network}",
                catalog.network()
            ))
            .into());
        }
        self.catalog = Some(catalog);
        Ok(self)
    }

    /// Prices checked by `oracle/check`, as 18-decimal text keyed by symbol.
    pub fn with_expected_prices(mut self, prices: BTreeMap<String, String>) -> Self {
        self.expected_prices = prices;
        self
    }

    pub fn ledger(&self) -> &dyn Ledger {
        &*self.ledger
    }

    pub fn registry(&self) -> &dyn DeploymentRegistry {
        &*self.registry
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn deployer(&self) -> Deployer<'_> {
        Deployer::new(&*self.ledger, &*self.registry)
    }

    pub fn network(&self) -> Result<NetworkName> {
        self.network.ok_or_else(|| ConfigError::Networkless.into())
    }

    pub fn catalog(&self) -> Result<&MarketCatalog> {
        self.catalog.as_ref().ok_or_else(|| ConfigError::Networkless.into())
    }

    pub fn seconds_per_block(&self) -> Result<String> {
        Ok(self.settings.seconds_per_block(self.network()?)?)
    }

    /// Resolve every catalog market against the chain. Never cached.
    pub async fn resolve_markets(&self) -> Result<Vec<MarketConfigResolved>> {
        resolve_markets(&*self.ledger, self.catalog()?).await
    }

    async fn resolved_markets<'s>(&self, scope: &'s RunScope) -> Result<&'s [MarketConfigResolved]> {
        let markets = scope
            .resolved
            .get_or_try_init(|| self.resolve_markets())
            .await?;
        Ok(markets)
    }

    /// Deployed markets keyed by underlying symbol. Re-read from the registry
    /// on every call.
    pub async fn market_addresses(&self) -> Result<BTreeMap<String, Address>> {
        market_addresses(&self.deployer(), self.catalog()?).await
    }

    /// Every catalog market with its deployed address, in catalog order.
    /// A catalog market without a deployment is a `StateError`.
    pub async fn deployed_markets(&self) -> Result<Vec<(String, Address)>> {
        let addresses = self.market_addresses().await?;
        self.catalog()?
            .iter()
            .map(|e| Ok((e.symbol.clone(), require_market(&addresses, &e.symbol)?)))
            .collect()
    }

    pub async fn market_address(&self, symbol: &str) -> Result<Address> {
        if !self.catalog()?.contains(symbol) {
            return Err(ConfigError::UnknownMarket(symbol.to_string()).into());
        }
        require_market(&self.market_addresses().await?, symbol)
    }

    /// Run one stage as a run of its own.
    pub async fn run_stage(&self, stage: Stage) -> Result<StageReport> {
        self.run_stage_in(&RunScope::default(), stage).await
    }

    async fn run_stage_in(&self, scope: &RunScope, stage: Stage) -> Result<StageReport> {
        info!(stage = %stage, ledger = self.ledger.kind(), "[START]");
        let report = self.dispatch(scope, stage).await?;
        info!(stage = %stage, "[END]");
        Ok(report)
    }

    /// Run `stages` in the given order, aborting on the first failure.
    pub async fn run(&self, stages: &[Stage]) -> Result<Vec<(Stage, StageReport)>> {
        validate_order(stages)?;
        let scope = RunScope::default();
        let mut out = Vec::with_capacity(stages.len());
        for &stage in stages {
            out.push((stage, self.run_stage_in(&scope, stage).await?));
        }
        Ok(out)
    }

    pub async fn initial_setup(&self) -> Result<Vec<(Stage, StageReport)>> {
        self.run(&Stage::INITIAL_SETUP).await
    }

    async fn dispatch(&self, scope: &RunScope, stage: Stage) -> Result<StageReport> {
        let deployer = self.deployer();
        Ok(match stage {
            Stage::RateModelsDeploy => {
                let spb = self.seconds_per_block()?;
                StageReport::RateModels(deploy_rate_models(&deployer, &spb).await?)
            }
            Stage::ComptrollerDeploy => StageReport::ComptrollerDeployed(deploy_comptroller(&deployer).await?),
            Stage::ComptrollerSetImplementation => {
                StageReport::ImplementationActivated(activate_implementation(&deployer).await?)
            }
            Stage::MarketsDeploy => {
                let markets = self.resolved_markets(scope).await?;
                StageReport::Markets(deploy_markets(&deployer, markets).await?)
            }
            Stage::OracleDeploy => {
                let markets = self.resolved_markets(scope).await?;
                StageReport::OracleDeployed(deploy_oracle(&deployer, markets, &self.settings.oracle).await?)
            }
            Stage::OracleInit => StageReport::OracleActivated(activate_oracle(&deployer, &self.settings.oracle.name).await?),
            Stage::MarketsSupport => {
                let markets = self.deployed_markets().await?;
                StageReport::Registered(support_markets(&deployer, &markets).await?)
            }
            Stage::MarketsSyncParams => StageReport::Synced(self.sync_params(&deployer).await?),
            Stage::ComptrollerInit => {
                StageReport::ComptrollerInitialized(init_comptroller(&deployer, &self.settings.comptroller).await?)
            }
            Stage::OracleCheck => {
                let addresses = self.market_addresses().await?;
                StageReport::PricesChecked(
                    check_prices(&deployer, self.catalog()?, &addresses, &self.expected_prices).await?,
                )
            }
            Stage::MarketsRates => StageReport::Rates(self.rates(scope).await?),
            Stage::RewardDistributorInit => {
                StageReport::RewardDistributorSet(init_reward_distributor(&deployer).await?)
            }
        })
    }

    async fn sync_params(&self, deployer: &Deployer<'_>) -> Result<Vec<MarketSyncReport>> {
        let comptroller = comptroller_address(deployer).await?;
        let deployed = self.deployed_markets().await?;
        let policy = SyncPolicy {
            collateral_supply_floor: u128::from(self.settings.policy.collateral_supply_floor),
        };

        let mut out = Vec::new();
        for (entry, (_, market)) in self.catalog()?.iter().zip(deployed) {
            info!(symbol = %entry.symbol, "syncing market");
            out.push(sync_market(&*self.ledger, comptroller, entry, market, &policy).await?);
        }
        Ok(out)
    }

    async fn rates(&self, scope: &RunScope) -> Result<Vec<MarketRates>> {
        let bpy = blocks_per_year(&self.seconds_per_block()?)?;
        info!(blocks_per_year = bpy, "using blocks per year for APY calculations");
        let addresses = self.market_addresses().await?;

        let mut out = Vec::new();
        for m in self.resolved_markets(scope).await? {
            let market = require_market(&addresses, m.key())?;
            out.push(market_rates(&*self.ledger, m.key(), market, m.underlying.decimals, bpy).await?);
        }
        Ok(out)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("ledger", &self.ledger.kind())
            .field("network", &self.network)
            .field("markets", &self.catalog.as_ref().map(|c| c.symbols()))
            .finish()
    }
}

