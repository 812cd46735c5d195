//! eon-reconcile
//!
//! Converges a chain onto the market catalog, one idempotent stage at a time.
//!
//! - Deployer: content-addressed deploys, proxies upgraded in place
//! - Stages run strictly in sequence; a failed stage aborts the rest
//! - Unchanged parameters send no transaction
//! - Collateral factors stay at zero until a market holds real supply
//!
//! Talks to the chain only through `eon_ledger::Ledger`.

mod comptroller;
mod deployer;
mod error;
mod markets;
mod oracle;
mod orchestrator;
mod rate_models;
mod rates;
mod registrar;
mod resolve;
mod stages;
mod sync;

pub use comptroller::{
    activate_implementation, comptroller_address, deploy_comptroller, init_comptroller, init_reward_distributor,
    ActivationReport, ComptrollerDeployReport, ComptrollerInitReport, RewardDistributorReport, COMPTROLLER,
    REWARD_DISTRIBUTOR, UNITROLLER,
};
pub use deployer::{
    content_hash, init_hash, DeployOutcome, Deployer, Deployment, ProxyDeployment, IMPLEMENTATION_SUFFIX,
    PROXY_CONTRACT, PROXY_SUFFIX,
};
pub use error::{ReconcileError, Result};
pub use markets::{
    deploy_market, deploy_markets, initial_exchange_rate_mantissa, market_addresses, market_init_call,
    require_market, MarketDeployReport,
};
pub use oracle::{activate_oracle, check_prices, deploy_oracle, oracle_args, OracleActivation, PriceCheck};
pub use orchestrator::{Pipeline, StageReport};
pub use rate_models::{deploy_rate_models, rate_model_address, rate_model_args, RateModelReport};
pub use rates::{apy_percent, market_rates, utilization_percent, MarketRates};
pub use registrar::{support_markets, RegistrationReport};
pub use resolve::{
    parse_address, resolve_market, resolve_markets, MarketConfigResolved, OracleConfigResolved, UnderlyingToken,
    TEST_FEED_DECIMALS,
};
pub use stages::{plan, validate_order, Stage};
pub use sync::{
    sync_collateral_factor, sync_market, sync_reserve_factor, MarketSyncReport, ParamSync, SyncPolicy,
};
