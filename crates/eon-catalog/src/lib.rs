//! eon-catalog
//!
//! Static, author-edited data the pipeline reconciles towards:
//! - per-network market tables (`catalog`)
//! - rate-model variants and their annual tables (`rate_model`)
//! - exact fixed-point scaling of decimal parameters (`fixed`)

pub mod catalog;
pub mod fixed;
pub mod market;
pub mod rate_model;

pub use catalog::{MarketCatalog, MarketEntry};
pub use fixed::{
    blocks_per_year, exchange_rate_mantissa, format_units, parse_units, rate_per_block,
    FixedPointError, Mantissa, MANTISSA_DECIMALS,
};
pub use market::{
    is_market_deployment, market_deployment_name, market_token_name, market_token_symbol,
    MarketConfig, OracleConfig, OracleKind, MARKET_CONTRACT, MARKET_TOKEN_DECIMALS,
    MARKET_TOKEN_NAME_SUFFIX, MARKET_TOKEN_SYMBOL_PREFIX,
};
pub use rate_model::{
    AnnualRates, RateModelParams, RateModelVariant, RATE_MODEL_CONTRACT, RATE_MODEL_KINK,
};
