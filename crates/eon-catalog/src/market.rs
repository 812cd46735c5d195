use serde::{Deserialize, Serialize};
use std::fmt;

use crate::RateModelVariant;

/// Suffix of every market token name, e.g. `USDT Eonian Market Token`.
pub const MARKET_TOKEN_NAME_SUFFIX: &str = "Eonian Market Token";
/// Prefix of every market token symbol, e.g. `emtUSDT`.
pub const MARKET_TOKEN_SYMBOL_PREFIX: &str = "emt";
pub const MARKET_TOKEN_DECIMALS: u8 = 8;

/// Contract every market is deployed from (behind a proxy).
pub const MARKET_CONTRACT: &str = "CErc20Upgradable";

pub fn market_token_name(symbol: &str) -> String {
    format!("{symbol} {MARKET_TOKEN_NAME_SUFFIX}")
}

pub fn market_token_symbol(symbol: &str) -> String {
    format!("{MARKET_TOKEN_SYMBOL_PREFIX}{symbol}")
}

/// Deployment-registry key of the market for `symbol`.
pub fn market_deployment_name(symbol: &str) -> String {
    format!("{MARKET_CONTRACT}_{symbol}")
}

/// `true` for market records, not their `_Implementation`/`_Proxy` siblings.
pub fn is_market_deployment(name: &str) -> bool {
    name.strip_prefix(MARKET_CONTRACT)
        .and_then(|rest| rest.strip_prefix('_'))
        .map(|sym| !sym.is_empty() && !name.ends_with("_Proxy") && !name.ends_with("_Implementation"))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OracleKind {
    UniswapV3Twap,
    Chainlink,
    Pyth,
    TestSimple,
}

impl OracleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OracleKind::UniswapV3Twap => "UNISWAP_V3_TWAP",
            OracleKind::Chainlink => "CHAINLINK",
            OracleKind::Pyth => "PYTH",
            OracleKind::TestSimple => "TEST_SIMPLE",
        }
    }
}

impl fmt::Display for OracleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(rename = "type")]
    pub kind: OracleKind,
    /// Feed address (chainlink, uniswap twap) or opaque id (pyth).
    pub source: String,
}

/// Declarative definition of one market. Numeric fields stay decimal text
/// until scaled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    pub underlying_token_address: String,
    pub collateral_factor: String,
    pub reserve_factor: String,
    pub initial_exchange_rate: String,
    /// Market token decimals.
    #[serde(default = "default_market_decimals")]
    pub decimals: u8,
    pub interest_rate_model: RateModelVariant,
    pub oracle: OracleConfig,
}

fn default_market_decimals() -> u8 {
    MARKET_TOKEN_DECIMALS
}
