//! Config Resolver.
//!
//! Enriches catalog entries with chain-side metadata: underlying token
//! symbol/decimals and price-feed decimals. The underlying token's on-chain
//! symbol must equal the catalog key; that single cross-check is what keeps
//! the catalog and the chain from drifting apart silently.
//!
//! Nothing is cached here. Each call re-queries the chain; the orchestrator
//! caches the result for the duration of one pipeline run.

use serde::Serialize;
use tracing::debug;

use eon_catalog::{
    market_deployment_name, market_token_name, market_token_symbol, MarketCatalog, MarketConfig,
    OracleConfig, OracleKind,
};
use eon_config::ConfigError;
use eon_ledger::contracts::{Erc20, PriceFeed};
use eon_ledger::{Address, Ledger};

use crate::error::Result;

/// Decimals reported for feeds that already quote at 18 decimals.
pub const TEST_FEED_DECIMALS: u8 = 18;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnderlyingToken {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OracleConfigResolved {
    pub kind: OracleKind,
    pub source: String,
    pub decimals: u8,
}

/// A catalog entry after chain verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketConfigResolved {
    /// Market token name, e.g. `USDT Eonian Market Token`.
    pub name: String,
    /// Market token symbol, e.g. `emtUSDT`.
    pub symbol: String,
    pub config: MarketConfig,
    pub underlying: UnderlyingToken,
    pub oracle: OracleConfigResolved,
}

impl MarketConfigResolved {
    /// Catalog key (the underlying symbol).
    pub fn key(&self) -> &str {
        &self.underlying.symbol
    }

    pub fn deployment_name(&self) -> String {
        market_deployment_name(self.key())
    }
}

pub fn parse_address(value: &str) -> std::result::Result<Address, ConfigError> {
    value.parse::<Address>().map_err(|e| ConfigError::InvalidAddress {
        value: e.value,
        reason: e.reason.to_string(),
    })
}

async fn resolve_oracle(ledger: &dyn Ledger, oracle: &OracleConfig) -> Result<OracleConfigResolved> {
    let decimals = match oracle.kind {
        OracleKind::Chainlink => {
            let feed = parse_address(&oracle.source)?;
            PriceFeed::at(ledger, feed).decimals().await?
        }
        OracleKind::TestSimple => TEST_FEED_DECIMALS,
        OracleKind::UniswapV3Twap | OracleKind::Pyth => {
            return Err(ConfigError::UnsupportedOracle(oracle.kind.to_string()).into())
        }
    };
    Ok(OracleConfigResolved {
        kind: oracle.kind,
        source: oracle.source.clone(),
        decimals,
    })
}

/// Resolve one catalog entry against the chain.
pub async fn resolve_market(
    ledger: &dyn Ledger,
    symbol: &str,
    config: &MarketConfig,
) -> Result<MarketConfigResolved> {
    let address = parse_address(&config.underlying_token_address)?;
    let token = Erc20::at(ledger, address);

    let actual = token.symbol().await?;
    if actual != symbol {
        return Err(ConfigError::SymbolMismatch {
            expected: symbol.to_string(),
            actual,
        }
        .into());
    }
    let decimals = token.decimals().await?;
    let oracle = resolve_oracle(ledger, &config.oracle).await?;

    debug!(symbol, %address, decimals, oracle = %oracle.kind, "market resolved");
    Ok(MarketConfigResolved {
        name: market_token_name(symbol),
        symbol: market_token_symbol(symbol),
        config: config.clone(),
        underlying: UnderlyingToken {
            address,
            symbol: actual,
            decimals,
        },
        oracle,
    })
}

/// Resolve every catalog entry, in catalog order. Fails on the first entry
/// that does not match the chain.
pub async fn resolve_markets(ledger: &dyn Ledger, catalog: &MarketCatalog) -> Result<Vec<MarketConfigResolved>> {
    let mut out = Vec::with_capacity(catalog.len());
    for entry in catalog.iter() {
        out.push(resolve_market(ledger, &entry.symbol, &entry.config).await?);
    }
    Ok(out)
}
