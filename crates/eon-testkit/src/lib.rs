//! eon-testkit
//!
//! Paper-chain fixtures shared by the scenario tests and `eon local`:
//! - `seed_catalog` installs a catalog's underlying tokens and price feeds at
//!   their catalog addresses
//! - `PaperWorld` bundles a seeded ledger, an in-memory registry and the
//!   catalog, and builds pipelines over them
//! - `supply_underlying` mints underlying to the supplier account and
//!   deposits it into a market

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::info;

use eon_catalog::{parse_units, MarketCatalog, OracleKind, MANTISSA_DECIMALS};
use eon_config::{NetworkName, NetworkSettings, Settings};
use eon_ledger::contracts::{Erc20, Market};
use eon_ledger::{Address, MemoryRegistry};
use eon_ledger_paper::{account, PaperLedger};
use eon_reconcile::{parse_address, Pipeline};

/// Decimals of seeded Chainlink-style aggregators.
pub const AGGREGATOR_DECIMALS: u8 = 8;

/// Paper account that supplies and borrows in fixtures.
pub const SUPPLIER_INDEX: u32 = 1;

/// Block time used for networks that have no built-in one.
pub const PAPER_SECONDS_PER_BLOCK: &str = "2";

/// USD price each seeded feed reports for `symbol`, decimal text.
pub fn reference_price(symbol: &str) -> &'static str {
    match symbol {
        "WBNB" => "600",
        "ptETH" => "2000",
        _ => "1",
    }
}

/// Decimals of the seeded underlying token for `symbol`.
pub fn reference_decimals(symbol: &str) -> u8 {
    match symbol {
        "zUSDC" => 6,
        _ => 18,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededMarket {
    pub symbol: String,
    pub token: Address,
    pub decimals: u8,
    pub feed: Address,
    pub price: &'static str,
}

/// Install every catalog market's underlying token and feed on `ledger`.
/// Re-seeding overwrites tokens and prices in place.
pub async fn seed_catalog(ledger: &PaperLedger, catalog: &MarketCatalog) -> Result<Vec<SeededMarket>> {
    let mut out = Vec::with_capacity(catalog.len());
    for entry in catalog.iter() {
        let symbol = entry.symbol.as_str();
        let token = parse_address(&entry.config.underlying_token_address)
            .with_context(|| format!("{symbol}: underlying address"))?;
        let feed = parse_address(&entry.config.oracle.source).with_context(|| format!("{symbol}: feed address"))?;
        let decimals = reference_decimals(symbol);
        let price = reference_price(symbol);

        ledger
            .install_token(token, &format!("{symbol} (paper)"), symbol, decimals)
            .await;
        match entry.config.oracle.kind {
            OracleKind::Chainlink => {
                let answer = parse_units(price, u32::from(AGGREGATOR_DECIMALS))?;
                ledger.install_aggregator(feed, AGGREGATOR_DECIMALS, answer).await;
            }
            OracleKind::TestSimple => {
                ledger.install_simple_feed(feed).await;
                ledger
                    .set_simple_price(feed, token, parse_units(price, MANTISSA_DECIMALS)?)
                    .await?;
            }
            other => bail!("{symbol}: paper chain has no {other} feeds"),
        }
        info!(symbol, %token, %feed, decimals, price, "seeded");

        out.push(SeededMarket {
            symbol: symbol.to_string(),
            token,
            decimals,
            feed,
            price,
        });
    }
    Ok(out)
}

/// Default settings plus a block time for networks lacking a built-in one.
pub fn paper_settings(network: NetworkName) -> Settings {
    let mut settings = Settings::default();
    if network.builtin_seconds_per_block().is_none() {
        settings.networks.insert(
            network.as_str().to_string(),
            NetworkSettings {
                seconds_per_block: Some(PAPER_SECONDS_PER_BLOCK.to_string()),
            },
        );
    }
    settings
}

/// Mint `amount` (decimal text, underlying units) of `symbol`'s underlying
/// to the supplier account and deposit it. Returns the supplier's shares.
pub async fn supply_underlying(ledger: &PaperLedger, pipeline: &Pipeline, symbol: &str, amount: &str) -> Result<u128> {
    let market = pipeline.market_address(symbol).await?;
    let token = Market::at(ledger, market).underlying().await?;
    let decimals = Erc20::at(ledger, token).decimals().await?;
    let raw = parse_units(amount, u32::from(decimals)).with_context(|| format!("supply amount {amount}"))?;

    let supplier = account(SUPPLIER_INDEX);
    ledger.mint_token(token, supplier, raw).await?;
    let shares = ledger.supply(supplier, market, raw).await?;
    info!(symbol, %market, amount, shares, "supplied");
    Ok(shares)
}

/// A seeded paper chain with its registry and catalog.
pub struct PaperWorld {
    pub network: NetworkName,
    pub ledger: Arc<PaperLedger>,
    pub registry: Arc<MemoryRegistry>,
    pub catalog: MarketCatalog,
    pub seeded: Vec<SeededMarket>,
}

impl PaperWorld {
    /// Fresh chain seeded with the built-in catalog of `network`.
    pub async fn new(network: NetworkName) -> Result<Self> {
        Self::with_catalog(MarketCatalog::builtin(network)).await
    }

    pub async fn with_catalog(catalog: MarketCatalog) -> Result<Self> {
        let ledger = Arc::new(PaperLedger::new());
        let seeded = seed_catalog(&ledger, &catalog).await?;
        Ok(Self {
            network: catalog.network(),
            ledger,
            registry: Arc::new(MemoryRegistry::new()),
            catalog,
            seeded,
        })
    }

    pub fn pipeline(&self) -> Result<Pipeline> {
        self.pipeline_with(paper_settings(self.network))
    }

    pub fn pipeline_with(&self, settings: Settings) -> Result<Pipeline> {
        let pipeline = Pipeline::new(self.ledger.clone(), self.registry.clone(), Some(self.network), settings)
            .with_catalog(self.catalog.clone())?;
        Ok(pipeline)
    }

    pub fn seeded(&self, symbol: &str) -> Option<&SeededMarket> {
        self.seeded.iter().find(|s| s.symbol == symbol)
    }

    pub async fn supply(&self, pipeline: &Pipeline, symbol: &str, amount: &str) -> Result<u128> {
        supply_underlying(&self.ledger, pipeline, symbol, amount).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zen_testnet_gets_a_block_time() {
        let s = paper_settings(NetworkName::ZenTestnet);
        assert_eq!(s.seconds_per_block(NetworkName::ZenTestnet).unwrap(), "2");
        assert!(paper_settings(NetworkName::Bsc).networks.is_empty());
    }
}
