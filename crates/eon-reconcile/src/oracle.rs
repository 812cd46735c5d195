//! Oracle Provisioner, activation and price check.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use eon_catalog::{format_units, parse_units, MarketCatalog, MANTISSA_DECIMALS};
use eon_config::{ConfigError, OracleSettings};
use eon_ledger::contracts::{Comptroller, PriceOracle};
use eon_ledger::{AbiValue, Address};

use crate::comptroller::comptroller_address;
use crate::deployer::{Deployer, Deployment};
use crate::error::{ReconcileError, Result};
use crate::markets::require_market;
use crate::resolve::{parse_address, MarketConfigResolved};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OracleActivation {
    pub name: String,
    pub oracle: Address,
    pub previous: Address,
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceCheck {
    pub symbol: String,
    pub market: Address,
    /// 18-decimal price reported by the active oracle.
    pub price: u128,
}

/// Constructor arguments: market token symbols and, in the same order,
/// `(feed, underlyingDecimals, targetCurrency)` tuples.
pub fn oracle_args(markets: &[MarketConfigResolved], target_currency: &str) -> Result<Vec<AbiValue>> {
    let mut symbols = Vec::with_capacity(markets.len());
    let mut configs = Vec::with_capacity(markets.len());
    for m in markets {
        symbols.push(AbiValue::from(m.symbol.as_str()));
        configs.push(AbiValue::Tuple(vec![
            AbiValue::from(parse_address(&m.oracle.source)?),
            AbiValue::from(m.underlying.decimals),
            AbiValue::from(target_currency),
        ]));
    }
    Ok(vec![AbiValue::Array(symbols), AbiValue::Array(configs)])
}

/// Issued every run; the content-addressed deployer turns an unchanged
/// feed set into a no-op.
pub async fn deploy_oracle(
    deployer: &Deployer<'_>,
    markets: &[MarketConfigResolved],
    settings: &OracleSettings,
) -> Result<Deployment> {
    let args = oracle_args(markets, &settings.target_currency)?;
    let d = deployer.deploy(&settings.name, &settings.contract, &args).await?;
    info!(
        name = %settings.name,
        contract = %settings.contract,
        address = %d.address,
        outcome = %d.outcome,
        "oracle deploy"
    );
    Ok(d)
}

/// Point the comptroller at the oracle recorded under `name`, if it is not
/// already.
pub async fn activate_oracle(deployer: &Deployer<'_>, name: &str) -> Result<OracleActivation> {
    let oracle = deployer.require(name, "price oracle").await?.address;
    let ledger = deployer.ledger();
    let comptroller = Comptroller::at(ledger, comptroller_address(deployer).await?);

    let previous = comptroller.oracle().await?;
    if previous == oracle {
        info!(name, %oracle, "price oracle wasn't changed");
        return Ok(OracleActivation {
            name: name.to_string(),
            oracle,
            previous,
            changed: false,
        });
    }

    info!(name, from = %previous, to = %oracle, "setting price oracle");
    let from = ledger.deployer().await?;
    comptroller.set_price_oracle(from, oracle).await?;
    Ok(OracleActivation {
        name: name.to_string(),
        oracle,
        previous,
        changed: true,
    })
}

/// Verify that the comptroller's active oracle reports exactly `expected`
/// (decimal text, 18-decimal scale) for each listed market symbol.
pub async fn check_prices(
    deployer: &Deployer<'_>,
    catalog: &MarketCatalog,
    markets: &BTreeMap<String, Address>,
    expected: &BTreeMap<String, String>,
) -> Result<Vec<PriceCheck>> {
    let ledger = deployer.ledger();
    let comptroller = Comptroller::at(ledger, comptroller_address(deployer).await?);
    let oracle = comptroller.oracle().await?;
    if oracle.is_zero() {
        return Err(ReconcileError::state("no price oracle is set on the comptroller (run oracle/init first)"));
    }
    let oracle = PriceOracle::at(ledger, oracle);

    let mut out = Vec::with_capacity(expected.len());
    for (symbol, want) in expected {
        if !catalog.contains(symbol) {
            return Err(ConfigError::UnknownMarket(symbol.clone()).into());
        }
        let want = parse_units(want, MANTISSA_DECIMALS).map_err(|e| e.for_field(format!("price.{symbol}")))?;
        let market = require_market(markets, symbol)?;
        let price = oracle.underlying_price(market).await?;
        if price != want {
            return Err(ReconcileError::Validation(format!(
                "price of {symbol} is not correct: expected {}, got {}",
                format_units(want, MANTISSA_DECIMALS),
                format_units(price, MANTISSA_DECIMALS)
            )));
        }
        info!(symbol = %symbol, price = %format_units(price, MANTISSA_DECIMALS), "price ok");
        out.push(PriceCheck {
            symbol: symbol.clone(),
            market,
            price,
        });
    }
    Ok(out)
}
