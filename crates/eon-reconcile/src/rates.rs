//! Market rates report (read-only).

use serde::Serialize;

use eon_catalog::format_units;
use eon_ledger::contracts::Market;
use eon_ledger::{Address, Ledger};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketRates {
    pub symbol: String,
    pub address: Address,
    pub supply_rate_per_block: u128,
    pub borrow_rate_per_block: u128,
    pub supply_apy: String,
    pub borrow_apy: String,
    /// Underlying units, decimal text.
    pub cash: String,
    pub total_borrows: String,
    pub utilization: String,
}

/// `((1 + r)^blocks_per_year − 1) × 100`, two decimals, with a `%` suffix.
pub fn apy_percent(rate_per_block: u128, blocks_per_year: u64) -> String {
    if rate_per_block == 0 {
        return "0.00%".to_string();
    }
    let r = rate_per_block as f64 / 1e18;
    // exp(n·ln(1+r)) − 1 keeps precision for tiny per-block rates.
    let apy = ((blocks_per_year as f64) * r.ln_1p()).exp_m1() * 100.0;
    if !apy.is_finite() {
        return "n/a".to_string();
    }
    format!("{apy:.2}%")
}

/// `borrows × 100 / (cash + borrows)` as an integer percent.
pub fn utilization_percent(cash: u128, borrows: u128) -> String {
    let liquidity = cash.saturating_add(borrows);
    if liquidity == 0 {
        return "0%".to_string();
    }
    format!("{}%", borrows.saturating_mul(100) / liquidity)
}

pub async fn market_rates(
    ledger: &dyn Ledger,
    symbol: &str,
    address: Address,
    underlying_decimals: u8,
    blocks_per_year: u64,
) -> Result<MarketRates> {
    let m = Market::at(ledger, address);
    let supply = m.supply_rate_per_block().await?;
    let borrow = m.borrow_rate_per_block().await?;
    let cash = m.cash().await?;
    let borrows = m.total_borrows().await?;
    let decimals = u32::from(underlying_decimals);

    Ok(MarketRates {
        symbol: symbol.to_string(),
        address,
        supply_rate_per_block: supply,
        borrow_rate_per_block: borrow,
        supply_apy: apy_percent(supply, blocks_per_year),
        borrow_apy: apy_percent(borrow, blocks_per_year),
        cash: format_units(cash, decimals),
        total_borrows: format_units(borrows, decimals),
        utilization: utilization_percent(cash, borrows),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apy_compounds_per_block() {
        assert_eq!(apy_percent(0, 10_512_000), "0.00%");
        // 2% annual at 3s blocks compounds to ~2.02%
        assert_eq!(apy_percent(1_902_587_519, 10_512_000), "2.02%");
    }

    #[test]
    fn utilization_is_integer_percent() {
        assert_eq!(utilization_percent(0, 0), "0%");
        assert_eq!(utilization_percent(50, 50), "50%");
        assert_eq!(utilization_percent(2, 1), "33%");
    }
}
