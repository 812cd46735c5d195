//! Param Syncer.
//!
//! Diffs the mutable per-market risk parameters against the catalog and
//! writes only what differs. Collateral-factor writes are gated on the market
//! token's total supply exceeding the configured floor; reserve-factor writes
//! are not gated.

use serde::Serialize;
use tracing::{info, warn};

use eon_catalog::{MarketEntry, Mantissa};
use eon_ledger::contracts::{Comptroller, Market};
use eon_ledger::{Address, Ledger};

use crate::error::Result;

/// Result of reconciling one on-chain parameter. Reporting only; never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamSync {
    Unchanged,
    /// Differs from configuration, but the supply guard held the write back.
    Suppressed { total_supply: u128 },
    Updated { old: u128, new: u128 },
}

impl ParamSync {
    /// `{old, new}` when a write happened.
    pub fn change(&self) -> Option<(u128, u128)> {
        match *self {
            ParamSync::Updated { old, new } => Some((old, new)),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ParamSync::Unchanged => "unchanged".to_string(),
            ParamSync::Suppressed { total_supply } => format!("suppressed(total_supply={total_supply})"),
            ParamSync::Updated { old, new } => format!("{old}->{new}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketSyncReport {
    pub symbol: String,
    pub address: Address,
    pub collateral_factor: ParamSync,
    pub reserve_factor: ParamSync,
}

pub struct SyncPolicy {
    /// Raw market-token units; collateral factor moves only above this.
    pub collateral_supply_floor: u128,
}

pub async fn sync_collateral_factor(
    ledger: &dyn Ledger,
    comptroller: Address,
    market: Address,
    desired: Mantissa,
    policy: &SyncPolicy,
) -> Result<ParamSync> {
    let comptroller = Comptroller::at(ledger, comptroller);
    let current = comptroller.collateral_factor(market).await?;
    if current == desired.raw() {
        return Ok(ParamSync::Unchanged);
    }

    let total_supply = Market::at(ledger, market).total_supply().await?;
    if total_supply <= policy.collateral_supply_floor {
        warn!(%market, total_supply, "market supply at or below floor, collateral factor won't change");
        return Ok(ParamSync::Suppressed { total_supply });
    }

    let from = ledger.deployer().await?;
    comptroller.set_collateral_factor(from, market, desired.raw()).await?;
    Ok(ParamSync::Updated {
        old: current,
        new: desired.raw(),
    })
}

pub async fn sync_reserve_factor(ledger: &dyn Ledger, market: Address, desired: Mantissa) -> Result<ParamSync> {
    let m = Market::at(ledger, market);
    let current = m.reserve_factor().await?;
    if current == desired.raw() {
        return Ok(ParamSync::Unchanged);
    }
    let from = ledger.owner().await?;
    m.set_reserve_factor(from, desired.raw()).await?;
    Ok(ParamSync::Updated {
        old: current,
        new: desired.raw(),
    })
}

pub async fn sync_market(
    ledger: &dyn Ledger,
    comptroller: Address,
    entry: &MarketEntry,
    market: Address,
    policy: &SyncPolicy,
) -> Result<MarketSyncReport> {
    let symbol = entry.symbol.as_str();
    let cf = Mantissa::parse(&entry.config.collateral_factor)
        .map_err(|e| e.for_field(format!("{symbol}.collateral_factor")))?;
    let rf = Mantissa::parse(&entry.config.reserve_factor)
        .map_err(|e| e.for_field(format!("{symbol}.reserve_factor")))?;

    let collateral_factor = sync_collateral_factor(ledger, comptroller, market, cf, policy).await?;
    let reserve_factor = sync_reserve_factor(ledger, market, rf).await?;

    for (param, result) in [("COLLATERAL_FACTOR", collateral_factor), ("RESERVE_FACTOR", reserve_factor)] {
        match result.change() {
            Some((old, new)) => info!(symbol, param, old, new, "parameter set"),
            None => info!(symbol, param, result = %result.describe(), "parameter hasn't changed"),
        }
    }

    Ok(MarketSyncReport {
        symbol: symbol.to_string(),
        address: market,
        collateral_factor,
        reserve_factor,
    })
}
