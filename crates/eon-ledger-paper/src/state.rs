//! Serializable contract storage of the paper chain.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use eon_ledger::Address;

pub const MANTISSA_ONE: u128 = 1_000_000_000_000_000_000;

/// Share units minted to the zero address on a market's first mint.
pub const LOCKED_FIRST_MINT: u128 = 1000;

/// Highest collateral factor the comptroller accepts (0.9).
pub const COLLATERAL_FACTOR_MAX: u128 = 900_000_000_000_000_000;

/// Highest reserve factor a market accepts (1.0).
pub const RESERVE_FACTOR_MAX: u128 = MANTISSA_ONE;

/// `a × b / d` with a 256-bit intermediate product. `None` when `d` is zero
/// or the quotient does not fit in `u128`.
pub fn mul_div(a: u128, b: u128, d: u128) -> Option<u128> {
    if d == 0 {
        return None;
    }
    let (hi, lo) = mul_wide(a, b);
    if hi >= d {
        return None;
    }
    // Restoring long division of (hi, lo) by d; hi is the running remainder.
    let mut rem = hi;
    let mut q = 0u128;
    for i in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> i) & 1);
        q <<= 1;
        if carry == 1 || rem >= d {
            rem = rem.wrapping_sub(d);
            q |= 1;
        }
    }
    Some(q)
}

fn mul_wide(a: u128, b: u128) -> (u128, u128) {
    const MASK: u128 = u64::MAX as u128;
    let (a1, a0) = (a >> 64, a & MASK);
    let (b1, b0) = (b >> 64, b & MASK);
    let p00 = a0 * b0;
    let p01 = a0 * b1;
    let p10 = a1 * b0;
    let p11 = a1 * b1;
    let mid = (p00 >> 64) + (p01 & MASK) + (p10 & MASK);
    let lo = (p00 & MASK) | (mid << 64);
    let hi = p11 + (p01 >> 64) + (p10 >> 64) + (mid >> 64);
    (hi, lo)
}

/// What a contract name compiles to on the paper chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactKind {
    Token,
    AggregatorFeed,
    SimpleFeed,
    RateModel,
    Unitroller,
    ComptrollerLogic,
    MarketLogic,
    Oracle,
}

impl ArtifactKind {
    pub fn for_contract(contract: &str) -> Option<ArtifactKind> {
        Some(match contract {
            "ERC20PresetMinterPauser" => ArtifactKind::Token,
            "AggregatorV3" => ArtifactKind::AggregatorFeed,
            "SimplePriceFeed" => ArtifactKind::SimpleFeed,
            "JumpRateModelV4" => ArtifactKind::RateModel,
            "Unitroller" => ArtifactKind::Unitroller,
            "Comptroller" => ArtifactKind::ComptrollerLogic,
            "CErc20Upgradable" => ArtifactKind::MarketLogic,
            "MixedPriceOracleV3" | "SimplePriceOracle" => ArtifactKind::Oracle,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenState {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: u128,
    pub balances: BTreeMap<Address, u128>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorState {
    pub decimals: u8,
    pub answer: u128,
}

/// Per-asset prices at 18 decimals, keyed by underlying token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleFeedState {
    pub prices: BTreeMap<Address, u128>,
}

/// Jump-rate model with per-block parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateModelState {
    pub name: String,
    pub owner: Address,
    pub blocks_per_year: u128,
    pub base_per_block: u128,
    pub multiplier_per_block: u128,
    pub jump_multiplier_per_block: u128,
    pub kink: u128,
}

impl RateModelState {
    pub fn borrow_rate(&self, utilization: u128) -> u128 {
        let scaled = |x: u128, rate: u128| mul_div(x, rate, MANTISSA_ONE).unwrap_or(u128::MAX);
        if utilization <= self.kink {
            return scaled(utilization, self.multiplier_per_block).saturating_add(self.base_per_block);
        }
        let normal = scaled(self.kink, self.multiplier_per_block).saturating_add(self.base_per_block);
        let excess = utilization - self.kink;
        scaled(excess, self.jump_multiplier_per_block).saturating_add(normal)
    }

    pub fn supply_rate(&self, utilization: u128, reserve_factor: u128) -> u128 {
        let one_minus_reserve = MANTISSA_ONE.saturating_sub(reserve_factor);
        let borrow = self.borrow_rate(utilization);
        let to_suppliers = mul_div(borrow, one_minus_reserve, MANTISSA_ONE).unwrap_or(u128::MAX);
        mul_div(utilization, to_suppliers, MANTISSA_ONE).unwrap_or(u128::MAX)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub collateral_factor: u128,
}

/// Comptroller storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitrollerState {
    pub admin: Address,
    pub implementation: Address,
    pub pending_implementation: Address,
    /// Listing order.
    pub all_markets: Vec<Address>,
    pub listings: BTreeMap<Address, Listing>,
    pub oracle: Address,
    #[serde(default)]
    pub reward_distributor: Address,
    pub close_factor: u128,
    pub liquidation_incentive: u128,
}

impl UnitrollerState {
    pub fn new(admin: Address) -> Self {
        Self {
            admin,
            implementation: Address::ZERO,
            pending_implementation: Address::ZERO,
            all_markets: Vec::new(),
            listings: BTreeMap::new(),
            oracle: Address::ZERO,
            reward_distributor: Address::ZERO,
            close_factor: 0,
            liquidation_incentive: 0,
        }
    }
}

/// Market storage, held by the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketState {
    pub underlying: Address,
    pub comptroller: Address,
    pub rate_model: Address,
    pub initial_exchange_rate: u128,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub admin: Address,
    pub reserve_factor: u128,
    pub total_supply: u128,
    pub balances: BTreeMap<Address, u128>,
    pub cash: u128,
    pub total_borrows: u128,
    pub total_reserves: u128,
}

impl MarketState {
    pub fn exchange_rate(&self) -> u128 {
        if self.total_supply == 0 {
            return self.initial_exchange_rate;
        }
        let backing = self
            .cash
            .saturating_add(self.total_borrows)
            .saturating_sub(self.total_reserves);
        mul_div(backing, MANTISSA_ONE, self.total_supply).unwrap_or(u128::MAX)
    }

    pub fn utilization(&self) -> u128 {
        if self.total_borrows == 0 {
            return 0;
        }
        let denom = self
            .cash
            .saturating_add(self.total_borrows)
            .saturating_sub(self.total_reserves);
        mul_div(self.total_borrows, MANTISSA_ONE, denom).unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyState {
    pub admin: Address,
    pub implementation: Address,
    /// `None` until the initializer has run.
    pub market: Option<MarketState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceConfig {
    pub feed: Address,
    pub underlying_decimals: u8,
    pub to_symbol: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleState {
    /// Keyed by market token symbol.
    pub configs: BTreeMap<String, PriceConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractState {
    Token(TokenState),
    Aggregator(AggregatorState),
    SimpleFeed(SimpleFeedState),
    RateModel(RateModelState),
    Unitroller(UnitrollerState),
    /// Stateless logic contract; `digest` identifies the code it runs.
    Logic { kind: ArtifactKind, digest: String },
    Proxy(ProxyState),
    Oracle(OracleState),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployed {
    pub contract: String,
    pub state: ContractState,
}

/// One confirmed transaction (deploys included).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxEntry {
    pub block: u64,
    pub hash: String,
    pub from: Address,
    /// `None` for contract creation.
    pub to: Option<Address>,
    pub method: String,
}
