//! Market Catalog.
//!
//! Ordered, per-network registry of declarative market definitions keyed by
//! underlying symbol. Built-in tables cover every known network; an operator
//! can inject a replacement from YAML:
//!
//! ```yaml
//! BSC:
//!   - symbol: USDT
//!     underlying_token_address: "0x55d398326f99059fF775485246999027B3197955"
//!     collateral_factor: "0.8"
//!     reserve_factor: "0.13"
//!     initial_exchange_rate: "0.02"
//!     interest_rate_model: STABLE
//!     oracle: { type: CHAINLINK, source: "0xB97Ad0E74fa7d920791E90258A6E2085088b4320" }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use eon_config::{ConfigError, NetworkName};

use crate::fixed::{exchange_rate_mantissa, Mantissa};
use crate::market::{MarketConfig, OracleConfig, OracleKind, MARKET_TOKEN_DECIMALS};
use crate::RateModelVariant;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketEntry {
    pub symbol: String,
    pub config: MarketConfig,
}

/// YAML shape of one entry: `symbol` alongside the config fields.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntry {
    symbol: String,
    underlying_token_address: String,
    collateral_factor: String,
    reserve_factor: String,
    initial_exchange_rate: String,
    #[serde(default)]
    decimals: Option<u8>,
    interest_rate_model: RateModelVariant,
    oracle: OracleConfig,
}

impl From<RawEntry> for MarketEntry {
    fn from(r: RawEntry) -> Self {
        MarketEntry {
            symbol: r.symbol,
            config: MarketConfig {
                underlying_token_address: r.underlying_token_address,
                collateral_factor: r.collateral_factor,
                reserve_factor: r.reserve_factor,
                initial_exchange_rate: r.initial_exchange_rate,
                decimals: r.decimals.unwrap_or(MARKET_TOKEN_DECIMALS),
                interest_rate_model: r.interest_rate_model,
                oracle: r.oracle,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketCatalog {
    network: NetworkName,
    entries: Vec<MarketEntry>,
}

impl MarketCatalog {
    /// Validate and wrap an ordered entry list.
    pub fn new(network: NetworkName, entries: Vec<MarketEntry>) -> Result<Self, ConfigError> {
        let mut seen = BTreeSet::new();
        for e in &entries {
            if e.symbol.trim().is_empty() {
                return Err(ConfigError::InvalidCatalog("empty market symbol".to_string()));
            }
            if !seen.insert(e.symbol.as_str()) {
                return Err(ConfigError::InvalidCatalog(format!(
                    "duplicate market {} on {network}",
                    e.symbol
                )));
            }
            validate_numbers(e)?;
        }
        Ok(Self { network, entries })
    }

    /// Built-in table for `network`.
    pub fn builtin(network: NetworkName) -> Self {
        let entries = match network {
            NetworkName::Bsc => bsc_markets(),
            NetworkName::ZenTestnet => zen_testnet_markets(),
        };
        Self { network, entries }
    }

    /// Read the entries for `network` from a YAML document mapping network
    /// names to entry lists. Network keys match case-insensitively.
    pub fn from_yaml_str(network: NetworkName, yaml: &str) -> Result<Self, ConfigError> {
        let by_network: BTreeMap<String, Vec<serde_yaml::Value>> =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::InvalidCatalog(e.to_string()))?;

        let mut selected = None;
        for (key, list) in by_network {
            match NetworkName::parse(&key) {
                Some(n) if n == network => {
                    if selected.is_some() {
                        return Err(ConfigError::InvalidCatalog(format!(
                            "network {network} listed more than once"
                        )));
                    }
                    selected = Some(list);
                }
                Some(_) => {}
                None => return Err(ConfigError::UnknownNetwork(key)),
            }
        }

        let raw = selected.ok_or_else(|| {
            ConfigError::InvalidCatalog(format!("no markets listed for network {network}"))
        })?;

        let entries = raw
            .into_iter()
            .map(|v| {
                serde_yaml::from_value::<RawEntry>(v)
                    .map(MarketEntry::from)
                    .map_err(|e| ConfigError::InvalidCatalog(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(network, entries)
    }

    pub fn network(&self) -> NetworkName {
        self.network
    }

    pub fn entries(&self) -> &[MarketEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &MarketEntry> {
        self.entries.iter()
    }

    pub fn get(&self, symbol: &str) -> Option<&MarketConfig> {
        self.entries.iter().find(|e| e.symbol == symbol).map(|e| &e.config)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.get(symbol).is_some()
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.symbol.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Catch malformed decimals at load time rather than mid-pipeline.
fn validate_numbers(e: &MarketEntry) -> Result<(), ConfigError> {
    let field = |name: &str| format!("{}.{name}", e.symbol);
    Mantissa::parse(&e.config.collateral_factor).map_err(|x| x.for_field(field("collateral_factor")))?;
    Mantissa::parse(&e.config.reserve_factor).map_err(|x| x.for_field(field("reserve_factor")))?;
    // Underlying decimals are only known on chain; 18 bounds the precision check.
    exchange_rate_mantissa(&e.config.initial_exchange_rate, 18, e.config.decimals)
        .map_err(|x| x.for_field(field("initial_exchange_rate")))?;
    Ok(())
}

fn entry(
    symbol: &str,
    underlying: &str,
    decimals: u8,
    model: RateModelVariant,
    kind: OracleKind,
    feed: &str,
) -> MarketEntry {
    MarketEntry {
        symbol: symbol.to_string(),
        config: MarketConfig {
            underlying_token_address: underlying.to_string(),
            collateral_factor: "0.8".to_string(),
            reserve_factor: "0.13".to_string(),
            initial_exchange_rate: "0.02".to_string(),
            decimals,
            interest_rate_model: model,
            oracle: OracleConfig {
                kind,
                source: feed.to_string(),
            },
        },
    }
}

fn bsc_markets() -> Vec<MarketEntry> {
    vec![
        entry(
            "WBNB",
            "0xbb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c",
            MARKET_TOKEN_DECIMALS,
            RateModelVariant::Medium,
            OracleKind::Chainlink,
            "0x0567F2323251f0Aab15c8dFb1967E4e8A7D42aeE",
        ),
        entry(
            "USDT",
            "0x55d398326f99059fF775485246999027B3197955",
            MARKET_TOKEN_DECIMALS,
            RateModelVariant::Stable,
            OracleKind::Chainlink,
            "0xB97Ad0E74fa7d920791E90258A6E2085088b4320",
        ),
    ]
}

const ZEN_TEST_FEED: &str = "0x6739d839bCd24fAf55FdeF4077AE7a282997F56B";

fn zen_testnet_markets() -> Vec<MarketEntry> {
    vec![
        entry(
            "ptETH",
            "0x62546c0D07E3D94878F816E65b038329F7586Cb5",
            MARKET_TOKEN_DECIMALS,
            RateModelVariant::Medium,
            OracleKind::TestSimple,
            ZEN_TEST_FEED,
        ),
        entry(
            "ptUSD",
            "0x78A61983B5B384c1aD2fee999cD34F4Fe4025952",
            MARKET_TOKEN_DECIMALS,
            RateModelVariant::Stable,
            OracleKind::TestSimple,
            ZEN_TEST_FEED,
        ),
        // Bridged USDC; its market token mirrors the 6 decimals.
        entry(
            "zUSDC",
            "0xF8aD5140d8B21D68366755DeF1fEFA2e2665060C",
            6,
            RateModelVariant::Stable,
            OracleKind::TestSimple,
            ZEN_TEST_FEED,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_validate() {
        for n in NetworkName::ALL {
            let c = MarketCatalog::builtin(n);
            assert!(!c.is_empty());
            MarketCatalog::new(n, c.entries().to_vec()).unwrap();
        }
    }

    #[test]
    fn builtin_order_is_stable() {
        assert_eq!(MarketCatalog::builtin(NetworkName::Bsc).symbols(), vec!["WBNB", "USDT"]);
        assert_eq!(
            MarketCatalog::builtin(NetworkName::ZenTestnet).symbols(),
            vec!["ptETH", "ptUSD", "zUSDC"]
        );
    }

    #[test]
    fn duplicate_symbol_rejected() {
        let mut entries = MarketCatalog::builtin(NetworkName::Bsc).entries().to_vec();
        entries.push(entries[0].clone());
        assert!(matches!(
            MarketCatalog::new(NetworkName::Bsc, entries),
            Err(ConfigError::InvalidCatalog(_))
        ));
    }
}
