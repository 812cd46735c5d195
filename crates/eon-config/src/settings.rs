use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{ConfigError, LoadedConfig, NetworkName};

pub const DEFAULT_ORACLE_DEPLOY_NAME: &str = "Oracle";
pub const DEFAULT_ORACLE_CONTRACT: &str = "MixedPriceOracleV3";
pub const DEFAULT_COLLATERAL_SUPPLY_FLOOR: u64 = 1000;

/// Typed operator settings. Every field has a default, so an empty layer
/// stack yields a usable configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub policy: PolicySettings,
    pub oracle: OracleSettings,
    pub comptroller: ComptrollerSettings,
    /// Keyed by canonical network name (`BSC`, `ZEN_TESTNET`).
    pub networks: BTreeMap<String, NetworkSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySettings {
    /// Collateral-factor writes are suppressed while the market token's raw
    /// total supply is at or below this value.
    pub collateral_supply_floor: u64,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            collateral_supply_floor: DEFAULT_COLLATERAL_SUPPLY_FLOOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSettings {
    /// Logical deployment name of the oracle.
    pub name: String,
    pub contract: String,
    pub target_currency: String,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_ORACLE_DEPLOY_NAME.to_string(),
            contract: DEFAULT_ORACLE_CONTRACT.to_string(),
            target_currency: "USD".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComptrollerSettings {
    /// Decimal string, scaled by 1e18 on write.
    pub close_factor: String,
    /// Decimal string, scaled by 1e18 on write.
    pub liquidation_incentive: String,
}

impl Default for ComptrollerSettings {
    fn default() -> Self {
        Self {
            close_factor: "0.5".to_string(),
            liquidation_incentive: "1.08".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    #[serde(deserialize_with = "decimal_text_opt")]
    pub seconds_per_block: Option<String>,
}

/// Accept `3`, `0.75` or `"0.75"`; the value stays decimal text so it can be
/// parsed exactly downstream.
fn decimal_text_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a decimal number, got {other}"
        ))),
    }
}

impl Settings {
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self, ConfigError> {
        Self::from_json(&loaded.config_json)
    }

    pub fn from_json(v: &serde_json::Value) -> Result<Self, ConfigError> {
        // An empty layer stack merges to `{}`; `null` comes from empty YAML docs.
        if v.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(v.clone()).map_err(|e| ConfigError::InvalidSettings(e.to_string()))
    }

    /// Seconds per block for `network`: settings override, else built-in table.
    pub fn seconds_per_block(&self, network: NetworkName) -> Result<String, ConfigError> {
        self.networks
            .get(network.as_str())
            .and_then(|n| n.seconds_per_block.clone())
            .or_else(|| network.builtin_seconds_per_block().map(str::to_string))
            .ok_or_else(|| ConfigError::MissingSecondsPerBlock(network.to_string()))
    }
}
