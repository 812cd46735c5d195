use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fixed::{blocks_per_year, rate_per_block, FixedPointError, Mantissa};

/// Contract every rate-model variant is deployed from.
pub const RATE_MODEL_CONTRACT: &str = "JumpRateModelV4";

/// Utilization kink shared by all variants.
pub const RATE_MODEL_KINK: &str = "0.8";

/// Interest-rate strategy assigned to a market.
///
/// Catalog files may spell a variant by tag (`STABLE`) or by its deployment
/// name (`StableRateModel`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RateModelVariant {
    #[serde(rename = "STABLE", alias = "StableRateModel")]
    Stable,
    #[serde(rename = "MEDIUM", alias = "MediumRateModel")]
    Medium,
    #[serde(rename = "VOLATILE", alias = "VolatileRateModel")]
    Volatile,
}

/// Annualized rates, as decimal text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnualRates {
    pub base: &'static str,
    pub multiplier: &'static str,
    pub jump_multiplier: &'static str,
}

/// Constructor parameters of a rate model for one network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateModelParams {
    pub blocks_per_year: u64,
    pub base_per_block: Mantissa,
    pub multiplier_per_block: Mantissa,
    pub jump_multiplier_per_block: Mantissa,
    pub kink: Mantissa,
}

impl RateModelVariant {
    pub const ALL: [RateModelVariant; 3] = [
        RateModelVariant::Stable,
        RateModelVariant::Medium,
        RateModelVariant::Volatile,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            RateModelVariant::Stable => "STABLE",
            RateModelVariant::Medium => "MEDIUM",
            RateModelVariant::Volatile => "VOLATILE",
        }
    }

    /// Deployment-registry key of the variant's rate model.
    pub fn logical_name(&self) -> &'static str {
        match self {
            RateModelVariant::Stable => "StableRateModel",
            RateModelVariant::Medium => "MediumRateModel",
            RateModelVariant::Volatile => "VolatileRateModel",
        }
    }

    pub fn parse(s: &str) -> Option<RateModelVariant> {
        let t = s.trim();
        RateModelVariant::ALL
            .into_iter()
            .find(|v| v.tag().eq_ignore_ascii_case(t) || v.logical_name() == t)
    }

    pub fn annual_rates(&self) -> AnnualRates {
        match self {
            RateModelVariant::Stable => AnnualRates {
                base: "0",
                multiplier: "0.05",
                jump_multiplier: "1.365",
            },
            RateModelVariant::Medium => AnnualRates {
                base: "0.02",
                multiplier: "0.225",
                jump_multiplier: "1.5",
            },
            RateModelVariant::Volatile => AnnualRates {
                base: "0.025",
                multiplier: "0.225",
                jump_multiplier: "5",
            },
        }
    }

    pub fn kink(&self) -> &'static str {
        RATE_MODEL_KINK
    }

    /// Normalize the annual table to per-block mantissas for a network with
    /// the given block time.
    pub fn params(&self, seconds_per_block: &str) -> Result<RateModelParams, FixedPointError> {
        let rates = self.annual_rates();
        Ok(RateModelParams {
            blocks_per_year: blocks_per_year(seconds_per_block)?,
            base_per_block: rate_per_block(rates.base, seconds_per_block)?,
            multiplier_per_block: rate_per_block(rates.multiplier, seconds_per_block)?,
            jump_multiplier_per_block: rate_per_block(rates.jump_multiplier, seconds_per_block)?,
            kink: Mantissa::parse(self.kink())?,
        })
    }
}

impl fmt::Display for RateModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_tag_and_logical_name() {
        assert_eq!(RateModelVariant::parse("medium"), Some(RateModelVariant::Medium));
        assert_eq!(
            RateModelVariant::parse("VolatileRateModel"),
            Some(RateModelVariant::Volatile)
        );
        assert_eq!(RateModelVariant::parse("JumpRateModelV4"), None);
    }

    #[test]
    fn yaml_spellings_deserialize() {
        let v: Vec<RateModelVariant> =
            serde_yaml::from_str("[STABLE, MediumRateModel, VOLATILE]").unwrap();
        assert_eq!(v, RateModelVariant::ALL.to_vec());
    }

    #[test]
    fn zero_base_rate_stays_zero() {
        let p = RateModelVariant::Stable.params("3").unwrap();
        assert_eq!(p.base_per_block, Mantissa::ZERO);
        assert_eq!(p.kink, Mantissa::new(800_000_000_000_000_000));
    }
}
