//! Network Resolver.
//!
//! Maps the ambient execution context (the active network name plus the
//! optional `FORKING_NETWORK` override) to a [`NetworkName`], or to `None`
//! for networkless local/ephemeral execution.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ConfigError;

/// Environment variable naming the real network a local node simulates.
pub const ENV_FORKING_NETWORK: &str = "FORKING_NETWORK";

/// Seconds in a (non-leap) year, used for per-block rate normalization.
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Canonical identity of a supported target network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NetworkName {
    #[serde(rename = "BSC")]
    Bsc,
    #[serde(rename = "ZEN_TESTNET")]
    ZenTestnet,
}

impl NetworkName {
    pub const ALL: [NetworkName; 2] = [NetworkName::Bsc, NetworkName::ZenTestnet];

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkName::Bsc => "BSC",
            NetworkName::ZenTestnet => "ZEN_TESTNET",
        }
    }

    /// Case-insensitive match against the known set.
    pub fn parse(s: &str) -> Option<NetworkName> {
        let wanted = s.trim();
        NetworkName::ALL
            .into_iter()
            .find(|n| n.as_str().eq_ignore_ascii_case(wanted))
    }

    /// Built-in block time. Networks without one must be configured through
    /// `networks.<NAME>.seconds_per_block`.
    pub fn builtin_seconds_per_block(&self) -> Option<&'static str> {
        match self {
            NetworkName::Bsc => Some("3"),
            NetworkName::ZenTestnet => None,
        }
    }

    /// Name of the environment variable holding the fork RPC endpoint.
    pub fn rpc_url_env(&self) -> String {
        format!("{}_RPC_URL", self.as_str())
    }
}

impl fmt::Display for NetworkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ambient execution context, captured once per process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Active network name as the operator spelled it (`hardhat`, `bsc`, ...).
    pub network: String,
    /// Raw `FORKING_NETWORK` value; empty strings are treated as absent.
    pub forking_network: Option<String>,
}

impl ExecutionContext {
    pub fn new(network: impl Into<String>, forking_network: Option<String>) -> Self {
        Self {
            network: network.into(),
            forking_network: forking_network.filter(|s| !s.trim().is_empty()),
        }
    }

    /// Capture the context from the process environment.
    pub fn from_env(network: impl Into<String>) -> Self {
        Self::new(network, std::env::var(ENV_FORKING_NETWORK).ok())
    }

    /// `true` for node names that run a local chain rather than a real network.
    pub fn is_local_node(&self) -> bool {
        matches!(
            self.network.trim().to_ascii_lowercase().as_str(),
            "ganache" | "hardhat" | "localhost"
        )
    }
}

/// Resolve the target network.
///
/// - `ganache` is a plain local node: networkless.
/// - `hardhat` / `localhost` may be a fork of a real network: the forking
///   override decides, absent override means networkless.
/// - Any other name must be a known network.
pub fn resolve_network(ctx: &ExecutionContext) -> Result<Option<NetworkName>, ConfigError> {
    let active = ctx.network.trim().to_ascii_lowercase();
    match active.as_str() {
        "ganache" => Ok(None),
        "hardhat" | "localhost" => forking_network(ctx),
        _ => NetworkName::parse(&active)
            .map(Some)
            .ok_or_else(|| ConfigError::UnknownNetwork(ctx.network.clone())),
    }
}

/// Resolve the forking override alone.
pub fn forking_network(ctx: &ExecutionContext) -> Result<Option<NetworkName>, ConfigError> {
    match ctx.forking_network.as_deref() {
        None => Ok(None),
        Some(raw) => NetworkName::parse(raw)
            .map(Some)
            .ok_or_else(|| ConfigError::UnknownForkingNetwork(raw.to_string())),
    }
}

/// How the local fork produces blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningMode {
    Auto,
    Interval { interval_ms: u64, fifo: bool },
}

/// Everything needed to start a local fork of a real network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkTarget {
    pub network: NetworkName,
    pub rpc_url: String,
    pub mining: MiningMode,
}

/// Resolve the fork target using the process environment.
pub fn fork_target(ctx: &ExecutionContext) -> Result<Option<ForkTarget>, ConfigError> {
    fork_target_with(ctx, |key| std::env::var(key).ok())
}

/// Resolve the fork target with an explicit environment lookup.
pub fn fork_target_with(
    ctx: &ExecutionContext,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Option<ForkTarget>, ConfigError> {
    let Some(network) = forking_network(ctx)? else {
        return Ok(None);
    };

    let key = network.rpc_url_env();
    let rpc_url = lookup(&key)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingEnv(key))?;

    // BSC forks need interval mining to mimic its 3s blocks with FIFO ordering.
    let mining = match network {
        NetworkName::Bsc => MiningMode::Interval {
            interval_ms: 5_000,
            fifo: true,
        },
        NetworkName::ZenTestnet => MiningMode::Auto,
    };

    Ok(Some(ForkTarget {
        network,
        rpc_url,
        mining,
    }))
}
