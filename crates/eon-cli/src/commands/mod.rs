//! Command handler modules for eon-cli.
//!
//! Shared utilities used by multiple command paths live here: global flags,
//! settings/catalog loading, and the paper-chain session every chain command
//! runs against. Command-specific logic lives in the submodules.

pub mod local;
pub mod stages;

use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use eon_catalog::{blocks_per_year, MarketCatalog};
use eon_config::{
    fork_target, load_layered_yaml, report_unused_keys, resolve_network, ConfigError, ExecutionContext,
    LoadedConfig, MiningMode, NetworkName, Settings, UnusedKeyPolicy,
};
use eon_ledger::JsonFileRegistry;
use eon_ledger_paper::PaperLedger;
use eon_reconcile::Pipeline;

#[derive(clap::Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Active network: hardhat, localhost, ganache, bsc, zen_testnet
    #[arg(long, global = true, env = "EON_NETWORK", default_value = "hardhat")]
    pub network: String,

    /// Settings YAML layers in merge order (repeatable; later overrides earlier)
    #[arg(long = "config", global = true)]
    pub config_paths: Vec<String>,

    /// Market catalog YAML replacing the built-in one
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Paper-chain state file
    #[arg(long, global = true, default_value = ".eon/chain.json")]
    pub state: PathBuf,

    /// Deployment registry file (default: deployments/<network>.json)
    #[arg(long, global = true)]
    pub deployments: Option<PathBuf>,

    /// Fail on settings keys no stage reads
    #[arg(long, global = true)]
    pub strict_config: bool,
}

/// Per-command overrides layered over the loaded settings.
#[derive(Debug, Clone, Default)]
pub struct Target {
    pub oracle_name: Option<String>,
    pub oracle_contract: Option<String>,
    /// 18-decimal price text keyed by symbol, for `oracle check`.
    pub expected_prices: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Resolved execution context: network, merged settings and catalog.
pub struct CommandContext {
    pub exec: ExecutionContext,
    pub network: Option<NetworkName>,
    pub loaded: LoadedConfig,
    pub settings: Settings,
    pub catalog: Option<MarketCatalog>,
}

pub fn load_context(g: &GlobalArgs) -> Result<CommandContext> {
    let exec = ExecutionContext::from_env(g.network.clone());
    let network = resolve_network(&exec)?;

    let path_refs: Vec<&str> = g.config_paths.iter().map(|s| s.as_str()).collect();
    let loaded = load_layered_yaml(&path_refs)?;

    let policy = if g.strict_config {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let report = report_unused_keys(&loaded.config_json, policy)?;
    for leaf in &report.unused_leaf_pointers {
        warn!(leaf = %leaf, "unused settings key");
    }

    let settings = Settings::from_loaded(&loaded)?;

    let catalog = match &g.catalog {
        None => None,
        Some(path) => {
            let network = network.ok_or(ConfigError::Networkless)?;
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read catalog path: {}", path.display()))?;
            Some(MarketCatalog::from_yaml_str(network, &raw)?)
        }
    };

    Ok(CommandContext {
        exec,
        network,
        loaded,
        settings,
        catalog,
    })
}

/// `deployments/<network>.json`, or `deployments/localhost.json` when
/// networkless.
pub fn deployments_path(g: &GlobalArgs, network: Option<NetworkName>) -> PathBuf {
    g.deployments.clone().unwrap_or_else(|| {
        let label = network
            .map(|n| n.as_str().to_ascii_lowercase())
            .unwrap_or_else(|| "localhost".to_string());
        PathBuf::from("deployments").join(format!("{label}.json"))
    })
}

/// A paper chain loaded from the state file plus a pipeline over it.
pub struct Session {
    pub ledger: Arc<PaperLedger>,
    pub pipeline: Pipeline,
    state: PathBuf,
}

impl Session {
    pub async fn open(g: &GlobalArgs, target: &Target) -> Result<Self> {
        let ctx = load_context(g)?;

        let mut settings = ctx.settings;
        if let Some(name) = &target.oracle_name {
            settings.oracle.name = name.clone();
        }
        if let Some(contract) = &target.oracle_contract {
            settings.oracle.contract = contract.clone();
        }

        let ledger = Arc::new(PaperLedger::open(&g.state).await?);
        let deployments = deployments_path(g, ctx.network);
        info!(
            network = ?ctx.network,
            state = %g.state.display(),
            deployments = %deployments.display(),
            config_hash = %ctx.loaded.config_hash,
            "session"
        );

        let mut pipeline = Pipeline::new(
            ledger.clone(),
            Arc::new(JsonFileRegistry::new(deployments)),
            ctx.network,
            settings,
        )
        .with_expected_prices(target.expected_prices.clone());
        if let Some(catalog) = ctx.catalog {
            pipeline = pipeline.with_catalog(catalog)?;
        }

        Ok(Self {
            ledger,
            pipeline,
            state: g.state.clone(),
        })
    }

    /// Persist the chain. Called after every command, failed or not: stages
    /// that completed before a failure have already sent their transactions.
    pub async fn save(&self) -> Result<()> {
        self.ledger
            .save(&self.state)
            .await
            .with_context(|| format!("save paper state {}", self.state.display()))
    }
}

/// Parse repeated `SYMBOL=VALUE` flags.
pub fn parse_prices(raw: &[String]) -> Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    for item in raw {
        let Some((symbol, value)) = item.split_once('=') else {
            bail!("invalid --price '{}'. expected SYMBOL=VALUE", item);
        };
        let (symbol, value) = (symbol.trim(), value.trim());
        if symbol.is_empty() || value.is_empty() {
            bail!("invalid --price '{}'. expected SYMBOL=VALUE", item);
        }
        if out.insert(symbol.to_string(), value.to_string()).is_some() {
            bail!("duplicate --price for {}", symbol);
        }
    }
    Ok(out)
}

pub fn config_hash(g: &GlobalArgs) -> Result<()> {
    let ctx = load_context(g)?;
    println!("config_hash={}", ctx.loaded.config_hash);
    println!("{}", ctx.loaded.canonical_json);
    Ok(())
}

pub fn network(g: &GlobalArgs) -> Result<()> {
    let ctx = load_context(g)?;
    // A resolved network on a local node can only come from the forking override.
    let fork = match ctx.network {
        Some(_) if ctx.exec.is_local_node() => fork_target(&ctx.exec)?,
        _ => None,
    };

    let Some(network) = ctx.network else {
        println!("network=none");
        return Ok(());
    };
    let spb = ctx.settings.seconds_per_block(network)?;
    println!("network={}", network);
    println!("seconds_per_block={}", spb);
    println!("blocks_per_year={}", blocks_per_year(&spb)?);

    if let Some(fork) = fork {
        println!("fork_network={}", fork.network);
        match fork.mining {
            MiningMode::Auto => println!("fork_mining=auto"),
            MiningMode::Interval { interval_ms, fifo } => {
                println!("fork_mining=interval interval_ms={} fifo={}", interval_ms, fifo)
            }
        }
    }
    Ok(())
}
