use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{GlobalArgs, Target};
use eon_reconcile::Stage;

#[derive(Parser)]
#[command(name = "eon")]
#[command(about = "Eonian lending markets: idempotent deployment and parameter sync", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: rate models, comptroller, markets, oracle,
    /// registration, parameter sync.
    InitialSetup,

    /// Interest rate models
    RateModels {
        #[command(subcommand)]
        cmd: RateModelsCmd,
    },

    /// Comptroller (unitroller + implementation)
    Comptroller {
        #[command(subcommand)]
        cmd: ComptrollerCmd,
    },

    /// Markets (cTokens)
    Markets {
        #[command(subcommand)]
        cmd: MarketsCmd,
    },

    /// Price oracle
    Oracle {
        #[command(subcommand)]
        cmd: OracleCmd,
    },

    /// Reward distributor wiring
    RewardDistributor {
        #[command(subcommand)]
        cmd: RewardDistributorCmd,
    },

    /// Print the stages needed to reach the given targets, in run order.
    Plan {
        /// Task names, e.g. markets/sync-params
        #[arg(required = true)]
        targets: Vec<String>,
    },

    /// Compute layered settings hash + print canonical JSON
    ConfigHash,

    /// Print the resolved network and its block timing.
    Network,

    /// Paper-chain fixtures
    Local {
        #[command(subcommand)]
        cmd: LocalCmd,
    },
}

#[derive(Subcommand)]
enum RateModelsCmd {
    /// Deploy every rate-model variant that has no deployment yet.
    Deploy,
}

#[derive(Subcommand)]
enum ComptrollerCmd {
    /// Deploy the unitroller once and the comptroller when its code changed.
    Deploy,
    /// Point the unitroller at the deployed comptroller.
    SetImplementation,
    /// Sync close factor and liquidation incentive with settings.
    Init,
}

#[derive(Subcommand)]
enum MarketsCmd {
    /// Deploy or upgrade every catalog market.
    Deploy,
    /// List deployed markets the comptroller does not list yet.
    Support,
    /// Sync collateral and reserve factors with the catalog.
    SyncParams,
    /// Print per-market rates, APYs and utilization.
    Rates,
}

#[derive(Subcommand)]
enum OracleCmd {
    /// Deploy the price oracle for the catalog's feeds.
    Deploy {
        /// Logical deployment name
        #[arg(long)]
        name: Option<String>,
        /// Contract to deploy
        #[arg(long)]
        contract: Option<String>,
    },
    /// Set the comptroller's price oracle.
    Init {
        /// Logical deployment name
        #[arg(long)]
        name: Option<String>,
    },
    /// Verify the active oracle reports the expected prices.
    Check {
        /// Expected 18-decimal price, as SYMBOL=VALUE (repeatable)
        #[arg(long = "price", required = true)]
        prices: Vec<String>,
    },
}

#[derive(Subcommand)]
enum RewardDistributorCmd {
    /// Set the comptroller's reward distributor to the `RewardDistributor` deployment.
    Init,
}

#[derive(Subcommand)]
enum LocalCmd {
    /// Install the catalog's underlying tokens and price feeds.
    Seed,
    /// Mint underlying to the supplier account and deposit it into a market.
    Supply {
        #[arg(long)]
        symbol: String,
        /// Underlying units, decimal text
        #[arg(long)]
        amount: String,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();
    let g = &cli.global;

    match cli.cmd {
        Commands::InitialSetup => commands::stages::run(g, &Stage::INITIAL_SETUP, Target::default()).await?,

        Commands::RateModels { cmd } => match cmd {
            RateModelsCmd::Deploy => commands::stages::run_one(g, Stage::RateModelsDeploy).await?,
        },

        Commands::Comptroller { cmd } => {
            let stage = match cmd {
                ComptrollerCmd::Deploy => Stage::ComptrollerDeploy,
                ComptrollerCmd::SetImplementation => Stage::ComptrollerSetImplementation,
                ComptrollerCmd::Init => Stage::ComptrollerInit,
            };
            commands::stages::run_one(g, stage).await?
        }

        Commands::Markets { cmd } => {
            let stage = match cmd {
                MarketsCmd::Deploy => Stage::MarketsDeploy,
                MarketsCmd::Support => Stage::MarketsSupport,
                MarketsCmd::SyncParams => Stage::MarketsSyncParams,
                MarketsCmd::Rates => Stage::MarketsRates,
            };
            commands::stages::run_one(g, stage).await?
        }

        Commands::Oracle { cmd } => match cmd {
            OracleCmd::Deploy { name, contract } => {
                let target = Target {
                    oracle_name: name,
                    oracle_contract: contract,
                    ..Target::default()
                };
                commands::stages::run(g, &[Stage::OracleDeploy], target).await?
            }
            OracleCmd::Init { name } => {
                let target = Target {
                    oracle_name: name,
                    ..Target::default()
                };
                commands::stages::run(g, &[Stage::OracleInit], target).await?
            }
            OracleCmd::Check { prices } => {
                let target = Target {
                    expected_prices: commands::parse_prices(&prices)?,
                    ..Target::default()
                };
                commands::stages::run(g, &[Stage::OracleCheck], target).await?
            }
        },

        Commands::RewardDistributor { cmd } => match cmd {
            RewardDistributorCmd::Init => commands::stages::run_one(g, Stage::RewardDistributorInit).await?,
        },

        Commands::Plan { targets } => commands::stages::plan(&targets)?,

        Commands::ConfigHash => commands::config_hash(g)?,

        Commands::Network => commands::network(g)?,

        Commands::Local { cmd } => match cmd {
            LocalCmd::Seed => commands::local::seed(g).await?,
            LocalCmd::Supply { symbol, amount } => commands::local::supply(g, &symbol, &amount).await?,
        },
    }

    Ok(())
}
