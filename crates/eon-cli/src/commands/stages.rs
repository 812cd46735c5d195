//! Pipeline stage commands: run stages against the paper chain and print
//! each report as `key=value` lines.

use anyhow::{Context, Result};

use eon_reconcile::{plan as plan_stages, validate_order, Deployment, Pipeline, Stage, StageReport};

use super::{GlobalArgs, Session, Target};

pub async fn run_one(g: &GlobalArgs, stage: Stage) -> Result<()> {
    run(g, &[stage], Target::default()).await
}

/// Run `stages` in order. The chain is saved even when a stage fails so that
/// its state keeps matching the deployment registry.
pub async fn run(g: &GlobalArgs, stages: &[Stage], target: Target) -> Result<()> {
    validate_order(stages)?;
    let session = Session::open(g, &target).await?;
    let outcome = run_printing(&session.pipeline, stages).await;
    session.save().await?;
    outcome
}

async fn run_printing(pipeline: &Pipeline, stages: &[Stage]) -> Result<()> {
    for &stage in stages {
        let report = pipeline
            .run_stage(stage)
            .await
            .with_context(|| format!("stage {stage} failed"))?;
        print_report(stage, &report);
    }
    Ok(())
}

pub fn plan(targets: &[String]) -> Result<()> {
    let mut wanted = Vec::with_capacity(targets.len());
    for t in targets {
        let stage = Stage::parse(t).with_context(|| {
            let known: Vec<&str> = Stage::ALL.iter().map(|s| s.task_name()).collect();
            format!("unknown stage '{}'. expected one of: {}", t, known.join(" | "))
        })?;
        wanted.push(stage);
    }
    for stage in plan_stages(&wanted) {
        println!("stage={}", stage);
    }
    Ok(())
}

fn print_deployment(key: &str, d: &Deployment) {
    match d.previous {
        Some(prev) => println!(
            "{}={} address={} outcome={} previous={}",
            key, d.name, d.address, d.outcome, prev
        ),
        None => println!("{}={} address={} outcome={}", key, d.name, d.address, d.outcome),
    }
}

fn print_report(stage: Stage, report: &StageReport) {
    println!("stage={}", stage);
    match report {
        StageReport::RateModels(models) => {
            for m in models {
                println!(
                    "rate_model={} address={} outcome={} blocks_per_year={}",
                    m.name, m.address, m.outcome, m.params.blocks_per_year
                );
            }
        }
        StageReport::ComptrollerDeployed(r) => {
            print_deployment("unitroller", &r.unitroller);
            print_deployment("comptroller", &r.implementation);
        }
        StageReport::ImplementationActivated(r) => {
            println!(
                "unitroller={} implementation={} previous={} changed={}",
                r.unitroller, r.implementation, r.previous, r.changed
            );
        }
        StageReport::Markets(markets) => {
            for m in markets {
                println!(
                    "market={} address={} outcome={} init_drift={}",
                    m.symbol, m.address, m.outcome, m.init_drift
                );
            }
        }
        StageReport::OracleDeployed(d) => print_deployment("oracle", d),
        StageReport::OracleActivated(r) => {
            println!(
                "oracle={} address={} previous={} changed={}",
                r.name, r.oracle, r.previous, r.changed
            );
        }
        StageReport::Registered(r) => {
            for symbol in &r.already_listed {
                println!("market={} listed=already", symbol);
            }
            for (symbol, address) in &r.registered {
                println!("market={} address={} listed=now", symbol, address);
            }
        }
        StageReport::Synced(markets) => {
            for m in markets {
                println!(
                    "market={} collateral_factor={} reserve_factor={}",
                    m.symbol,
                    m.collateral_factor.describe(),
                    m.reserve_factor.describe()
                );
            }
        }
        StageReport::ComptrollerInitialized(r) => {
            println!("close_factor={}", r.close_factor.describe());
            println!("liquidation_incentive={}", r.liquidation_incentive.describe());
        }
        StageReport::RewardDistributorSet(r) => {
            println!(
                "reward_distributor={} previous={} changed={}",
                r.distributor, r.previous, r.changed
            );
        }
        StageReport::PricesChecked(checks) => {
            for c in checks {
                println!("price={} market={} value={}", c.symbol, c.market, c.price);
            }
        }
        StageReport::Rates(rates) => {
            for r in rates {
                println!(
                    "market={} cash={} total_borrows={} utilization={} borrow_rate_per_block={} supply_rate_per_block={} borrow_apy={} supply_apy={}",
                    r.symbol,
                    r.cash,
                    r.total_borrows,
                    r.utilization,
                    r.borrow_rate_per_block,
                    r.supply_rate_per_block,
                    r.borrow_apy,
                    r.supply_apy
                );
            }
        }
    }
}
