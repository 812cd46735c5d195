use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

#[allow(deprecated)]
fn eon(dir: &Path) -> anyhow::Result<Command> {
    let mut cmd = Command::cargo_bin("eon")?;
    cmd.current_dir(dir)
        .env_remove("EON_NETWORK")
        .env_remove("FORKING_NETWORK")
        .env("RUST_LOG", "warn");
    Ok(cmd)
}

/// `eon initial-setup` against a persisted paper chain: the second run
/// deploys nothing and leaves the deployment registry byte-identical.
#[test]
fn cli_initial_setup_twice_is_a_no_op() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    eon(dir.path())?
        .args(["--network", "bsc", "local", "seed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("token=USDT"));

    eon(dir.path())?
        .args(["--network", "bsc", "initial-setup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stage=markets/sync-params"))
        .stdout(predicate::str::contains("outcome=DEPLOYED"))
        .stdout(predicate::str::contains("listed=now"));

    let registry = dir.path().join("deployments").join("bsc.json");
    let first = std::fs::read(&registry)?;
    let records: serde_json::Value = serde_json::from_slice(&first)?;
    assert!(records.get("Unitroller").is_some());
    assert!(records.get("Comptroller").is_some());

    eon(dir.path())?
        .args(["--network", "bsc", "initial-setup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("outcome=IGNORED"))
        .stdout(predicate::str::contains("outcome=DEPLOYED").not())
        .stdout(predicate::str::contains("listed=now").not())
        .stdout(predicate::str::contains("listed=already"));

    assert_eq!(std::fs::read(&registry)?, first);
    Ok(())
}

/// Supplying to a market lifts the collateral-factor guard on the next sync.
#[test]
fn cli_supply_then_sync_sets_collateral_factor() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    eon(dir.path())?.args(["--network", "bsc", "local", "seed"]).assert().success();
    eon(dir.path())?.args(["--network", "bsc", "initial-setup"]).assert().success();

    eon(dir.path())?
        .args(["--network", "bsc", "local", "supply", "--symbol", "USDT", "--amount", "100"])
        .assert()
        .success()
        .stdout(predicate::str::contains("shares=499999999000"));

    eon(dir.path())?
        .args(["--network", "bsc", "markets", "sync-params"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "market=USDT collateral_factor=0->800000000000000000 reserve_factor=unchanged",
        ))
        .stdout(predicate::str::contains("market=WBNB collateral_factor=suppressed"));
    Ok(())
}

#[test]
fn cli_stage_before_its_prerequisites_is_a_state_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    eon(dir.path())?.args(["--network", "bsc", "local", "seed"]).assert().success();
    eon(dir.path())?
        .args(["--network", "bsc", "markets", "deploy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("state error"));

    assert!(!dir.path().join("deployments").join("bsc.json").exists());
    Ok(())
}

#[test]
fn cli_reward_distributor_init_needs_a_deployment() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    eon(dir.path())?.args(["--network", "bsc", "local", "seed"]).assert().success();
    eon(dir.path())?.args(["--network", "bsc", "initial-setup"]).assert().success();

    eon(dir.path())?
        .args(["--network", "bsc", "markets", "deploy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("market=USDT"))
        .stdout(predicate::str::contains("init_drift=false"))
        .stdout(predicate::str::contains("init_drift=true").not());

    eon(dir.path())?
        .args(["--network", "bsc", "reward-distributor", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("there is no deployed reward distributor (RewardDistributor)"));
    Ok(())
}
