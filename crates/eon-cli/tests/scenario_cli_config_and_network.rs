use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

#[allow(deprecated)]
fn eon(dir: &Path) -> anyhow::Result<Command> {
    let mut cmd = Command::cargo_bin("eon")?;
    cmd.current_dir(dir)
        .env_remove("EON_NETWORK")
        .env_remove("FORKING_NETWORK")
        .env_remove("BSC_RPC_URL")
        .env("RUST_LOG", "warn");
    Ok(cmd)
}

#[test]
fn cli_config_hash_is_stable_across_key_order() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("a.yaml"), "oracle:\n  name: Oracle\npolicy:\n  collateral_supply_floor: 1000\n")?;
    std::fs::write(dir.path().join("b.yaml"), "policy:\n  collateral_supply_floor: 1000\noracle:\n  name: Oracle\n")?;

    let a = eon(dir.path())?.args(["--config", "a.yaml", "config-hash"]).assert().success();
    let b = eon(dir.path())?.args(["--config", "b.yaml", "config-hash"]).assert().success();

    let a = String::from_utf8(a.get_output().stdout.clone())?;
    let b = String::from_utf8(b.get_output().stdout.clone())?;
    assert!(a.starts_with("config_hash="), "{a}");
    assert_eq!(a, b);
    Ok(())
}

#[test]
fn cli_config_with_secret_literal_is_rejected() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(
        dir.path().join("leaky.yaml"),
        "oracle:\n  name: \"0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318\"\n",
    )?;

    eon(dir.path())?
        .args(["--config", "leaky.yaml", "config-hash"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"))
        .stderr(predicate::str::contains("4c0883a6").not());
    Ok(())
}

#[test]
fn cli_unused_settings_key_fails_only_when_strict() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("typo.yaml"), "policy:\n  collateral_floor: 5\n")?;

    eon(dir.path())?
        .args(["--config", "typo.yaml", "config-hash"])
        .assert()
        .success();

    eon(dir.path())?
        .args(["--config", "typo.yaml", "--strict-config", "config-hash"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_UNUSED_KEYS"))
        .stderr(predicate::str::contains("/policy/collateral_floor"));
    Ok(())
}

#[test]
fn cli_local_node_without_fork_is_networkless() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    eon(dir.path())?
        .arg("network")
        .assert()
        .success()
        .stdout(predicate::str::contains("network=none"));

    eon(dir.path())?
        .args(["--network", "ganache", "network"])
        .env("FORKING_NETWORK", "bsc")
        .assert()
        .success()
        .stdout(predicate::str::contains("network=none"));

    eon(dir.path())?
        .args(["--network", "mainnet", "network"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unable to resolve network from: mainnet"));
    Ok(())
}

#[test]
fn cli_fork_requires_rpc_url() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    eon(dir.path())?
        .arg("network")
        .env("FORKING_NETWORK", "bsc")
        .assert()
        .failure()
        .stderr(predicate::str::contains("BSC_RPC_URL"));

    eon(dir.path())?
        .arg("network")
        .env("FORKING_NETWORK", "bsc")
        .env("BSC_RPC_URL", "http://127.0.0.1:8545")
        .assert()
        .success()
        .stdout(predicate::str::contains("network=BSC"))
        .stdout(predicate::str::contains("seconds_per_block=3"))
        .stdout(predicate::str::contains("blocks_per_year=10512000"))
        .stdout(predicate::str::contains("fork_mining=interval interval_ms=5000 fifo=true"))
        .stdout(predicate::str::contains("127.0.0.1").not());
    Ok(())
}

#[test]
fn cli_network_without_block_time_needs_settings() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    eon(dir.path())?
        .args(["--network", "zen_testnet", "network"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ZEN_TESTNET"));

    std::fs::write(dir.path().join("zen.yaml"), "networks:\n  ZEN_TESTNET:\n    seconds_per_block: 2\n")?;
    eon(dir.path())?
        .args(["--network", "zen_testnet", "--config", "zen.yaml", "network"])
        .assert()
        .success()
        .stdout(predicate::str::contains("network=ZEN_TESTNET"))
        .stdout(predicate::str::contains("blocks_per_year=15768000"));
    Ok(())
}
