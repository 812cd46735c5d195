//! Network resolution from the execution context.
//!
//! GREEN when:
//! - local node names resolve through the forking override (or to networkless)
//! - real network names resolve case-insensitively
//! - unknown names fail with a ConfigError
//! - a fork target requires its `<NETWORK>_RPC_URL`

use eon_config::{
    fork_target_with, resolve_network, ConfigError, ExecutionContext, MiningMode, NetworkName,
};

#[test]
fn ganache_is_networkless_even_with_override() {
    let ctx = ExecutionContext::new("ganache", Some("BSC".to_string()));
    assert_eq!(resolve_network(&ctx).unwrap(), None);
}

#[test]
fn hardhat_follows_forking_override() {
    let ctx = ExecutionContext::new("hardhat", Some("BSC".to_string()));
    assert_eq!(resolve_network(&ctx).unwrap(), Some(NetworkName::Bsc));

    let ctx = ExecutionContext::new("localhost", None);
    assert_eq!(resolve_network(&ctx).unwrap(), None);
}

#[test]
fn real_network_names_resolve() {
    let ctx = ExecutionContext::new("zen_testnet", None);
    assert_eq!(resolve_network(&ctx).unwrap(), Some(NetworkName::ZenTestnet));

    let ctx = ExecutionContext::new("BSC", None);
    assert_eq!(resolve_network(&ctx).unwrap(), Some(NetworkName::Bsc));
}

#[test]
fn unknown_network_is_config_error() {
    let ctx = ExecutionContext::new("polygon", None);
    assert_eq!(
        resolve_network(&ctx),
        Err(ConfigError::UnknownNetwork("polygon".to_string()))
    );

    let ctx = ExecutionContext::new("hardhat", Some("POLYGON".to_string()));
    assert_eq!(
        resolve_network(&ctx),
        Err(ConfigError::UnknownForkingNetwork("POLYGON".to_string()))
    );
}

#[test]
fn fork_target_requires_rpc_url() {
    let ctx = ExecutionContext::new("hardhat", Some("BSC".to_string()));

    let missing = fork_target_with(&ctx, |_| None);
    assert_eq!(missing, Err(ConfigError::MissingEnv("BSC_RPC_URL".to_string())));

    let target = fork_target_with(&ctx, |key| {
        (key == "BSC_RPC_URL").then(|| "https://bsc.example/rpc".to_string())
    })
    .unwrap()
    .expect("fork target");
    assert_eq!(target.network, NetworkName::Bsc);
    assert_eq!(target.rpc_url, "https://bsc.example/rpc");
    assert_eq!(
        target.mining,
        MiningMode::Interval {
            interval_ms: 5_000,
            fifo: true
        }
    );
}

#[test]
fn no_override_means_no_fork() {
    let ctx = ExecutionContext::new("hardhat", None);
    assert_eq!(fork_target_with(&ctx, |_| None), Ok(None));
}
