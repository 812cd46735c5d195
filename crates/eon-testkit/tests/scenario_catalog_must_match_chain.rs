use std::sync::Arc;

use eon_catalog::{is_market_deployment, MarketCatalog, OracleKind};
use eon_config::{ConfigError, NetworkName};
use eon_ledger::DeploymentRegistry;
use eon_reconcile::{plan, Pipeline, ReconcileError, Stage};
use eon_testkit::{paper_settings, PaperWorld};

/// BSC catalog whose USDT entry points at the WBNB token.
fn drifted_catalog() -> MarketCatalog {
    let builtin = MarketCatalog::builtin(NetworkName::Bsc);
    let wbnb = builtin.get("WBNB").unwrap().underlying_token_address.clone();
    let mut entries = builtin.entries().to_vec();
    for e in entries.iter_mut().filter(|e| e.symbol == "USDT") {
        e.config.underlying_token_address = wbnb.clone();
    }
    MarketCatalog::new(NetworkName::Bsc, entries).unwrap()
}

/// BSC catalog whose USDT entry is priced by `kind`.
fn catalog_with_oracle(kind: OracleKind) -> MarketCatalog {
    let mut entries = MarketCatalog::builtin(NetworkName::Bsc).entries().to_vec();
    for e in entries.iter_mut().filter(|e| e.symbol == "USDT") {
        e.config.oracle.kind = kind;
    }
    MarketCatalog::new(NetworkName::Bsc, entries).unwrap()
}

#[tokio::test]
async fn scenario_symbol_mismatch_aborts_before_any_market_deploys() {
    let world = PaperWorld::new(NetworkName::Bsc).await.unwrap();
    let pipeline = Pipeline::new(
        world.ledger.clone(),
        world.registry.clone(),
        Some(NetworkName::Bsc),
        paper_settings(NetworkName::Bsc),
    )
    .with_catalog(drifted_catalog())
    .unwrap();

    let err = pipeline.run(&plan(&[Stage::MarketsDeploy])).await.unwrap_err();
    assert_eq!(
        err,
        ReconcileError::Config(ConfigError::SymbolMismatch {
            expected: "USDT".to_string(),
            actual: "WBNB".to_string(),
        })
    );

    // Stages before markets/deploy committed; no market record was written.
    let records = world.registry.all().await.unwrap();
    assert!(records.contains_key("Unitroller"));
    assert!(!records.keys().any(|k| is_market_deployment(k)));
}

#[tokio::test]
async fn scenario_catalog_for_another_network_is_rejected() {
    let world = PaperWorld::new(NetworkName::Bsc).await.unwrap();
    let err = Pipeline::new(
        world.ledger.clone(),
        Arc::new(eon_ledger::MemoryRegistry::new()),
        Some(NetworkName::Bsc),
        paper_settings(NetworkName::Bsc),
    )
    .with_catalog(MarketCatalog::builtin(NetworkName::ZenTestnet))
    .unwrap_err();
    assert!(matches!(err, ReconcileError::Config(ConfigError::InvalidCatalog(_))));
}

#[tokio::test]
async fn scenario_registry_market_outside_catalog_is_a_config_error() {
    let world = PaperWorld::new(NetworkName::Bsc).await.unwrap();
    world.pipeline().unwrap().initial_setup().await.unwrap();

    // Same chain and registry, but a catalog that no longer lists WBNB.
    let usdt_only: Vec<_> = MarketCatalog::builtin(NetworkName::Bsc)
        .entries()
        .iter()
        .filter(|e| e.symbol == "USDT")
        .cloned()
        .collect();
    let pipeline = Pipeline::new(
        world.ledger.clone(),
        world.registry.clone(),
        Some(NetworkName::Bsc),
        paper_settings(NetworkName::Bsc),
    )
    .with_catalog(MarketCatalog::new(NetworkName::Bsc, usdt_only).unwrap())
    .unwrap();

    let err = pipeline.market_addresses().await.unwrap_err();
    assert_eq!(err, ReconcileError::Config(ConfigError::UnknownMarket("WBNB".to_string())));
}

#[tokio::test]
async fn scenario_token_changed_between_runs_is_caught_by_next_run() {
    let world = PaperWorld::new(NetworkName::Bsc).await.unwrap();
    let pipeline = world.pipeline().unwrap();
    pipeline.initial_setup().await.unwrap();

    let usdt = world.seeded("USDT").unwrap().token;
    world.ledger.install_token(usdt, "x", "USDX", 18).await;

    let txs = world.ledger.tx_count().await;
    let err = pipeline
        .run(&[Stage::MarketsDeploy, Stage::OracleDeploy])
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ReconcileError::Config(ConfigError::SymbolMismatch {
            expected: "USDT".to_string(),
            actual: "USDX".to_string(),
        })
    );
    assert_eq!(world.ledger.tx_count().await, txs);
}

#[tokio::test]
async fn scenario_unsupported_oracle_aborts_market_deploy() {
    for kind in [OracleKind::Pyth, OracleKind::UniswapV3Twap] {
        let world = PaperWorld::new(NetworkName::Bsc).await.unwrap();
        let pipeline = Pipeline::new(
            world.ledger.clone(),
            world.registry.clone(),
            Some(NetworkName::Bsc),
            paper_settings(NetworkName::Bsc),
        )
        .with_catalog(catalog_with_oracle(kind))
        .unwrap();

        let err = pipeline.run(&plan(&[Stage::MarketsDeploy])).await.unwrap_err();
        assert_eq!(
            err,
            ReconcileError::Config(ConfigError::UnsupportedOracle(kind.to_string())),
            "{kind}"
        );

        let records = world.registry.all().await.unwrap();
        assert!(records.contains_key("Unitroller"));
        assert!(!records.keys().any(|k| is_market_deployment(k)), "{kind}");
    }
}
