use eon_catalog::{MarketCatalog, MARKET_CONTRACT};
use eon_config::NetworkName;
use eon_ledger::contracts::{Comptroller, Market};
use eon_ledger::{DeploymentRegistry, Ledger};
use eon_reconcile::{comptroller_address, DeployOutcome, Pipeline, Stage, StageReport, COMPTROLLER};
use eon_testkit::{paper_settings, PaperWorld};

const E18: u128 = 1_000_000_000_000_000_000;

#[tokio::test]
async fn scenario_recompiled_market_is_upgraded_behind_same_proxy() {
    let world = PaperWorld::new(NetworkName::Bsc).await.unwrap();
    let pipeline = world.pipeline().unwrap();
    pipeline.initial_setup().await.unwrap();

    let usdt = pipeline.market_address("USDT").await.unwrap();
    let old_impl = world.ledger.proxy_implementation(usdt).await.unwrap();

    world.ledger.set_artifact_version(MARKET_CONTRACT, 2).await;
    let report = pipeline.run_stage(Stage::MarketsDeploy).await.unwrap();
    let StageReport::Markets(markets) = report else {
        panic!("expected a market deploy report");
    };
    assert!(markets.iter().all(|m| m.outcome == DeployOutcome::Upgraded && !m.init_drift));

    assert_eq!(pipeline.market_address("USDT").await.unwrap(), usdt);
    let new_impl = world.ledger.proxy_implementation(usdt).await.unwrap();
    assert_ne!(new_impl, old_impl);

    let record = world
        .registry
        .get("CErc20Upgradable_USDT")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.address, usdt);
    assert_eq!(record.implementation, Some(new_impl));

    // Storage lives in the proxy and survives the upgrade.
    assert_eq!(Market::at(pipeline.ledger(), usdt).reserve_factor().await.unwrap(), 13 * E18 / 100);

    let again = pipeline.run_stage(Stage::MarketsDeploy).await.unwrap();
    let StageReport::Markets(markets) = again else {
        panic!("expected a market deploy report");
    };
    assert!(markets.iter().all(|m| m.outcome == DeployOutcome::Ignored));
}

#[tokio::test]
async fn scenario_new_comptroller_is_activated_on_same_unitroller() {
    let world = PaperWorld::new(NetworkName::Bsc).await.unwrap();
    let pipeline = world.pipeline().unwrap();
    pipeline.initial_setup().await.unwrap();

    let deployer = pipeline.deployer();
    let unitroller = comptroller_address(&deployer).await.unwrap();
    let old_impl = world.registry.get(COMPTROLLER).await.unwrap().unwrap().address;

    world.ledger.set_artifact_version(COMPTROLLER, 2).await;
    let StageReport::ComptrollerDeployed(r) = pipeline.run_stage(Stage::ComptrollerDeploy).await.unwrap() else {
        panic!("expected a comptroller deploy report");
    };
    assert_eq!(r.unitroller.outcome, DeployOutcome::Ignored);
    assert_eq!(r.unitroller.address, unitroller);
    assert_eq!(r.implementation.outcome, DeployOutcome::Upgraded);
    assert_eq!(r.implementation.previous, Some(old_impl));

    let StageReport::ImplementationActivated(a) =
        pipeline.run_stage(Stage::ComptrollerSetImplementation).await.unwrap()
    else {
        panic!("expected an activation report");
    };
    assert!(a.changed);
    assert_eq!(a.previous, old_impl);
    assert_eq!(a.implementation, r.implementation.address);

    let comptroller = Comptroller::at(pipeline.ledger(), unitroller);
    assert_eq!(comptroller.comptroller_implementation().await.unwrap(), r.implementation.address);
    // Listings live in the unitroller.
    assert_eq!(comptroller.all_markets().await.unwrap().len(), 2);

    let deployer_account = world.ledger.deployer().await.unwrap();
    assert_eq!(world.ledger.owner().await.unwrap(), deployer_account);
}

#[tokio::test]
async fn scenario_changed_initializer_is_reported_not_applied() {
    let world = PaperWorld::new(NetworkName::Bsc).await.unwrap();
    world.pipeline().unwrap().initial_setup().await.unwrap();

    let mut entries = MarketCatalog::builtin(NetworkName::Bsc).entries().to_vec();
    for e in entries.iter_mut().filter(|e| e.symbol == "USDT") {
        e.config.initial_exchange_rate = "0.05".to_string();
    }
    let pipeline = Pipeline::new(
        world.ledger.clone(),
        world.registry.clone(),
        Some(NetworkName::Bsc),
        paper_settings(NetworkName::Bsc),
    )
    .with_catalog(MarketCatalog::new(NetworkName::Bsc, entries).unwrap())
    .unwrap();

    let usdt = pipeline.market_address("USDT").await.unwrap();
    let rate = Market::at(pipeline.ledger(), usdt).exchange_rate_stored().await.unwrap();
    let records = world.registry.all().await.unwrap();
    let txs = world.ledger.tx_count().await;

    for _ in 0..2 {
        let StageReport::Markets(markets) = pipeline.run_stage(Stage::MarketsDeploy).await.unwrap() else {
            panic!("expected a market deploy report");
        };
        for m in &markets {
            assert_eq!(m.outcome, DeployOutcome::Ignored, "{}", m.symbol);
            assert_eq!(m.init_drift, m.symbol == "USDT", "{}", m.symbol);
        }
    }

    // The proxy keeps the storage it was initialized with.
    assert_eq!(Market::at(pipeline.ledger(), usdt).exchange_rate_stored().await.unwrap(), rate);
    assert_eq!(world.ledger.tx_count().await, txs);
    assert_eq!(world.registry.all().await.unwrap(), records);
}
