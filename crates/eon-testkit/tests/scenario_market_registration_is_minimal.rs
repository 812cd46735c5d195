use eon_config::NetworkName;
use eon_ledger::contracts::Comptroller;
use eon_ledger::Ledger;
use eon_reconcile::{comptroller_address, plan, Stage, StageReport};
use eon_testkit::PaperWorld;

#[tokio::test]
async fn scenario_only_unlisted_markets_are_registered() {
    let world = PaperWorld::new(NetworkName::Bsc).await.unwrap();
    let pipeline = world.pipeline().unwrap();
    pipeline.run(&plan(&[Stage::MarketsDeploy])).await.unwrap();

    // List WBNB out of band.
    let deployer = pipeline.deployer();
    let comptroller = Comptroller::at(pipeline.ledger(), comptroller_address(&deployer).await.unwrap());
    let wbnb = pipeline.market_address("WBNB").await.unwrap();
    let usdt = pipeline.market_address("USDT").await.unwrap();
    let from = world.ledger.deployer().await.unwrap();
    comptroller.support_market(from, wbnb).await.unwrap();

    let txs = world.ledger.tx_count().await;
    let report = pipeline.run_stage(Stage::MarketsSupport).await.unwrap();
    let StageReport::Registered(r) = report else {
        panic!("expected a registration report");
    };
    assert_eq!(r.already_listed, vec!["WBNB".to_string()]);
    assert_eq!(r.registered, vec![("USDT".to_string(), usdt)]);
    assert_eq!(world.ledger.tx_count().await, txs + 1);
    assert_eq!(comptroller.all_markets().await.unwrap(), vec![wbnb, usdt]);
}

#[tokio::test]
async fn scenario_fully_listed_comptroller_gets_no_transaction() {
    let world = PaperWorld::new(NetworkName::Bsc).await.unwrap();
    let pipeline = world.pipeline().unwrap();
    pipeline.initial_setup().await.unwrap();

    let txs = world.ledger.tx_count().await;
    let report = pipeline.run_stage(Stage::MarketsSupport).await.unwrap();
    let StageReport::Registered(r) = report else {
        panic!("expected a registration report");
    };
    assert!(r.registered.is_empty());
    assert_eq!(r.already_listed.len(), 2);
    assert_eq!(world.ledger.tx_count().await, txs);
}
