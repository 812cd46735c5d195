use eon_config::NetworkName;
use eon_ledger::contracts::Comptroller;
use eon_reconcile::{comptroller_address, ParamSync, Stage, StageReport};
use eon_testkit::{paper_settings, PaperWorld};

const E18: u128 = 1_000_000_000_000_000_000;

fn synced(report: StageReport) -> Vec<(String, ParamSync, ParamSync)> {
    match report {
        StageReport::Synced(markets) => markets
            .into_iter()
            .map(|m| (m.symbol, m.collateral_factor, m.reserve_factor))
            .collect(),
        other => panic!("expected a sync report, got {other:?}"),
    }
}

#[tokio::test]
async fn scenario_collateral_factor_set_only_after_real_supply() {
    let world = PaperWorld::new(NetworkName::Bsc).await.unwrap();
    let pipeline = world.pipeline().unwrap();

    let mut setup = pipeline.initial_setup().await.unwrap();
    let (stage, last) = setup.pop().unwrap();
    assert_eq!(stage, Stage::MarketsSyncParams);
    assert_eq!(
        synced(last),
        vec![
            (
                "WBNB".to_string(),
                ParamSync::Suppressed { total_supply: 0 },
                ParamSync::Updated { old: 0, new: 13 * E18 / 100 },
            ),
            (
                "USDT".to_string(),
                ParamSync::Suppressed { total_supply: 0 },
                ParamSync::Updated { old: 0, new: 13 * E18 / 100 },
            ),
        ]
    );

    // 100 USDT at an initial rate of 0.02 mints 5e11 raw market-token units.
    let shares = world.supply(&pipeline, "USDT", "100").await.unwrap();
    assert_eq!(shares, 500_000_000_000 - 1000);

    let report = pipeline.run_stage(Stage::MarketsSyncParams).await.unwrap();
    assert_eq!(
        synced(report),
        vec![
            (
                "WBNB".to_string(),
                ParamSync::Suppressed { total_supply: 0 },
                ParamSync::Unchanged,
            ),
            (
                "USDT".to_string(),
                ParamSync::Updated { old: 0, new: 8 * E18 / 10 },
                ParamSync::Unchanged,
            ),
        ]
    );

    let deployer = pipeline.deployer();
    let comptroller = Comptroller::at(pipeline.ledger(), comptroller_address(&deployer).await.unwrap());
    let usdt = pipeline.market_address("USDT").await.unwrap();
    let wbnb = pipeline.market_address("WBNB").await.unwrap();
    assert_eq!(comptroller.collateral_factor(usdt).await.unwrap(), 8 * E18 / 10);
    assert_eq!(comptroller.collateral_factor(wbnb).await.unwrap(), 0);
}

#[tokio::test]
async fn scenario_supply_floor_is_configurable() {
    let world = PaperWorld::new(NetworkName::Bsc).await.unwrap();
    let mut settings = paper_settings(NetworkName::Bsc);
    settings.policy.collateral_supply_floor = 1_000_000_000_000;
    let pipeline = world.pipeline_with(settings).unwrap();

    pipeline.initial_setup().await.unwrap();
    world.supply(&pipeline, "USDT", "100").await.unwrap();

    let report = pipeline.run_stage(Stage::MarketsSyncParams).await.unwrap();
    let usdt = synced(report)
        .into_iter()
        .find(|(s, _, _)| s == "USDT")
        .unwrap();
    assert_eq!(usdt.1, ParamSync::Suppressed { total_supply: 500_000_000_000 });
}
