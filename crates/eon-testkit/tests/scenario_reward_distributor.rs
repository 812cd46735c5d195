use eon_config::NetworkName;
use eon_ledger::contracts::Comptroller;
use eon_ledger::{Address, DeploymentRecord, DeploymentRegistry};
use eon_ledger_paper::account;
use eon_reconcile::{comptroller_address, plan, ReconcileError, Stage, StageReport, REWARD_DISTRIBUTOR};
use eon_testkit::PaperWorld;

#[tokio::test]
async fn scenario_missing_distributor_record_is_a_state_error() {
    let world = PaperWorld::new(NetworkName::Bsc).await.unwrap();
    let pipeline = world.pipeline().unwrap();
    pipeline.run(&plan(&[Stage::ComptrollerSetImplementation])).await.unwrap();
    let txs = world.ledger.tx_count().await;

    let err = pipeline.run_stage(Stage::RewardDistributorInit).await.unwrap_err();
    let ReconcileError::State(msg) = &err else {
        panic!("expected a state error, got {err}");
    };
    assert!(msg.contains(REWARD_DISTRIBUTOR), "{msg}");
    assert_eq!(world.ledger.tx_count().await, txs);
}

#[tokio::test]
async fn scenario_distributor_is_set_once() {
    let world = PaperWorld::new(NetworkName::Bsc).await.unwrap();
    let pipeline = world.pipeline().unwrap();

    assert_eq!(
        plan(&[Stage::RewardDistributorInit]),
        vec![
            Stage::ComptrollerDeploy,
            Stage::ComptrollerSetImplementation,
            Stage::RewardDistributorInit
        ]
    );
    pipeline.run(&plan(&[Stage::ComptrollerSetImplementation])).await.unwrap();

    let distributor = account(7);
    world
        .registry
        .put(
            REWARD_DISTRIBUTOR,
            DeploymentRecord {
                address: distributor,
                implementation: None,
                newly_deployed: true,
                contract: "RewardDistributor".to_string(),
                content_hash: String::new(),
            },
        )
        .await
        .unwrap();

    let StageReport::RewardDistributorSet(r) = pipeline.run_stage(Stage::RewardDistributorInit).await.unwrap() else {
        panic!("expected a reward distributor report");
    };
    assert!(r.changed);
    assert_eq!(r.previous, Address::ZERO);
    assert_eq!(r.distributor, distributor);

    let unitroller = comptroller_address(&pipeline.deployer()).await.unwrap();
    let comptroller = Comptroller::at(pipeline.ledger(), unitroller);
    assert_eq!(comptroller.reward_distributor().await.unwrap(), distributor);

    let txs = world.ledger.tx_count().await;
    let StageReport::RewardDistributorSet(again) = pipeline.run_stage(Stage::RewardDistributorInit).await.unwrap()
    else {
        panic!("expected a reward distributor report");
    };
    assert!(!again.changed);
    assert_eq!(again.previous, distributor);
    assert_eq!(world.ledger.tx_count().await, txs, "rerun must not transact");
}
