use std::sync::Arc;

use eon_config::{ConfigError, NetworkName, Settings};
use eon_ledger::{DeploymentRegistry, MemoryRegistry};
use eon_ledger_paper::PaperLedger;
use eon_reconcile::{plan, Pipeline, ReconcileError, Stage};
use eon_testkit::PaperWorld;

#[tokio::test]
async fn scenario_stage_without_prerequisites_is_a_state_error() {
    let world = PaperWorld::new(NetworkName::Bsc).await.unwrap();
    let pipeline = world.pipeline().unwrap();

    for stage in [
        Stage::ComptrollerSetImplementation,
        Stage::MarketsDeploy,
        Stage::OracleInit,
        Stage::MarketsSupport,
        Stage::MarketsSyncParams,
        Stage::ComptrollerInit,
        Stage::OracleCheck,
        Stage::MarketsRates,
        Stage::RewardDistributorInit,
    ] {
        let err = pipeline.run_stage(stage).await.unwrap_err();
        assert!(matches!(err, ReconcileError::State(_)), "{stage}: {err}");
    }
    assert_eq!(world.ledger.tx_count().await, 0);
    assert!(world.registry.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn scenario_out_of_order_sequence_runs_nothing() {
    let world = PaperWorld::new(NetworkName::Bsc).await.unwrap();
    let pipeline = world.pipeline().unwrap();

    let err = pipeline
        .run(&[Stage::ComptrollerSetImplementation, Stage::ComptrollerDeploy])
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::State(_)));
    assert_eq!(world.ledger.tx_count().await, 0);
}

#[tokio::test]
async fn scenario_planned_single_stage_succeeds() {
    let world = PaperWorld::new(NetworkName::Bsc).await.unwrap();
    let pipeline = world.pipeline().unwrap();

    let sequence = plan(&[Stage::ComptrollerInit]);
    assert_eq!(
        sequence,
        vec![
            Stage::ComptrollerDeploy,
            Stage::ComptrollerSetImplementation,
            Stage::ComptrollerInit
        ]
    );
    pipeline.run(&sequence).await.unwrap();

    // A second init finds both parameters in place.
    let report = pipeline.run_stage(Stage::ComptrollerInit).await.unwrap();
    let eon_reconcile::StageReport::ComptrollerInitialized(r) = report else {
        panic!("expected a comptroller init report");
    };
    assert_eq!(r.close_factor, eon_reconcile::ParamSync::Unchanged);
    assert_eq!(r.liquidation_incentive, eon_reconcile::ParamSync::Unchanged);
}

#[tokio::test]
async fn scenario_networkless_pipeline_runs_comptroller_stages_only() {
    let pipeline = Pipeline::new(
        Arc::new(PaperLedger::new()),
        Arc::new(MemoryRegistry::new()),
        None,
        Settings::default(),
    );

    pipeline.run_stage(Stage::ComptrollerDeploy).await.unwrap();
    pipeline.run_stage(Stage::ComptrollerSetImplementation).await.unwrap();

    for stage in [Stage::RateModelsDeploy, Stage::MarketsDeploy, Stage::OracleDeploy] {
        let err = pipeline.run_stage(stage).await.unwrap_err();
        assert_eq!(err, ReconcileError::Config(ConfigError::Networkless), "{stage}");
    }
}
