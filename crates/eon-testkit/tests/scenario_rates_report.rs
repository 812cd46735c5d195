use eon_config::NetworkName;
use eon_ledger_paper::account;
use eon_reconcile::{MarketRates, Stage, StageReport};
use eon_testkit::PaperWorld;

const E18: u128 = 1_000_000_000_000_000_000;

fn by_symbol<'a>(rates: &'a [MarketRates], symbol: &str) -> &'a MarketRates {
    rates.iter().find(|r| r.symbol == symbol).unwrap()
}

#[tokio::test]
async fn scenario_rates_follow_utilization() {
    let world = PaperWorld::new(NetworkName::Bsc).await.unwrap();
    let pipeline = world.pipeline().unwrap();
    pipeline.initial_setup().await.unwrap();

    world.supply(&pipeline, "USDT", "100").await.unwrap();
    let usdt = pipeline.market_address("USDT").await.unwrap();
    world.ledger.borrow(account(2), usdt, 50 * E18).await.unwrap();

    let StageReport::Rates(rates) = pipeline.run_stage(Stage::MarketsRates).await.unwrap() else {
        panic!("expected a rates report");
    };
    assert_eq!(rates.len(), 2);

    // STABLE model at 50% utilization: 0.05 × 0.5 per year, compounded per block.
    let u = by_symbol(&rates, "USDT");
    assert_eq!(u.address, usdt);
    assert_eq!(u.cash, "50.0");
    assert_eq!(u.total_borrows, "50.0");
    assert_eq!(u.utilization, "50%");
    assert_eq!(u.borrow_rate_per_block, 2_378_234_399);
    assert_eq!(u.borrow_apy, "2.53%");
    // Suppliers get utilization × borrow rate × (1 − 0.13).
    assert_eq!(u.supply_apy, "1.09%");

    // MEDIUM model on an empty market: base rate only, nothing to suppliers.
    let w = by_symbol(&rates, "WBNB");
    assert_eq!(w.utilization, "0%");
    assert_eq!(w.borrow_rate_per_block, 1_902_587_519);
    assert_eq!(w.borrow_apy, "2.02%");
    assert_eq!(w.supply_apy, "0.00%");
}

#[tokio::test]
async fn scenario_rates_report_sends_no_transaction() {
    let world = PaperWorld::new(NetworkName::Bsc).await.unwrap();
    let pipeline = world.pipeline().unwrap();
    pipeline.initial_setup().await.unwrap();

    let txs = world.ledger.tx_count().await;
    pipeline.run_stage(Stage::MarketsRates).await.unwrap();
    assert_eq!(world.ledger.tx_count().await, txs);
}
