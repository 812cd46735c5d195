use eon_catalog::{exchange_rate_mantissa, FixedPointError, Mantissa, MarketCatalog};
use eon_config::NetworkName;

#[test]
fn standard_market_mantissa_is_2e26() {
    // R = 0.02, U = 18, M = 8  =>  0.02 × 10^28
    assert_eq!(
        exchange_rate_mantissa("0.02", 18, 8).unwrap(),
        200_000_000_000_000_000_000_000_000
    );
}

#[test]
fn exponent_tracks_both_decimal_counts() {
    // USDC-style underlying (6) with 8-decimal market token: 0.02 × 10^16
    assert_eq!(exchange_rate_mantissa("0.02", 6, 8).unwrap(), 200_000_000_000_000);
    // zUSDC: 6-decimal underlying, 6-decimal market token: 0.02 × 10^18
    assert_eq!(
        exchange_rate_mantissa("0.02", 6, 6).unwrap(),
        20_000_000_000_000_000
    );
}

#[test]
fn too_precise_rate_is_rejected_not_rounded() {
    assert!(matches!(
        exchange_rate_mantissa("0.0000000000000000001", 0, 18),
        Err(FixedPointError::TooPrecise { .. })
    ));
}

#[test]
fn catalog_factors_scale_to_mantissas() {
    let c = MarketCatalog::builtin(NetworkName::Bsc);
    let usdt = c.get("USDT").unwrap();
    assert_eq!(
        Mantissa::parse(&usdt.collateral_factor).unwrap(),
        Mantissa::new(800_000_000_000_000_000)
    );
    assert_eq!(
        Mantissa::parse(&usdt.reserve_factor).unwrap(),
        Mantissa::new(130_000_000_000_000_000)
    );
}
