use eon_catalog::{rate_per_block, Mantissa, RateModelVariant};

#[test]
fn medium_base_rate_on_three_second_blocks() {
    // 0.02 × 3 / 31_536_000 = 1.902587519025875190...e-9
    assert_eq!(
        rate_per_block("0.02", "3").unwrap(),
        Mantissa::new(1_902_587_519)
    );
}

#[test]
fn rounds_half_up_at_eighteenth_digit() {
    // 0.05 × 3 / 31_536_000 = 4.7564687975646879...e-9
    assert_eq!(rate_per_block("0.05", "3").unwrap(), Mantissa::new(4_756_468_798));
}

#[test]
fn every_variant_is_deterministic_per_network() {
    for v in RateModelVariant::ALL {
        let a = v.params("3").unwrap();
        let b = v.params("3").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.blocks_per_year, 10_512_000);

        let rates = v.annual_rates();
        assert_eq!(a.base_per_block, rate_per_block(rates.base, "3").unwrap());
        assert_eq!(
            a.jump_multiplier_per_block,
            rate_per_block(rates.jump_multiplier, "3").unwrap()
        );
    }
}

#[test]
fn block_time_changes_the_result() {
    let slow = RateModelVariant::Volatile.params("12").unwrap();
    let fast = RateModelVariant::Volatile.params("3").unwrap();
    assert!(slow.jump_multiplier_per_block > fast.jump_multiplier_per_block);
    assert_eq!(slow.blocks_per_year, 2_628_000);
}

#[test]
fn fractional_block_time_is_exact() {
    // 1 / (31_536_000 / 0.25) = 7.927447995941146...e-9
    assert_eq!(rate_per_block("1", "0.25").unwrap(), Mantissa::new(7_927_447_996));
}
