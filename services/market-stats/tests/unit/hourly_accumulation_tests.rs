//! Comprehensive tests for hourly statistics accumulation

use chrono::NaiveDate;
use market_stats::{BonusKey, HourlyStatAccumulator, StatIdentity};
use pretty_assertions::assert_eq;
use rstest::*;
use services_common::{AhId, ItemId, PetSpeciesId, Px, Qty, Ts};
use test_utils::{ListingFactory, BASE_SNAPSHOT_MILLIS, HOUR_MILLIS};

/// Test fixture for the accumulator under test
#[fixture]
fn accumulator() -> HourlyStatAccumulator {
    HourlyStatAccumulator::new()
}

/// Test fixture for the snapshot capture time (2020-03-17 14:30 UTC)
#[fixture]
fn captured_at() -> Ts {
    Ts::from_millis(BASE_SNAPSHOT_MILLIS)
}

#[rstest]
fn test_snapshot_hour_and_day_derive_from_capture_time(
    accumulator: HourlyStatAccumulator,
    captured_at: Ts,
) {
    let factory = ListingFactory::new();
    let batch = accumulator.accumulate(&[factory.build(1, 100, 50, 1)], captured_at, AhId::new(69));

    assert_eq!(batch.day, NaiveDate::from_ymd_opt(2020, 3, 17).unwrap());
    assert_eq!(batch.hour, 14);
    assert_eq!(batch.rows.len(), 1);
}

#[rstest]
fn test_shared_identity_folds_to_min_price_and_summed_quantity(
    accumulator: HourlyStatAccumulator,
    captured_at: Ts,
) {
    let factory = ListingFactory::new();

    // Unit prices 10 and 8 with quantities 3 and 4
    let batch = accumulator.accumulate(
        &[factory.build(1, 30, 10, 3), factory.build(2, 32, 10, 4)],
        captured_at,
        AhId::new(69),
    );

    assert_eq!(batch.rows.len(), 1);
    assert_eq!(batch.rows[0].price, Px::from_copper(8));
    assert_eq!(batch.rows[0].quantity, Qty::from_units(7));
}

#[rstest]
fn test_stack_totals_become_unit_prices(accumulator: HourlyStatAccumulator, captured_at: Ts) {
    let factory = ListingFactory::new();
    let batch = accumulator.accumulate(&[factory.build(1, 200, 50, 10)], captured_at, AhId::new(69));

    assert_eq!(batch.rows[0].price, Px::from_copper(20));
    assert_eq!(batch.rows[0].quantity, Qty::from_units(10));
}

#[rstest]
fn test_bonused_and_bare_listings_keep_separate_rows(
    accumulator: HourlyStatAccumulator,
    captured_at: Ts,
) {
    let factory = ListingFactory::new();
    let batch = accumulator.accumulate(
        &[
            factory.build(1, 100, 50, 1),
            factory.build_with_bonuses(2, 300, 100, 1, vec![7, 2]),
        ],
        captured_at,
        AhId::new(69),
    );

    assert_eq!(batch.rows.len(), 2);
    let bare = StatIdentity {
        ah: AhId::new(69),
        item: ItemId::new(2770),
        species: None,
        bonus: BonusKey::empty(),
    };
    let bonused = StatIdentity {
        bonus: BonusKey::new(vec![2, 7]),
        ..bare.clone()
    };
    assert_eq!(batch.rows[0].identity, bare);
    assert_eq!(batch.rows[1].identity, bonused);
}

#[rstest]
fn test_pet_rows_collapse_to_species(accumulator: HourlyStatAccumulator, captured_at: Ts) {
    let factory = ListingFactory::new().with_item(82_800);

    // Different rolls of one species share a statistics row
    let batch = accumulator.accumulate(
        &[
            factory.build_pet(1, 900, 1155, 25, 3),
            factory.build_pet(2, 700, 1155, 1, 1),
        ],
        captured_at,
        AhId::new(69),
    );

    assert_eq!(batch.rows.len(), 1);
    assert_eq!(batch.rows[0].identity.species, Some(PetSpeciesId::new(1155)));
    assert_eq!(batch.rows[0].price, Px::from_copper(700));
    assert_eq!(batch.rows[0].quantity, Qty::from_units(2));
}

#[rstest]
fn test_listings_without_price_signal_are_skipped(
    accumulator: HourlyStatAccumulator,
    captured_at: Ts,
) {
    let factory = ListingFactory::new();
    let batch = accumulator.accumulate(
        &[
            factory.build(1, 0, 500, 5),
            factory.build(2, 300, 100, 0),
            factory.build(3, 90, 30, 3),
        ],
        captured_at,
        AhId::new(69),
    );

    // Only the listing with both a buyout and a quantity contributes
    assert_eq!(batch.rows.len(), 1);
    assert_eq!(batch.rows[0].price, Px::from_copper(30));
    assert_eq!(batch.rows[0].quantity, Qty::from_units(3));
}

#[rstest]
fn test_day_boundary_splits_batches(accumulator: HourlyStatAccumulator) {
    let factory = ListingFactory::new();
    let listings = [factory.build(1, 100, 50, 1)];

    let late = accumulator.accumulate(
        &listings,
        Ts::from_millis(BASE_SNAPSHOT_MILLIS + 9 * HOUR_MILLIS),
        AhId::new(69),
    );
    let early = accumulator.accumulate(
        &listings,
        Ts::from_millis(BASE_SNAPSHOT_MILLIS + 10 * HOUR_MILLIS),
        AhId::new(69),
    );

    assert_eq!(late.day, NaiveDate::from_ymd_opt(2020, 3, 17).unwrap());
    assert_eq!(late.hour, 23);
    assert_eq!(early.day, NaiveDate::from_ymd_opt(2020, 3, 18).unwrap());
    assert_eq!(early.hour, 0);
}

#[rstest]
fn test_empty_snapshot_yields_empty_batch(accumulator: HourlyStatAccumulator, captured_at: Ts) {
    let batch = accumulator.accumulate(&[], captured_at, AhId::new(69));
    assert!(batch.is_empty());
    assert_eq!(batch.len(), 0);
}
