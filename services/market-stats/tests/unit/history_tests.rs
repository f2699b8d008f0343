//! Comprehensive tests for history expansion and the current-day overlay

use chrono::NaiveDate;
use market_stats::{
    BonusKey, DailyPricePoint, DaySlot, HistoryQueryAdapter, HourSlot, HourlyPricePoint,
    HourlyStatRow, MonthlyStatRow, StatIdentity,
};
use pretty_assertions::assert_eq;
use rstest::*;
use services_common::{AhId, ItemId, PetSpeciesId, Px, Qty, Ts};

/// Test fixture for the adapter under test
#[fixture]
fn adapter() -> HistoryQueryAdapter {
    HistoryQueryAdapter::new()
}

fn identity() -> StatIdentity {
    StatIdentity {
        ah: AhId::new(69),
        item: ItemId::new(2770),
        species: None,
        bonus: BonusKey::empty(),
    }
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 3, day).unwrap()
}

fn utc_millis(day: u32, hour: u32, minute: u32, second: u32, milli: u32) -> Ts {
    Ts::from_datetime(
        date(day)
            .and_hms_milli_opt(hour, minute, second, milli)
            .unwrap()
            .and_utc(),
    )
}

fn hourly_point(day: u32, hour: u32, min: i64, quantity: i64) -> HourlyPricePoint {
    HourlyPricePoint {
        timestamp: utc_millis(day, hour, 0, 0, 0),
        species: None,
        bonus: BonusKey::empty(),
        min: Px::from_copper(min),
        quantity: Qty::from_units(quantity),
    }
}

#[rstest]
fn test_expand_hourly_emits_one_point_per_populated_slot(adapter: HistoryQueryAdapter) {
    let mut row = HourlyStatRow::new(identity(), date(17));
    row.set_hour(
        3,
        HourSlot {
            price: Px::from_copper(12),
            quantity: Qty::from_units(5),
        },
    );
    row.set_hour(
        14,
        HourSlot {
            price: Px::from_copper(8),
            quantity: Qty::from_units(7),
        },
    );

    let points = adapter.expand_hourly(&[row]);

    assert_eq!(points.len(), 2);
    assert_eq!(points[0].timestamp, utc_millis(17, 3, 0, 0, 0));
    assert_eq!(points[0].min, Px::from_copper(12));
    assert_eq!(points[1].timestamp, utc_millis(17, 14, 0, 0, 0));
    assert_eq!(points[1].quantity, Qty::from_units(7));
}

#[rstest]
fn test_expand_hourly_skips_priceless_slots(adapter: HistoryQueryAdapter) {
    let mut row = HourlyStatRow::new(identity(), date(17));
    row.set_hour(
        6,
        HourSlot {
            price: Px::ZERO,
            quantity: Qty::from_units(40),
        },
    );

    assert!(adapter.expand_hourly(&[row]).is_empty());
}

#[rstest]
fn test_expand_daily_is_midday_anchored(adapter: HistoryQueryAdapter) {
    let mut row = MonthlyStatRow::new(identity(), date(15));
    row.set_day(
        17,
        DaySlot {
            min: Px::from_copper(6),
            min_hour: 2,
            avg: Px::from_i64(8_5000),
            max: Px::from_copper(10),
            min_quantity: Qty::from_units(2),
            avg_quantity: Qty::from_i64(5_5000),
            max_quantity: Qty::from_units(8),
        },
    );

    let points = adapter.expand_daily(&[row]);

    assert_eq!(points.len(), 1);
    assert_eq!(points[0].timestamp, utc_millis(17, 12, 1, 1, 1));
    assert_eq!(points[0].min, Px::from_copper(6));
    assert_eq!(points[0].min_hour, 2);
    assert_eq!(points[0].avg, Px::from_i64(8_5000));
}

#[rstest]
fn test_expand_daily_is_idempotent(adapter: HistoryQueryAdapter) {
    let mut row = MonthlyStatRow::new(identity(), date(15));
    for day in [3, 11, 26] {
        row.set_day(
            day,
            DaySlot {
                min: Px::from_copper(i64::from(day)),
                min_hour: 1,
                avg: Px::from_copper(i64::from(day) * 2),
                max: Px::from_copper(i64::from(day) * 3),
                min_quantity: Qty::from_units(1),
                avg_quantity: Qty::from_units(2),
                max_quantity: Qty::from_units(3),
            },
        );
    }

    let rows = [row];
    assert_eq!(adapter.expand_daily(&rows), adapter.expand_daily(&rows));
    assert_eq!(adapter.expand_daily(&rows).len(), 3);
}

#[rstest]
fn test_merge_synthesizes_one_bucket_for_today(adapter: HistoryQueryAdapter) {
    // Latest compacted point is yesterday; three hourly points from today
    let mut daily = vec![DailyPricePoint {
        timestamp: utc_millis(16, 12, 1, 1, 1),
        species: None,
        bonus: BonusKey::empty(),
        min: Px::from_copper(5),
        min_hour: 4,
        min_quantity: Qty::from_units(1),
        avg: Px::from_copper(7),
        avg_quantity: Qty::from_units(3),
        max: Px::from_copper(11),
        max_quantity: Qty::from_units(6),
    }];
    let yesterday = daily[0].clone();

    let hourly = [
        hourly_point(17, 8, 10, 4),
        hourly_point(17, 9, 6, 2),
        hourly_point(17, 11, 9, 8),
    ];
    adapter.merge_current_day(&mut daily, &hourly);

    assert_eq!(daily.len(), 2);
    assert_eq!(daily[0], yesterday);

    let today = &daily[1];
    assert_eq!(today.timestamp, utc_millis(17, 12, 1, 1, 1));
    assert_eq!(today.min, Px::from_copper(6));
    assert_eq!(today.min_hour, 9);
    assert_eq!(today.max, Px::from_copper(10));
    assert_eq!(today.avg, Px::from_i64(8_5000));
    assert_eq!(today.min_quantity, Qty::from_units(2));
    assert_eq!(today.max_quantity, Qty::from_units(8));
    assert_eq!(today.avg_quantity, Qty::from_i64(5_5000));
}

#[rstest]
fn test_merge_ignores_points_at_or_before_the_cutoff(adapter: HistoryQueryAdapter) {
    let mut daily = vec![DailyPricePoint {
        timestamp: utc_millis(16, 12, 1, 1, 1),
        species: None,
        bonus: BonusKey::empty(),
        min: Px::from_copper(5),
        min_hour: 4,
        min_quantity: Qty::from_units(1),
        avg: Px::from_copper(7),
        avg_quantity: Qty::from_units(3),
        max: Px::from_copper(11),
        max_quantity: Qty::from_units(6),
    }];

    // Both points predate yesterday's midnight cutoff
    let hourly = [hourly_point(14, 13, 3, 1), hourly_point(15, 22, 4, 1)];
    adapter.merge_current_day(&mut daily, &hourly);

    assert_eq!(daily.len(), 1);
}

#[rstest]
fn test_merge_with_no_daily_points_overlays_every_day(adapter: HistoryQueryAdapter) {
    let mut daily = Vec::new();
    let hourly = [
        hourly_point(16, 9, 10, 1),
        hourly_point(16, 15, 8, 1),
        hourly_point(17, 10, 20, 2),
    ];
    adapter.merge_current_day(&mut daily, &hourly);

    assert_eq!(daily.len(), 2);
    assert_eq!(daily[0].timestamp, utc_millis(16, 12, 1, 1, 1));
    assert_eq!(daily[0].min, Px::from_copper(8));
    assert_eq!(daily[1].timestamp, utc_millis(17, 12, 1, 1, 1));
    assert_eq!(daily[1].min, Px::from_copper(20));
}

#[rstest]
fn test_merge_keeps_identity_of_first_folded_point(adapter: HistoryQueryAdapter) {
    let mut daily = Vec::new();
    let mut first = hourly_point(17, 8, 10, 4);
    first.species = Some(PetSpeciesId::new(1155));
    let hourly = [first, hourly_point(17, 9, 6, 2)];

    adapter.merge_current_day(&mut daily, &hourly);

    assert_eq!(daily.len(), 1);
    assert_eq!(daily[0].species, Some(PetSpeciesId::new(1155)));
}

#[rstest]
fn test_summarize_recent_averages_only_the_window(adapter: HistoryQueryAdapter) {
    let mut row = MonthlyStatRow::new(identity(), date(15));
    // Inside a 14-day window ending 2020-03-17
    row.set_day(
        10,
        DaySlot {
            min: Px::from_copper(4),
            min_hour: 0,
            avg: Px::from_copper(10),
            max: Px::from_copper(12),
            min_quantity: Qty::from_units(1),
            avg_quantity: Qty::from_units(30),
            max_quantity: Qty::from_units(40),
        },
    );
    row.set_day(
        16,
        DaySlot {
            min: Px::from_copper(6),
            min_hour: 3,
            avg: Px::from_copper(20),
            max: Px::from_copper(25),
            min_quantity: Qty::from_units(2),
            avg_quantity: Qty::from_units(10),
            max_quantity: Qty::from_units(12),
        },
    );
    // Outside the window
    row.set_day(
        1,
        DaySlot {
            min: Px::from_copper(1),
            min_hour: 0,
            avg: Px::from_copper(900),
            max: Px::from_copper(900),
            min_quantity: Qty::from_units(1),
            avg_quantity: Qty::from_units(900),
            max_quantity: Qty::from_units(900),
        },
    );

    let now = utc_millis(17, 14, 30, 0, 0);
    let summaries = adapter.summarize_recent(&[row], now, 14);

    let stats = &summaries[&(ItemId::new(2770), None, BonusKey::empty())];
    assert_eq!(stats.days, 2);
    assert_eq!(stats.avg_price, Px::from_copper(15));
    assert_eq!(stats.avg_quantity, Qty::from_units(20));
}

#[rstest]
fn test_summarize_recent_with_no_rows_is_empty(adapter: HistoryQueryAdapter) {
    let summaries = adapter.summarize_recent(&[], utc_millis(17, 14, 30, 0, 0), 14);
    assert!(summaries.is_empty());
}
