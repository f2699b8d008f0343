//! Comprehensive tests for daily rollup compaction

use anyhow::Result;
use chrono::NaiveDate;
use market_stats::{
    BonusKey, DailyRollupCompactor, HourSlot, HourlyStatRow, HourlyUpsertBatch, HourlyUpsertRow,
    MemoryStatsStore, StatIdentity, StatsStore,
};
use pretty_assertions::assert_eq;
use rstest::*;
use services_common::{AhId, ItemId, Px, Qty};

/// Test fixture for the compactor under test
#[fixture]
fn compactor() -> DailyRollupCompactor {
    DailyRollupCompactor::new()
}

fn identity(item: u32) -> StatIdentity {
    StatIdentity {
        ah: AhId::new(69),
        item: ItemId::new(item),
        species: None,
        bonus: BonusKey::empty(),
    }
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 3, 17).unwrap()
}

fn row_with_hours(hours: &[(u8, i64, i64)]) -> HourlyStatRow {
    let mut row = HourlyStatRow::new(identity(2770), day());
    for &(hour, price, quantity) in hours {
        row.set_hour(
            hour,
            HourSlot {
                price: Px::from_copper(price),
                quantity: Qty::from_units(quantity),
            },
        );
    }
    row
}

#[rstest]
fn test_sparse_day_compacts_with_decaying_average(compactor: DailyRollupCompactor) {
    // Hours 0, 2, 4 with prices 10, 6, 9: avg folds as ((10+6)/2 + 9)/2
    let slot = compactor
        .compact_row(&row_with_hours(&[(0, 10, 4), (2, 6, 2), (4, 9, 8)]))
        .unwrap();

    assert_eq!(slot.min, Px::from_copper(6));
    assert_eq!(slot.min_hour, 2);
    assert_eq!(slot.max, Px::from_copper(10));
    assert_eq!(slot.avg, Px::from_i64(8_5000));

    assert_eq!(slot.min_quantity, Qty::from_units(2));
    assert_eq!(slot.max_quantity, Qty::from_units(8));
    assert_eq!(slot.avg_quantity, Qty::from_i64(5_5000));
}

#[rstest]
fn test_fold_order_is_observable(compactor: DailyRollupCompactor) {
    // Same three prices, different hour placement: late hours weigh more
    let ascending = compactor
        .compact_row(&row_with_hours(&[(0, 6, 1), (2, 9, 1), (4, 10, 1)]))
        .unwrap();
    let descending = compactor
        .compact_row(&row_with_hours(&[(0, 10, 1), (2, 9, 1), (4, 6, 1)]))
        .unwrap();

    assert_eq!(ascending.avg, Px::from_i64(8_7500));
    assert_eq!(descending.avg, Px::from_i64(7_7500));
    assert_eq!(ascending.min, descending.min);
    assert_eq!(ascending.max, descending.max);
}

#[rstest]
fn test_single_hour_day_is_its_own_average(compactor: DailyRollupCompactor) {
    let slot = compactor
        .compact_row(&row_with_hours(&[(7, 42, 3)]))
        .unwrap();

    assert_eq!(slot.min, Px::from_copper(42));
    assert_eq!(slot.min_hour, 7);
    assert_eq!(slot.avg, Px::from_copper(42));
    assert_eq!(slot.max, Px::from_copper(42));
}

#[rstest]
fn test_zero_price_hours_contribute_nothing(compactor: DailyRollupCompactor) {
    // The zero-price hour neither seeds nor skews the fold
    let slot = compactor
        .compact_row(&row_with_hours(&[(0, 0, 9), (5, 12, 2)]))
        .unwrap();
    assert_eq!(slot.min, Px::from_copper(12));
    assert_eq!(slot.min_hour, 5);
    assert_eq!(slot.avg_quantity, Qty::from_units(2));

    assert!(compactor
        .compact_row(&row_with_hours(&[(0, 0, 9), (5, 0, 2)]))
        .is_none());
    assert!(compactor.compact_row(&row_with_hours(&[])).is_none());
}

#[rstest]
#[tokio::test]
async fn test_compact_day_builds_month_anchored_batch(
    compactor: DailyRollupCompactor,
) -> Result<()> {
    let mut store = MemoryStatsStore::new();
    for (hour, price, quantity) in [(0u8, 10i64, 4i64), (2, 6, 2), (4, 9, 8)] {
        store
            .upsert_hourly(&HourlyUpsertBatch {
                day: day(),
                hour,
                rows: vec![HourlyUpsertRow {
                    identity: identity(2770),
                    price: Px::from_copper(price),
                    quantity: Qty::from_units(quantity),
                }],
            })
            .await?;
    }

    let batch = compactor.compact_day(&store, AhId::new(69), day()).await?;

    assert_eq!(batch.month, NaiveDate::from_ymd_opt(2020, 3, 15).unwrap());
    assert_eq!(batch.day_of_month, 17);
    assert_eq!(batch.rows.len(), 1);
    assert_eq!(batch.rows[0].identity, identity(2770));
    assert_eq!(batch.rows[0].slot.avg, Px::from_i64(8_5000));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn test_compact_day_drops_identities_without_signal(
    compactor: DailyRollupCompactor,
) -> Result<()> {
    let mut store = MemoryStatsStore::new();
    store
        .upsert_hourly(&HourlyUpsertBatch {
            day: day(),
            hour: 9,
            rows: vec![
                HourlyUpsertRow {
                    identity: identity(2770),
                    price: Px::from_copper(25),
                    quantity: Qty::from_units(1),
                },
                HourlyUpsertRow {
                    identity: identity(4306),
                    price: Px::ZERO,
                    quantity: Qty::from_units(50),
                },
            ],
        })
        .await?;

    let batch = compactor.compact_day(&store, AhId::new(69), day()).await?;

    assert_eq!(batch.rows.len(), 1);
    assert_eq!(batch.rows[0].identity, identity(2770));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn test_compact_day_with_no_rows_is_empty(compactor: DailyRollupCompactor) -> Result<()> {
    let store = MemoryStatsStore::new();
    let batch = compactor.compact_day(&store, AhId::new(69), day()).await?;
    assert!(batch.is_empty());
    assert_eq!(batch.day_of_month, 17);
    Ok(())
}
