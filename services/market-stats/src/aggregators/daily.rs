//! Daily rollup compaction
//!
//! A finished day's 24 hour-slots compact into one day-slot of the monthly
//! row. The average is a decaying running average, `avg = (avg + new) / 2`
//! folded in hour order: late hours weigh more, and the fold order is part
//! of the observable behavior. It is not an arithmetic mean and must not
//! become one.

use crate::storage::rows::{DailyUpsertBatch, DailyUpsertRow, DaySlot, HourlyStatRow, MonthlyStatRow};
use crate::storage::StatsStore;
use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use services_common::AhId;
use tracing::debug;

/// Compactor folding hourly rows into monthly day-slots
#[derive(Debug, Default)]
pub struct DailyRollupCompactor;

impl DailyRollupCompactor {
    /// Create a new daily compactor
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Fold one hourly row's populated slots, in hour order, into a day
    /// slot. Hours without a positive price contribute nothing. Returns
    /// `None` when no hour qualifies.
    #[must_use]
    pub fn compact_row(&self, row: &HourlyStatRow) -> Option<DaySlot> {
        let mut compacted: Option<DaySlot> = None;
        for (hour, slot) in row.populated() {
            if !slot.price.is_positive() {
                continue;
            }
            match &mut compacted {
                None => {
                    compacted = Some(DaySlot {
                        min: slot.price,
                        min_hour: hour,
                        avg: slot.price,
                        max: slot.price,
                        min_quantity: slot.quantity,
                        avg_quantity: slot.quantity,
                        max_quantity: slot.quantity,
                    });
                }
                Some(day) => {
                    if slot.price < day.min {
                        day.min = slot.price;
                        day.min_hour = hour;
                    }
                    if slot.price > day.max {
                        day.max = slot.price;
                    }
                    day.avg = day.avg.decayed(slot.price);

                    if slot.quantity < day.min_quantity {
                        day.min_quantity = slot.quantity;
                    }
                    if slot.quantity > day.max_quantity {
                        day.max_quantity = slot.quantity;
                    }
                    day.avg_quantity = day.avg_quantity.decayed(slot.quantity);
                }
            }
        }
        compacted
    }

    /// Load a completed day's hourly rows from the store and compact each
    /// into the monthly upsert batch for that day of month. Does not write;
    /// the caller applies the batch.
    pub async fn compact_day(
        &self,
        store: &dyn StatsStore,
        ah: AhId,
        day: NaiveDate,
    ) -> Result<DailyUpsertBatch> {
        let hourly_rows = store.hourly_rows_for_day(ah, day).await?;

        let rows: Vec<DailyUpsertRow> = hourly_rows
            .iter()
            .filter_map(|row| {
                self.compact_row(row).map(|slot| DailyUpsertRow {
                    identity: row.identity.clone(),
                    slot,
                })
            })
            .collect();

        debug!(
            rows = rows.len(),
            hourly_rows = hourly_rows.len(),
            ah = %ah,
            %day,
            "compacted day"
        );

        // Day of month is 1-31
        #[allow(clippy::cast_possible_truncation)]
        let day_of_month = day.day() as u8;

        Ok(DailyUpsertBatch {
            month: MonthlyStatRow::anchor_for(day),
            day_of_month,
            rows,
        })
    }
}
