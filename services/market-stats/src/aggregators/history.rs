//! History expansion for charting
//!
//! Persisted rows are hour/day slot arrays; charts want flat chronological
//! point lists. Daily points are timestamped 12:01:01.001 UTC of their day
//! so a downstream local-timezone rendering cannot drift the date. The
//! current (uncompacted) day is synthesized from hourly points on top of
//! the compacted dailies.

use crate::identity::{BonusKey, StatLookup};
use crate::storage::rows::{HourlyStatRow, MonthlyStatRow};
use chrono::{Datelike, Days, NaiveDate, Timelike};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use services_common::{PetSpeciesId, Px, Qty, Ts};

/// One populated hour-slot as a chart point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyPricePoint {
    /// Hour timestamp (UTC, on the hour)
    pub timestamp: Ts,
    /// Pet species of the identity, absent for items
    pub species: Option<PetSpeciesId>,
    /// Bonus key of the identity
    pub bonus: BonusKey,
    /// Lowest unit price of the hour
    pub min: Px,
    /// Total quantity of the hour
    pub quantity: Qty,
}

/// One populated day-slot as a chart point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPricePoint {
    /// Midday-anchored timestamp (12:01:01.001 UTC)
    pub timestamp: Ts,
    /// Pet species of the identity, absent for items
    pub species: Option<PetSpeciesId>,
    /// Bonus key of the identity
    pub bonus: BonusKey,
    /// Lowest price of the day
    pub min: Px,
    /// Hour-of-day of the minimum
    pub min_hour: u8,
    /// Lowest quantity of the day
    pub min_quantity: Qty,
    /// Decaying average price
    pub avg: Px,
    /// Decaying average quantity
    pub avg_quantity: Qty,
    /// Highest price of the day
    pub max: Px,
    /// Highest quantity of the day
    pub max_quantity: Qty,
}

/// Past-period summary for one statistics identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStats {
    /// Arithmetic mean of the stored daily averages in the window
    pub avg_price: Px,
    /// Arithmetic mean of the stored daily average quantities
    pub avg_quantity: Qty,
    /// Number of days with data inside the window
    pub days: u32,
}

/// Adapter from persisted rows to chart-ready point lists
#[derive(Debug, Default)]
pub struct HistoryQueryAdapter;

impl HistoryQueryAdapter {
    /// Create a new history adapter
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// One point per populated hour-slot, in row order then hour order
    #[must_use]
    pub fn expand_hourly(&self, rows: &[HourlyStatRow]) -> Vec<HourlyPricePoint> {
        let mut points = Vec::new();
        for row in rows {
            for (hour, slot) in row.populated() {
                if !slot.price.is_positive() {
                    continue;
                }
                let Some(timestamp) = hour_timestamp(row.day, hour) else {
                    continue;
                };
                points.push(HourlyPricePoint {
                    timestamp,
                    species: row.identity.species,
                    bonus: row.identity.bonus.clone(),
                    min: slot.price,
                    quantity: slot.quantity,
                });
            }
        }
        points
    }

    /// One point per populated day-slot, midday-anchored. Pure function of
    /// its input: expanding the same rows twice yields identical output.
    #[must_use]
    pub fn expand_daily(&self, rows: &[MonthlyStatRow]) -> Vec<DailyPricePoint> {
        let mut points = Vec::new();
        for row in rows {
            for (day_of_month, slot) in row.populated() {
                if !slot.min.is_positive() {
                    continue;
                }
                let Some(date) = NaiveDate::from_ymd_opt(
                    row.month.year(),
                    row.month.month(),
                    u32::from(day_of_month),
                ) else {
                    continue;
                };
                let Some(timestamp) = midday_anchor(date) else {
                    continue;
                };
                points.push(DailyPricePoint {
                    timestamp,
                    species: row.identity.species,
                    bonus: row.identity.bonus.clone(),
                    min: slot.min,
                    min_hour: slot.min_hour,
                    min_quantity: slot.min_quantity,
                    avg: slot.avg,
                    avg_quantity: slot.avg_quantity,
                    max: slot.max,
                    max_quantity: slot.max_quantity,
                });
            }
        }
        points
    }

    /// Overlay the not-yet-compacted day(s) onto compacted daily points.
    ///
    /// Cutoff is midnight UTC of the latest daily point's day; with no
    /// daily points at all every hourly point overlays. Hourly points
    /// strictly newer than the cutoff group by calendar day and fold with
    /// the daily rollup rules; identity fields come from the first point
    /// of each synthesized bucket. Synthesized buckets are appended, never
    /// replacing compacted ones.
    pub fn merge_current_day(
        &self,
        daily: &mut Vec<DailyPricePoint>,
        hourly: &[HourlyPricePoint],
    ) {
        let cutoff: Option<Ts> = daily.iter().map(|point| point.timestamp).max().map(day_start);

        let mut day_index: FxHashMap<NaiveDate, usize> = FxHashMap::default();
        for point in hourly {
            if cutoff.is_some_and(|cutoff| point.timestamp <= cutoff) {
                continue;
            }
            let datetime = point.timestamp.to_datetime();
            let date = datetime.date_naive();
            // Hour of day is 0-23
            #[allow(clippy::cast_possible_truncation)]
            let hour = datetime.hour() as u8;

            if let Some(&index) = day_index.get(&date) {
                let Some(bucket) = daily.get_mut(index) else {
                    continue;
                };
                if point.min < bucket.min {
                    bucket.min = point.min;
                    bucket.min_hour = hour;
                }
                if point.min > bucket.max {
                    bucket.max = point.min;
                }
                bucket.avg = bucket.avg.decayed(point.min);

                if point.quantity < bucket.min_quantity {
                    bucket.min_quantity = point.quantity;
                }
                if point.quantity > bucket.max_quantity {
                    bucket.max_quantity = point.quantity;
                }
                bucket.avg_quantity = bucket.avg_quantity.decayed(point.quantity);
            } else {
                let Some(timestamp) = midday_anchor(date) else {
                    continue;
                };
                daily.push(DailyPricePoint {
                    timestamp,
                    species: point.species,
                    bonus: point.bonus.clone(),
                    min: point.min,
                    min_hour: hour,
                    min_quantity: point.quantity,
                    avg: point.min,
                    avg_quantity: point.quantity,
                    max: point.min,
                    max_quantity: point.quantity,
                });
                day_index.insert(date, daily.len() - 1);
            }
        }
    }

    /// Arithmetic mean of the stored daily averages over the trailing
    /// window, per statistics identity. A mean of stored decayed values;
    /// the decaying rule itself lives in the daily compactor.
    #[must_use]
    pub fn summarize_recent(
        &self,
        rows: &[MonthlyStatRow],
        now: Ts,
        window_days: u32,
    ) -> FxHashMap<StatLookup, ItemStats> {
        let today = now.to_datetime().date_naive();
        let Some(since) = today.checked_sub_days(Days::new(u64::from(window_days))) else {
            return FxHashMap::default();
        };

        let mut folded: FxHashMap<StatLookup, (i64, i64, u32)> = FxHashMap::default();
        for row in rows {
            for (day_of_month, slot) in row.populated() {
                let Some(date) = NaiveDate::from_ymd_opt(
                    row.month.year(),
                    row.month.month(),
                    u32::from(day_of_month),
                ) else {
                    continue;
                };
                if date < since || date > today {
                    continue;
                }
                let entry = folded.entry(row.identity.stat_lookup()).or_insert((0, 0, 0));
                entry.0 += slot.avg.as_i64();
                entry.1 += slot.avg_quantity.as_i64();
                entry.2 += 1;
            }
        }

        folded
            .into_iter()
            .map(|(lookup, (price_sum, quantity_sum, days))| {
                let divisor = i64::from(days.max(1));
                (
                    lookup,
                    ItemStats {
                        avg_price: Px::from_i64(price_sum / divisor),
                        avg_quantity: Qty::from_i64(quantity_sum / divisor),
                        days,
                    },
                )
            })
            .collect()
    }
}

/// Midnight UTC of the timestamp's calendar day
fn day_start(ts: Ts) -> Ts {
    let date = ts.to_datetime().date_naive();
    date.and_hms_opt(0, 0, 0)
        .map_or(ts, |datetime| Ts::from_datetime(datetime.and_utc()))
}

/// 12:01:01.001 UTC of a calendar day
fn midday_anchor(date: NaiveDate) -> Option<Ts> {
    date.and_hms_milli_opt(12, 1, 1, 1)
        .map(|datetime| Ts::from_datetime(datetime.and_utc()))
}

/// Start of `hour` on `day`, UTC
fn hour_timestamp(day: NaiveDate, hour: u8) -> Option<Ts> {
    day.and_hms_opt(u32::from(hour), 0, 0)
        .map(|datetime| Ts::from_datetime(datetime.and_utc()))
}
