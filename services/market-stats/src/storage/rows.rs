//! Persisted statistics row shapes
//!
//! Hour and day slots are fixed-size arrays addressed by integer index.
//! Rendering to the external zero-padded column names happens only in
//! [`crate::storage::columns`]; nothing in here touches column strings.

use crate::identity::StatIdentity;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use services_common::constants::time::{DAYS_PER_MONTH_TABLE, HOURS_PER_DAY, MONTH_ANCHOR_DAY};
use services_common::{Px, Qty};

/// One hour's observation for one statistics identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourSlot {
    /// Lowest unit price observed this hour
    pub price: Px,
    /// Total units listed this hour
    pub quantity: Qty,
}

/// One identity's price/quantity track for one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyStatRow {
    /// Row identity
    pub identity: StatIdentity,
    /// Calendar day (UTC)
    pub day: NaiveDate,
    /// Hour-of-day slots, `None` = no observation that hour
    pub hours: [Option<HourSlot>; HOURS_PER_DAY],
}

impl HourlyStatRow {
    /// Empty row for an identity and day
    #[must_use]
    pub const fn new(identity: StatIdentity, day: NaiveDate) -> Self {
        Self {
            identity,
            day,
            hours: [None; HOURS_PER_DAY],
        }
    }

    /// Replace exactly one hour's slot, leaving the other 23 untouched.
    /// Out-of-range hours are ignored.
    pub fn set_hour(&mut self, hour: u8, slot: HourSlot) {
        if let Some(entry) = self.hours.get_mut(usize::from(hour)) {
            *entry = Some(slot);
        }
    }

    /// The slot for one hour, if populated
    #[must_use]
    pub fn hour(&self, hour: u8) -> Option<&HourSlot> {
        self.hours.get(usize::from(hour))?.as_ref()
    }

    /// Populated slots in hour order
    pub fn populated(&self) -> impl Iterator<Item = (u8, &HourSlot)> {
        self.hours.iter().enumerate().filter_map(|(hour, slot)| {
            // Index is bounded by the array length of 24
            #[allow(clippy::cast_possible_truncation)]
            slot.as_ref().map(|slot| (hour as u8, slot))
        })
    }

    /// Whether any hour holds an observation
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hours.iter().all(Option::is_none)
    }
}

/// One day's compacted statistics for one identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySlot {
    /// Lowest hourly price of the day
    pub min: Px,
    /// Hour-of-day the minimum was observed
    pub min_hour: u8,
    /// Decaying average price, fold order = hour order
    pub avg: Px,
    /// Highest hourly price of the day
    pub max: Px,
    /// Lowest hourly quantity of the day
    pub min_quantity: Qty,
    /// Decaying average quantity
    pub avg_quantity: Qty,
    /// Highest hourly quantity of the day
    pub max_quantity: Qty,
}

/// One identity's compacted day track for one calendar month
///
/// The month is anchored to day 15 so every row of a month shares one date
/// key regardless of which day wrote it first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyStatRow {
    /// Row identity
    pub identity: StatIdentity,
    /// Month anchor date (day 15, UTC)
    pub month: NaiveDate,
    /// Day-of-month slots, index = day - 1, `None` = day not compacted
    pub days: [Option<DaySlot>; DAYS_PER_MONTH_TABLE],
}

impl MonthlyStatRow {
    /// Empty row for an identity and month (any date in the month works,
    /// the anchor is derived)
    #[must_use]
    pub fn new(identity: StatIdentity, month: NaiveDate) -> Self {
        Self {
            identity,
            month: Self::anchor_for(month),
            days: [None; DAYS_PER_MONTH_TABLE],
        }
    }

    /// The anchor date (day 15) of the month containing `day`
    #[must_use]
    pub fn anchor_for(day: NaiveDate) -> NaiveDate {
        NaiveDate::from_ymd_opt(day.year(), day.month(), MONTH_ANCHOR_DAY).unwrap_or(day)
    }

    /// Replace exactly one day's slot (1-based day of month), leaving the
    /// other 30 untouched. Out-of-range days are ignored.
    pub fn set_day(&mut self, day_of_month: u8, slot: DaySlot) {
        if day_of_month == 0 {
            return;
        }
        if let Some(entry) = self.days.get_mut(usize::from(day_of_month) - 1) {
            *entry = Some(slot);
        }
    }

    /// The slot for one day of month (1-based), if populated
    #[must_use]
    pub fn day(&self, day_of_month: u8) -> Option<&DaySlot> {
        if day_of_month == 0 {
            return None;
        }
        self.days.get(usize::from(day_of_month) - 1)?.as_ref()
    }

    /// Populated slots as (1-based day of month, slot) in day order
    pub fn populated(&self) -> impl Iterator<Item = (u8, &DaySlot)> {
        self.days.iter().enumerate().filter_map(|(index, slot)| {
            // Index is bounded by the array length of 31
            #[allow(clippy::cast_possible_truncation)]
            slot.as_ref().map(|slot| (index as u8 + 1, slot))
        })
    }
}

/// One identity's contribution to an hourly upsert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyUpsertRow {
    /// Row identity
    pub identity: StatIdentity,
    /// Lowest unit price in the batch
    pub price: Px,
    /// Summed quantity in the batch
    pub quantity: Qty,
}

/// Insert-or-update payload for one snapshot hour
///
/// The store must touch exactly the two columns of `hour` per row:
/// existing rows keep their other 23 slots, missing rows are created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyUpsertBatch {
    /// Calendar day the snapshot belongs to (UTC)
    pub day: NaiveDate,
    /// Hour-of-day the snapshot belongs to (0-23)
    pub hour: u8,
    /// One row per distinct identity in the snapshot
    pub rows: Vec<HourlyUpsertRow>,
}

impl HourlyUpsertBatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// One identity's contribution to a daily upsert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyUpsertRow {
    /// Row identity
    pub identity: StatIdentity,
    /// Compacted slot for the batch day
    pub slot: DaySlot,
}

/// Insert-or-update payload for one compacted day
///
/// The store must touch exactly the seven fields of `day_of_month` per row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyUpsertBatch {
    /// Month anchor date (day 15) of the compacted day's month
    pub month: NaiveDate,
    /// Day of month being written (1-31)
    pub day_of_month: u8,
    /// One row per identity that had observations that day
    pub rows: Vec<DailyUpsertRow>,
}

impl DailyUpsertBatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}
