//! Persistence contract for market statistics
//!
//! The core never speaks SQL. It hands upsert batches to a [`StatsStore`]
//! and reads rows back; the in-tree [`MemoryStatsStore`] is the reference
//! implementation, a relational backend is an external collaborator honoring
//! the same trait.

pub mod columns;
pub mod memory;
pub mod rows;

use crate::identity::BonusKey;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use services_common::{AhId, ItemId, PetSpeciesId, Ts};

// Re-export commonly used types
pub use columns::Column;
pub use memory::MemoryStatsStore;
pub use rows::{
    DailyUpsertBatch, DailyUpsertRow, DaySlot, HourSlot, HourlyStatRow, HourlyUpsertBatch,
    HourlyUpsertRow, MonthlyStatRow,
};

/// Statistics store trait
///
/// Writers are serialized per auction house by the calling scheduler; the
/// trait does not guard against two concurrent upserts for the same house.
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Apply one hourly batch: per row, create the `(identity, day)` row if
    /// missing and replace exactly the two columns of `batch.hour`.
    async fn upsert_hourly(&mut self, batch: &HourlyUpsertBatch) -> Result<()>;

    /// Apply one daily batch: per row, create the `(identity, month)` row if
    /// missing and replace exactly the seven fields of `batch.day_of_month`.
    async fn upsert_daily(&mut self, batch: &DailyUpsertBatch) -> Result<()>;

    /// Every hourly row of one house for one calendar day
    async fn hourly_rows_for_day(&self, ah: AhId, day: NaiveDate) -> Result<Vec<HourlyStatRow>>;

    /// Hourly rows of one identity on or after `since`, ascending by day
    async fn hourly_history(
        &self,
        ah: AhId,
        item: ItemId,
        species: Option<PetSpeciesId>,
        bonus: &BonusKey,
        since: NaiveDate,
    ) -> Result<Vec<HourlyStatRow>>;

    /// Monthly rows of one identity, ascending by month anchor
    async fn daily_history(
        &self,
        ah: AhId,
        item: ItemId,
        species: Option<PetSpeciesId>,
        bonus: &BonusKey,
    ) -> Result<Vec<MonthlyStatRow>>;

    /// Every monthly row of one house for the given month anchors
    async fn monthly_rows(&self, ah: AhId, months: &[NaiveDate]) -> Result<Vec<MonthlyStatRow>>;

    /// The house whose retention sweep is most overdue (never-swept houses
    /// first), `None` when no house is known
    async fn next_house_due_for_sweep(&self) -> Result<Option<AhId>>;

    /// Delete hourly rows of one house older than `cutoff` (exclusive).
    /// Returns the number of rows removed.
    async fn delete_hourly_before(&mut self, ah: AhId, cutoff: NaiveDate) -> Result<u64>;

    /// Record that a house's sweep ran at `at`
    async fn mark_swept(&mut self, ah: AhId, at: Ts) -> Result<()>;
}
