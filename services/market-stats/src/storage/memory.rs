//! In-memory statistics store
//!
//! Reference implementation of [`StatsStore`] used by the binary, the
//! tests and the benchmarks. Reads return rows in a deterministic order
//! (day, then identity) so callers and tests see stable output.

use crate::identity::{BonusKey, StatIdentity};
use crate::storage::rows::{
    DailyUpsertBatch, HourSlot, HourlyStatRow, HourlyUpsertBatch, MonthlyStatRow,
};
use crate::storage::StatsStore;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use services_common::{AhId, ItemId, PetSpeciesId, Ts};

/// FxHashMap-backed statistics store
#[derive(Debug, Default)]
pub struct MemoryStatsStore {
    hourly: FxHashMap<(StatIdentity, NaiveDate), HourlyStatRow>,
    monthly: FxHashMap<(StatIdentity, NaiveDate), MonthlyStatRow>,
    swept: FxHashMap<AhId, Ts>,
}

impl MemoryStatsStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of hourly rows held
    #[must_use]
    pub fn hourly_row_count(&self) -> usize {
        self.hourly.len()
    }

    /// Number of monthly rows held
    #[must_use]
    pub fn monthly_row_count(&self) -> usize {
        self.monthly.len()
    }

    fn identity_sort_key(identity: &StatIdentity) -> (u32, i64, Vec<u32>) {
        (
            identity.item.0,
            identity.species_column_value(),
            identity.bonus.ids().to_vec(),
        )
    }

    fn known_houses(&self) -> Vec<AhId> {
        let mut houses: Vec<AhId> = self
            .hourly
            .keys()
            .map(|(identity, _)| identity.ah)
            .chain(self.monthly.keys().map(|(identity, _)| identity.ah))
            .chain(self.swept.keys().copied())
            .collect();
        houses.sort_unstable();
        houses.dedup();
        houses
    }
}

#[async_trait]
impl StatsStore for MemoryStatsStore {
    async fn upsert_hourly(&mut self, batch: &HourlyUpsertBatch) -> Result<()> {
        for row in &batch.rows {
            let entry = self
                .hourly
                .entry((row.identity.clone(), batch.day))
                .or_insert_with(|| HourlyStatRow::new(row.identity.clone(), batch.day));
            entry.set_hour(
                batch.hour,
                HourSlot {
                    price: row.price,
                    quantity: row.quantity,
                },
            );
        }
        Ok(())
    }

    async fn upsert_daily(&mut self, batch: &DailyUpsertBatch) -> Result<()> {
        for row in &batch.rows {
            let entry = self
                .monthly
                .entry((row.identity.clone(), batch.month))
                .or_insert_with(|| MonthlyStatRow::new(row.identity.clone(), batch.month));
            entry.set_day(batch.day_of_month, row.slot);
        }
        Ok(())
    }

    async fn hourly_rows_for_day(&self, ah: AhId, day: NaiveDate) -> Result<Vec<HourlyStatRow>> {
        let mut rows: Vec<HourlyStatRow> = self
            .hourly
            .values()
            .filter(|row| row.identity.ah == ah && row.day == day)
            .cloned()
            .collect();
        rows.sort_by_key(|row| Self::identity_sort_key(&row.identity));
        Ok(rows)
    }

    async fn hourly_history(
        &self,
        ah: AhId,
        item: ItemId,
        species: Option<PetSpeciesId>,
        bonus: &BonusKey,
        since: NaiveDate,
    ) -> Result<Vec<HourlyStatRow>> {
        let mut rows: Vec<HourlyStatRow> = self
            .hourly
            .values()
            .filter(|row| {
                row.identity.ah == ah
                    && row.identity.item == item
                    && row.identity.species == species
                    && row.identity.bonus == *bonus
                    && row.day >= since
            })
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.day);
        Ok(rows)
    }

    async fn daily_history(
        &self,
        ah: AhId,
        item: ItemId,
        species: Option<PetSpeciesId>,
        bonus: &BonusKey,
    ) -> Result<Vec<MonthlyStatRow>> {
        let mut rows: Vec<MonthlyStatRow> = self
            .monthly
            .values()
            .filter(|row| {
                row.identity.ah == ah
                    && row.identity.item == item
                    && row.identity.species == species
                    && row.identity.bonus == *bonus
            })
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.month);
        Ok(rows)
    }

    async fn monthly_rows(&self, ah: AhId, months: &[NaiveDate]) -> Result<Vec<MonthlyStatRow>> {
        let mut rows: Vec<MonthlyStatRow> = self
            .monthly
            .values()
            .filter(|row| row.identity.ah == ah && months.contains(&row.month))
            .cloned()
            .collect();
        rows.sort_by_key(|row| (row.month, Self::identity_sort_key(&row.identity)));
        Ok(rows)
    }

    async fn next_house_due_for_sweep(&self) -> Result<Option<AhId>> {
        Ok(self
            .known_houses()
            .into_iter()
            .min_by_key(|ah| (self.swept.get(ah).copied().unwrap_or(Ts(0)), *ah)))
    }

    async fn delete_hourly_before(&mut self, ah: AhId, cutoff: NaiveDate) -> Result<u64> {
        let before = self.hourly.len();
        self.hourly
            .retain(|_, row| !(row.identity.ah == ah && row.day < cutoff));
        Ok((before - self.hourly.len()) as u64)
    }

    async fn mark_swept(&mut self, ah: AhId, at: Ts) -> Result<()> {
        self.swept.insert(ah, at);
        Ok(())
    }
}
