//! Market Statistics Service
//!
//! Turns periodic auction-house snapshots into:
//! - A deduplicated live market view (per item, bonus variant and pet)
//! - Hour-of-day price and quantity rows (one row per identity per day)
//! - Day-of-month rollups compacted with min / decaying-average / max
//! - Chart-ready history points with a synthesized current-day overlay

pub mod aggregators;
pub mod catalog;
pub mod config;
pub mod identity;
pub mod storage;

use anyhow::Result;
use chrono::{Days, Months, NaiveDate};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use services_common::{AhId, ItemId, PetQualityId, PetSpeciesId, Px, Qty, Ts};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

// Re-export the aggregation surface
pub use aggregators::history::{DailyPricePoint, HourlyPricePoint, ItemStats};
pub use aggregators::listing::{AggregatedItem, ExternalMarketData, OrganizedAuctions};
pub use aggregators::{
    DailyRollupCompactor, HistoryQueryAdapter, HourlyStatAccumulator, ListingAggregator,
};
pub use catalog::{
    BonusCatalog, BonusMeta, ItemCatalog, ItemMeta, MemoryBonusCatalog, MemoryItemCatalog,
    MemoryPetCatalog, PetCatalog, PetEntry,
};
pub use config::{AggregatorConfig, HouseConfig};
pub use identity::{BonusKey, MarketKey, StatIdentity, StatLookup};
pub use storage::{
    Column, DailyUpsertBatch, DailyUpsertRow, DaySlot, HourSlot, HourlyStatRow, HourlyUpsertBatch,
    HourlyUpsertRow, MemoryStatsStore, MonthlyStatRow, StatsStore,
};

/// Battle-pet attributes carried by a caged-pet listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetAttributes {
    /// Pet species
    pub species: PetSpeciesId,
    /// Pet level (1-25)
    pub level: u8,
    /// Pet quality tier
    pub quality: PetQualityId,
}

/// One auction listing from a snapshot
///
/// `bid` and `buyout` are stack totals, not unit prices; every statistic
/// works on the derived unit prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionListing {
    /// Feed-assigned auction id
    pub auction_id: u64,
    /// Item id
    pub item: ItemId,
    /// Current bid for the whole stack
    pub bid: Px,
    /// Buyout for the whole stack
    pub buyout: Px,
    /// Units in the stack
    pub quantity: Qty,
    /// Item modifier bonus ids, unordered
    pub bonus_ids: Option<Vec<u32>>,
    /// Pet attributes when the listing is a caged pet
    pub pet: Option<PetAttributes>,
    /// Seller name; some feeds omit it
    #[serde(default)]
    pub owner: String,
    /// Seller's realm
    #[serde(default)]
    pub owner_realm: String,
}

impl AuctionListing {
    /// Buyout per unit, `None` when the listing has no quantity
    #[must_use]
    pub fn unit_buyout(&self) -> Option<Px> {
        self.buyout.per_unit(self.quantity)
    }

    /// Bid per unit, `None` when the listing has no quantity
    #[must_use]
    pub fn unit_bid(&self) -> Option<Px> {
        self.bid.per_unit(self.quantity)
    }
}

/// One auction-house snapshot as delivered by the fetch collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Auction house the snapshot belongs to
    pub ah: AhId,
    /// Feed-side modification timestamp, milliseconds UTC
    pub last_modified: Ts,
    /// Raw listings
    pub listings: Vec<AuctionListing>,
}

/// Counters from one snapshot ingest
#[derive(Debug, Clone, Copy, Serialize)]
pub struct IngestSummary {
    /// House the snapshot belonged to
    pub ah: AhId,
    /// Calendar day the snapshot fell on (UTC)
    pub day: NaiveDate,
    /// Hour-of-day the snapshot fell on
    pub hour: u8,
    /// Raw listings consumed
    pub listings: usize,
    /// Live-view buckets produced
    pub buckets: usize,
    /// Hourly rows upserted
    pub hourly_rows: usize,
}

/// Result of one retention sweep tick
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SweepOutcome {
    /// House that was swept
    pub ah: AhId,
    /// Rows strictly older than this day were deleted
    pub cutoff: NaiveDate,
    /// Hourly rows removed
    pub deleted: u64,
}

/// Service facade wiring the aggregators to the store and catalogs
///
/// State is partitioned by auction house. At most one ingest per house at a
/// time is the calling scheduler's contract; the locks here only keep the
/// shared maps coherent, they do not order writers.
pub struct MarketStatsService<S: StatsStore> {
    config: AggregatorConfig,
    organizer: ListingAggregator,
    accumulator: HourlyStatAccumulator,
    compactor: DailyRollupCompactor,
    history: HistoryQueryAdapter,
    store: Arc<RwLock<S>>,
    items: Box<dyn ItemCatalog>,
    bonuses: Box<dyn BonusCatalog>,
    pets: RwLock<Box<dyn PetCatalog>>,
    /// Latest live view per house, replaced wholesale on ingest
    current: RwLock<FxHashMap<AhId, Arc<OrganizedAuctions>>>,
    /// Third-party market data per house, used by subsequent ingests
    external: RwLock<FxHashMap<AhId, FxHashMap<ItemId, ExternalMarketData>>>,
}

impl<S: StatsStore> MarketStatsService<S> {
    /// Create a new service over a store and the read-only catalogs
    pub fn new(
        config: AggregatorConfig,
        store: S,
        items: Box<dyn ItemCatalog>,
        bonuses: Box<dyn BonusCatalog>,
        pets: Box<dyn PetCatalog>,
    ) -> Self {
        Self {
            config,
            organizer: ListingAggregator::new(),
            accumulator: HourlyStatAccumulator::new(),
            compactor: DailyRollupCompactor::new(),
            history: HistoryQueryAdapter::new(),
            store: Arc::new(RwLock::new(store)),
            items,
            bonuses,
            pets: RwLock::new(pets),
            current: RwLock::new(FxHashMap::default()),
            external: RwLock::new(FxHashMap::default()),
        }
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Ingest one snapshot: fold it into the hourly statistics and replace
    /// the house's live market view. On error the previous view stays
    /// authoritative.
    pub async fn ingest_snapshot(&self, snapshot: Snapshot) -> Result<IngestSummary> {
        let Snapshot {
            ah,
            last_modified,
            listings,
        } = snapshot;

        let batch = self.accumulator.accumulate(&listings, last_modified, ah);
        let day = batch.day;
        let hour = batch.hour;
        let hourly_rows = batch.len();
        if !batch.is_empty() {
            let mut store = self.store.write().await;
            store.upsert_hourly(&batch).await?;
        }

        let stats = self.recent_stats(ah, last_modified).await?;

        let organized = {
            let external = self.external.read().await;
            let mut pets = self.pets.write().await;
            self.organizer.organize(
                listings,
                external.get(&ah),
                Some(&stats),
                self.items.as_ref(),
                self.bonuses.as_ref(),
                &mut **pets,
            )?
        };

        let buckets = organized.grouped.len();
        let listing_count = organized.listings.len();
        self.current.write().await.insert(ah, Arc::new(organized));

        info!(
            ah = %ah,
            %day,
            hour,
            listings = listing_count,
            buckets,
            hourly_rows,
            "ingested snapshot"
        );

        Ok(IngestSummary {
            ah,
            day,
            hour,
            listings: listing_count,
            buckets,
            hourly_rows,
        })
    }

    /// The live market view of one house from its latest ingest
    pub async fn current_auctions(&self, ah: AhId) -> Option<Arc<OrganizedAuctions>> {
        self.current.read().await.get(&ah).cloned()
    }

    /// Replace the third-party market data picked up by the next ingest
    /// for one house
    pub async fn set_external(&self, ah: AhId, data: FxHashMap<ItemId, ExternalMarketData>) {
        self.external.write().await.insert(ah, data);
    }

    /// Per-identity summary of the trailing daily history; annotates the
    /// live view and is queryable on its own
    pub async fn recent_stats(
        &self,
        ah: AhId,
        now: Ts,
    ) -> Result<FxHashMap<StatLookup, ItemStats>> {
        let today = now.to_datetime().date_naive();
        let months = window_months(today, self.config.stats_window_days);
        let rows = {
            let store = self.store.read().await;
            store.monthly_rows(ah, &months).await?
        };
        Ok(self
            .history
            .summarize_recent(&rows, now, self.config.stats_window_days))
    }

    /// Hourly price points of one identity over the configured window
    pub async fn hourly_history(
        &self,
        ah: AhId,
        item: ItemId,
        species: Option<PetSpeciesId>,
        bonus: &BonusKey,
        now: Ts,
    ) -> Result<Vec<HourlyPricePoint>> {
        let since = self.hourly_since(now);
        let rows = {
            let store = self.store.read().await;
            store.hourly_history(ah, item, species, bonus, since).await?
        };
        Ok(self.history.expand_hourly(&rows))
    }

    /// Daily price points of one identity, with the current day synthesized
    /// from hourly rows not yet compacted
    pub async fn daily_history(
        &self,
        ah: AhId,
        item: ItemId,
        species: Option<PetSpeciesId>,
        bonus: &BonusKey,
        now: Ts,
    ) -> Result<Vec<DailyPricePoint>> {
        let since = self.hourly_since(now);
        let (daily_rows, hourly_rows) = {
            let store = self.store.read().await;
            let daily = store.daily_history(ah, item, species, bonus).await?;
            let hourly = store.hourly_history(ah, item, species, bonus, since).await?;
            (daily, hourly)
        };

        let mut points = self.history.expand_daily(&daily_rows);
        let hourly_points = self.history.expand_hourly(&hourly_rows);
        self.history.merge_current_day(&mut points, &hourly_points);
        Ok(points)
    }

    /// Compact one completed day's hourly rows into the monthly table.
    /// The upsert replaces the day's seven fields, so re-running for the
    /// same day is safe. Returns the number of identities compacted.
    pub async fn compact_completed_day(&self, ah: AhId, day: NaiveDate) -> Result<usize> {
        let batch = {
            let store = self.store.read().await;
            self.compactor.compact_day(&*store, ah, day).await?
        };
        if batch.is_empty() {
            return Ok(0);
        }
        let compacted = batch.len();
        {
            let mut store = self.store.write().await;
            store.upsert_daily(&batch).await?;
        }
        info!(ah = %ah, %day, rows = compacted, "compacted day into monthly rows");
        Ok(compacted)
    }

    /// Run one retention sweep tick: the most overdue house gets its hourly
    /// rows older than its retention window deleted. One house per call.
    pub async fn sweep_retention(&self, now: Ts) -> Result<Option<SweepOutcome>> {
        let mut store = self.store.write().await;
        let Some(ah) = store.next_house_due_for_sweep().await? else {
            return Ok(None);
        };
        let max_age = self.config.retention_for(ah);
        let today = now.to_datetime().date_naive();
        let cutoff = today
            .checked_sub_days(Days::new(u64::from(max_age)))
            .unwrap_or(NaiveDate::MIN);
        let deleted = store.delete_hourly_before(ah, cutoff).await?;
        store.mark_swept(ah, now).await?;
        info!(ah = %ah, %cutoff, deleted, "retention sweep");
        Ok(Some(SweepOutcome {
            ah,
            cutoff,
            deleted,
        }))
    }

    fn hourly_since(&self, now: Ts) -> NaiveDate {
        let today = now.to_datetime().date_naive();
        today
            .checked_sub_days(Days::new(u64::from(self.config.hourly_window_days)))
            .unwrap_or(NaiveDate::MIN)
    }
}

/// Month anchors covering a trailing window that ends today
fn window_months(today: NaiveDate, window_days: u32) -> Vec<NaiveDate> {
    let start = today
        .checked_sub_days(Days::new(u64::from(window_days)))
        .unwrap_or(today);
    let end = MonthlyStatRow::anchor_for(today);
    let mut anchor = MonthlyStatRow::anchor_for(start);

    let mut months = Vec::new();
    while anchor <= end {
        months.push(anchor);
        let Some(next) = anchor.checked_add_months(Months::new(1)) else {
            break;
        };
        anchor = next;
    }
    months
}
