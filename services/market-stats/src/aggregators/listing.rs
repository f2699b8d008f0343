//! Live market view aggregation
//!
//! One snapshot of raw listings becomes one deduplicated per-item /
//! per-pet view. Each refresh replaces the previous view wholesale; no
//! state survives between calls except the pet catalog back-references,
//! which are cleared on entry.

use crate::aggregators::history::ItemStats;
use crate::catalog::{BonusCatalog, ItemCatalog, PetCatalog};
use crate::identity::{MarketKey, StatLookup};
use crate::AuctionListing;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use services_common::{ItemId, Px, Qty, StatsError};
use std::fmt::Write as _;
use tracing::debug;

/// Third-party market data for one item id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalMarketData {
    /// Region-wide market value per unit
    pub market_value: Px,
    /// Sale-rate fraction, fixed-point 4 decimals (10000 = 100%)
    pub region_sale_rate: i32,
    /// Average units sold per day across the region
    pub region_avg_daily_sold: Qty,
    /// Average realized sale price per unit across the region
    pub region_sale_avg: Px,
}

/// One bucket of the live market view
///
/// Ephemeral: owned by the caller of the refresh that produced it and
/// superseded wholesale by the next refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedItem {
    /// Canonical key of this bucket
    pub key: MarketKey,
    /// Resolved display name
    pub name: String,
    /// Quality tier after bonus overrides
    pub quality: u8,
    /// Item level after bonus deltas
    pub item_level: u16,
    /// Representative unit buyout
    pub buyout: Px,
    /// Representative unit bid
    pub bid: Px,
    /// Total units across contributing listings
    pub quantity_total: Qty,
    /// Seller of the representative listing
    pub owner: String,
    /// Seller's realm
    pub owner_realm: String,
    /// Vendor sell price per unit from the catalog
    pub vendor_sell: Px,
    /// Contributing listings, ascending by unit buyout after finalization
    pub listings: Vec<AuctionListing>,
    /// Third-party market data for the item, when tracked
    pub external: Option<ExternalMarketData>,
    /// Past-period price summary, when history exists
    pub stats: Option<ItemStats>,
}

/// Result of one aggregation refresh
#[derive(Debug, Clone, Default)]
pub struct OrganizedAuctions {
    /// Buckets by canonical key
    pub grouped: FxHashMap<MarketKey, AggregatedItem>,
    /// Bucket creation order
    pub ordered: Vec<MarketKey>,
    /// The raw listings the refresh consumed
    pub listings: Vec<AuctionListing>,
}

impl OrganizedAuctions {
    /// Buckets in creation order
    pub fn iter_ordered(&self) -> impl Iterator<Item = &AggregatedItem> {
        self.ordered.iter().filter_map(|key| self.grouped.get(key))
    }
}

/// Aggregator for the live market view
#[derive(Debug, Default)]
pub struct ListingAggregator;

impl ListingAggregator {
    /// Create a new listing aggregator
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Organize one snapshot's listings into the live market view.
    ///
    /// Synchronous and single-threaded; the caller must not start a second
    /// refresh before this one returns. Listings with zero quantity carry
    /// no unit price and are dropped on entry; they join no bucket and do
    /// not suppress placeholder synthesis. On error the caller keeps its
    /// previous view, nothing is partially published.
    #[allow(clippy::too_many_arguments)]
    pub fn organize(
        &self,
        listings: Vec<AuctionListing>,
        external: Option<&FxHashMap<ItemId, ExternalMarketData>>,
        stats: Option<&FxHashMap<StatLookup, ItemStats>>,
        items: &dyn ItemCatalog,
        bonuses: &dyn BonusCatalog,
        pets: &mut dyn PetCatalog,
    ) -> Result<OrganizedAuctions, StatsError> {
        pets.clear_back_refs();

        let mut grouped: FxHashMap<MarketKey, AggregatedItem> = FxHashMap::default();
        let mut ordered: Vec<MarketKey> = Vec::new();
        let mut seen_items: FxHashSet<ItemId> = FxHashSet::default();

        for listing in &listings {
            if !listing.quantity.is_positive() {
                continue;
            }
            Self::process_listing(
                listing,
                &mut grouped,
                &mut ordered,
                external,
                stats,
                items,
                bonuses,
                pets,
            );
            seen_items.insert(listing.item);
        }

        // Items the external feed tracks but nobody lists still get a row,
        // appended in ascending item order.
        if let Some(external_map) = external {
            let mut missing: Vec<ItemId> = external_map
                .keys()
                .filter(|item| !seen_items.contains(item))
                .copied()
                .collect();
            missing.sort_unstable();
            for item in missing {
                let key = MarketKey::bare_item(item);
                let bucket =
                    Self::new_bucket(key.clone(), None, external, stats, items, bonuses, pets);
                grouped.insert(key.clone(), bucket);
                ordered.push(key);
            }
        }

        for key in &ordered {
            let Some(bucket) = grouped.get_mut(key) else {
                return Err(StatsError::Internal(format!(
                    "bucket index out of sync for key {key}"
                )));
            };
            Self::finalize_bucket(bucket);
        }

        debug!(
            buckets = ordered.len(),
            listings = listings.len(),
            "organized snapshot"
        );

        Ok(OrganizedAuctions {
            grouped,
            ordered,
            listings,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn process_listing(
        listing: &AuctionListing,
        grouped: &mut FxHashMap<MarketKey, AggregatedItem>,
        ordered: &mut Vec<MarketKey>,
        external: Option<&FxHashMap<ItemId, ExternalMarketData>>,
        stats: Option<&FxHashMap<StatLookup, ItemStats>>,
        items: &dyn ItemCatalog,
        bonuses: &dyn BonusCatalog,
        pets: &mut dyn PetCatalog,
    ) {
        match &listing.pet {
            Some(pet) => {
                let key = MarketKey::pet(listing.item, pet);
                Self::upsert_bucket(
                    key, listing, grouped, ordered, external, stats, items, bonuses, pets,
                );
                pets.attach(pet.species, listing.clone());
            }
            None => {
                let has_bonuses = listing
                    .bonus_ids
                    .as_deref()
                    .is_some_and(|ids| !ids.is_empty());
                if has_bonuses {
                    let key = MarketKey::from_listing(listing);
                    Self::upsert_bucket(
                        key, listing, grouped, ordered, external, stats, items, bonuses, pets,
                    );
                }
                // A modified item also counts toward its base item's market
                let bare = MarketKey::bare_item(listing.item);
                Self::upsert_bucket(
                    bare, listing, grouped, ordered, external, stats, items, bonuses, pets,
                );
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn upsert_bucket(
        key: MarketKey,
        listing: &AuctionListing,
        grouped: &mut FxHashMap<MarketKey, AggregatedItem>,
        ordered: &mut Vec<MarketKey>,
        external: Option<&FxHashMap<ItemId, ExternalMarketData>>,
        stats: Option<&FxHashMap<StatLookup, ItemStats>>,
        items: &dyn ItemCatalog,
        bonuses: &dyn BonusCatalog,
        pets: &dyn PetCatalog,
    ) {
        if let Some(bucket) = grouped.get_mut(&key) {
            Self::fold_into(bucket, listing);
        } else {
            let bucket = Self::new_bucket(
                key.clone(),
                Some(listing),
                external,
                stats,
                items,
                bonuses,
                pets,
            );
            grouped.insert(key.clone(), bucket);
            ordered.push(key);
        }
    }

    /// Fold one more listing into an existing bucket. The buyout moves only
    /// downward (or claims an unset slot), and the representative owner
    /// follows it; bid independently follows the same rule. Quantity and
    /// the listing list always grow.
    fn fold_into(bucket: &mut AggregatedItem, listing: &AuctionListing) {
        let unit_buyout = listing.unit_buyout().unwrap_or(Px::ZERO);
        if bucket.buyout == Px::ZERO || (unit_buyout.is_positive() && unit_buyout < bucket.buyout) {
            bucket.owner.clone_from(&listing.owner);
            bucket.owner_realm.clone_from(&listing.owner_realm);
            bucket.buyout = unit_buyout;
        }

        let unit_bid = listing.unit_bid().unwrap_or(Px::ZERO);
        if bucket.bid == Px::ZERO || (unit_bid.is_positive() && unit_bid < bucket.bid) {
            bucket.bid = unit_bid;
        }

        bucket.quantity_total = bucket.quantity_total.add(listing.quantity);
        bucket.listings.push(listing.clone());
    }

    /// Build a fresh bucket. `listing` is `None` for the zero-listing
    /// placeholders synthesized from the external feed.
    fn new_bucket(
        key: MarketKey,
        listing: Option<&AuctionListing>,
        external: Option<&FxHashMap<ItemId, ExternalMarketData>>,
        stats: Option<&FxHashMap<StatLookup, ItemStats>>,
        items: &dyn ItemCatalog,
        bonuses: &dyn BonusCatalog,
        pets: &dyn PetCatalog,
    ) -> AggregatedItem {
        let item_id = key.item_id();
        let meta = items.meta(item_id);
        let bonus_ids: &[u32] = listing
            .and_then(|l| l.bonus_ids.as_deref())
            .unwrap_or_default();

        let mut quality = meta.map_or(0, |m| m.quality);
        let mut item_level = i32::from(meta.map_or(0, |m| m.item_level));
        if !key.is_pet() {
            for id in bonus_ids {
                let Some(bonus) = bonuses.meta(*id) else {
                    continue;
                };
                if let Some(delta) = bonus.level_delta {
                    item_level += i32::from(delta);
                }
                if let Some(override_quality) = bonus.quality_override {
                    quality = override_quality;
                }
            }
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let item_level = item_level.clamp(0, i32::from(u16::MAX)) as u16;

        AggregatedItem {
            name: Self::resolve_name(&key, meta.map(|m| m.name.as_str()), bonus_ids, bonuses, pets),
            quality,
            item_level,
            buyout: listing.and_then(AuctionListing::unit_buyout).unwrap_or(Px::ZERO),
            bid: listing.and_then(AuctionListing::unit_bid).unwrap_or(Px::ZERO),
            quantity_total: listing.map_or(Qty::ZERO, |l| l.quantity),
            owner: listing.map_or_else(String::new, |l| l.owner.clone()),
            owner_realm: listing.map_or_else(String::new, |l| l.owner_realm.clone()),
            vendor_sell: meta.map_or(Px::ZERO, |m| m.vendor_sell),
            listings: listing.map_or_else(Vec::new, |l| vec![l.clone()]),
            external: external.and_then(|map| map.get(&item_id)).copied(),
            stats: stats.and_then(|map| map.get(&key.stat_lookup())).cloned(),
            key,
        }
    }

    fn resolve_name(
        key: &MarketKey,
        base_name: Option<&str>,
        bonus_ids: &[u32],
        bonuses: &dyn BonusCatalog,
        pets: &dyn PetCatalog,
    ) -> String {
        if let MarketKey::Pet {
            species,
            level,
            quality,
            ..
        } = key
        {
            return match pets.species_name(*species) {
                Some(name) => format!("{name} - Level {level} - Quality {quality}"),
                None => "Pet name missing".to_string(),
            };
        }

        let Some(base) = base_name else {
            return "Item name missing".to_string();
        };

        let mut suffix = String::new();
        let mut tags = String::new();
        for id in bonus_ids {
            let Some(bonus) = bonuses.meta(*id) else {
                continue;
            };
            if let Some(name) = &bonus.name {
                suffix = format!(" {name}");
            }
            if let Some(stats) = &bonus.stats {
                let _ = write!(suffix, "({stats})");
            }
            if let Some(tag) = &bonus.tag {
                if tags.is_empty() {
                    let _ = write!(tags, " Tag: {tag}");
                } else {
                    let _ = write!(tags, ", {tag}");
                }
            }
        }
        format!("{base}{suffix}{tags}")
    }

    /// Sort the bucket's listings by unit buyout and pick the representative:
    /// the cheapest listing whose total buyout exceeds its total bid, else
    /// the cheapest overall. Placeholder buckets keep their zeroed prices.
    fn finalize_bucket(bucket: &mut AggregatedItem) {
        if bucket.listings.is_empty() {
            return;
        }
        bucket
            .listings
            .sort_by_key(|listing| listing.unit_buyout().unwrap_or(Px::ZERO));

        let representative = bucket
            .listings
            .iter()
            .find(|listing| listing.buyout > listing.bid)
            .or_else(|| bucket.listings.first());
        if let Some(rep) = representative {
            bucket.buyout = rep.unit_buyout().unwrap_or(Px::ZERO);
        }
    }
}
