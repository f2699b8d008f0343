//! Read-only game catalog collaborators
//!
//! Aggregation resolves display names, quality tiers and vendor prices from
//! catalogs it does not own. The in-memory implementations here back the
//! binary and the tests; a production deployment loads the same shapes from
//! game-data dumps.

use crate::AuctionListing;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use services_common::{ItemId, PetSpeciesId, Px};

/// Catalog metadata for one item id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemMeta {
    /// Display name
    pub name: String,
    /// Quality tier (0 = poor .. 5 = legendary)
    pub quality: u8,
    /// Item level
    pub item_level: u16,
    /// Vendor sell price per unit
    pub vendor_sell: Px,
}

/// Item metadata lookup
pub trait ItemCatalog: Send + Sync {
    /// Metadata for an item id, if the catalog knows it
    fn meta(&self, item: ItemId) -> Option<&ItemMeta>;
}

/// FxHashMap-backed item catalog
#[derive(Debug, Default)]
pub struct MemoryItemCatalog {
    items: FxHashMap<ItemId, ItemMeta>,
}

impl MemoryItemCatalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace one item's metadata
    pub fn insert(&mut self, item: ItemId, meta: ItemMeta) {
        self.items.insert(item, meta);
    }

    /// Number of known items
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl ItemCatalog for MemoryItemCatalog {
    fn meta(&self, item: ItemId) -> Option<&ItemMeta> {
        self.items.get(&item)
    }
}

/// Catalog metadata for one bonus id
///
/// Bonus ids modify the base item: a name suffix, a stat line, an item
/// level delta, a quality override, or a loot tag. All fields optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BonusMeta {
    /// Name suffix ("of the Fireflash")
    pub name: Option<String>,
    /// Stat line rendered after the suffix
    pub stats: Option<String>,
    /// Item level adjustment
    pub level_delta: Option<i16>,
    /// Quality tier override
    pub quality_override: Option<u8>,
    /// Loot tag ("Raid Finder", "Heroic")
    pub tag: Option<String>,
}

/// Bonus id metadata lookup
pub trait BonusCatalog: Send + Sync {
    /// Metadata for a bonus id, if the catalog knows it
    fn meta(&self, bonus: u32) -> Option<&BonusMeta>;
}

/// FxHashMap-backed bonus catalog
#[derive(Debug, Default)]
pub struct MemoryBonusCatalog {
    bonuses: FxHashMap<u32, BonusMeta>,
}

impl MemoryBonusCatalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace one bonus id's metadata
    pub fn insert(&mut self, bonus: u32, meta: BonusMeta) {
        self.bonuses.insert(bonus, meta);
    }

    /// Number of known bonus ids
    #[must_use]
    pub fn len(&self) -> usize {
        self.bonuses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bonuses.is_empty()
    }
}

impl BonusCatalog for MemoryBonusCatalog {
    fn meta(&self, bonus: u32) -> Option<&BonusMeta> {
        self.bonuses.get(&bonus)
    }
}

/// Pet species metadata plus the per-refresh listing back-references
#[derive(Debug, Clone)]
pub struct PetEntry {
    /// Species display name
    pub name: String,
    /// Live listings for this species. Valid only for the refresh that
    /// attached them.
    back_refs: Vec<AuctionListing>,
}

impl PetEntry {
    /// Entry with no live listings attached
    #[must_use]
    pub const fn new(name: String) -> Self {
        Self {
            name,
            back_refs: Vec::new(),
        }
    }
}

/// Pet species lookup plus the back-reference attachment surface
///
/// Back-references tie a species to the listings currently offering it.
/// They are refresh-scoped: `clear_back_refs` runs before each aggregation
/// pass so stale listings never leak into the next pet view.
pub trait PetCatalog: Send + Sync {
    /// Species display name, if known
    fn species_name(&self, species: PetSpeciesId) -> Option<&str>;

    /// Drop every back-reference from the previous refresh
    fn clear_back_refs(&mut self);

    /// Attach a listing to its species entry. Unknown species are ignored.
    fn attach(&mut self, species: PetSpeciesId, listing: AuctionListing);

    /// Listings attached to a species during the current refresh
    fn back_refs(&self, species: PetSpeciesId) -> Option<&[AuctionListing]>;
}

/// FxHashMap-backed pet catalog
#[derive(Debug, Default)]
pub struct MemoryPetCatalog {
    species: FxHashMap<PetSpeciesId, PetEntry>,
}

impl MemoryPetCatalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace one species
    pub fn insert(&mut self, species: PetSpeciesId, entry: PetEntry) {
        self.species.insert(species, entry);
    }

    /// Number of known species
    #[must_use]
    pub fn len(&self) -> usize {
        self.species.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }
}

impl PetCatalog for MemoryPetCatalog {
    fn species_name(&self, species: PetSpeciesId) -> Option<&str> {
        self.species.get(&species).map(|entry| entry.name.as_str())
    }

    fn clear_back_refs(&mut self) {
        for entry in self.species.values_mut() {
            entry.back_refs.clear();
        }
    }

    fn attach(&mut self, species: PetSpeciesId, listing: AuctionListing) {
        if let Some(entry) = self.species.get_mut(&species) {
            entry.back_refs.push(listing);
        }
    }

    fn back_refs(&self, species: PetSpeciesId) -> Option<&[AuctionListing]> {
        self.species
            .get(&species)
            .map(|entry| entry.back_refs.as_slice())
    }
}
