//! Canonical market identity resolution
//!
//! Listings name the same tradable good in many surface forms: bonus id
//! lists arrive in arbitrary order, and every caged battle pet shares one
//! cage item id regardless of species. This module collapses those forms
//! into canonical keys. Pure functions, no state.

use crate::{AuctionListing, PetAttributes};
use serde::{Deserialize, Serialize};
use services_common::constants::keys::{BONUS_SENTINEL, PET_SPECIES_SENTINEL};
use services_common::{AhId, ItemId, PetQualityId, PetSpeciesId, StatsError};
use std::fmt;

/// Key of the per-identity statistics lookup map. Pets collapse to species
/// level, so both [`MarketKey`] and [`StatIdentity`] reduce to it.
pub type StatLookup = (ItemId, Option<PetSpeciesId>, BonusKey);

/// Ascending-sorted bonus id list
///
/// Two renderings exist at the boundaries. [`BonusKey::as_column_value`]
/// always emits a value (`"-1"` when empty) and keys persisted statistics.
/// `Display` emits the empty string when empty, which is what lets a
/// bonus-carrying listing also register under its bare-item bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BonusKey(Vec<u32>);

impl BonusKey {
    /// Canonicalize a bonus id list (sorts ascending, keeps duplicates)
    #[must_use]
    pub fn new(mut ids: Vec<u32>) -> Self {
        ids.sort_unstable();
        Self(ids)
    }

    /// The "no modifiers" key
    #[must_use]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Build from the optional bonus list of a raw listing
    #[must_use]
    pub fn from_listing_bonuses(ids: Option<&[u32]>) -> Self {
        match ids {
            Some(ids) if !ids.is_empty() => Self::new(ids.to_vec()),
            _ => Self::empty(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The canonicalized ids, ascending
    #[must_use]
    pub fn ids(&self) -> &[u32] {
        &self.0
    }

    /// Persistence-boundary rendering: comma-joined ids, `"-1"` when empty
    #[must_use]
    pub fn as_column_value(&self) -> String {
        if self.0.is_empty() {
            BONUS_SENTINEL.to_string()
        } else {
            self.to_string()
        }
    }

    /// Parse the persistence-boundary rendering back
    pub fn from_column_value(value: &str) -> Result<Self, StatsError> {
        if value == BONUS_SENTINEL || value.is_empty() {
            return Ok(Self::empty());
        }
        let ids = value
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<u32>()
                    .map_err(|_| StatsError::Storage(format!("bad bonus column value: {value}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(ids))
    }
}

impl fmt::Display for BonusKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for id in &self.0 {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{id}")?;
            first = false;
        }
        Ok(())
    }
}

/// Canonical grouping key for the live market view
///
/// Pets are tracked per exact stat roll (species, level, quality) and their
/// bonus ids are ignored. Everything else groups by item id plus canonical
/// bonus key; the empty bonus key is the bare-item bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketKey {
    /// Caged battle pet, keyed by exact stat roll
    Pet {
        /// Cage item id
        item: ItemId,
        /// Pet species
        species: PetSpeciesId,
        /// Pet level (1-25)
        level: u8,
        /// Pet quality tier
        quality: PetQualityId,
    },
    /// Regular item, keyed by item id and canonical bonus key
    Item {
        /// Item id
        item: ItemId,
        /// Canonical bonus key (empty = bare item)
        bonus: BonusKey,
    },
}

impl MarketKey {
    /// Derive the canonical key for a listing. Pet branch wins over bonus
    /// branch; malformed ids pass through untouched.
    #[must_use]
    pub fn from_listing(listing: &AuctionListing) -> Self {
        match &listing.pet {
            Some(pet) => Self::pet(listing.item, pet),
            None => Self::Item {
                item: listing.item,
                bonus: BonusKey::from_listing_bonuses(listing.bonus_ids.as_deref()),
            },
        }
    }

    /// Pet key from listed pet attributes
    #[must_use]
    pub const fn pet(item: ItemId, pet: &PetAttributes) -> Self {
        Self::Pet {
            item,
            species: pet.species,
            level: pet.level,
            quality: pet.quality,
        }
    }

    /// Bare-item key (empty bonus key)
    #[must_use]
    pub const fn bare_item(item: ItemId) -> Self {
        Self::Item {
            item,
            bonus: BonusKey::empty(),
        }
    }

    /// The item id behind either branch
    #[must_use]
    pub const fn item_id(&self) -> ItemId {
        match self {
            Self::Pet { item, .. } | Self::Item { item, .. } => *item,
        }
    }

    #[must_use]
    pub const fn is_pet(&self) -> bool {
        matches!(self, Self::Pet { .. })
    }

    /// Fold a bonus-qualified key down to its bare-item bucket. Pets and
    /// already-bare keys come back unchanged.
    #[must_use]
    pub fn to_bare(&self) -> Self {
        match self {
            Self::Item { item, .. } => Self::bare_item(*item),
            pet => pet.clone(),
        }
    }

    /// Statistics lookup triple: pets collapse to species, items keep their
    /// bonus key. Shared by [`StatIdentity::stat_lookup`] so the live view
    /// and the persisted history meet on the same map key.
    #[must_use]
    pub fn stat_lookup(&self) -> StatLookup {
        match self {
            Self::Pet { item, species, .. } => (*item, Some(*species), BonusKey::empty()),
            Self::Item { item, bonus } => (*item, None, bonus.clone()),
        }
    }
}

impl fmt::Display for MarketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pet {
                item,
                species,
                level,
                quality,
            } => {
                write!(f, "{item}-{species}-{level}-{quality}")
            }
            Self::Item { item, bonus } => {
                if bonus.is_empty() {
                    write!(f, "{item}")
                } else {
                    write!(f, "{item}-{bonus}")
                }
            }
        }
    }
}

/// Identity of one persisted statistics row
///
/// Pets are stat-tracked per species only; level and quality stay out of the
/// persisted identity. The bonus key is computed from the listing either
/// way, so a bonus-carrying cage (none exist today) would still round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatIdentity {
    /// Auction house the row belongs to
    pub ah: AhId,
    /// Item id
    pub item: ItemId,
    /// Pet species, absent for regular items
    pub species: Option<PetSpeciesId>,
    /// Canonical bonus key
    pub bonus: BonusKey,
}

impl StatIdentity {
    /// Derive the persisted statistics identity for a listing
    #[must_use]
    pub fn from_listing(ah: AhId, listing: &AuctionListing) -> Self {
        Self {
            ah,
            item: listing.item,
            species: listing.pet.as_ref().map(|pet| pet.species),
            bonus: BonusKey::from_listing_bonuses(listing.bonus_ids.as_deref()),
        }
    }

    /// Species rendering at the persistence boundary (`-1` = not a pet)
    #[must_use]
    pub fn species_column_value(&self) -> i64 {
        self.species
            .map_or(PET_SPECIES_SENTINEL, |species| i64::from(species.0))
    }

    /// Statistics lookup triple, see [`MarketKey::stat_lookup`]
    #[must_use]
    pub fn stat_lookup(&self) -> StatLookup {
        (self.item, self.species, self.bonus.clone())
    }
}
