//! Core types for the auction market-statistics platform

use crate::constants::fixed_point::SCALE_4;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Auction house identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AhId(pub u32);

impl AhId {
    /// Create a new auction house id
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for AhId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AH_{}", self.0)
    }
}

/// Item identifier from the game catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u32);

impl ItemId {
    /// Create a new item id
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Battle pet species identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PetSpeciesId(pub u32);

impl PetSpeciesId {
    /// Create a new pet species id
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for PetSpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Battle pet quality tier (0 = poor .. 5 = legendary)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PetQualityId(pub u8);

impl PetQualityId {
    /// Create a new pet quality id
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }
}

impl fmt::Display for PetQualityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Money type (stored as i64 ticks for determinism, 4 decimal places)
///
/// The base unit is copper, the marketplace's smallest currency unit.
/// Fractional ticks exist because unit prices divide listing totals by
/// quantity, and decayed averages halve repeatedly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Px(i64); // Internal: copper in ticks (1 tick = 0.0001 copper)

impl Px {
    /// Create a new price from a copper amount (for external API compatibility)
    /// For internal code, prefer `from_copper` or `from_i64`
    #[must_use]
    pub fn new(value: f64) -> Self {
        let scaled = (value * SCALE_4 as f64).round();
        let clamped = if scaled >= i64::MAX as f64 {
            i64::MAX
        } else if scaled <= i64::MIN as f64 {
            i64::MIN
        } else {
            // Bounds checked above, truncation cannot occur
            #[allow(clippy::cast_possible_truncation)]
            let result = scaled as i64;
            result
        };
        Self(clamped)
    }

    /// Get price as f64 copper for external APIs only.
    /// Internal code should always use fixed-point arithmetic.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        {
            self.0 as f64 / SCALE_4 as f64
        }
    }

    /// Create from a whole copper amount
    #[must_use]
    pub const fn from_copper(copper: i64) -> Self {
        Self(copper * SCALE_4)
    }

    /// Get price as i64 ticks
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }

    /// Create from i64 ticks
    #[must_use]
    pub const fn from_i64(ticks: i64) -> Self {
        Self(ticks)
    }

    /// Zero price
    pub const ZERO: Self = Self(0);

    /// True for prices strictly above zero
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Unit price of a listing total spread across `qty` units.
    ///
    /// Returns `None` when the quantity carries no signal (zero or negative),
    /// which callers treat as "no price", not as an error.
    #[must_use]
    pub fn per_unit(self, qty: Qty) -> Option<Self> {
        if qty.as_i64() <= 0 {
            return None;
        }
        // i128 intermediate: a large buyout times the scale factor can
        // exceed i64 before the divide brings it back down.
        let unit = (i128::from(self.0) * i128::from(SCALE_4)) / i128::from(qty.as_i64());
        // Quantities are whole units, so the quotient never exceeds the total
        #[allow(clippy::cast_possible_truncation)]
        let unit = unit as i64;
        Some(Self(unit))
    }

    /// One decaying-average step: the running value replaced by
    /// `(current + next) / 2`. Order of application is observable.
    #[must_use]
    pub const fn decayed(self, next: Self) -> Self {
        Self((self.0 + next.0) / 2)
    }
}

impl fmt::Display for Px {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / SCALE_4;
        let frac = (self.0 % SCALE_4).abs();
        write!(f, "{whole}.{frac:04}")
    }
}

/// Quantity type for listing sizes (stored as i64 units for determinism, 4 decimal places)
///
/// Listings carry whole counts; fractional ticks appear only in decayed
/// average quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Qty(i64); // Internal: quantity in units (1 unit = 0.0001)

impl Qty {
    /// Create a new quantity (for external API compatibility)
    /// For internal code, prefer `from_units` or `from_i64`
    #[must_use]
    pub fn new(value: f64) -> Self {
        let scaled = (value * SCALE_4 as f64).round();
        let clamped = if scaled >= i64::MAX as f64 {
            i64::MAX
        } else if scaled <= i64::MIN as f64 {
            i64::MIN
        } else {
            // Bounds checked above, truncation cannot occur
            #[allow(clippy::cast_possible_truncation)]
            let result = scaled as i64;
            result
        };
        Self(clamped)
    }

    /// Get quantity as f64 for external APIs only
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        {
            self.0 as f64 / SCALE_4 as f64
        }
    }

    /// Create from whole units
    #[must_use]
    pub const fn from_units(units: i64) -> Self {
        Self(units * SCALE_4)
    }

    /// Get quantity as whole units (fractional part truncated)
    #[must_use]
    pub const fn as_units(&self) -> i64 {
        self.0 / SCALE_4
    }

    /// Get quantity as i64 ticks
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }

    /// Create from i64 ticks
    #[must_use]
    pub const fn from_i64(ticks: i64) -> Self {
        Self(ticks)
    }

    /// Check if quantity is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// True for quantities strictly above zero
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Zero quantity
    pub const ZERO: Self = Self(0);

    /// Add two quantities (fixed-point arithmetic)
    #[must_use]
    pub const fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }

    /// One decaying-average step, same rule as [`Px::decayed`]
    #[must_use]
    pub const fn decayed(self, next: Self) -> Self {
        Self((self.0 + next.0) / 2)
    }
}

impl fmt::Display for Qty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / SCALE_4;
        let frac = (self.0 % SCALE_4).abs();
        write!(f, "{whole}.{frac:04}")
    }
}

/// Timestamp in milliseconds since UNIX epoch, UTC
///
/// Milliseconds are the snapshot feed's native resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ts(pub u64);

impl Ts {
    /// Get current timestamp
    #[must_use]
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_else(|_| std::time::Duration::from_secs(0));
        Self(duration.as_secs() * 1_000 + u64::from(duration.subsec_millis()))
    }

    /// Create timestamp from milliseconds
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Get timestamp as milliseconds
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Convert to a chrono UTC datetime
    #[must_use]
    pub fn to_datetime(&self) -> DateTime<Utc> {
        // SAFETY: u64 to i64 - millisecond timestamps stay inside i64
        // for roughly 292 million years
        #[allow(clippy::cast_possible_wrap)]
        DateTime::from_timestamp_millis(self.0 as i64).unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// Create from a chrono UTC datetime (pre-epoch clamps to zero)
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        #[allow(clippy::cast_sign_loss)]
        Self(dt.timestamp_millis().max(0) as u64)
    }
}

impl fmt::Display for Ts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
