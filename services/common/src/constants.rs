//! Core constants for the auction market-statistics system.
//!
//! Centralized to keep magic numbers out of the aggregation code.

/// Fixed-point arithmetic constants
pub mod fixed_point {
    /// 4-decimal fixed-point scale factor (unit prices, decayed quantities)
    pub const SCALE_4: i64 = 10_000;
}

/// Time-related constants
pub mod time {
    /// Milliseconds per second
    pub const MILLIS_PER_SEC: u64 = 1_000;

    /// Milliseconds per hour
    pub const MILLIS_PER_HOUR: u64 = 3_600_000;

    /// Milliseconds per day
    pub const MILLIS_PER_DAY: u64 = 86_400_000;

    /// Hour slots in one hourly statistics row
    pub const HOURS_PER_DAY: usize = 24;

    /// Day slots in one monthly statistics row
    pub const DAYS_PER_MONTH_TABLE: usize = 31;

    /// Monthly rows are anchored to this day of month
    pub const MONTH_ANCHOR_DAY: u32 = 15;
}

/// Canonical-key constants
pub mod keys {
    /// External column value for "no bonus ids" (persisted statistics keys)
    pub const BONUS_SENTINEL: &str = "-1";

    /// External column value for "not a pet"
    pub const PET_SPECIES_SENTINEL: i64 = -1;
}
