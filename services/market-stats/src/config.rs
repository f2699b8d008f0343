//! Market statistics aggregator configuration

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use services_common::AhId;

/// Market statistics aggregator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Directory polled for snapshot JSON files
    pub spool_dir: String,

    /// Spool poll interval in seconds
    pub poll_interval_secs: u64,

    /// Hourly history window served to chart consumers, in days
    pub hourly_window_days: u32,

    /// Window for the recent-stats summary attached to the live view, in days
    pub stats_window_days: u32,

    /// Hourly rows older than this are eligible for the retention sweep, in days
    pub retention_max_age_days: u32,

    /// Retention sweep interval in seconds (one house per tick)
    pub sweep_interval_secs: u64,

    /// Per-auction-house overrides, keyed by numeric house id
    pub houses: FxHashMap<String, HouseConfig>,
}

/// Per-auction-house configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseConfig {
    /// Override for the retention max age, in days
    pub retention_max_age_days: Option<u32>,

    /// Whether snapshots for this house are ingested at all
    pub enabled: bool,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            spool_dir: "./spool".to_string(),
            poll_interval_secs: 60,
            hourly_window_days: 14,
            stats_window_days: 14,
            retention_max_age_days: 15,
            sweep_interval_secs: 900,
            houses: FxHashMap::default(),
        }
    }
}

impl AggregatorConfig {
    /// Retention max age for one house, honoring per-house overrides
    #[must_use]
    pub fn retention_for(&self, ah: AhId) -> u32 {
        self.houses
            .get(&ah.0.to_string())
            .and_then(|house| house.retention_max_age_days)
            .unwrap_or(self.retention_max_age_days)
    }

    /// Whether snapshots for this house are ingested. Houses without an
    /// override are enabled.
    #[must_use]
    pub fn is_enabled(&self, ah: AhId) -> bool {
        self.houses
            .get(&ah.0.to_string())
            .map_or(true, |house| house.enabled)
    }
}
