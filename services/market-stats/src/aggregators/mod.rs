//! Aggregator implementations

pub mod daily;
pub mod history;
pub mod hourly;
pub mod listing;

pub use daily::DailyRollupCompactor;
pub use history::HistoryQueryAdapter;
pub use hourly::HourlyStatAccumulator;
pub use listing::ListingAggregator;
