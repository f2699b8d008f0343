//! Common error types for services

use thiserror::Error;

/// Error types shared by the market-statistics services
#[derive(Debug, Error)]
pub enum StatsError {
    /// Snapshot payload could not be used
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Storage collaborator failed an upsert or query
    #[error("storage failure: {0}")]
    Storage(String),

    /// Catalog collaborator failed a lookup
    #[error("catalog failure: {0}")]
    Catalog(String),

    /// Configuration could not be loaded or validated
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}
