//! Error types for the collection cycle.

use thiserror::Error;

/// Result type for cycle operations.
pub type Result<T> = std::result::Result<T, CycleError>;

/// Errors that can abort a collection cycle.
///
/// Every variant is recoverable at the cadence level: the cycle leaves
/// persisted state untouched on failure, so the next tick re-detects the
/// same unrecorded run and retries from scratch.
#[derive(Debug, Error)]
pub enum CycleError {
    /// Upstream listing, probing, or fetch failure.
    #[error(transparent)]
    Upstream(#[from] gale_upstream::UpstreamError),

    /// Delivery exhausted its attempts.
    #[error(transparent)]
    Deliver(#[from] gale_deliver::DeliverError),

    /// State record read/write failure.
    #[error(transparent)]
    State(#[from] gale_state::StateError),

    /// The configuration was unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}
