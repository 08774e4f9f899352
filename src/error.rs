//! Error types for allocation building and rebalancing.

/// Errors returned by the allocation and rebalancing core.
///
/// Every variant is raised at the point of detection and propagated to the
/// caller; nothing here is retried or logged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The allocation descriptor is malformed: a required field is missing,
    /// a weight is invalid, or the category hierarchy is inconsistent.
    #[error("invalid allocation specification: {0}")]
    Specification(String),

    /// The number of periods to the goal is zero or negative.
    #[error("periods to goal must be positive, got {0}")]
    InvalidGoalHorizon(i64),

    /// The goal net worth is negative or not a finite number.
    #[error("goal net worth must be finite and non-negative, got {0}")]
    InvalidGoal(f64),

    /// An operation needs data that has not been loaded.
    #[error("missing input: {0}")]
    MissingInput(&'static str),

    /// Balance data does not have the expected columns or values.
    #[error("balance data error: {0}")]
    BalanceFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "csv")]
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
