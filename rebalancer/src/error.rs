//! Error types for the rebalancer.

use std::path::PathBuf;

/// All errors that can occur during a rebalancer run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to load {what} from {path}: {source}")]
    Load {
        what: &'static str,
        path: PathBuf,
        source: pinwheel::Error,
    },

    #[error(transparent)]
    Plan(#[from] pinwheel::Error),

    #[error("price data error: {0}")]
    Prices(String),

    #[error("failed to read price file {path}: {source}")]
    PriceRead {
        path: PathBuf,
        source: csv::Error,
    },

    #[error("chart error: {0}")]
    Chart(String),

    #[error("failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("aborted: {0}")]
    Aborted(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
