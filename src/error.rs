use thiserror::Error;

/// Why a price feed could not produce a sample
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeedError {
    /// Transient network/parse failure. The tick is skipped.
    #[error("price feed unavailable: {0}")]
    Unavailable(String),

    /// Historical series has no more rows
    #[error("price series exhausted")]
    Exhausted,
}

/// Top-level error type for the trading engine
#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("no price available at startup: {0}")]
    StartupFetch(FeedError),

    #[error("persistence failure on {path}: {reason}")]
    Persistence { path: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("historical data error: {0}")]
    HistoricalData(String),

    #[error("invalid price {0}: must be positive and finite")]
    InvalidPrice(f64),
}

impl BotError {
    pub(crate) fn persistence(path: &std::path::Path, reason: impl ToString) -> Self {
        BotError::Persistence {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<config::ConfigError> for BotError {
    fn from(e: config::ConfigError) -> Self {
        BotError::Config(e.to_string())
    }
}
