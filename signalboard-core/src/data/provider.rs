//! Market data source trait and structured error types.
//!
//! The MarketDataSource trait abstracts over where bars come from (Yahoo
//! chart API, CSV files, a synthetic walk) so the pipeline can swap them and
//! tests can inject fakes.

use thiserror::Error;

use super::frame::FrameError;
use crate::domain::{Interval, Period, PriceSeries};

/// Structured error types for data operations.
///
/// `NoData` is the expected "nothing to analyze" outcome (unknown symbol,
/// closed exchange, unsupported period/interval pair); callers treat it as a
/// per-symbol skip.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("no data for {symbol}: {reason}")]
    NoData { symbol: String, reason: String },

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("unreadable columns: {0}")]
    Frame(#[from] FrameError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("data error: {0}")]
    Other(String),
}

impl DataError {
    pub fn no_data(symbol: &str, reason: impl Into<String>) -> Self {
        DataError::NoData {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }

    /// True when the source answered but its columns could not be mapped to
    /// OHLCV. The symbol is then analyzed as an empty series.
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, DataError::Frame(FrameError::MissingColumn(_)))
    }
}

/// A source of historical bars.
pub trait MarketDataSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch bars for `symbol` covering `period`, sampled at `interval`.
    fn fetch(&self, symbol: &str, period: Period, interval: Interval)
        -> Result<PriceSeries, DataError>;
}
