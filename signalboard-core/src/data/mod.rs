//! Market data sources and column normalization.

pub mod csv_source;
pub mod frame;
pub mod provider;
pub mod synthetic;
pub mod yahoo;

pub use csv_source::{read_csv_frame, CsvSource};
pub use frame::{normalize_frame, FrameError};
pub use provider::{DataError, MarketDataSource};
pub use synthetic::SyntheticSource;
pub use yahoo::YahooChartSource;
