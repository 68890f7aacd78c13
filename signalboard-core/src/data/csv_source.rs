//! CSV import source: one `<SYMBOL>.csv` file per symbol in a directory.
//!
//! Files are read through polars and mapped with [`normalize_frame`], so
//! exports with multi-level headers (`('Close', 'AAPL')`) load as well.
//! The file is taken as-is; `period` trims it to the trailing window ending
//! at its last bar.

use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::frame::{normalize_frame, FrameError};
use super::provider::{DataError, MarketDataSource};
use crate::domain::{Interval, Period, PriceSeries};

pub struct CsvSource {
    dir: PathBuf,
}

impl CsvSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }
}

/// Read a CSV file into a DataFrame, parsing date-like columns.
pub fn read_csv_frame(path: &Path) -> Result<DataFrame, FrameError> {
    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_try_parse_dates(true)
        .finish()?
        .collect()?;
    Ok(df)
}

impl MarketDataSource for CsvSource {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn fetch(
        &self,
        symbol: &str,
        period: Period,
        _interval: Interval,
    ) -> Result<PriceSeries, DataError> {
        let path = self.path_for(symbol);
        if !path.is_file() {
            return Err(DataError::no_data(
                symbol,
                format!("no CSV file at {}", path.display()),
            ));
        }
        debug!(path = %path.display(), "reading CSV");

        let df = read_csv_frame(&path)?;
        let series = normalize_frame(&df, symbol)?;
        if series.is_empty() {
            return Ok(series);
        }

        let Some(last) = series.last_timestamp() else {
            return Ok(series);
        };
        let cutoff = last - chrono::Duration::days(period.approx_days());
        let bars = series
            .bars()
            .iter()
            .filter(|b| b.timestamp > cutoff)
            .cloned()
            .collect();
        Ok(PriceSeries::new(symbol, bars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn reads_symbol_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("AAPL.csv"),
            "Date,Open,High,Low,Close,Volume\n\
             2024-01-02,187.15,188.44,183.89,185.64,82488700\n\
             2024-01-03,184.22,185.88,183.43,184.25,58414500\n",
        )
        .unwrap();

        let source = CsvSource::new(dir.path());
        let series = source.fetch("AAPL", Period::OneYear, Interval::Daily).unwrap();
        assert_eq!(series.symbol(), "AAPL");
        assert_eq!(series.closes(), vec![185.64, 184.25]);
    }

    #[test]
    fn missing_file_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let err = CsvSource::new(dir.path())
            .fetch("NOPE", Period::OneYear, Interval::Daily)
            .unwrap_err();
        assert!(matches!(err, DataError::NoData { .. }));
    }

    #[test]
    fn unreadable_columns_are_malformed_input() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("BAD.csv"), "Date,Price\n2024-01-02,1.0\n").unwrap();
        let err = CsvSource::new(dir.path())
            .fetch("BAD", Period::OneYear, Interval::Daily)
            .unwrap_err();
        assert!(err.is_malformed_input());
    }

    #[test]
    fn period_trims_to_trailing_window() {
        let dir = tempfile::tempdir().unwrap();
        let mut body = String::from("Date,Close\n");
        for m in 1..=12 {
            body.push_str(&format!("2023-{m:02}-15,{}\n", 100 + m));
        }
        fs::write(dir.path().join("X.csv"), body).unwrap();

        let series = CsvSource::new(dir.path())
            .fetch("X", Period::ThreeMonths, Interval::Monthly)
            .unwrap();
        // 91 days back from Dec 15 keeps Oct, Nov and Dec.
        assert_eq!(series.closes(), vec![110.0, 111.0, 112.0]);
    }
}
