//! Column normalization: turn whatever tabular layout a source produced into
//! a PriceSeries.
//!
//! Accepted column names, matched case-insensitively and ignoring spaces and
//! underscores:
//! - flat: `Close`, `close`, `Adj Close`, `adj_close`, ...
//! - tuple-encoded multi-level: `('Close', 'AAPL')`
//! - delimited multi-level: `Close.AAPL`, `AAPL|Close`
//!
//! A level naming a different ticker excludes that column. `Adj Close` is only
//! used when no `Close` column exists.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use polars::prelude::*;
use std::collections::HashMap;
use thiserror::Error;

use crate::domain::{PriceBar, PriceSeries};

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("column '{column}' has unsupported type {dtype}")]
    UnsupportedType { column: String, dtype: String },

    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Field {
    Timestamp,
    Open,
    High,
    Low,
    Close,
    AdjClose,
    Volume,
}

impl Field {
    fn from_label(label: &str) -> Option<Field> {
        let key: String = label
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "timestamp" | "date" | "datetime" => Some(Field::Timestamp),
            "open" => Some(Field::Open),
            "high" => Some(Field::High),
            "low" => Some(Field::Low),
            "close" => Some(Field::Close),
            "adjclose" => Some(Field::AdjClose),
            "volume" => Some(Field::Volume),
            _ => None,
        }
    }
}

/// Split a column name into its field and, for multi-level names, the ticker.
fn parse_column_name(name: &str) -> Option<(Field, Option<String>)> {
    let trimmed = name.trim();
    let raw_parts: Vec<&str> = if trimmed.starts_with('(') && trimmed.ends_with(')') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].split(',').collect()
    } else if trimmed.contains('|') {
        trimmed.split('|').collect()
    } else if trimmed.contains('.') {
        trimmed.splitn(2, '.').collect()
    } else {
        vec![trimmed]
    };

    let parts: Vec<&str> = raw_parts
        .into_iter()
        .map(|p| p.trim().trim_matches(|c| c == '\'' || c == '"').trim())
        .filter(|p| !p.is_empty())
        .collect();

    let field_pos = parts.iter().position(|p| Field::from_label(p).is_some())?;
    let field = Field::from_label(parts[field_pos])?;
    let others: Vec<&str> = parts
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != field_pos)
        .map(|(_, p)| *p)
        .collect();

    match others.as_slice() {
        [] => Some((field, None)),
        [ticker] => Some((field, Some(ticker.to_string()))),
        _ => None,
    }
}

/// Map a frame onto OHLCV bars for `symbol`.
///
/// Rows without a timestamp or a finite close are dropped. Missing
/// open/high/low fall back to the close, missing volume to zero. The result
/// is sorted by timestamp with duplicates removed (first row wins).
pub fn normalize_frame(df: &DataFrame, symbol: &str) -> Result<PriceSeries, FrameError> {
    let mut columns: HashMap<Field, &Column> = HashMap::new();
    for column in df.get_columns() {
        let Some((field, ticker)) = parse_column_name(column.name().as_str()) else {
            continue;
        };
        if ticker.is_some_and(|t| !t.eq_ignore_ascii_case(symbol)) {
            continue;
        }
        columns.entry(field).or_insert(column);
    }

    let close_column = columns
        .get(&Field::Close)
        .or_else(|| columns.get(&Field::AdjClose))
        .ok_or_else(|| FrameError::MissingColumn("Close".to_string()))?;
    let time_column = columns
        .get(&Field::Timestamp)
        .ok_or_else(|| FrameError::MissingColumn("timestamp".to_string()))?;

    let timestamps = timestamp_values(time_column)?;
    let closes = float_values(close_column)?;
    let opens = optional_floats(&columns, Field::Open)?;
    let highs = optional_floats(&columns, Field::High)?;
    let lows = optional_floats(&columns, Field::Low)?;
    let volumes = optional_floats(&columns, Field::Volume)?;

    let mut bars = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let Some(timestamp) = timestamps[i] else {
            continue;
        };
        let Some(close) = closes[i].filter(|c| c.is_finite()) else {
            continue;
        };
        let pick = |values: &Option<Vec<Option<f64>>>| {
            values
                .as_ref()
                .and_then(|v| v[i])
                .filter(|v| v.is_finite())
                .unwrap_or(close)
        };
        let volume = volumes
            .as_ref()
            .and_then(|v| v[i])
            .filter(|v| v.is_finite() && *v > 0.0)
            .map(|v| v.round() as u64)
            .unwrap_or(0);

        bars.push(PriceBar {
            timestamp,
            open: pick(&opens),
            high: pick(&highs),
            low: pick(&lows),
            close,
            volume,
        });
    }

    Ok(PriceSeries::new(symbol, bars))
}

fn optional_floats(
    columns: &HashMap<Field, &Column>,
    field: Field,
) -> Result<Option<Vec<Option<f64>>>, FrameError> {
    columns.get(&field).map(|c| float_values(c)).transpose()
}

fn float_values(column: &Column) -> Result<Vec<Option<f64>>, FrameError> {
    let cast = column.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

fn timestamp_values(column: &Column) -> Result<Vec<Option<DateTime<Utc>>>, FrameError> {
    match column.dtype() {
        DataType::Date => {
            let days = column.cast(&DataType::Int32)?;
            Ok(days
                .i32()?
                .into_iter()
                .map(|d| d.and_then(|d| DateTime::from_timestamp(d as i64 * 86_400, 0)))
                .collect())
        }
        DataType::Datetime(unit, _) => {
            let per_second: i64 = match unit {
                TimeUnit::Milliseconds => 1_000,
                TimeUnit::Microseconds => 1_000_000,
                TimeUnit::Nanoseconds => 1_000_000_000,
            };
            let raw = column.cast(&DataType::Int64)?;
            Ok(raw
                .i64()?
                .into_iter()
                .map(|v| v.and_then(|v| from_epoch(v, per_second)))
                .collect())
        }
        DataType::String => Ok(column
            .str()?
            .into_iter()
            .map(|s| s.and_then(parse_timestamp))
            .collect()),
        dtype if dtype.is_integer() => {
            // Integer timestamps are epoch milliseconds.
            let raw = column.cast(&DataType::Int64)?;
            Ok(raw
                .i64()?
                .into_iter()
                .map(|v| v.and_then(|v| from_epoch(v, 1_000)))
                .collect())
        }
        other => Err(FrameError::UnsupportedType {
            column: column.name().to_string(),
            dtype: other.to_string(),
        }),
    }
}

fn from_epoch(value: i64, per_second: i64) -> Option<DateTime<Utc>> {
    let secs = value.div_euclid(per_second);
    let nanos = value.rem_euclid(per_second) * (1_000_000_000 / per_second);
    DateTime::from_timestamp(secs, nanos as u32)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn column_name_forms() {
        assert_eq!(parse_column_name("Close"), Some((Field::Close, None)));
        assert_eq!(parse_column_name("adj_close"), Some((Field::AdjClose, None)));
        assert_eq!(
            parse_column_name("('Close', 'AAPL')"),
            Some((Field::Close, Some("AAPL".into())))
        );
        assert_eq!(
            parse_column_name("Close.AAPL"),
            Some((Field::Close, Some("AAPL".into())))
        );
        assert_eq!(
            parse_column_name("AAPL|Volume"),
            Some((Field::Volume, Some("AAPL".into())))
        );
        assert_eq!(parse_column_name("('Date', '')"), Some((Field::Timestamp, None)));
        assert_eq!(parse_column_name("Dividends"), None);
    }

    #[test]
    fn flat_frame_sorted() {
        let df = df!(
            "Date" => &["2024-01-03", "2024-01-02"],
            "Open" => &[101.0, 100.0],
            "High" => &[103.0, 102.0],
            "Low" => &[99.0, 98.0],
            "Close" => &[102.0, 101.0],
            "Volume" => &[2_000i64, 1_000]
        )
        .unwrap();

        let series = normalize_frame(&df, "AAPL").unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars()[0].timestamp, day(2));
        assert_eq!(series.bars()[0].close, 101.0);
        assert_eq!(series.bars()[1].volume, 2_000);
    }

    #[test]
    fn tuple_encoded_multi_level() {
        let df = df!(
            "Date" => &["2024-01-02", "2024-01-03"],
            "('Close', 'AAPL')" => &[10.0, 11.0],
            "('Volume', 'AAPL')" => &[5i64, 6]
        )
        .unwrap();

        let series = normalize_frame(&df, "AAPL").unwrap();
        assert_eq!(series.closes(), vec![10.0, 11.0]);
        // OHL fall back to close.
        assert_eq!(series.bars()[0].high, 10.0);
        assert_eq!(series.bars()[1].volume, 6);
    }

    #[test]
    fn other_ticker_levels_ignored() {
        let df = df!(
            "Date" => &["2024-01-02"],
            "Close.MSFT" => &[400.0],
            "Close.AAPL" => &[190.0]
        )
        .unwrap();

        let series = normalize_frame(&df, "aapl").unwrap();
        assert_eq!(series.closes(), vec![190.0]);
    }

    #[test]
    fn adj_close_only_as_fallback() {
        let both = df!(
            "Date" => &["2024-01-02"],
            "Adj Close" => &[9.5],
            "Close" => &[10.0]
        )
        .unwrap();
        assert_eq!(normalize_frame(&both, "X").unwrap().closes(), vec![10.0]);

        let adj_only = df!("Date" => &["2024-01-02"], "Adj Close" => &[9.5]).unwrap();
        assert_eq!(normalize_frame(&adj_only, "X").unwrap().closes(), vec![9.5]);
    }

    #[test]
    fn missing_close_is_error() {
        let df = df!("Date" => &["2024-01-02"], "Open" => &[1.0]).unwrap();
        assert!(matches!(
            normalize_frame(&df, "X"),
            Err(FrameError::MissingColumn(ref c)) if c == "Close"
        ));
    }

    #[test]
    fn epoch_millis_timestamps() {
        let ms = day(2).timestamp_millis();
        let df = df!("timestamp" => &[ms, ms + 86_400_000], "close" => &[1.0, 2.0]).unwrap();
        let series = normalize_frame(&df, "X").unwrap();
        assert_eq!(series.first_timestamp(), Some(day(2)));
        assert_eq!(series.last_timestamp(), Some(day(3)));
    }

    #[test]
    fn duplicate_timestamps_keep_first_and_null_close_dropped() {
        let df = df!(
            "Date" => &["2024-01-02", "2024-01-02", "2024-01-03"],
            "Close" => &[Some(1.0), Some(2.0), None]
        )
        .unwrap();
        let series = normalize_frame(&df, "X").unwrap();
        assert_eq!(series.closes(), vec![1.0]);
    }

    #[test]
    fn timestamp_string_formats() {
        assert_eq!(parse_timestamp("2024-01-02"), Some(day(2)));
        assert_eq!(parse_timestamp("2024-01-02 00:00:00"), Some(day(2)));
        assert_eq!(parse_timestamp("2024-01-02T00:00:00Z"), Some(day(2)));
        assert_eq!(
            parse_timestamp("2024-01-01 19:00:00-05:00"),
            Some(day(2))
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
