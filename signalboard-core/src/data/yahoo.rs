//! Yahoo Finance chart source.
//!
//! Fetches OHLCV bars from Yahoo's v8 chart API using its own `range` and
//! `interval` codes. One request per symbol, no retries: a failed fetch is
//! reported to the caller, which skips the symbol.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.
//! The CSV source is the fallback when Yahoo is unavailable.

use chrono::DateTime;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::provider::{DataError, MarketDataSource};
use crate::domain::{Interval, Period, PriceBar, PriceSeries};

pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

pub struct YahooChartSource {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooChartSource {
    pub fn new(timeout: Duration) -> Result<Self, DataError> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build the chart API URL for a symbol, period and interval.
    fn chart_url(&self, symbol: &str, period: Period, interval: Interval) -> String {
        format!(
            "{}/{symbol}?range={}&interval={}&includeAdjustedClose=true",
            self.base_url,
            period.as_str(),
            interval.as_str()
        )
    }
}

/// Parse the chart API response into bars.
///
/// API-level errors (unknown symbol, unsupported range/interval pair) and
/// empty results are `NoData`. Rows where every field is null (holidays) or
/// the close is null are skipped; a null open/high/low falls back to the close.
fn parse_chart(symbol: &str, resp: ChartResponse) -> Result<Vec<PriceBar>, DataError> {
    let result = match (resp.chart.result, resp.chart.error) {
        (_, Some(err)) => {
            return Err(DataError::no_data(
                symbol,
                format!("{}: {}", err.code, err.description),
            ))
        }
        (Some(result), None) => result,
        (None, None) => {
            return Err(DataError::ResponseFormatChanged(
                "empty result with no error".into(),
            ))
        }
    };

    let Some(data) = result.into_iter().next() else {
        return Err(DataError::no_data(symbol, "empty result"));
    };

    // Yahoo omits `timestamp` entirely when the range holds no bars.
    let Some(timestamps) = data.timestamp else {
        return Err(DataError::no_data(symbol, "no bars in range"));
    };

    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let timestamp = DateTime::from_timestamp(ts, 0).ok_or_else(|| {
            DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
        })?;

        let open = quote.open.get(i).copied().flatten();
        let high = quote.high.get(i).copied().flatten();
        let low = quote.low.get(i).copied().flatten();
        let close = quote.close.get(i).copied().flatten();
        let volume = quote.volume.get(i).copied().flatten();

        let Some(close) = close else {
            continue;
        };

        bars.push(PriceBar {
            timestamp,
            open: open.unwrap_or(close),
            high: high.unwrap_or(close),
            low: low.unwrap_or(close),
            close,
            volume: volume.unwrap_or(0),
        });
    }

    if bars.is_empty() {
        return Err(DataError::no_data(symbol, "no bars in range"));
    }

    Ok(bars)
}

impl MarketDataSource for YahooChartSource {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<PriceSeries, DataError> {
        let url = self.chart_url(symbol, period, interval);
        debug!(%url, "requesting chart");

        let resp = self.client.get(&url).send().map_err(|e| {
            if e.is_timeout() {
                DataError::NetworkUnreachable(format!("timed out fetching {symbol}: {e}"))
            } else {
                DataError::NetworkUnreachable(e.to_string())
            }
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(DataError::RateLimited {
                retry_after_secs: retry_after,
            });
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(DataError::AuthenticationRequired(format!(
                "Yahoo Finance answered HTTP {status}"
            )));
        }

        // 404 and 422 still carry a chart error body naming the reason.
        let chart: ChartResponse = resp.json().map_err(|e| {
            if status.is_success() {
                DataError::ResponseFormatChanged(format!(
                    "failed to parse response for {symbol}: {e}"
                ))
            } else if status == reqwest::StatusCode::NOT_FOUND {
                DataError::no_data(symbol, "Not Found")
            } else {
                DataError::Other(format!("HTTP {status} for {symbol}"))
            }
        })?;

        let bars = parse_chart(symbol, chart)?;
        Ok(PriceSeries::new(symbol, bars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Vec<PriceBar>, DataError> {
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        parse_chart("AAPL", resp)
    }

    #[test]
    fn url_uses_range_and_interval_codes() {
        let source =
            YahooChartSource::with_base_url("http://localhost/chart/", Duration::from_secs(1))
                .unwrap();
        assert_eq!(
            source.chart_url("AAPL", Period::OneYear, Interval::Weekly),
            "http://localhost/chart/AAPL?range=1y&interval=1wk&includeAdjustedClose=true"
        );
    }

    #[test]
    fn parses_bars_and_skips_holidays() {
        let bars = parse(
            r#"{"chart":{"result":[{"timestamp":[1704205800,1704292200,1704378600],
            "indicators":{"quote":[{"open":[187.15,null,184.22],"high":[188.44,null,185.88],
            "low":[183.89,null,183.43],"close":[185.64,null,184.25],
            "volume":[82488700,null,58414500]}]}}],"error":null}}"#,
        )
        .unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 185.64);
        assert_eq!(bars[1].volume, 58_414_500);
    }

    #[test]
    fn null_open_falls_back_to_close() {
        let bars = parse(
            r#"{"chart":{"result":[{"timestamp":[1704205800],
            "indicators":{"quote":[{"open":[null],"high":[null],"low":[null],
            "close":[100.0],"volume":[null]}]}}],"error":null}}"#,
        )
        .unwrap();
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].volume, 0);
    }

    #[test]
    fn not_found_is_no_data() {
        let err = parse(
            r#"{"chart":{"result":null,"error":{"code":"Not Found",
            "description":"No data found, symbol may be delisted"}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DataError::NoData { ref symbol, .. } if symbol == "AAPL"));
    }

    #[test]
    fn missing_timestamps_is_no_data() {
        let err = parse(
            r#"{"chart":{"result":[{"indicators":{"quote":[{}]}}],"error":null}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DataError::NoData { .. }));
    }

    #[test]
    fn empty_envelope_is_format_change() {
        let err = parse(r#"{"chart":{"result":null,"error":null}}"#).unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
    }
}
