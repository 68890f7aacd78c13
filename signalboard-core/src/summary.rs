//! Market summary: price range, volume and volatility at a glance, plus a
//! sector performance table built from the SPDR sector ETFs.
//!
//! Unlike the risk engine, volatility here is annualized with the interval's
//! own factor (√252 daily, √52 weekly, √12 monthly).

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::data::MarketDataSource;
use crate::domain::{Interval, Period, PriceSeries};
use crate::risk::{sample_std_dev, simple_returns};

/// Sector name and the ETF that tracks it.
pub const SECTOR_ETFS: [(&str, &str); 11] = [
    ("Technology", "XLK"),
    ("Financials", "XLF"),
    ("Health Care", "XLV"),
    ("Energy", "XLE"),
    ("Consumer Discretionary", "XLY"),
    ("Consumer Staples", "XLP"),
    ("Industrials", "XLI"),
    ("Materials", "XLB"),
    ("Utilities", "XLU"),
    ("Real Estate", "XLRE"),
    ("Communication Services", "XLC"),
];

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarketSummary {
    pub latest_close: f64,
    pub period_high: f64,
    pub period_low: f64,
    pub average_close: f64,
    pub average_volume: f64,
    pub recent_volume: u64,
    /// Recent volume over average volume; 0 when the average is 0.
    pub relative_volume: f64,
    /// Stdev of bar returns, percent.
    pub bar_volatility_pct: f64,
    /// Bar volatility scaled to a year for `interval`, percent.
    pub annualized_volatility_pct: f64,
    /// Largest absolute single-bar return, percent.
    pub max_move_pct: f64,
    pub interval: Interval,
}

impl MarketSummary {
    /// Summary of `series`. All zero for an empty series.
    pub fn compute(series: &PriceSeries, interval: Interval) -> Self {
        let bars = series.bars();
        let Some(last) = bars.last() else {
            return Self {
                interval,
                ..Self::default()
            };
        };

        let n = bars.len() as f64;
        let period_high = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let period_low = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let average_close = bars.iter().map(|b| b.close).sum::<f64>() / n;
        let average_volume = bars.iter().map(|b| b.volume as f64).sum::<f64>() / n;
        let relative_volume = if average_volume > 0.0 {
            last.volume as f64 / average_volume
        } else {
            0.0
        };

        let returns = simple_returns(&series.closes());
        let bar_volatility = sample_std_dev(&returns);
        let max_move = returns.iter().map(|r| r.abs()).fold(0.0, f64::max);

        Self {
            latest_close: last.close,
            period_high,
            period_low,
            average_close,
            average_volume,
            recent_volume: last.volume,
            relative_volume,
            bar_volatility_pct: bar_volatility * 100.0,
            annualized_volatility_pct: bar_volatility * interval.periods_per_year().sqrt() * 100.0,
            max_move_pct: max_move * 100.0,
            interval,
        }
    }
}

/// Last close over first close, minus one. `None` for an empty series or a
/// non-positive first close.
pub fn total_return(series: &PriceSeries) -> Option<f64> {
    let bars = series.bars();
    let first = bars.first()?.close;
    let last = bars.last()?.close;
    (first > 0.0).then(|| last / first - 1.0)
}

/// One row of the sector table. Price and return are `None` when the ETF
/// could not be fetched or had no bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorPerformance {
    pub sector: String,
    pub etf: String,
    pub current_price: Option<f64>,
    pub total_return_pct: Option<f64>,
}

/// Fetch each sector ETF and rank by total return, best first.
///
/// A failed fetch only blanks that row. Rows without a return sort last and
/// keep their table order.
pub fn sector_performance(
    source: &dyn MarketDataSource,
    sectors: &[(&str, &str)],
    period: Period,
    interval: Interval,
) -> Vec<SectorPerformance> {
    let mut rows: Vec<SectorPerformance> = sectors
        .iter()
        .map(|&(sector, etf)| {
            let series = source
                .fetch(etf, period, interval)
                .map_err(|e| warn!(%sector, %etf, error = %e, "sector fetch failed"))
                .ok();
            SectorPerformance {
                sector: sector.to_string(),
                etf: etf.to_string(),
                current_price: series
                    .as_ref()
                    .and_then(|s| s.bars().last())
                    .map(|b| b.close),
                total_return_pct: series.as_ref().and_then(total_return).map(|r| r * 100.0),
            }
        })
        .collect();

    rows.sort_by(|a, b| match (a.total_return_pct, b.total_return_pct) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataError;
    use crate::indicators::{assert_approx, make_series};

    #[test]
    fn empty_series_is_zero() {
        let summary = MarketSummary::compute(&PriceSeries::empty("X"), Interval::Weekly);
        assert_eq!(summary.latest_close, 0.0);
        assert_eq!(summary.relative_volume, 0.0);
        assert_eq!(summary.interval, Interval::Weekly);
    }

    #[test]
    fn price_and_volume_stats() {
        // make_series: high = max(open, close) + 1, low = min(open, close) - 1, volume 1000
        let summary = MarketSummary::compute(&make_series(&[100.0, 110.0, 99.0]), Interval::Daily);
        assert_eq!(summary.latest_close, 99.0);
        assert_eq!(summary.period_high, 111.0);
        assert_eq!(summary.period_low, 98.0);
        assert_approx(summary.average_close, 103.0, 1e-12);
        assert_approx(summary.relative_volume, 1.0, 1e-12);
        assert_approx(summary.max_move_pct, 10.0, 1e-9);
    }

    #[test]
    fn annualization_follows_interval() {
        let series = make_series(&[100.0, 102.0, 101.0, 104.0, 103.0]);
        let daily = MarketSummary::compute(&series, Interval::Daily);
        let weekly = MarketSummary::compute(&series, Interval::Weekly);
        assert_approx(daily.bar_volatility_pct, weekly.bar_volatility_pct, 1e-12);
        assert_approx(
            daily.annualized_volatility_pct / weekly.annualized_volatility_pct,
            (252.0_f64 / 52.0).sqrt(),
            1e-9,
        );
    }

    /// Serves `make_series` closes per ETF; anything else is offline.
    struct SectorFake(Vec<(&'static str, Vec<f64>)>);

    impl MarketDataSource for SectorFake {
        fn name(&self) -> &str {
            "sector-fake"
        }

        fn fetch(&self, symbol: &str, _: Period, _: Interval) -> Result<PriceSeries, DataError> {
            self.0
                .iter()
                .find(|(etf, _)| *etf == symbol)
                .map(|(_, closes)| make_series(closes))
                .ok_or_else(|| DataError::NetworkUnreachable("offline".into()))
        }
    }

    #[test]
    fn total_return_uses_first_and_last_close() {
        assert_approx(total_return(&make_series(&[50.0, 40.0, 60.0])).unwrap(), 0.2, 1e-12);
        assert_eq!(total_return(&PriceSeries::empty("X")), None);
    }

    #[test]
    fn sectors_rank_best_first_with_failures_last() {
        let source = SectorFake(vec![
            ("XLK", vec![100.0, 110.0]),
            ("XLE", vec![100.0, 90.0]),
            ("XLF", vec![100.0, 125.0]),
        ]);
        let sectors = [
            ("Technology", "XLK"),
            ("Utilities", "XLU"),
            ("Energy", "XLE"),
            ("Financials", "XLF"),
        ];
        let rows = sector_performance(&source, &sectors, Period::OneYear, Interval::Daily);

        let order: Vec<&str> = rows.iter().map(|r| r.etf.as_str()).collect();
        assert_eq!(order, vec!["XLF", "XLK", "XLE", "XLU"]);
        assert_approx(rows[0].total_return_pct.unwrap(), 25.0, 1e-9);
        assert_eq!(rows[0].current_price, Some(125.0));
        assert_approx(rows[2].total_return_pct.unwrap(), -10.0, 1e-9);
        assert_eq!(rows[3].sector, "Utilities");
        assert_eq!(rows[3].current_price, None);
        assert_eq!(rows[3].total_return_pct, None);
    }

    #[test]
    fn sector_table_covers_eleven_etfs() {
        let mut etfs: Vec<&str> = SECTOR_ETFS.iter().map(|(_, etf)| *etf).collect();
        etfs.sort_unstable();
        etfs.dedup();
        assert_eq!(etfs.len(), 11);
    }
}
