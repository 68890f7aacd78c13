//! Synthetic source for offline demos and tests.
//!
//! Produces a simple random walk from a starting price of 100.0, seeded from
//! the symbol name so every run yields the same bars. The walk ends at a fixed
//! anchor date rather than "today" to keep output reproducible.

use chrono::{DateTime, Datelike, TimeZone, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{DataError, MarketDataSource};
use crate::domain::{Interval, Period, PriceBar, PriceSeries};

pub struct SyntheticSource {
    end: DateTime<Utc>,
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self {
            end: Utc
                .with_ymd_and_hms(2024, 12, 31, 0, 0, 0)
                .single()
                .unwrap_or_default(),
        }
    }

    /// Walk ending at `end` instead of the default anchor.
    pub fn ending_at(end: DateTime<Utc>) -> Self {
        Self { end }
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketDataSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<PriceSeries, DataError> {
        let bars = generate_walk(symbol, self.end, period, interval);
        if bars.is_empty() {
            return Err(DataError::no_data(symbol, "period shorter than one bar"));
        }
        Ok(PriceSeries::new(symbol, bars))
    }
}

pub fn generate_walk(
    symbol: &str,
    end: DateTime<Utc>,
    period: Period,
    interval: Interval,
) -> Vec<PriceBar> {
    // Deterministic seed from symbol name
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let start = end - chrono::Duration::days(period.approx_days());
    let step = chrono::Duration::days(interval.step_days());
    let mut bars = Vec::new();
    let mut price = 100.0_f64;
    let mut current = start;

    while current <= end {
        // Skip weekends (simple heuristic)
        if interval == Interval::Daily
            && matches!(current.weekday(), Weekday::Sat | Weekday::Sun)
        {
            current += step;
            continue;
        }

        let bar_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + bar_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        bars.push(PriceBar {
            timestamp: current,
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
        current += step;
    }

    bars
}
