//! Indicator Engine.
//!
//! Each indicator is a pure function from a close-price slice to one or more
//! derived series aligned to that slice. Undefined warm-up positions are
//! `f64::NAN` inside the computations and become `None` once stored in an
//! [`IndicatorSet`], so a consumer can never mistake warm-up for zero.
//!
//! Indicators are independent: the engine computes each one in isolation and
//! degrades a failing indicator to [`IndicatorValue::Unavailable`] without
//! touching the others.

pub mod bollinger;
pub mod ema;
pub mod engine;
pub mod macd;
pub mod rsi;
pub mod set;
pub mod sma;

pub use bollinger::Bollinger;
pub use ema::Ema;
pub use engine::{IndicatorEngine, IndicatorParams};
pub use macd::Macd;
pub use rsi::Rsi;
pub use set::{BollingerBands, IndicatorName, IndicatorSet, IndicatorValue, Line, MacdLines};
pub use sma::Sma;

/// Trait for indicators.
///
/// `compute` receives the full close series and returns a value whose series
/// are the same length as the input. Implementations never fail: the engine
/// checks `min_bars` first and inspects the result for defined values.
///
/// # Look-ahead contamination guard
/// No output value at index t may depend on a close at t+1 or later.
pub trait Indicator: Send + Sync {
    /// Slot this indicator fills in an [`IndicatorSet`].
    fn name(&self) -> IndicatorName;

    /// Bars needed before the first defined value exists.
    fn min_bars(&self) -> usize;

    fn compute(&self, closes: &[f64]) -> IndicatorValue;
}

/// Create a daily series from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_series(closes: &[f64]) -> crate::domain::PriceSeries {
    use crate::domain::{PriceBar, PriceSeries};
    use chrono::TimeZone;

    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            PriceBar {
                timestamp: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect();
    PriceSeries::new("TEST", bars)
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
