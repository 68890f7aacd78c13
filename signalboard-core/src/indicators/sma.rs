//! Simple Moving Average (SMA).
//!
//! Rolling mean of close prices over a lookback window.
//! First defined value at index period-1.

use super::set::{IndicatorName, IndicatorValue, Line};
use super::Indicator;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: IndicatorName,
}

impl Sma {
    /// SMA over `period` bars, stored under `name`.
    pub fn new(name: IndicatorName, period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self { period, name }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Sma {
    fn name(&self) -> IndicatorName {
        self.name
    }

    fn min_bars(&self) -> usize {
        self.period
    }

    fn compute(&self, closes: &[f64]) -> IndicatorValue {
        IndicatorValue::Line(Line::from_raw(sma_of_series(closes, self.period)))
    }
}

/// Rolling mean with NaN propagation: any NaN inside a window makes that
/// position NaN.
pub fn sma_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period {
        return result;
    }

    let mut sum = 0.0;
    let mut nan_in_window = false;
    for &v in values.iter().take(period) {
        if v.is_nan() {
            nan_in_window = true;
        }
        sum += v;
    }

    if !nan_in_window {
        result[period - 1] = sum / period as f64;
    }

    for i in period..n {
        let leaving = values[i - period];
        let entering = values[i];
        sum = sum - leaving + entering;

        // A NaN poisons the running sum, so rescan the window when one is near.
        if entering.is_nan() || leaving.is_nan() || nan_in_window {
            nan_in_window = false;
            sum = 0.0;
            for &v in &values[(i + 1 - period)..=i] {
                if v.is_nan() {
                    nan_in_window = true;
                }
                sum += v;
            }
            if nan_in_window {
                continue;
            }
        }

        result[i] = sum / period as f64;
    }

    result
}
