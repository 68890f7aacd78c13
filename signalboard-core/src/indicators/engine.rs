//! IndicatorEngine: runs the standard indicator roster over a series.

use tracing::debug;

use super::set::{IndicatorName, IndicatorSet, IndicatorValue};
use super::{Bollinger, Ema, Indicator, Macd, Rsi, Sma};
use crate::domain::PriceSeries;

/// Window lengths for the standard roster.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorParams {
    pub rsi_period: usize,
    pub sma_short: usize,
    pub sma_medium: usize,
    pub sma_long: usize,
    pub ema_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_k: f64,
}

impl IndicatorParams {
    /// RSI 14, SMA 20/50/200, EMA 50, MACD 12/26/9, Bollinger 20 x 2.0.
    pub fn standard() -> Self {
        Self {
            rsi_period: 14,
            sma_short: 20,
            sma_medium: 50,
            sma_long: 200,
            ema_period: 50,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_period: 20,
            bollinger_k: 2.0,
        }
    }
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self::standard()
    }
}

pub struct IndicatorEngine {
    indicators: Vec<Box<dyn Indicator>>,
}

impl IndicatorEngine {
    pub fn new(params: &IndicatorParams) -> Self {
        let indicators: Vec<Box<dyn Indicator>> = vec![
            Box::new(Rsi::new(params.rsi_period)),
            Box::new(Sma::new(IndicatorName::Sma20, params.sma_short)),
            Box::new(Sma::new(IndicatorName::Sma50, params.sma_medium)),
            Box::new(Sma::new(IndicatorName::Sma200, params.sma_long)),
            Box::new(Ema::new(IndicatorName::Ema50, params.ema_period)),
            Box::new(Macd::new(
                params.macd_fast,
                params.macd_slow,
                params.macd_signal,
            )),
            Box::new(Bollinger::new(params.bollinger_period, params.bollinger_k)),
        ];
        Self { indicators }
    }

    pub fn standard() -> Self {
        Self::new(&IndicatorParams::standard())
    }

    /// Compute every indicator over the series' closes.
    ///
    /// An empty series yields an empty set. Otherwise every roster slot is
    /// filled, either with series or with an `Unavailable` marker when the
    /// history is too short or nothing could be derived.
    pub fn compute(&self, series: &PriceSeries) -> IndicatorSet {
        let mut set = IndicatorSet::new();
        if series.is_empty() {
            debug!(symbol = series.symbol(), "empty series, no indicators");
            return set;
        }

        let closes = series.closes();
        for indicator in &self.indicators {
            let value = evaluate(indicator.as_ref(), &closes);
            if let IndicatorValue::Unavailable { reason } = &value {
                debug!(
                    symbol = series.symbol(),
                    indicator = %indicator.name(),
                    reason = reason.as_str(),
                    "indicator unavailable"
                );
            }
            set.insert(indicator.name(), value);
        }
        set
    }
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::standard()
    }
}

fn evaluate(indicator: &dyn Indicator, closes: &[f64]) -> IndicatorValue {
    let need = indicator.min_bars();
    if closes.len() < need {
        return IndicatorValue::unavailable(format!(
            "need {need} bars, have {}",
            closes.len()
        ));
    }
    let value = indicator.compute(closes);
    if value.has_defined() {
        value
    } else {
        IndicatorValue::unavailable("no defined values")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_series};

    #[test]
    fn empty_series_gives_empty_set() {
        let set = IndicatorEngine::standard().compute(&PriceSeries::empty("X"));
        assert!(set.is_empty());
    }

    #[test]
    fn short_series_marks_long_windows_unavailable() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let set = IndicatorEngine::standard().compute(&make_series(&closes));

        assert_eq!(set.len(), 7);
        assert!(set.is_available(IndicatorName::Rsi));
        assert!(set.is_available(IndicatorName::Sma20));
        assert!(set.is_available(IndicatorName::Ema50));
        assert!(set.is_available(IndicatorName::Macd));
        assert!(set.is_available(IndicatorName::BollingerBands));
        assert!(!set.is_available(IndicatorName::Sma50));
        assert!(!set.is_available(IndicatorName::Sma200));

        let missing = set.unavailable();
        assert!(missing
            .iter()
            .any(|(name, reason)| *name == IndicatorName::Sma200 && *reason == "need 200 bars, have 30"));
    }

    #[test]
    fn macd_needs_slow_window() {
        let set = IndicatorEngine::standard().compute(&make_series(&[10.0; 25]));
        assert!(!set.is_available(IndicatorName::Macd));
        let set = IndicatorEngine::standard().compute(&make_series(&[10.0; 26]));
        assert!(set.is_available(IndicatorName::Macd));
    }

    #[test]
    fn full_history_fills_every_slot() {
        let closes: Vec<f64> = (0..252).map(|i| 100.0 + i as f64 * 100.0 / 251.0).collect();
        let set = IndicatorEngine::standard().compute(&make_series(&closes));

        assert!(set.unavailable().is_empty());
        assert_approx(set.latest(IndicatorName::Rsi).unwrap(), 100.0, 1e-9);
        assert!(set.latest(IndicatorName::Sma50).unwrap() > set.latest(IndicatorName::Sma200).unwrap());
        let sma20 = set.line(IndicatorName::Sma20).unwrap();
        assert_eq!(sma20.len(), 252);
        assert_eq!(sma20.defined_count(), 252 - 19);
    }

    #[test]
    fn single_bar_only_ema_available() {
        let set = IndicatorEngine::standard().compute(&make_series(&[42.0]));
        assert_eq!(set.latest(IndicatorName::Ema50), Some(42.0));
        assert_eq!(set.unavailable().len(), 6);
    }
}
