//! Signalboard Core: indicator, risk and recommendation engines, market data.
//!
//! This crate contains the domain logic of the dashboard:
//! - Domain types (bars, series, period and interval codes)
//! - Indicator engine (RSI, SMA, EMA, MACD, Bollinger Bands)
//! - Risk engine (volatility, drawdown, VaR, sizing, risk level)
//! - Recommendation engine (threshold voting plus optional advisory pass)
//! - Market data sources (Yahoo chart API, CSV files, synthetic walk)
//! - Lifecycle events and the observer trait
//!
//! Everything except the data sources is a pure function of its inputs.

pub mod data;
pub mod domain;
pub mod events;
pub mod fingerprint;
pub mod indicators;
pub mod recommendation;
pub mod risk;
pub mod summary;

pub use domain::{Interval, Period, PriceBar, PriceSeries};
pub use indicators::{IndicatorEngine, IndicatorName, IndicatorSet};
pub use recommendation::{Action, RecommendationEngine, RecommendationResult};
pub use risk::{RiskEngine, RiskLevel, RiskMetrics, RiskParams};
pub use summary::{MarketSummary, SectorPerformance};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: records and engines are Send + Sync so a caller
    /// can move a batch onto a worker thread.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<PriceBar>();
        require_sync::<PriceBar>();
        require_send::<PriceSeries>();
        require_sync::<PriceSeries>();

        // Result records
        require_send::<IndicatorSet>();
        require_sync::<IndicatorSet>();
        require_send::<RiskMetrics>();
        require_sync::<RiskMetrics>();
        require_send::<RecommendationResult>();
        require_sync::<RecommendationResult>();
        require_send::<MarketSummary>();
        require_sync::<MarketSummary>();
        require_send::<events::PipelineEvent>();
        require_sync::<events::PipelineEvent>();

        // Engines
        require_send::<IndicatorEngine>();
        require_sync::<IndicatorEngine>();
        require_send::<RiskEngine>();
        require_sync::<RiskEngine>();
        require_send::<RecommendationEngine>();
        require_sync::<RecommendationEngine>();

        // Data sources
        require_send::<data::YahooChartSource>();
        require_sync::<data::YahooChartSource>();
        require_send::<data::CsvSource>();
        require_sync::<data::CsvSource>();
        require_send::<data::SyntheticSource>();
        require_sync::<data::SyntheticSource>();
    }

    /// Architecture contract: engines only read the series.
    ///
    /// Every engine entry point takes `&PriceSeries`; none can mutate the
    /// caller's copy to stash derived columns.
    #[test]
    fn engines_take_series_by_shared_reference() {
        fn _check(
            indicators: &IndicatorEngine,
            risk: &RiskEngine,
            series: &PriceSeries,
        ) -> (IndicatorSet, RiskMetrics) {
            (indicators.compute(series), risk.assess(series, 1.0))
        }
    }
}
