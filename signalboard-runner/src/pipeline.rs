//! Pipeline orchestrator: fetch → indicators → risk → recommendation, one
//! symbol at a time.
//!
//! A symbol is the unit of failure. A fetch error becomes a
//! [`SymbolOutcome::Failed`] marker and the batch moves on; an advisory error
//! degrades that symbol to its technical verdict. [`PipelineError`] is only
//! returned while wiring the pipeline up, never from [`Pipeline::run`].

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use signalboard_core::data::{CsvSource, DataError, MarketDataSource, SyntheticSource, YahooChartSource};
use signalboard_core::events::{PipelineEvent, PipelineObserver};
use signalboard_core::fingerprint::{ConfigHash, DatasetHash};
use signalboard_core::recommendation::{AdvisoryError, AdvisoryRequest, AdvisoryService};
use signalboard_core::summary::{self, SECTOR_ETFS};
use signalboard_core::{
    IndicatorEngine, MarketSummary, PriceSeries, RecommendationEngine, RiskEngine,
    SectorPerformance,
};

use crate::advisory_client::OpenAiAdvisor;
use crate::config::{AdvisoryConfig, ConfigError, PipelineConfig, SourceConfig, SourceKind};
use crate::report::{BatchReport, SymbolOutcome, SymbolReport};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("cannot set up {source_kind} data source: {reason}")]
    Source { source_kind: &'static str, reason: String },
    #[error("cannot set up advisory client: {0}")]
    Advisory(AdvisoryError),
}

/// Build the market data source named by `config.kind`.
pub fn build_source(config: &SourceConfig) -> Result<Box<dyn MarketDataSource>, PipelineError> {
    match config.kind {
        SourceKind::Yahoo => {
            let source = YahooChartSource::new(Duration::from_secs(config.timeout_secs)).map_err(
                |e: DataError| PipelineError::Source {
                    source_kind: SourceKind::Yahoo.as_str(),
                    reason: e.to_string(),
                },
            )?;
            Ok(Box::new(source))
        }
        SourceKind::Csv => Ok(Box::new(CsvSource::new(config.csv_dir.clone()))),
        SourceKind::Synthetic => Ok(Box::new(SyntheticSource::new())),
    }
}

/// Build the advisory client, or `None` when advisory is disabled.
///
/// A missing API key is not a wiring failure: the returned service fails
/// every call with `MissingCredential`, so each symbol degrades to its
/// technical verdict with an explanatory insight.
pub fn build_advisor(
    config: &AdvisoryConfig,
) -> Result<Option<Box<dyn AdvisoryService>>, PipelineError> {
    if !config.enabled {
        return Ok(None);
    }
    match OpenAiAdvisor::from_config(config) {
        Ok(client) => Ok(Some(Box::new(client))),
        Err(AdvisoryError::MissingCredential(var)) => {
            warn!(env_var = %var, "advisory enabled but no API key set");
            Ok(Some(Box::new(MissingCredential(var))))
        }
        Err(other) => Err(PipelineError::Advisory(other)),
    }
}

/// Stand-in advisor used when the credential is absent.
struct MissingCredential(String);

impl AdvisoryService for MissingCredential {
    fn advise(&self, _request: &AdvisoryRequest) -> Result<String, AdvisoryError> {
        Err(AdvisoryError::MissingCredential(self.0.clone()))
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    config_hash: ConfigHash,
    source: Box<dyn MarketDataSource>,
    advisor: Option<Box<dyn AdvisoryService>>,
    indicators: IndicatorEngine,
    risk: RiskEngine,
    recommender: RecommendationEngine,
}

impl Pipeline {
    /// Pipeline over `source` with no advisory pass.
    pub fn new(config: PipelineConfig, source: Box<dyn MarketDataSource>) -> Result<Self, PipelineError> {
        config.validate()?;
        let config_hash = config.config_hash()?;
        let risk = RiskEngine::new(config.risk.clone());
        Ok(Self {
            config,
            config_hash,
            source,
            advisor: None,
            indicators: IndicatorEngine::standard(),
            risk,
            recommender: RecommendationEngine::new(),
        })
    }

    /// Pipeline with the source and advisor the config asks for.
    pub fn from_config(config: PipelineConfig) -> Result<Self, PipelineError> {
        let source = build_source(&config.source)?;
        let advisor = build_advisor(&config.advisory)?;
        let mut pipeline = Self::new(config, source)?;
        pipeline.advisor = advisor;
        Ok(pipeline)
    }

    pub fn with_advisor(mut self, advisor: Box<dyn AdvisoryService>) -> Self {
        self.advisor = Some(advisor);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn config_hash(&self) -> &ConfigHash {
        &self.config_hash
    }

    /// Analyze every configured symbol in order.
    pub fn run(&self, observer: &dyn PipelineObserver) -> BatchReport {
        let symbols = self.config.normalized_symbols();
        let total = symbols.len();
        info!(
            total,
            source = self.source.name(),
            period = self.config.period.as_str(),
            interval = self.config.interval.as_str(),
            advisory = self.advisor.is_some(),
            "batch started"
        );

        let outcomes: Vec<SymbolOutcome> = symbols
            .iter()
            .enumerate()
            .map(|(index, symbol)| self.analyze_symbol(symbol, index, total, observer))
            .collect();

        let batch = BatchReport::new(self.config_hash.clone(), outcomes);
        observer.on_event(&PipelineEvent::BatchCompleted {
            succeeded: batch.succeeded,
            failed: batch.failed,
            total: batch.total(),
        });
        batch
    }

    /// Sector ETF returns over the configured period and interval.
    pub fn sector_performance(&self) -> Vec<SectorPerformance> {
        info!(source = self.source.name(), "sector table requested");
        summary::sector_performance(
            self.source.as_ref(),
            &SECTOR_ETFS,
            self.config.period,
            self.config.interval,
        )
    }

    /// Fetch and analyze one symbol. Never fails: errors become markers.
    pub fn analyze_symbol(
        &self,
        symbol: &str,
        index: usize,
        total: usize,
        observer: &dyn PipelineObserver,
    ) -> SymbolOutcome {
        observer.on_event(&PipelineEvent::Started {
            symbol: symbol.to_string(),
            index,
            total,
        });

        let series = match self.source.fetch(symbol, self.config.period, self.config.interval) {
            Ok(series) => series,
            Err(err) if err.is_malformed_input() => {
                warn!(%symbol, error = %err, "unrecognized columns, analyzing as empty series");
                PriceSeries::empty(symbol)
            }
            Err(err) => {
                let reason = err.to_string();
                observer.on_event(&PipelineEvent::FetchFailed {
                    symbol: symbol.to_string(),
                    reason: reason.clone(),
                });
                return SymbolOutcome::Failed {
                    symbol: symbol.to_string(),
                    reason,
                };
            }
        };

        let report = self.analyze_series(&series, observer);
        observer.on_event(&PipelineEvent::Completed {
            symbol: report.symbol.clone(),
            action: report.recommendation.action,
            risk_level: report.risk.risk_level,
        });
        SymbolOutcome::Analyzed(Box::new(report))
    }

    /// Run the engines over an already-loaded series.
    pub fn analyze_series(&self, series: &PriceSeries, observer: &dyn PipelineObserver) -> SymbolReport {
        let symbol = series.symbol();
        debug!(%symbol, bars = series.len(), "series loaded");

        let indicators = self.indicators.compute(series);
        for (indicator, reason) in indicators.unavailable() {
            observer.on_event(&PipelineEvent::IndicatorUnavailable {
                symbol: symbol.to_string(),
                indicator,
                reason: reason.to_string(),
            });
        }

        let risk = self.risk.assess(series, self.config.account_balance);

        let recommendation = match self.advisor.as_deref() {
            // Nothing to show an advisor without price history.
            Some(advisor) if !series.is_empty() => {
                let advised = self.recommender.recommend_with_advisory(
                    series,
                    &indicators,
                    &risk,
                    self.config.advisory.history_bars,
                    advisor,
                );
                if let Some(err) = &advised.degraded {
                    observer.on_event(&PipelineEvent::AdvisoryDegraded {
                        symbol: symbol.to_string(),
                        reason: err.to_string(),
                    });
                }
                advised.result
            }
            _ => self.recommender.recommend(&indicators, &risk),
        };

        SymbolReport {
            symbol: symbol.to_string(),
            bars: series.len(),
            first_timestamp: series.first_timestamp(),
            last_timestamp: series.last_timestamp(),
            summary: MarketSummary::compute(series, self.config.interval),
            dataset_hash: DatasetHash::of_series(series),
            config_hash: self.config_hash.clone(),
            indicators,
            risk,
            recommendation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::RecordingObserver;
    use signalboard_core::Action;

    #[test]
    fn disabled_advisory_builds_nothing() {
        assert!(build_advisor(&AdvisoryConfig::default()).unwrap().is_none());
    }

    #[test]
    fn missing_key_still_builds_a_degrading_advisor() {
        let config = AdvisoryConfig {
            enabled: true,
            api_key_env: "SIGNALBOARD_PIPELINE_TEST_KEY_UNSET".into(),
            ..AdvisoryConfig::default()
        };
        assert!(build_advisor(&config).unwrap().is_some());
    }

    #[test]
    fn synthetic_batch_completes() {
        let config = PipelineConfig {
            symbols: vec!["AAPL".into(), "msft".into()],
            period: signalboard_core::Period::OneYear,
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::new(config, Box::new(SyntheticSource::new())).unwrap();
        let observer = RecordingObserver::new();
        let batch = pipeline.run(&observer);

        assert_eq!(batch.succeeded, 2);
        assert_eq!(batch.outcomes[1].symbol(), "MSFT");
        let events = observer.events();
        assert!(matches!(events.first(), Some(PipelineEvent::Started { index: 0, total: 2, .. })));
        assert!(matches!(events.last(), Some(PipelineEvent::BatchCompleted { succeeded: 2, .. })));
    }

    #[test]
    fn missing_credential_degrades_each_symbol() {
        let config = PipelineConfig {
            symbols: vec!["AAPL".into()],
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::new(config, Box::new(SyntheticSource::new()))
            .unwrap()
            .with_advisor(Box::new(MissingCredential("OPENAI_API_KEY".into())));
        let observer = RecordingObserver::new();
        let batch = pipeline.run(&observer);

        let report = batch.outcomes[0].report().unwrap();
        assert!(report.recommendation.confidence_score.is_none());
        let insights = report.recommendation.ai_insights.clone().unwrap();
        assert!(insights[0].starts_with("AI analysis unavailable"));
        assert!(matches!(report.recommendation.action, Action::Buy | Action::Sell | Action::Hold));
        assert!(observer
            .events()
            .iter()
            .any(|e| matches!(e, PipelineEvent::AdvisoryDegraded { .. })));
    }
}
