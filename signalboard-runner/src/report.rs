//! Per-symbol and batch result records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use signalboard_core::fingerprint::{ConfigHash, DatasetHash};
use signalboard_core::{IndicatorSet, MarketSummary, RecommendationResult, RiskMetrics};

/// Current schema version for exported batches.
pub const SCHEMA_VERSION: u32 = 1;

/// Everything computed for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolReport {
    pub symbol: String,
    pub bars: usize,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub indicators: IndicatorSet,
    pub risk: RiskMetrics,
    pub recommendation: RecommendationResult,
    pub summary: MarketSummary,
    pub dataset_hash: DatasetHash,
    pub config_hash: ConfigHash,
}

/// Result of one symbol's pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SymbolOutcome {
    Analyzed(Box<SymbolReport>),
    Failed { symbol: String, reason: String },
}

impl SymbolOutcome {
    pub fn symbol(&self) -> &str {
        match self {
            SymbolOutcome::Analyzed(report) => &report.symbol,
            SymbolOutcome::Failed { symbol, .. } => symbol,
        }
    }

    pub fn report(&self) -> Option<&SymbolReport> {
        match self {
            SymbolOutcome::Analyzed(report) => Some(report),
            SymbolOutcome::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SymbolOutcome::Failed { .. })
    }
}

/// All outcomes of one batch, in request order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    pub config_hash: ConfigHash,
    pub outcomes: Vec<SymbolOutcome>,
    pub succeeded: usize,
    pub failed: usize,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BatchReport {
    pub fn new(config_hash: ConfigHash, outcomes: Vec<SymbolOutcome>) -> Self {
        let failed = outcomes.iter().filter(|o| o.is_failed()).count();
        Self {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            config_hash,
            succeeded: outcomes.len() - failed,
            failed,
            outcomes,
        }
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// True when there was at least one symbol and none succeeded.
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.succeeded == 0
    }

    pub fn reports(&self) -> impl Iterator<Item = &SymbolReport> {
        self.outcomes.iter().filter_map(SymbolOutcome::report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(symbol: &str) -> SymbolOutcome {
        SymbolOutcome::Failed {
            symbol: symbol.into(),
            reason: "no data".into(),
        }
    }

    #[test]
    fn counts_failures() {
        let batch = BatchReport::new(ConfigHash("abc".into()), vec![failed("A"), failed("B")]);
        assert_eq!(batch.failed, 2);
        assert_eq!(batch.succeeded, 0);
        assert!(batch.all_failed());
        assert_eq!(batch.reports().count(), 0);
    }

    #[test]
    fn empty_batch_is_not_all_failed() {
        let batch = BatchReport::new(ConfigHash("abc".into()), vec![]);
        assert!(!batch.all_failed());
        assert_eq!(batch.total(), 0);
    }

    #[test]
    fn failed_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(failed("ZZZZ")).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["symbol"], "ZZZZ");
    }
}
