//! Lifecycle events emitted while a batch of symbols is analyzed.
//!
//! The pipeline owns no status board: it hands each event to a
//! [`PipelineObserver`] supplied by the caller.

use serde::Serialize;

use crate::indicators::IndicatorName;
use crate::recommendation::Action;
use crate::risk::RiskLevel;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    Started {
        symbol: String,
        index: usize,
        total: usize,
    },
    IndicatorUnavailable {
        symbol: String,
        indicator: IndicatorName,
        reason: String,
    },
    FetchFailed {
        symbol: String,
        reason: String,
    },
    AdvisoryDegraded {
        symbol: String,
        reason: String,
    },
    Completed {
        symbol: String,
        action: Action,
        risk_level: RiskLevel,
    },
    BatchCompleted {
        succeeded: usize,
        failed: usize,
        total: usize,
    },
}

impl PipelineEvent {
    /// Symbol the event concerns; `None` for batch-level events.
    pub fn symbol(&self) -> Option<&str> {
        match self {
            PipelineEvent::Started { symbol, .. }
            | PipelineEvent::IndicatorUnavailable { symbol, .. }
            | PipelineEvent::FetchFailed { symbol, .. }
            | PipelineEvent::AdvisoryDegraded { symbol, .. }
            | PipelineEvent::Completed { symbol, .. } => Some(symbol),
            PipelineEvent::BatchCompleted { .. } => None,
        }
    }
}

/// Subscriber to pipeline lifecycle events.
pub trait PipelineObserver: Send {
    fn on_event(&self, event: &PipelineEvent);
}

/// Observer that ignores every event.
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {
    fn on_event(&self, _event: &PipelineEvent) {}
}
