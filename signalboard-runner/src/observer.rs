//! Observers that ship with the runner.

use std::sync::Mutex;

use tracing::{debug, info, warn};

use signalboard_core::events::{PipelineEvent, PipelineObserver};

/// Forwards every lifecycle event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::Started { symbol, index, total } => {
                info!(%symbol, position = index + 1, total, "analyzing");
            }
            PipelineEvent::IndicatorUnavailable {
                symbol,
                indicator,
                reason,
            } => {
                debug!(%symbol, indicator = indicator.as_str(), %reason, "indicator unavailable");
            }
            PipelineEvent::FetchFailed { symbol, reason } => {
                warn!(%symbol, %reason, "fetch failed, symbol skipped");
            }
            PipelineEvent::AdvisoryDegraded { symbol, reason } => {
                warn!(%symbol, %reason, "advisory unavailable, technical verdict kept");
            }
            PipelineEvent::Completed {
                symbol,
                action,
                risk_level,
            } => {
                info!(%symbol, %action, %risk_level, "completed");
            }
            PipelineEvent::BatchCompleted {
                succeeded,
                failed,
                total,
            } => {
                info!(succeeded, failed, total, "batch completed");
            }
        }
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events seen so far.
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl PipelineObserver for RecordingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        let mut events = self
            .events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        events.push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_observer_keeps_order() {
        let observer = RecordingObserver::new();
        observer.on_event(&PipelineEvent::Started {
            symbol: "A".into(),
            index: 0,
            total: 2,
        });
        observer.on_event(&PipelineEvent::FetchFailed {
            symbol: "A".into(),
            reason: "offline".into(),
        });
        let events = observer.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], PipelineEvent::FetchFailed { .. }));
    }

    #[test]
    fn tracing_observer_accepts_every_event() {
        TracingObserver.on_event(&PipelineEvent::BatchCompleted {
            succeeded: 1,
            failed: 0,
            total: 1,
        });
    }
}
