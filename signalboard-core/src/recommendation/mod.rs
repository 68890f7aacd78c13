//! Recommendation Engine: threshold rules over indicators and risk.
//!
//! Rules run in a fixed order: RSI, SMA 50/200 cross, EMA 50 vs SMA 50,
//! MACD vs signal, then the risk override. The first directional proposal
//! sets the action; later proposals only add reasons. The risk override
//! may turn a Buy into a Hold and never does anything else.

pub mod advisory;

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::domain::PriceSeries;
use crate::indicators::{IndicatorName, IndicatorSet};
use crate::risk::RiskMetrics;

pub use advisory::{AdvisoryError, AdvisoryReply, AdvisoryRequest, AdvisoryService, RecentClose};

pub const RSI_OVERSOLD: f64 = 30.0;
pub const RSI_OVERBOUGHT: f64 = 70.0;
/// Annualized volatility above which a Buy is held back.
pub const MAX_BUY_VOLATILITY: f64 = 0.25;
/// Drawdown below which a Buy is held back.
pub const MIN_BUY_DRAWDOWN: f64 = -0.20;

pub const NEUTRAL_REASON: &str = "indicators neutral";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "Buy",
            Action::Sell => "Sell",
            Action::Hold => "Hold",
        }
    }

    /// Parse an externally supplied label. Only `Buy`, `Sell` and `Hold`
    /// (any case, surrounding whitespace ignored) are accepted.
    pub fn from_label(label: &str) -> Option<Action> {
        match label.trim().to_ascii_lowercase().as_str() {
            "buy" => Some(Action::Buy),
            "sell" => Some(Action::Sell),
            "hold" => Some(Action::Hold),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final verdict for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub action: Action,
    pub reasons: Vec<String>,
    pub ai_insights: Option<Vec<String>>,
    pub confidence_score: Option<f64>,
}

impl RecommendationResult {
    pub fn technical(action: Action, reasons: Vec<String>) -> Self {
        Self {
            action,
            reasons,
            ai_insights: None,
            confidence_score: None,
        }
    }
}

/// Technical recommendation plus what happened to the advisory call.
#[derive(Debug)]
pub struct Advised {
    pub result: RecommendationResult,
    /// Set when the advisory call failed and the technical verdict was kept.
    pub degraded: Option<AdvisoryError>,
}

/// Accumulates proposals. The first directional proposal wins the action;
/// every proposal's reason is kept in order.
#[derive(Debug, Default)]
struct Ballot {
    action: Option<Action>,
    reasons: Vec<String>,
}

impl Ballot {
    fn propose(&mut self, action: Action, reason: String) {
        match self.action {
            None => self.action = Some(action),
            Some(current) if current != action => {
                debug!(%current, proposed = %action, "opposing proposal recorded only");
            }
            Some(_) => {}
        }
        self.reasons.push(reason);
    }
}

/// Turn a Buy into a Hold when volatility or drawdown is past its limit.
/// Any other action passes through. A reason already present is not repeated.
fn apply_risk_override(action: Action, risk: &RiskMetrics, reasons: &mut Vec<String>) -> Action {
    let mut held = Vec::new();
    if risk.volatility > MAX_BUY_VOLATILITY {
        held.push(format!(
            "Buy held back: volatility {:.2}% above {:.0}%",
            risk.volatility * 100.0,
            MAX_BUY_VOLATILITY * 100.0
        ));
    }
    if risk.max_drawdown < MIN_BUY_DRAWDOWN {
        held.push(format!(
            "Buy held back: max drawdown {:.2}% below {:.0}%",
            risk.max_drawdown * 100.0,
            MIN_BUY_DRAWDOWN * 100.0
        ));
    }
    if action != Action::Buy || held.is_empty() {
        return action;
    }
    for reason in held {
        if !reasons.contains(&reason) {
            reasons.push(reason);
        }
    }
    Action::Hold
}

#[derive(Debug, Clone, Default)]
pub struct RecommendationEngine;

impl RecommendationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Rule-based verdict. Missing or unavailable indicators are skipped.
    pub fn recommend(&self, indicators: &IndicatorSet, risk: &RiskMetrics) -> RecommendationResult {
        let mut ballot = Ballot::default();

        if let Some(rsi) = indicators.latest(IndicatorName::Rsi) {
            if rsi < RSI_OVERSOLD {
                ballot.propose(Action::Buy, format!("RSI oversold ({rsi:.2} < {RSI_OVERSOLD})"));
            } else if rsi > RSI_OVERBOUGHT {
                ballot.propose(
                    Action::Sell,
                    format!("RSI overbought ({rsi:.2} > {RSI_OVERBOUGHT})"),
                );
            }
        }

        if let (Some(short), Some(long)) = (
            indicators.latest(IndicatorName::Sma50),
            indicators.latest(IndicatorName::Sma200),
        ) {
            if short > long {
                ballot.propose(
                    Action::Buy,
                    format!("golden cross (SMA 50 {short:.2} > SMA 200 {long:.2})"),
                );
            } else if short < long {
                ballot.propose(
                    Action::Sell,
                    format!("death cross (SMA 50 {short:.2} < SMA 200 {long:.2})"),
                );
            }
        }

        if let (Some(ema), Some(sma)) = (
            indicators.latest(IndicatorName::Ema50),
            indicators.latest(IndicatorName::Sma50),
        ) {
            if ema > sma {
                ballot.propose(
                    Action::Buy,
                    format!("EMA 50 above SMA 50 ({ema:.2} > {sma:.2})"),
                );
            } else {
                ballot.propose(
                    Action::Sell,
                    format!("EMA 50 at or below SMA 50 ({ema:.2} <= {sma:.2})"),
                );
            }
        }

        if let Some(macd) = indicators.macd() {
            if let (Some(line), Some(signal)) = (macd.latest_line(), macd.latest_signal()) {
                if line > signal {
                    ballot.propose(
                        Action::Buy,
                        format!("MACD above signal ({line:.4} > {signal:.4})"),
                    );
                } else {
                    ballot.propose(
                        Action::Sell,
                        format!("MACD at or below signal ({line:.4} <= {signal:.4})"),
                    );
                }
            }
        }

        let Ballot { action, mut reasons } = ballot;
        let Some(action) = action else {
            return RecommendationResult::technical(Action::Hold, vec![NEUTRAL_REASON.to_string()]);
        };
        let action = apply_risk_override(action, risk, &mut reasons);

        RecommendationResult::technical(action, reasons)
    }

    /// Rule-based verdict, then an advisory pass over it.
    ///
    /// The advisory call never fails the recommendation: any error keeps the
    /// technical action, adds a placeholder insight and drops confidence.
    pub fn recommend_with_advisory(
        &self,
        series: &PriceSeries,
        indicators: &IndicatorSet,
        risk: &RiskMetrics,
        history_bars: usize,
        service: &dyn AdvisoryService,
    ) -> Advised {
        let technical = self.recommend(indicators, risk);
        let request = AdvisoryRequest::build(series, indicators, risk, &technical, history_bars);

        match service.advise(&request).and_then(|raw| AdvisoryReply::parse(&raw)) {
            Ok(reply) => {
                let mut result = reply.merge_into(technical);
                result.action = apply_risk_override(result.action, risk, &mut result.reasons);
                Advised {
                    result,
                    degraded: None,
                }
            }
            Err(err) => {
                warn!(symbol = series.symbol(), error = %err, "advisory degraded to technical verdict");
                Advised {
                    result: advisory::degrade(technical, &err),
                    degraded: Some(err),
                }
            }
        }
    }
}
