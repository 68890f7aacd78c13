//! Advisory augmentation: the optional second opinion from a language model.
//!
//! The service only sees a compact request and returns raw text. Everything
//! it says is validated here before it can touch a recommendation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

use super::{Action, RecommendationResult};
use crate::domain::PriceSeries;
use crate::indicators::{IndicatorName, IndicatorSet};
use crate::risk::{RiskLevel, RiskMetrics};

/// Upper bound on insights kept from one reply.
pub const MAX_INSIGHTS: usize = 3;

#[derive(Debug, Error)]
pub enum AdvisoryError {
    #[error("environment variable {0} is not set")]
    MissingCredential(String),

    #[error("credential rejected by advisory service")]
    InvalidCredential,

    #[error("advisory service rate limit exceeded")]
    RateLimited,

    #[error("advisory service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("advisory transport error: {0}")]
    Transport(String),

    #[error("malformed advisory reply: {0}")]
    Malformed(String),
}

/// External advisor. Implementations return the raw reply text, which is
/// expected to hold a JSON object `{action, insights, confidence_score}`.
pub trait AdvisoryService {
    fn advise(&self, request: &AdvisoryRequest) -> Result<String, AdvisoryError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentClose {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

/// Compact summary sent to the advisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryRequest {
    pub symbol: String,
    /// Latest defined value per indicator part, keyed by display name.
    pub latest: BTreeMap<String, f64>,
    pub volatility: f64,
    pub max_drawdown: f64,
    pub risk_level: RiskLevel,
    pub technical_action: Action,
    pub technical_reasons: Vec<String>,
    pub recent_closes: Vec<RecentClose>,
}

impl AdvisoryRequest {
    pub fn build(
        series: &PriceSeries,
        indicators: &IndicatorSet,
        risk: &RiskMetrics,
        technical: &RecommendationResult,
        history_bars: usize,
    ) -> Self {
        let mut latest = BTreeMap::new();
        for name in [
            IndicatorName::Rsi,
            IndicatorName::Sma50,
            IndicatorName::Sma200,
            IndicatorName::Ema50,
        ] {
            if let Some(v) = indicators.latest(name) {
                latest.insert(name.to_string(), v);
            }
        }
        if let Some(macd) = indicators.macd() {
            if let Some(v) = macd.latest_line() {
                latest.insert("MACD line".to_string(), v);
            }
            if let Some(v) = macd.latest_signal() {
                latest.insert("MACD signal".to_string(), v);
            }
        }
        if let Some(bands) = indicators.bollinger() {
            for (label, value) in [
                ("Bollinger upper", bands.latest_upper()),
                ("Bollinger middle", bands.latest_middle()),
                ("Bollinger lower", bands.latest_lower()),
            ] {
                if let Some(v) = value {
                    latest.insert(label.to_string(), v);
                }
            }
        }

        let recent_closes = series
            .tail(history_bars)
            .bars()
            .iter()
            .map(|b| RecentClose {
                timestamp: b.timestamp,
                close: b.close,
            })
            .collect();

        Self {
            symbol: series.symbol().to_string(),
            latest,
            volatility: risk.volatility,
            max_drawdown: risk.max_drawdown,
            risk_level: risk.risk_level,
            technical_action: technical.action,
            technical_reasons: technical.reasons.clone(),
            recent_closes,
        }
    }

    /// System instruction for chat-style advisors.
    pub fn system_prompt() -> &'static str {
        "You are a cautious equity analyst. Reply with a single JSON object and nothing else: \
         {\"action\": \"Buy\" | \"Sell\" | \"Hold\", \"insights\": [2-3 short strings], \
         \"confidence_score\": number between 0 and 1}."
    }

    /// User message describing this symbol.
    pub fn prompt(&self) -> String {
        let mut out = format!("Symbol: {}\n", self.symbol);
        out.push_str("Latest indicators:\n");
        for (name, value) in &self.latest {
            out.push_str(&format!("- {name}: {value:.4}\n"));
        }
        out.push_str(&format!(
            "Risk: volatility {:.2}%, max drawdown {:.2}%, level {}\n",
            self.volatility * 100.0,
            self.max_drawdown * 100.0,
            self.risk_level
        ));
        out.push_str(&format!("Technical verdict: {}\n", self.technical_action));
        for reason in &self.technical_reasons {
            out.push_str(&format!("- {reason}\n"));
        }
        if !self.recent_closes.is_empty() {
            let closes: Vec<String> = self
                .recent_closes
                .iter()
                .map(|c| format!("{} {:.2}", c.timestamp.format("%Y-%m-%d"), c.close))
                .collect();
            out.push_str(&format!("Recent closes: {}\n", closes.join(", ")));
        }
        out
    }
}

/// Validated advisor reply.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvisoryReply {
    /// `None` when the reply's action was missing or not Buy/Sell/Hold.
    pub action: Option<Action>,
    pub insights: Vec<String>,
    /// Only kept when numeric and within [0, 1].
    pub confidence_score: Option<f64>,
}

impl AdvisoryReply {
    /// Extract and sanitize the JSON object in `raw`. Markdown code fences
    /// and text around the object are tolerated. A reply without at least
    /// one non-blank insight is malformed.
    pub fn parse(raw: &str) -> Result<Self, AdvisoryError> {
        let start = raw
            .find('{')
            .ok_or_else(|| AdvisoryError::Malformed("no JSON object in reply".to_string()))?;
        let end = raw
            .rfind('}')
            .filter(|&end| end > start)
            .ok_or_else(|| AdvisoryError::Malformed("unterminated JSON object".to_string()))?;

        let value: Value = serde_json::from_str(&raw[start..=end])
            .map_err(|e| AdvisoryError::Malformed(e.to_string()))?;
        let object = value
            .as_object()
            .ok_or_else(|| AdvisoryError::Malformed("reply is not a JSON object".to_string()))?;

        let action = match object.get("action") {
            Some(Value::String(label)) => {
                let parsed = Action::from_label(label);
                if parsed.is_none() {
                    warn!(label = label.as_str(), "advisory action rejected");
                }
                parsed
            }
            _ => None,
        };

        let insights = match object.get("insights") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .take(MAX_INSIGHTS)
                .map(str::to_string)
                .collect(),
            Some(Value::String(single)) if !single.trim().is_empty() => {
                vec![single.trim().to_string()]
            }
            _ => Vec::new(),
        };
        if insights.is_empty() {
            return Err(AdvisoryError::Malformed("reply has no insights".to_string()));
        }

        let confidence_score = object
            .get("confidence_score")
            .and_then(Value::as_f64)
            .filter(|c| (0.0..=1.0).contains(c));

        Ok(Self {
            action,
            insights,
            confidence_score,
        })
    }

    /// Overlay the reply on the technical verdict. An invalid action falls
    /// back to the technical one; reasons are never replaced. The caller
    /// still owes the risk override on the merged action.
    pub fn merge_into(self, technical: RecommendationResult) -> RecommendationResult {
        RecommendationResult {
            action: self.action.unwrap_or(technical.action),
            reasons: technical.reasons,
            ai_insights: Some(self.insights),
            confidence_score: self.confidence_score,
        }
    }
}

/// Technical verdict with a placeholder insight explaining the failure.
pub fn degrade(technical: RecommendationResult, err: &AdvisoryError) -> RecommendationResult {
    RecommendationResult {
        ai_insights: Some(vec![format!("AI analysis unavailable: {err}")]),
        confidence_score: None,
        ..technical
    }
}
