//! Risk Engine: volatility, drawdown, VaR, position sizing and a coarse
//! risk level for one price series.
//!
//! Every metric is a pure function of the close series (plus the account
//! balance where money is involved). Returns are derived locally per call;
//! the input series is never touched.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::domain::PriceSeries;

/// Annualization constant for volatility. Applied to every interval.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Ordinal risk classification. `Low < Medium < High < VeryHigh`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::VeryHigh => "Very High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sizing and VaR constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskParams {
    /// Fraction of the account risked on one trade.
    pub risk_per_trade: f64,
    /// Stop distance as a fraction of the entry price.
    pub stop_loss_fraction: f64,
    /// One-sided z-score for the parametric VaR (1.65 ≈ 95%).
    pub var_z_score: f64,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            risk_per_trade: 0.02,
            stop_loss_fraction: 0.02,
            var_z_score: 1.65,
        }
    }
}

/// Risk statistics for one series. All zero and `Low` for an empty series.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub volatility: f64,
    pub max_drawdown: f64,
    pub value_at_risk: f64,
    pub position_size: f64,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Default)]
pub struct RiskEngine {
    params: RiskParams,
}

impl RiskEngine {
    pub fn new(params: RiskParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &RiskParams {
        &self.params
    }

    pub fn assess(&self, series: &PriceSeries, account_balance: f64) -> RiskMetrics {
        if series.is_empty() {
            return RiskMetrics::default();
        }

        let closes = series.closes();
        let returns = simple_returns(&closes);
        let volatility = annualized_volatility(&returns);
        let max_drawdown = max_drawdown(&returns);
        let latest_close = series.latest_close().unwrap_or(0.0);

        let metrics = RiskMetrics {
            volatility,
            max_drawdown,
            value_at_risk: value_at_risk(account_balance, volatility, self.params.var_z_score),
            position_size: position_size(
                account_balance,
                latest_close,
                self.params.risk_per_trade,
                self.params.stop_loss_fraction,
            ),
            risk_level: classify_risk(volatility, max_drawdown),
        };
        debug!(
            symbol = series.symbol(),
            volatility = metrics.volatility,
            max_drawdown = metrics.max_drawdown,
            risk_level = %metrics.risk_level,
            "risk assessed"
        );
        metrics
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Bar-over-bar percentage change. The undefined first return is omitted,
/// so the output has `closes.len() - 1` elements. A non-positive previous
/// close yields a 0.0 return.
pub fn simple_returns(closes: &[f64]) -> Vec<f64> {
    if closes.len() < 2 {
        return Vec::new();
    }
    closes
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

/// Sample standard deviation (N - 1). 0.0 for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Sample stdev of returns scaled by √252.
pub fn annualized_volatility(returns: &[f64]) -> f64 {
    sample_std_dev(returns) * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Most negative drawdown of the compounded return curve, always <= 0.
///
/// The curve starts at the first compounded return, C[0] = 1 + r[0], and
/// the running peak starts there too.
pub fn max_drawdown(returns: &[f64]) -> f64 {
    let mut cumulative = 1.0;
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;

    for r in returns {
        cumulative *= 1.0 + r;
        if cumulative > peak {
            peak = cumulative;
        }
        if peak > 0.0 {
            let dd = (cumulative - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// One-day parametric VaR: balance × volatility × z / √252.
pub fn value_at_risk(account_balance: f64, volatility: f64, z_score: f64) -> f64 {
    account_balance * volatility * z_score / TRADING_DAYS_PER_YEAR.sqrt()
}

/// Shares such that hitting the stop loses `risk_per_trade` of the account.
/// 0.0 when the stop distance is zero or not finite.
pub fn position_size(
    account_balance: f64,
    latest_close: f64,
    risk_per_trade: f64,
    stop_loss_fraction: f64,
) -> f64 {
    let stop_distance = latest_close * stop_loss_fraction;
    if stop_distance <= 0.0 || !stop_distance.is_finite() {
        return 0.0;
    }
    (account_balance * risk_per_trade) / stop_distance
}

/// First matching row wins; both bounds must hold.
pub fn classify_risk(volatility: f64, max_drawdown: f64) -> RiskLevel {
    const TABLE: [(f64, f64, RiskLevel); 3] = [
        (0.10, -0.10, RiskLevel::Low),
        (0.20, -0.20, RiskLevel::Medium),
        (0.30, -0.30, RiskLevel::High),
    ];
    TABLE
        .iter()
        .find(|(vol_cap, dd_floor, _)| volatility < *vol_cap && max_drawdown > *dd_floor)
        .map(|(_, _, level)| *level)
        .unwrap_or(RiskLevel::VeryHigh)
}
