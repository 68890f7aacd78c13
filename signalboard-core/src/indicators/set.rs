//! IndicatorSet: named indicator readings for one symbol.
//!
//! Every slot holds either derived series or an explicit `Unavailable`
//! marker. Multi-series indicators (MACD, Bollinger) expose their parts
//! through fixed field names so consumers never depend on how a library
//! happened to label its columns.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stable logical name of an indicator slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IndicatorName {
    #[serde(rename = "RSI")]
    Rsi,
    #[serde(rename = "SMA 20")]
    Sma20,
    #[serde(rename = "SMA 50")]
    Sma50,
    #[serde(rename = "SMA 200")]
    Sma200,
    #[serde(rename = "EMA 50")]
    Ema50,
    #[serde(rename = "MACD")]
    Macd,
    #[serde(rename = "Bollinger Bands")]
    BollingerBands,
}

impl IndicatorName {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorName::Rsi => "RSI",
            IndicatorName::Sma20 => "SMA 20",
            IndicatorName::Sma50 => "SMA 50",
            IndicatorName::Sma200 => "SMA 200",
            IndicatorName::Ema50 => "EMA 50",
            IndicatorName::Macd => "MACD",
            IndicatorName::BollingerBands => "Bollinger Bands",
        }
    }
}

impl fmt::Display for IndicatorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A derived series aligned to the input bars. `None` = not yet available.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Line(Vec<Option<f64>>);

impl Line {
    /// Convert a NaN-padded computation result; NaN and infinities become `None`.
    pub fn from_raw(values: Vec<f64>) -> Self {
        Self(
            values
                .into_iter()
                .map(|v| if v.is_finite() { Some(v) } else { None })
                .collect(),
        )
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value at a bar index; `None` during warm-up or out of range.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied().flatten()
    }

    /// Most recent defined value.
    pub fn latest(&self) -> Option<f64> {
        self.0.iter().rev().find_map(|v| *v)
    }

    pub fn defined_count(&self) -> usize {
        self.0.iter().filter(|v| v.is_some()).count()
    }

    pub fn has_defined(&self) -> bool {
        self.0.iter().any(|v| v.is_some())
    }
}

/// MACD line, signal line and histogram (line - signal).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacdLines {
    pub line: Line,
    pub signal: Line,
    pub histogram: Line,
}

impl MacdLines {
    pub fn latest_line(&self) -> Option<f64> {
        self.line.latest()
    }

    pub fn latest_signal(&self) -> Option<f64> {
        self.signal.latest()
    }

    pub fn latest_histogram(&self) -> Option<f64> {
        self.histogram.latest()
    }
}

/// Upper, middle and lower Bollinger bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: Line,
    pub middle: Line,
    pub lower: Line,
}

impl BollingerBands {
    pub fn latest_upper(&self) -> Option<f64> {
        self.upper.latest()
    }

    pub fn latest_middle(&self) -> Option<f64> {
        self.middle.latest()
    }

    pub fn latest_lower(&self) -> Option<f64> {
        self.lower.latest()
    }
}

/// Reading stored in one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndicatorValue {
    Line(Line),
    Macd(MacdLines),
    Bollinger(BollingerBands),
    Unavailable { reason: String },
}

impl IndicatorValue {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        IndicatorValue::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, IndicatorValue::Unavailable { .. })
    }

    /// True if at least one series position is defined.
    pub fn has_defined(&self) -> bool {
        match self {
            IndicatorValue::Line(line) => line.has_defined(),
            IndicatorValue::Macd(m) => m.line.has_defined() && m.signal.has_defined(),
            IndicatorValue::Bollinger(b) => b.middle.has_defined(),
            IndicatorValue::Unavailable { .. } => false,
        }
    }
}

/// Indicator readings keyed by logical name.
///
/// An empty set is a valid state (empty or unreadable input): every lookup
/// then yields `None` and every rule that depends on it stays silent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndicatorSet {
    values: BTreeMap<IndicatorName, IndicatorValue>,
}

impl IndicatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: IndicatorName, value: IndicatorValue) {
        self.values.insert(name, value);
    }

    pub fn get(&self, name: IndicatorName) -> Option<&IndicatorValue> {
        self.values.get(&name)
    }

    pub fn is_available(&self, name: IndicatorName) -> bool {
        self.get(name).is_some_and(IndicatorValue::is_available)
    }

    /// Line series for a single-series slot.
    pub fn line(&self, name: IndicatorName) -> Option<&Line> {
        match self.get(name)? {
            IndicatorValue::Line(line) => Some(line),
            _ => None,
        }
    }

    /// Most recent defined value of a single-series slot.
    pub fn latest(&self, name: IndicatorName) -> Option<f64> {
        self.line(name).and_then(Line::latest)
    }

    pub fn macd(&self) -> Option<&MacdLines> {
        match self.get(IndicatorName::Macd)? {
            IndicatorValue::Macd(m) => Some(m),
            _ => None,
        }
    }

    pub fn bollinger(&self) -> Option<&BollingerBands> {
        match self.get(IndicatorName::BollingerBands)? {
            IndicatorValue::Bollinger(b) => Some(b),
            _ => None,
        }
    }

    /// Slots explicitly marked unavailable, with their reasons.
    pub fn unavailable(&self) -> Vec<(IndicatorName, &str)> {
        self.values
            .iter()
            .filter_map(|(name, value)| match value {
                IndicatorValue::Unavailable { reason } => Some((*name, reason.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (IndicatorName, &IndicatorValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_maps_nan_to_none() {
        let line = Line::from_raw(vec![f64::NAN, f64::NAN, 3.0, 4.0]);
        assert_eq!(line.get(0), None);
        assert_eq!(line.get(2), Some(3.0));
        assert_eq!(line.get(9), None);
        assert_eq!(line.latest(), Some(4.0));
        assert_eq!(line.defined_count(), 2);
    }

    #[test]
    fn latest_skips_trailing_gaps() {
        let line = Line::from_raw(vec![1.0, 2.0, f64::NAN]);
        assert_eq!(line.latest(), Some(2.0));
    }

    #[test]
    fn missing_slot_reads_as_none() {
        let set = IndicatorSet::new();
        assert!(set.is_empty());
        assert_eq!(set.latest(IndicatorName::Rsi), None);
        assert!(set.macd().is_none());
        assert!(!set.is_available(IndicatorName::Sma50));
    }

    #[test]
    fn unavailable_slot_is_reported() {
        let mut set = IndicatorSet::new();
        set.insert(
            IndicatorName::Sma200,
            IndicatorValue::unavailable("need 200 bars, have 20"),
        );
        set.insert(IndicatorName::Rsi, IndicatorValue::Line(Line::from_raw(vec![55.0])));
        assert_eq!(set.latest(IndicatorName::Sma200), None);
        assert_eq!(set.latest(IndicatorName::Rsi), Some(55.0));
        let missing = set.unavailable();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].0, IndicatorName::Sma200);
    }

    #[test]
    fn serializes_with_display_names() {
        let mut set = IndicatorSet::new();
        set.insert(IndicatorName::Sma50, IndicatorValue::Line(Line::from_raw(vec![f64::NAN, 2.0])));
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"{"SMA 50":{"Line":[null,2.0]}}"#);
    }
}
