//! Serializable pipeline configuration.
//!
//! Every field has a default, so an empty TOML file is a valid config and a
//! partial one only overrides what it names.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use signalboard_core::fingerprint::ConfigHash;
use signalboard_core::{Interval, Period, RiskParams};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to hash config: {0}")]
    Hash(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Where bars come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Yahoo,
    Csv,
    Synthetic,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Yahoo => "yahoo",
            SourceKind::Csv => "csv",
            SourceKind::Synthetic => "synthetic",
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yahoo" => Ok(SourceKind::Yahoo),
            "csv" => Ok(SourceKind::Csv),
            "synthetic" => Ok(SourceKind::Synthetic),
            other => Err(ConfigError::Invalid(format!(
                "unknown source '{other}' (expected yahoo, csv or synthetic)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Directory holding `<SYMBOL>.csv` files for the `csv` source.
    pub csv_dir: PathBuf,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Yahoo,
            csv_dir: PathBuf::from("data"),
            timeout_secs: 10,
        }
    }
}

/// OpenAI-compatible chat completion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryConfig {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key. The key itself
    /// never lives in the config file.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Recent closes included in the prompt.
    pub history_bars: usize,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 30,
            temperature: 0.3,
            max_tokens: 300,
            history_bars: 30,
        }
    }
}

/// Configuration for one batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub symbols: Vec<String>,
    pub period: Period,
    pub interval: Interval,
    pub account_balance: f64,
    pub risk: RiskParams,
    pub advisory: AdvisoryConfig,
    pub source: SourceConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["AAPL".into(), "MSFT".into(), "GOOG".into()],
            period: Period::SixMonths,
            interval: Interval::Daily,
            account_balance: 10_000.0,
            risk: RiskParams::default(),
            advisory: AdvisoryConfig::default(),
            source: SourceConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write the config as TOML, creating parent directories.
    pub fn write_to(&self, path: &Path) -> Result<(), ConfigError> {
        let toml = self.to_toml()?;
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(path, toml).map_err(write_err)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::Invalid("at least one symbol is required".into()));
        }
        if let Some(blank) = self.symbols.iter().position(|s| s.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("symbol #{} is blank", blank + 1)));
        }
        if !(self.account_balance.is_finite() && self.account_balance > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "account_balance must be positive, got {}",
                self.account_balance
            )));
        }

        let risk = &self.risk;
        if !(risk.risk_per_trade > 0.0 && risk.risk_per_trade <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "risk.risk_per_trade must be in (0, 1], got {}",
                risk.risk_per_trade
            )));
        }
        if !(risk.stop_loss_fraction > 0.0 && risk.stop_loss_fraction < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "risk.stop_loss_fraction must be in (0, 1), got {}",
                risk.stop_loss_fraction
            )));
        }
        if !(risk.var_z_score.is_finite() && risk.var_z_score > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "risk.var_z_score must be positive, got {}",
                risk.var_z_score
            )));
        }

        let advisory = &self.advisory;
        if advisory.enabled {
            if advisory.api_key_env.trim().is_empty() {
                return Err(ConfigError::Invalid("advisory.api_key_env is empty".into()));
            }
            if advisory.model.trim().is_empty() {
                return Err(ConfigError::Invalid("advisory.model is empty".into()));
            }
        }
        if !(0.0..=2.0).contains(&advisory.temperature) {
            return Err(ConfigError::Invalid(format!(
                "advisory.temperature must be in [0, 2], got {}",
                advisory.temperature
            )));
        }
        if advisory.timeout_secs == 0 || self.source.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be at least 1 second".into()));
        }
        Ok(())
    }

    /// BLAKE3 over the config's JSON form. Stable for equal configs.
    pub fn config_hash(&self) -> Result<ConfigHash, ConfigError> {
        Ok(ConfigHash::of(self)?)
    }

    /// Symbols upper-cased and de-duplicated, first occurrence kept.
    pub fn normalized_symbols(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.symbols.len());
        for symbol in &self.symbols {
            let symbol = symbol.trim().to_ascii_uppercase();
            if !symbol.is_empty() && !out.contains(&symbol) {
                out.push(symbol);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_default() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.risk.var_z_score, 1.65);
        assert!(!config.advisory.enabled);
    }

    #[test]
    fn partial_toml_overrides_named_fields() {
        let config = PipelineConfig::from_toml(
            r#"
            symbols = ["TSLA"]
            period = "1y"
            interval = "1wk"

            [risk]
            risk_per_trade = 0.01

            [source]
            kind = "synthetic"
            "#,
        )
        .unwrap();
        assert_eq!(config.symbols, vec!["TSLA"]);
        assert_eq!(config.period, Period::OneYear);
        assert_eq!(config.interval, Interval::Weekly);
        assert_eq!(config.risk.risk_per_trade, 0.01);
        assert_eq!(config.risk.stop_loss_fraction, 0.02);
        assert_eq!(config.source.kind, SourceKind::Synthetic);
        assert_eq!(config.source.timeout_secs, 10);
    }

    #[test]
    fn toml_roundtrip() {
        let config = PipelineConfig::default();
        let toml = config.to_toml().unwrap();
        assert_eq!(PipelineConfig::from_toml(&toml).unwrap(), config);
    }

    #[test]
    fn rejects_non_positive_balance() {
        let err = PipelineConfig::from_toml("account_balance = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unknown_period() {
        let err = PipelineConfig::from_toml(r#"period = "7w""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_empty_symbol_list() {
        let err = PipelineConfig::from_toml("symbols = []").unwrap_err();
        assert!(err.to_string().contains("symbol"));
    }

    #[test]
    fn config_hash_tracks_content() {
        let a = PipelineConfig::default();
        let mut b = a.clone();
        assert_eq!(a.config_hash().unwrap(), b.config_hash().unwrap());
        b.account_balance = 20_000.0;
        assert_ne!(a.config_hash().unwrap(), b.config_hash().unwrap());
    }

    #[test]
    fn normalized_symbols_dedupes() {
        let config = PipelineConfig {
            symbols: vec!["aapl".into(), " AAPL ".into(), "msft".into()],
            ..PipelineConfig::default()
        };
        assert_eq!(config.normalized_symbols(), vec!["AAPL", "MSFT"]);
    }

    proptest::proptest! {
        #[test]
        fn normalized_symbols_are_unique_and_upper(
            symbols in proptest::collection::vec("[a-zA-Z]{1,5}", 1..12)
        ) {
            let config = PipelineConfig { symbols, ..PipelineConfig::default() };
            let normalized = config.normalized_symbols();
            let mut deduped = normalized.clone();
            deduped.sort();
            deduped.dedup();
            proptest::prop_assert_eq!(deduped.len(), normalized.len());
            proptest::prop_assert!(normalized.iter().all(|s| s == &s.to_ascii_uppercase()));
        }

        #[test]
        fn any_positive_balance_roundtrips(balance in 1.0..1e9_f64) {
            let config = PipelineConfig { account_balance: balance, ..PipelineConfig::default() };
            let parsed = PipelineConfig::from_toml(&config.to_toml().unwrap()).unwrap();
            proptest::prop_assert_eq!(parsed.account_balance, balance);
        }
    }

    #[test]
    fn source_kind_parses_case_insensitively() {
        assert_eq!("CSV".parse::<SourceKind>().unwrap(), SourceKind::Csv);
        assert!("ftp".parse::<SourceKind>().is_err());
    }
}
