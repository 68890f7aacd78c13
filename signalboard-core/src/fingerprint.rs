//! Fingerprinting: deterministic identification of inputs behind a report.
//!
//! - `DatasetHash`: content hash of one price series.
//! - `ConfigHash`: hash of a configuration's canonical JSON.
//!
//! Both use BLAKE3 so hashes are stable across builds and platforms.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::PriceSeries;

/// Content hash of a price series (symbol + every bar field).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetHash(pub String);

impl DatasetHash {
    pub fn of_series(series: &PriceSeries) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(series.symbol().as_bytes());
        for bar in series.bars() {
            hasher.update(&bar.timestamp.timestamp().to_le_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
            hasher.update(&bar.volume.to_le_bytes());
        }
        Self(hasher.finalize().to_hex().to_string())
    }
}

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hash of a configuration's canonical JSON.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigHash(pub String);

impl ConfigHash {
    /// Hash `value` via its JSON form. Struct fields serialize in declaration
    /// order and maps should be `BTreeMap`, so equal values hash equally.
    pub fn of<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(value)?;
        Ok(Self(blake3::hash(json.as_bytes()).to_hex().to_string()))
    }

    /// First 12 hex characters, for display.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
