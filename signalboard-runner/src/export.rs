//! Batch export: full JSON, or a one-row-per-symbol CSV for spreadsheets.
//!
//! Exported JSON carries a `schema_version`; newer versions are rejected on
//! load.

use std::path::{Path, PathBuf};

use thiserror::Error;

use signalboard_core::IndicatorName;

use crate::report::{BatchReport, SymbolOutcome, SCHEMA_VERSION};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("unsupported schema version {found} (max supported: {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },
}

pub const CSV_HEADER: [&str; 13] = [
    "symbol",
    "status",
    "action",
    "confidence",
    "rsi",
    "sma_50",
    "sma_200",
    "volatility",
    "max_drawdown",
    "value_at_risk",
    "position_size",
    "risk_level",
    "reasons",
];

// ─── JSON ───────────────────────────────────────────────────────────

pub fn batch_to_json(batch: &BatchReport) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(batch)?)
}

pub fn batch_from_json(json: &str) -> Result<BatchReport, ExportError> {
    let batch: BatchReport = serde_json::from_str(json)?;
    if batch.schema_version > SCHEMA_VERSION {
        return Err(ExportError::UnsupportedSchema {
            found: batch.schema_version,
            supported: SCHEMA_VERSION,
        });
    }
    Ok(batch)
}

pub fn export_json(path: &Path, batch: &BatchReport) -> Result<(), ExportError> {
    write_file(path, batch_to_json(batch)?.as_bytes())
}

// ─── CSV ────────────────────────────────────────────────────────────

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    value.map(|v| format!("{v:.precision$}")).unwrap_or_default()
}

/// One row per symbol. Failed symbols keep their row with the failure
/// reason in `reasons` and every metric column blank.
pub fn batch_to_csv(batch: &BatchReport) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_HEADER)?;

    for outcome in &batch.outcomes {
        match outcome {
            SymbolOutcome::Analyzed(report) => {
                let rec = &report.recommendation;
                let risk = &report.risk;
                let ind = &report.indicators;
                let row: [String; 13] = [
                    report.symbol.clone(),
                    "ok".to_string(),
                    rec.action.as_str().to_string(),
                    fmt_opt(rec.confidence_score, 2),
                    fmt_opt(ind.latest(IndicatorName::Rsi), 2),
                    fmt_opt(ind.latest(IndicatorName::Sma50), 4),
                    fmt_opt(ind.latest(IndicatorName::Sma200), 4),
                    format!("{:.6}", risk.volatility),
                    format!("{:.6}", risk.max_drawdown),
                    format!("{:.2}", risk.value_at_risk),
                    format!("{:.2}", risk.position_size),
                    risk.risk_level.as_str().to_string(),
                    rec.reasons.join("; "),
                ];
                wtr.write_record(&row)?;
            }
            SymbolOutcome::Failed { symbol, reason } => {
                let mut row = [""; 13];
                row[0] = symbol.as_str();
                row[1] = "failed";
                row[12] = reason.as_str();
                wtr.write_record(row)?;
            }
        }
    }

    let data = wtr
        .into_inner()
        .map_err(|e| ExportError::Csv(e.into_error().into()))?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}

pub fn export_csv(path: &Path, batch: &BatchReport) -> Result<(), ExportError> {
    write_file(path, batch_to_csv(batch)?.as_bytes())
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), ExportError> {
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, contents).map_err(io_err)
}
