//! Signalboard Runner: batch orchestration on top of `signalboard-core`.
//!
//! This crate provides:
//! - TOML pipeline configuration with defaults and validation
//! - The per-symbol pipeline (fetch → indicators → risk → recommendation)
//! - An OpenAI-compatible advisory client
//! - Result records with dataset and config fingerprints
//! - JSON and CSV export
//! - A `tracing`-backed lifecycle observer

pub mod advisory_client;
pub mod config;
pub mod export;
pub mod observer;
pub mod pipeline;
pub mod report;

pub use advisory_client::OpenAiAdvisor;
pub use config::{AdvisoryConfig, ConfigError, PipelineConfig, SourceConfig, SourceKind};
pub use export::{export_csv, export_json, ExportError};
pub use observer::{RecordingObserver, TracingObserver};
pub use pipeline::{build_advisor, build_source, Pipeline, PipelineError};
pub use report::{BatchReport, SymbolOutcome, SymbolReport, SCHEMA_VERSION};
