//! File-system round trips: config files, CSV input, JSON and CSV export.

use std::fs;

use signalboard_core::Action;
use signalboard_runner::export::{batch_from_json, CSV_HEADER};
use signalboard_runner::{
    export_csv, export_json, ConfigError, Pipeline, PipelineConfig, RecordingObserver, SourceKind,
};

#[test]
fn config_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("signalboard.toml");

    let config = PipelineConfig {
        symbols: vec!["NVDA".into(), "AMD".into()],
        account_balance: 25_000.0,
        ..PipelineConfig::default()
    };
    config.write_to(&path).unwrap();

    let loaded = PipelineConfig::from_file(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.config_hash().unwrap(), config.config_hash().unwrap());
}

#[test]
fn missing_config_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = PipelineConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn csv_directory_batch_and_exports() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();

    // Multi-level header as written by a pandas export of a ticker download.
    let mut csv = String::from("Date,\"('Close', 'SPY')\",\"('High', 'SPY')\",\"('Low', 'SPY')\",\"('Open', 'SPY')\",\"('Volume', 'SPY')\"\n");
    for day in 0..60 {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(day);
        let close = 400.0 + day as f64;
        csv.push_str(&format!(
            "{date},{close},{},{},{close},{}\n",
            close + 1.0,
            close - 1.0,
            1_000_000 + day
        ));
    }
    fs::write(data_dir.join("SPY.csv"), csv).unwrap();

    let mut config = PipelineConfig {
        symbols: vec!["SPY".into(), "QQQ".into()],
        ..PipelineConfig::default()
    };
    config.source.kind = SourceKind::Csv;
    config.source.csv_dir = data_dir;

    let pipeline = Pipeline::from_config(config).unwrap();
    let batch = pipeline.run(&RecordingObserver::new());

    assert_eq!(batch.succeeded, 1);
    assert_eq!(batch.failed, 1);
    let spy = batch.outcomes[0].report().unwrap();
    assert_eq!(spy.bars, 60);
    assert!((spy.summary.latest_close - 459.0).abs() < 1e-9);
    assert_ne!(spy.recommendation.action, Action::Buy);

    let json_path = dir.path().join("out").join("batch.json");
    export_json(&json_path, &batch).unwrap();
    let reloaded = batch_from_json(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(reloaded.total(), 2);
    assert_eq!(reloaded.config_hash, batch.config_hash);
    assert_eq!(reloaded.outcomes[1], batch.outcomes[1]);
    let reloaded_spy = reloaded.outcomes[0].report().unwrap();
    assert_eq!(reloaded_spy.dataset_hash, spy.dataset_hash);
    assert_eq!(reloaded_spy.recommendation.action, spy.recommendation.action);

    let csv_path = dir.path().join("out").join("batch.csv");
    export_csv(&csv_path, &batch).unwrap();
    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, CSV_HEADER);
    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "SPY");
    assert_eq!(&rows[0][1], "ok");
    assert_eq!(&rows[1][0], "QQQ");
    assert_eq!(&rows[1][1], "failed");
    assert!(rows[1][12].contains("no CSV file"));
}
