use std::fs;
use std::path::Path;

use chrono::{Days, NaiveDate};
use lagcast::{run, PipelineConfig, PipelineError, FORECAST_FILE_NAME, METRICS_FILE_NAME};
use tempfile::tempdir;

fn config(source: &Path, out_dir: &Path) -> PipelineConfig {
    PipelineConfig {
        source_path: source.to_path_buf(),
        date_column: "Order Date".to_string(),
        value_column: "Sales".to_string(),
        lag_count: 5,
        train_fraction: 0.8,
        n_estimators: 20,
        max_depth: 5,
        out_dir: out_dir.to_path_buf(),
    }
}

/// 30 days of synthetic sales, two rows per day so aggregation has work to do.
fn write_clean_csv(path: &Path) {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut text = String::from("Order Date,Region,Sales\n");
    for day in 0..30u64 {
        let date = start + Days::new(day);
        let base = 100.0 + (day as f64) * 3.0;
        text.push_str(&format!("{},East,{}\n", date.format("%Y-%m-%d"), base));
        text.push_str(&format!("{},West,{}\n", date.format("%Y-%m-%d"), base / 2.0));
    }
    fs::write(path, text).unwrap();
}

#[test]
fn clean_source_produces_forecast_and_metrics() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("sales.csv");
    write_clean_csv(&source);
    let out_dir = dir.path().join("output");

    let summary = run(&config(&source, &out_dir)).expect("pipeline should succeed");

    assert_eq!(summary.series_len, 30);
    // 30 - 5 lags = 25 rows; floor(0.8 * 25) = 20 train, 5 test.
    assert_eq!(summary.train_size, 20);
    assert_eq!(summary.test_size, 5);
    assert!(summary.metrics.rmse >= summary.metrics.mae);
    assert!(summary.metrics.mae >= 0.0);

    let forecast = fs::read_to_string(out_dir.join(FORECAST_FILE_NAME)).unwrap();
    let mut lines = forecast.lines();
    assert_eq!(lines.next(), Some("date,actual,predicted"));
    let data_lines: Vec<&str> = lines.collect();
    assert_eq!(data_lines.len(), 5);
    // Test rows are the chronological suffix: the last 5 dates of January.
    assert!(data_lines[0].starts_with("2024-01-26,"));
    assert!(data_lines[4].starts_with("2024-01-30,"));

    let metrics: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out_dir.join(METRICS_FILE_NAME)).unwrap())
            .unwrap();
    assert_eq!(metrics["model"]["n_estimators"], 20);
    assert_eq!(metrics["model"]["max_depth"], 5);
    assert_eq!(metrics["model"]["lags"], 5);
    assert_eq!(metrics["rows"], 30);
    assert_eq!(metrics["train_size"], 20);
    assert_eq!(metrics["test_size"], 5);
    assert!(metrics["metrics"]["mae"].is_number());
    assert!(metrics["metrics"]["rmse"].is_number());
}

#[test]
fn rerun_with_identical_inputs_is_byte_identical() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("sales.csv");
    write_clean_csv(&source);
    let out_dir = dir.path().join("output");
    let cfg = config(&source, &out_dir);

    run(&cfg).unwrap();
    let forecast_a = fs::read(out_dir.join(FORECAST_FILE_NAME)).unwrap();
    let metrics_a = fs::read(out_dir.join(METRICS_FILE_NAME)).unwrap();

    run(&cfg).unwrap();
    let forecast_b = fs::read(out_dir.join(FORECAST_FILE_NAME)).unwrap();
    let metrics_b = fs::read(out_dir.join(METRICS_FILE_NAME)).unwrap();

    assert_eq!(forecast_a, forecast_b);
    assert_eq!(metrics_a, metrics_b);
}

#[test]
fn corrupt_encoding_bad_dates_and_values_are_absorbed() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("sales.csv");
    let out_dir = dir.path().join("output");

    // Windows-1252 accented byte, CRLF endings, a stray control byte, one
    // unparsable date and one unparsable value.
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut raw: Vec<u8> = b"Order Date,Region,Sales\r\n".to_vec();
    for day in 0..12u64 {
        let date = start + Days::new(day);
        raw.extend_from_slice(
            format!("{},East,{}\r\n", date.format("%m/%d/%Y"), 50.0 + day as f64).as_bytes(),
        );
    }
    // A raw 0xE9 (Windows-1252 e-acute) and a control byte on dedicated rows.
    raw.extend_from_slice(b"01/13/2024,Qu\xE9bec,65.0\r\n");
    raw.extend_from_slice(b"01/14/2024,No\x07rth,66.0\r\n");
    raw.extend_from_slice(b"not-a-date,East,999.0\r\n");
    raw.extend_from_slice(b"01/14/2024,South,N/A\r\n");
    fs::write(&source, raw).unwrap();

    let mut cfg = config(&source, &out_dir);
    cfg.lag_count = 4;
    cfg.train_fraction = 0.7;

    let summary = run(&cfg).expect("fallback chain should absorb the corruption");

    // 14 valid dates; the bad-date row is dropped, the N/A row adds 0.0.
    assert_eq!(summary.series_len, 14);
    assert_eq!(summary.aggregate.rows_dropped_bad_date, 1);
    assert_eq!(summary.aggregate.values_coerced_to_zero, 1);

    // A cleaned diagnostic side file was persisted, named by encoding.
    let cleaned: Vec<_> = fs::read_dir(&out_dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| name.contains(".cleaned.") || name.ends_with(".fallback.csv"))
        .collect();
    assert!(!cleaned.is_empty(), "expected a diagnostic side file");

    assert!(out_dir.join(FORECAST_FILE_NAME).exists());
    assert!(out_dir.join(METRICS_FILE_NAME).exists());
}

#[test]
fn missing_source_fails_before_any_artifact_is_written() {
    let dir = tempdir().unwrap();
    let out_dir = dir.path().join("output");
    let err = run(&config(&dir.path().join("absent.csv"), &out_dir)).unwrap_err();

    assert!(matches!(err, PipelineError::Normalize(_)));
    assert!(!out_dir.join(FORECAST_FILE_NAME).exists());
    assert!(!out_dir.join(METRICS_FILE_NAME).exists());
}

#[test]
fn missing_column_is_fatal_and_names_the_column() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("sales.csv");
    write_clean_csv(&source);
    let out_dir = dir.path().join("output");

    let mut cfg = config(&source, &out_dir);
    cfg.value_column = "Revenue".to_string();

    let err = run(&cfg).unwrap_err();
    assert!(err.to_string().contains("Revenue"));
    assert!(!out_dir.join(FORECAST_FILE_NAME).exists());
}

#[test]
fn degenerate_split_is_fatal_and_leaves_no_artifacts() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("sales.csv");
    write_clean_csv(&source);
    let out_dir = dir.path().join("output");

    let mut cfg = config(&source, &out_dir);
    cfg.train_fraction = 1.0;

    let err = run(&cfg).unwrap_err();
    assert!(matches!(err, PipelineError::Feature(_)));
    assert!(err.to_string().contains("train_size=25"));
    assert!(!out_dir.join(FORECAST_FILE_NAME).exists());
    assert!(!out_dir.join(METRICS_FILE_NAME).exists());
}

#[test]
fn insufficient_data_for_lags_is_fatal() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("sales.csv");
    fs::write(
        &source,
        "Order Date,Sales\n2024-01-01,1.0\n2024-01-02,2.0\n2024-01-03,3.0\n",
    )
    .unwrap();
    let out_dir = dir.path().join("output");

    let err = run(&config(&source, &out_dir)).unwrap_err();
    assert!(matches!(err, PipelineError::Feature(_)));
    assert!(err.to_string().contains("lag count is 5"));
}
