//! Forecast and metrics artifact serialization.
//!
//! Artifacts are computed fully before anything is written, then each file
//! is written atomically (temp file in the target directory, then rename).
//! Reruns overwrite; there is no versioning or append behavior.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::metrics::Metrics;

pub const FORECAST_FILE_NAME: &str = "forecast.csv";
pub const METRICS_FILE_NAME: &str = "metrics.json";

/// One test-set example with its actual and predicted value, in original
/// chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub date: NaiveDate,
    pub actual: f64,
    pub predicted: f64,
}

/// Hyperparameters echoed into the metrics summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub lags: usize,
}

/// The structured metrics record, produced exactly once per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub model: ModelParams,
    pub metrics: Metrics,
    pub rows: usize,
    pub train_size: usize,
    pub test_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifacts {
    pub forecast_path: PathBuf,
    pub metrics_path: PathBuf,
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid output path: {path}")]
    InvalidPath { path: PathBuf },
}

/// Writes the forecast table and metrics summary under `out_dir`, creating
/// the directory if absent.
pub fn write_artifacts(
    out_dir: &Path,
    forecast: &[ForecastRecord],
    summary: &MetricsSummary,
) -> Result<WrittenArtifacts, ArtifactError> {
    fs::create_dir_all(out_dir)?;

    let forecast_path = out_dir.join(FORECAST_FILE_NAME);
    write_atomic(&forecast_path, &render_forecast_csv(forecast)?)?;

    let metrics_path = out_dir.join(METRICS_FILE_NAME);
    let mut json = serde_json::to_vec_pretty(summary)?;
    json.push(b'\n');
    write_atomic(&metrics_path, &json)?;

    info!(
        component = "artifacts",
        event = "artifacts.write.finish",
        forecast_path = %forecast_path.display(),
        metrics_path = %metrics_path.display(),
        forecast_rows = forecast.len()
    );

    Ok(WrittenArtifacts {
        forecast_path,
        metrics_path,
    })
}

fn render_forecast_csv(forecast: &[ForecastRecord]) -> Result<Vec<u8>, ArtifactError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["date", "actual", "predicted"])?;
    for record in forecast {
        writer.write_record([
            record.date.format("%Y-%m-%d").to_string(),
            record.actual.to_string(),
            record.predicted.to_string(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|err| ArtifactError::Io(err.into_error()))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ArtifactError> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| ArtifactError::InvalidPath {
            path: path.to_path_buf(),
        })?;
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));

    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    fs::rename(tmp_path, path)?;
    Ok(())
}
