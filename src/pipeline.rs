//! End-to-end run orchestration.
//!
//! Stages run strictly in order, single-threaded, each consuming only the
//! previous stage's output. Everything is computed before any forecast or
//! metrics artifact is written, so a fatal error never leaves partial
//! artifacts behind (the normalizer's diagnostic side files are exempt).

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::artifacts::{
    write_artifacts, ArtifactError, ForecastRecord, MetricsSummary, ModelParams, WrittenArtifacts,
};
use crate::config::{PipelineConfig, MODEL_SEED};
use crate::encoding::{normalize_source, NormalizeError};
use crate::features::{build_lag_features, split_chronological, FeatureError};
use crate::forest::{ForestError, RandomForestRegressor};
use crate::metrics::{evaluate, Metrics, MetricsError};
use crate::series::{aggregate_daily, AggregateReport, SeriesError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Series(#[from] SeriesError),
    #[error(transparent)]
    Feature(#[from] FeatureError),
    #[error(transparent)]
    Forest(#[from] ForestError),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub series_len: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub metrics: Metrics,
    pub aggregate: AggregateReport,
    #[serde(skip)]
    pub artifacts: Option<WrittenArtifacts>,
}

/// Runs the full pipeline for one configuration and writes the artifacts.
pub fn run(config: &PipelineConfig) -> Result<RunSummary, PipelineError> {
    let table = normalize_source(&config.source_path, &config.out_dir)?;
    let (series, aggregate) =
        aggregate_daily(&table, &config.date_column, &config.value_column)?;

    let rows = build_lag_features(&series, config.lag_count)?;
    let (train_rows, test_rows) = split_chronological(&rows, config.train_fraction)?;

    let mut model = RandomForestRegressor::new(config.n_estimators)
        .with_max_depth(config.max_depth)
        .with_seed(MODEL_SEED);
    model.fit(train_rows)?;
    let predictions = model.predict(test_rows);

    let actuals: Vec<f64> = test_rows.iter().map(|row| row.target).collect();
    let metrics = evaluate(&actuals, &predictions)?;

    let forecast: Vec<ForecastRecord> = test_rows
        .iter()
        .zip(&predictions)
        .map(|(row, predicted)| ForecastRecord {
            date: row.date,
            actual: row.target,
            predicted: *predicted,
        })
        .collect();

    let summary = MetricsSummary {
        model: ModelParams {
            n_estimators: config.n_estimators,
            max_depth: config.max_depth,
            lags: config.lag_count,
        },
        metrics,
        rows: series.len(),
        train_size: train_rows.len(),
        test_size: test_rows.len(),
    };

    let written = write_artifacts(&config.out_dir, &forecast, &summary)?;

    info!(
        component = "pipeline",
        event = "run.finish",
        series_len = series.len(),
        train_size = train_rows.len(),
        test_size = test_rows.len(),
        mae = metrics.mae,
        rmse = metrics.rmse
    );

    Ok(RunSummary {
        series_len: series.len(),
        train_size: train_rows.len(),
        test_size: test_rows.len(),
        metrics,
        aggregate,
        artifacts: Some(written),
    })
}
