//! Lag-feature construction and chronological train/test splitting.
//!
//! Order is load-bearing everywhere in this module: feature rows are emitted
//! in series order, the split is positional, and nothing downstream may
//! reorder them. Shuffling here would leak future values into training.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::series::SeriesPoint;

/// One supervised example: the `lag_count` values preceding `date`, most
/// recent first, and the observed value at `date` as the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub lags: Vec<f64>,
    pub target: f64,
}

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error(
        "not enough data for lag features: series has {series_len} points, lag count is {lag_count}"
    )]
    InsufficientData { series_len: usize, lag_count: usize },
    #[error("degenerate train/test split: train_size={train_size} of {total} rows")]
    DegenerateSplit { train_size: usize, total: usize },
}

/// Builds fixed-width feature/target pairs from a date-ordered series.
///
/// Row `i` (for `i` in `lag_count..len`) has lags
/// `[series[i-1], ..., series[i-lag_count]]` and target `series[i]`. No lag
/// value is observed at or after the target's date.
pub fn build_lag_features(
    series: &[SeriesPoint],
    lag_count: usize,
) -> Result<Vec<FeatureRow>, FeatureError> {
    if lag_count == 0 || lag_count >= series.len() {
        return Err(FeatureError::InsufficientData {
            series_len: series.len(),
            lag_count,
        });
    }

    let rows: Vec<FeatureRow> = (lag_count..series.len())
        .map(|i| FeatureRow {
            date: series[i].date,
            lags: (1..=lag_count).map(|lag| series[i - lag].value).collect(),
            target: series[i].value,
        })
        .collect();

    info!(
        component = "features",
        event = "features.build.finish",
        series_len = series.len(),
        lag_count = lag_count,
        feature_rows = rows.len()
    );

    Ok(rows)
}

/// Splits feature rows into train and test segments by position.
///
/// `train_size = floor(train_fraction * n)`. The boundary is the only thing
/// computed here; both segments keep their chronological order.
pub fn split_chronological(
    rows: &[FeatureRow],
    train_fraction: f64,
) -> Result<(&[FeatureRow], &[FeatureRow]), FeatureError> {
    let total = rows.len();
    let train_size = (train_fraction * total as f64).floor() as usize;

    if train_size == 0 || train_size >= total {
        return Err(FeatureError::DegenerateSplit { train_size, total });
    }

    info!(
        component = "features",
        event = "features.split.finish",
        total = total,
        train_size = train_size,
        test_size = total - train_size
    );

    Ok(rows.split_at(train_size))
}
