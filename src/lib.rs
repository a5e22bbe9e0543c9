//! lagcast core crate.
//!
//! Batch pipeline from a possibly malformed sales CSV to forecast and
//! metrics artifacts:
//! - encoding/newline recovery for unreliable sources
//! - daily aggregation into a date-ordered series
//! - lag-feature construction with a chronological train/test split
//! - random forest regression, evaluation, artifact writing

mod artifacts;
mod config;
mod encoding;
mod features;
mod forest;
mod metrics;
mod observability;
mod pipeline;
mod series;

pub use artifacts::{
    write_artifacts, ArtifactError, ForecastRecord, MetricsSummary, ModelParams, WrittenArtifacts,
    FORECAST_FILE_NAME, METRICS_FILE_NAME,
};
pub use config::{ConfigError, PipelineConfig, MODEL_SEED};
pub use encoding::{
    normalize_source, CandidateEncoding, NormalizeError, NormalizedTable, RecoverySource,
};
pub use features::{build_lag_features, split_chronological, FeatureError, FeatureRow};
pub use forest::{ForestError, RandomForestRegressor};
pub use metrics::{evaluate, Metrics, MetricsError};
pub use observability::{
    init_logging, log_run_start, logging_config_from_env, LogFormat, LoggingConfig,
    LoggingInitError,
};
pub use pipeline::{run, PipelineError, RunSummary};
pub use series::{
    aggregate_daily, coerce_or_zero, parse_flexible_date, AggregateReport, SeriesError,
    SeriesPoint,
};
