//! Run configuration, built once at startup from the environment and passed
//! into each component. The variable names are the contract the external
//! orchestration loop drives this binary through.

use std::env;
use std::path::PathBuf;

use thiserror::Error;

pub const DEFAULT_DATE_COLUMN: &str = "Order Date";
pub const DEFAULT_VALUE_COLUMN: &str = "Sales";
pub const DEFAULT_LAGS: usize = 14;
pub const DEFAULT_TRAIN_FRACTION: f64 = 0.8;
pub const DEFAULT_N_ESTIMATORS: usize = 200;
pub const DEFAULT_MAX_DEPTH: usize = 8;
pub const DEFAULT_OUT_DIR: &str = "output";

/// Fixed model seed; identical inputs and configuration must produce
/// byte-identical artifacts.
pub const MODEL_SEED: u64 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub source_path: PathBuf,
    pub date_column: String,
    pub value_column: String,
    pub lag_count: usize,
    pub train_fraction: f64,
    pub n_estimators: usize,
    pub max_depth: usize,
    pub out_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DATA_PATH is not set; it must point to the input CSV")]
    SourcePathMissing,
    #[error("invalid value '{value}' for {variable}: expected {expected}")]
    InvalidValue {
        variable: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl PipelineConfig {
    /// Reads the full configuration from the environment. Unset optional
    /// variables take the original script's defaults; malformed values are
    /// configuration errors, never silent fallbacks.
    pub fn from_env() -> Result<Self, ConfigError> {
        let source_path = env::var("DATA_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .ok_or(ConfigError::SourcePathMissing)?;

        // VALUE_COL is the generic name; SALES_COL is accepted for
        // compatibility with the original orchestration contract.
        let value_column = env::var("VALUE_COL")
            .or_else(|_| env::var("SALES_COL"))
            .unwrap_or_else(|_| DEFAULT_VALUE_COLUMN.to_string());

        Ok(Self {
            source_path,
            date_column: env::var("DATE_COL").unwrap_or_else(|_| DEFAULT_DATE_COLUMN.to_string()),
            value_column,
            lag_count: parse_env("LAGS", DEFAULT_LAGS, parse_positive_usize)?,
            train_fraction: parse_env("TRAIN_FRAC", DEFAULT_TRAIN_FRACTION, parse_fraction)?,
            n_estimators: parse_env(
                "MODEL_N_ESTIMATORS",
                DEFAULT_N_ESTIMATORS,
                parse_positive_usize,
            )?,
            max_depth: parse_env("MODEL_MAX_DEPTH", DEFAULT_MAX_DEPTH, parse_positive_usize)?,
            out_dir: env::var("OUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUT_DIR)),
        })
    }
}

fn parse_env<T>(
    variable: &'static str,
    default: T,
    parser: fn(&'static str, &str) -> Result<T, ConfigError>,
) -> Result<T, ConfigError> {
    match env::var(variable) {
        Ok(raw) => parser(variable, raw.trim()),
        Err(_) => Ok(default),
    }
}

fn parse_positive_usize(variable: &'static str, raw: &str) -> Result<usize, ConfigError> {
    raw.parse::<usize>()
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| ConfigError::InvalidValue {
            variable,
            value: raw.to_string(),
            expected: "a positive integer",
        })
}

/// Parses the train fraction. Degenerate fractions (0, 1, or out of range)
/// are accepted here and rejected by the splitter, which reports the
/// computed train size.
fn parse_fraction(variable: &'static str, raw: &str) -> Result<f64, ConfigError> {
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ConfigError::InvalidValue {
            variable,
            value: raw.to_string(),
            expected: "a finite float",
        })
}
