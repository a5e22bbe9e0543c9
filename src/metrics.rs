//! Forecast accuracy metrics.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean absolute error and root-mean-square error over the test pairs.
/// Immutable once computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub mae: f64,
    pub rmse: f64,
}

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("cannot evaluate empty actual/prediction sequences")]
    Empty,
    #[error("misaligned inputs: {actuals} actuals vs {predictions} predictions")]
    LengthMismatch { actuals: usize, predictions: usize },
}

pub fn evaluate(actuals: &[f64], predictions: &[f64]) -> Result<Metrics, MetricsError> {
    if actuals.len() != predictions.len() {
        return Err(MetricsError::LengthMismatch {
            actuals: actuals.len(),
            predictions: predictions.len(),
        });
    }
    if actuals.is_empty() {
        return Err(MetricsError::Empty);
    }

    let n = actuals.len() as f64;
    let mae = actuals
        .iter()
        .zip(predictions)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / n;
    let rmse = (actuals
        .iter()
        .zip(predictions)
        .map(|(a, p)| (a - p) * (a - p))
        .sum::<f64>()
        / n)
        .sqrt();

    Ok(Metrics { mae, rmse })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_sequences_score_zero() {
        let values = [1.0, 2.5, -3.0, 4.0];
        let metrics = evaluate(&values, &values).unwrap();
        assert_eq!(metrics.mae, 0.0);
        assert_eq!(metrics.rmse, 0.0);
    }

    #[test]
    fn known_errors_match_standard_definitions() {
        let actuals = [1.0, 2.0, 3.0];
        let predictions = [2.0, 2.0, 5.0];
        let metrics = evaluate(&actuals, &predictions).unwrap();
        assert!((metrics.mae - 1.0).abs() < 1e-12);
        assert!((metrics.rmse - (5.0_f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn rmse_dominates_mae() {
        let actuals = [0.0, 0.0, 0.0, 0.0];
        let predictions = [1.0, -2.0, 0.5, 3.0];
        let metrics = evaluate(&actuals, &predictions).unwrap();
        assert!(metrics.rmse >= metrics.mae);
        assert!(metrics.mae >= 0.0);
    }

    #[test]
    fn mismatched_or_empty_inputs_are_fatal() {
        assert!(matches!(
            evaluate(&[1.0], &[1.0, 2.0]).unwrap_err(),
            MetricsError::LengthMismatch {
                actuals: 1,
                predictions: 2
            }
        ));
        assert!(matches!(evaluate(&[], &[]).unwrap_err(), MetricsError::Empty));
    }
}
