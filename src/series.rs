//! Daily series aggregation from normalized tabular rows.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::encoding::NormalizedTable;

/// Date formats accepted by the permissive parser, tried in order.
const DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%d-%b-%Y",
    "%b %d, %Y",
];

/// One aggregated observation: all rows sharing a calendar date, summed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Row-quality counters for one aggregation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AggregateReport {
    pub rows_total: u64,
    pub rows_dropped_bad_date: u64,
    pub values_coerced_to_zero: u64,
}

#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("missing required column '{column}'; available columns: {available:?}")]
    ColumnMissing {
        column: String,
        available: Vec<String>,
    },
    #[error("series is empty after date filtering")]
    EmptySeries,
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Aggregates normalized rows into a date-ordered daily series.
///
/// Rows whose date fails to parse are dropped with a warning. Value cells
/// that fail numeric parsing contribute zero via [`coerce_or_zero`]; a date
/// may still carry other valid rows, so the row itself is kept.
pub fn aggregate_daily(
    table: &NormalizedTable,
    date_col: &str,
    value_col: &str,
) -> Result<(Vec<SeriesPoint>, AggregateReport), SeriesError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(table.text.as_bytes());

    let headers = reader.headers()?.clone();
    let date_idx = column_index(&headers, date_col)?;
    let value_idx = column_index(&headers, value_col)?;

    let mut grouped: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut report = AggregateReport::default();

    for record in reader.records() {
        let record = record?;
        report.rows_total += 1;

        let raw_date = record.get(date_idx).unwrap_or_default();
        let Some(date) = parse_flexible_date(raw_date) else {
            report.rows_dropped_bad_date += 1;
            warn!(
                component = "series",
                event = "series.aggregate.row_dropped",
                raw_date = raw_date,
                row = report.rows_total
            );
            continue;
        };

        let raw_value = record.get(value_idx).unwrap_or_default();
        let (value, coerced) = coerce_or_zero(raw_value);
        if coerced {
            report.values_coerced_to_zero += 1;
            warn!(
                component = "series",
                event = "series.aggregate.value_coerced",
                raw_value = raw_value,
                date = %date
            );
        }

        *grouped.entry(date).or_insert(0.0) += value;
    }

    if grouped.is_empty() {
        return Err(SeriesError::EmptySeries);
    }

    let series: Vec<SeriesPoint> = grouped
        .into_iter()
        .map(|(date, value)| SeriesPoint { date, value })
        .collect();

    info!(
        component = "series",
        event = "series.aggregate.finish",
        rows_total = report.rows_total,
        rows_dropped_bad_date = report.rows_dropped_bad_date,
        values_coerced_to_zero = report.values_coerced_to_zero,
        series_len = series.len(),
        first_date = %series[0].date,
        last_date = %series[series.len() - 1].date
    );

    Ok((series, report))
}

/// Parses a calendar date from any of the accepted formats, first match wins.
pub fn parse_flexible_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

/// The named coercion policy for malformed numeric cells: parse as `f64`
/// after trimming currency noise, or contribute `0.0`. Returns the value and
/// whether coercion was applied.
pub fn coerce_or_zero(raw: &str) -> (f64, bool) {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|ch| *ch != '$' && *ch != ',')
        .collect();

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => (value, false),
        _ => (0.0, true),
    }
}

fn column_index(headers: &csv::StringRecord, column: &str) -> Result<usize, SeriesError> {
    headers
        .iter()
        .position(|header| header.trim() == column)
        .ok_or_else(|| SeriesError::ColumnMissing {
            column: column.to_string(),
            available: headers.iter().map(|h| h.trim().to_string()).collect(),
        })
}
