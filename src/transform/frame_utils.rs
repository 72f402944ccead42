//! Conversions between polars columns and the typed rows used by the transforms.

use crate::transform::error::TransformError;
use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;

/// Retrieves a column by name from a DataFrame.
pub(crate) fn get_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, TransformError> {
    df.column(name)
        .map_err(|e| TransformError::ColumnNotFound(name.to_string(), e))
}

/// Fails with [`TransformError::Schema`] unless the frame has exactly `expected` as its
/// column set. Column order is ignored.
pub(crate) fn check_columns(df: &DataFrame, expected: &[&str]) -> Result<(), TransformError> {
    let mut found: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let mut wanted: Vec<String> = expected.iter().map(|name| name.to_string()).collect();
    found.sort();
    wanted.sort();

    if found != wanted {
        return Err(TransformError::Schema {
            expected: wanted,
            found,
        });
    }
    Ok(())
}

/// Reads a datetime (or integer millisecond) column as naive UTC timestamps.
pub(crate) fn datetime_values(
    df: &DataFrame,
    name: &str,
) -> Result<Vec<NaiveDateTime>, TransformError> {
    let millis = get_column(df, name)?
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
        .cast(&DataType::Int64)?;

    millis
        .i64()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            let ms = value.ok_or_else(|| TransformError::NullValue {
                column: name.to_string(),
                row,
            })?;
            DateTime::from_timestamp_millis(ms)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| TransformError::InvalidValue {
                    column: name.to_string(),
                    row,
                    value: ms.to_string(),
                })
        })
        .collect()
}

/// Reads an integer column as non-negative `u32` values.
pub(crate) fn u32_values(df: &DataFrame, name: &str) -> Result<Vec<u32>, TransformError> {
    let ints = get_column(df, name)?.cast(&DataType::Int64)?;

    ints.i64()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            let value = value.ok_or_else(|| TransformError::NullValue {
                column: name.to_string(),
                row,
            })?;
            u32::try_from(value).map_err(|_| TransformError::InvalidValue {
                column: name.to_string(),
                row,
                value: value.to_string(),
            })
        })
        .collect()
}

/// Builds a `Datetime(ms)` column from naive UTC timestamps.
pub(crate) fn datetime_column(name: &str, values: &[NaiveDateTime]) -> PolarsResult<Column> {
    let millis: Vec<i64> = values
        .iter()
        .map(|dt| dt.and_utc().timestamp_millis())
        .collect();
    Series::new(name.into(), millis)
        .into_column()
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
}
