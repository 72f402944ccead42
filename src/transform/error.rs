use chrono::NaiveDateTime;
use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    /// The densifier needs at least one observation to know the hour range.
    #[error("Cannot fill missing slots: no observations were given")]
    EmptyInput,

    #[error("Expected exactly the columns {expected:?}, found {found:?}")]
    Schema {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Parameter '{name}' must be a positive integer, got {value}")]
    InvalidParameter { name: &'static str, value: usize },

    #[error("Observation hour {0} is not truncated to a whole hour")]
    UnalignedHour(NaiveDateTime),

    #[error("Location {location_id} is not an hourly series: {previous} is followed by {next}")]
    NonContiguousHours {
        location_id: u32,
        previous: NaiveDateTime,
        next: NaiveDateTime,
    },

    #[error("Failed to truncate timestamp {0} to the hour")]
    HourTruncation(NaiveDateTime, #[source] chrono::RoundingError),

    #[error("Ride count overflow for location {location_id} at {hour}")]
    CountOverflow {
        location_id: u32,
        hour: NaiveDateTime,
    },

    #[error("Null value in column '{column}' at row {row}")]
    NullValue { column: String, row: usize },

    #[error("Value {value} in column '{column}' at row {row} is out of range")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Required column '{0}' not found in DataFrame")]
    ColumnNotFound(String, #[source] PolarsError),

    #[error("Failed processing DataFrame: {0}")]
    DataFrame(#[from] PolarsError),
}
