//! Lazy validation of raw trip records: column selection, renaming and month filtering.

use crate::ingest::error::IngestError;
use crate::types::columns::{
    PICKUP_DATETIME, PICKUP_LOCATION_ID, RAW_PICKUP_DATETIME, RAW_PICKUP_LOCATION_ID,
};
use crate::types::month::Month;
use chrono::NaiveDateTime;
use polars::prelude::{col, lit, DataType, LazyFrame, TimeUnit};

pub trait RidesFrameExt {
    /// Keeps only the pickup timestamp and pickup location of a raw trip frame and
    /// renames them to `pickup_datetime` and `pickup_location_id`.
    ///
    /// The timestamp is cast to `Datetime(ms)` and the location to `Int64`.
    fn select_pickup_columns(self) -> LazyFrame;

    /// Keeps rows with `start <= pickup_datetime < end` and drops rows with a null
    /// timestamp or location.
    fn filter_pickup_range(self, start: NaiveDateTime, end: NaiveDateTime) -> LazyFrame;
}

impl RidesFrameExt for LazyFrame {
    fn select_pickup_columns(self) -> LazyFrame {
        self.select([
            col(RAW_PICKUP_DATETIME)
                .cast(DataType::Datetime(TimeUnit::Milliseconds, None))
                .alias(PICKUP_DATETIME),
            col(RAW_PICKUP_LOCATION_ID)
                .cast(DataType::Int64)
                .alias(PICKUP_LOCATION_ID),
        ])
    }

    fn filter_pickup_range(self, start: NaiveDateTime, end: NaiveDateTime) -> LazyFrame {
        self.filter(
            col(PICKUP_DATETIME)
                .is_not_null()
                .and(col(PICKUP_LOCATION_ID).is_not_null())
                .and(col(PICKUP_DATETIME).gt_eq(lit(start)))
                .and(col(PICKUP_DATETIME).lt(lit(end))),
        )
    }
}

/// Validates the raw trips of `month`: only `pickup_datetime` and
/// `pickup_location_id` remain, and only rows picked up within the month.
///
/// # Errors
///
/// Returns [`IngestError::InvalidMonth`] if `month` is not a calendar month.
pub fn validate_rides(frame: LazyFrame, month: Month) -> Result<LazyFrame, IngestError> {
    let (start, end) = month
        .start()
        .zip(month.end())
        .ok_or(IngestError::InvalidMonth(month))?;

    Ok(frame
        .select_pickup_columns()
        .filter_pickup_range(start, end))
}
