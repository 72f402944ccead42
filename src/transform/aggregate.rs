//! Turns validated trips into hourly ride counts per pickup location.

use crate::transform::densify::add_missing_slots;
use crate::transform::error::TransformError;
use crate::transform::frame_utils::{datetime_values, get_column, u32_values};
use crate::types::columns::{PICKUP_DATETIME, PICKUP_LOCATION_ID};
use crate::types::dense_series::DenseSeries;
use crate::types::observation::{Observation, Trip};
use chrono::{DurationRound, NaiveDateTime, TimeDelta};
use log::debug;
use polars::prelude::DataFrame;
use std::collections::HashMap;

/// Reads the `pickup_datetime` and `pickup_location_id` columns of a validated frame.
///
/// Other columns are ignored. Null values are rejected; validation removes them.
pub fn trips_from_frame(frame: &DataFrame) -> Result<Vec<Trip>, TransformError> {
    // Fail on a missing location column before converting the timestamps.
    get_column(frame, PICKUP_LOCATION_ID)?;
    let datetimes = datetime_values(frame, PICKUP_DATETIME)?;
    let location_ids = u32_values(frame, PICKUP_LOCATION_ID)?;

    Ok(datetimes
        .into_iter()
        .zip(location_ids)
        .map(|(pickup_datetime, pickup_location_id)| Trip {
            pickup_datetime,
            pickup_location_id,
        })
        .collect())
}

/// Truncates a timestamp to the start of its hour.
pub fn truncate_to_hour(datetime: NaiveDateTime) -> Result<NaiveDateTime, TransformError> {
    datetime
        .duration_trunc(TimeDelta::hours(1))
        .map_err(|e| TransformError::HourTruncation(datetime, e))
}

/// Counts trips per (pickup hour, pickup location).
///
/// Only (hour, location) pairs with at least one trip are returned, sorted by hour
/// and then location.
pub fn aggregate_hourly(trips: &[Trip]) -> Result<Vec<Observation>, TransformError> {
    let mut counts: HashMap<(NaiveDateTime, u32), u32> = HashMap::new();

    for trip in trips {
        let hour = truncate_to_hour(trip.pickup_datetime)?;
        let count = counts.entry((hour, trip.pickup_location_id)).or_insert(0);
        *count = count
            .checked_add(1)
            .ok_or(TransformError::CountOverflow {
                location_id: trip.pickup_location_id,
                hour,
            })?;
    }

    let mut observations: Vec<Observation> = counts
        .into_iter()
        .map(|((hour, location_id), rides)| Observation::new(hour, location_id, rides))
        .collect();
    observations.sort_unstable();

    debug!(
        "Aggregated {} trips into {} hourly observations",
        trips.len(),
        observations.len()
    );
    Ok(observations)
}

/// Aggregates trips to hourly counts and fills every missing (hour, location)
/// slot with zero.
///
/// # Errors
///
/// Returns [`TransformError::EmptyInput`] when `trips` is empty.
pub fn transform_raw_data_into_ts_data(trips: &[Trip]) -> Result<DenseSeries, TransformError> {
    let observations = aggregate_hourly(trips)?;
    add_missing_slots(&observations)
}
