//! Slices dense hourly series into (features, target) training examples.

use crate::transform::error::TransformError;
use crate::types::dense_series::{DenseSeries, LocationSeries};
use crate::types::feature_window::{CutoffIndices, FeaturesAndTargets};
use log::debug;
use polars::prelude::{DataFrame, Series};
use rayon::prelude::*;

pub(crate) fn check_positive(name: &'static str, value: usize) -> Result<(), TransformError> {
    if value == 0 {
        return Err(TransformError::InvalidParameter { name, value });
    }
    Ok(())
}

/// Number of windows a series of `len` rows yields.
///
/// Zero when `len <= input_seq_len + 1`, since the last row is never used as a
/// target.
pub fn window_count(len: usize, input_seq_len: usize, step_size: usize) -> usize {
    if step_size == 0 || len < input_seq_len + 2 {
        return 0;
    }
    (len - input_seq_len - 2) / step_size + 1
}

/// Computes the cutoff triples for a series of `len` rows.
///
/// The first triple is `(0, input_seq_len, input_seq_len + 1)`; each following
/// triple is shifted by `step_size`, and the scan stops once `end` would exceed
/// `len - 1`.
///
/// # Errors
///
/// Returns [`TransformError::InvalidParameter`] if `input_seq_len` or `step_size`
/// is zero.
pub fn get_cutoff_indices_features_and_target(
    len: usize,
    input_seq_len: usize,
    step_size: usize,
) -> Result<Vec<CutoffIndices>, TransformError> {
    check_positive("input_seq_len", input_seq_len)?;
    check_positive("step_size", step_size)?;

    Ok((0..window_count(len, input_seq_len, step_size))
        .map(|i| {
            let start = i * step_size;
            CutoffIndices {
                start,
                mid: start + input_seq_len,
                end: start + input_seq_len + 1,
            }
        })
        .collect())
}

fn slice_location(
    series: &LocationSeries,
    input_seq_len: usize,
    step_size: usize,
) -> Result<FeaturesAndTargets, TransformError> {
    series.check_hourly()?;
    let indices = get_cutoff_indices_features_and_target(series.len(), input_seq_len, step_size)?;
    let mut windows = FeaturesAndTargets::with_capacity(input_seq_len, indices.len());

    for idx in &indices {
        windows.push(
            series.location_id,
            series.hours[idx.mid],
            &series.rides[idx.start..idx.mid],
            series.rides[idx.mid],
        );
    }

    debug!(
        "Location {}: {} rows -> {} windows",
        series.location_id,
        series.len(),
        windows.len()
    );
    Ok(windows)
}

/// Slices every location of `ts_data` into sliding windows of `input_seq_len`
/// hourly counts, each paired with the count of the following hour.
///
/// Windows of one location are ordered by target hour; locations keep the order of
/// `ts_data`. Locations are sliced in parallel.
///
/// # Errors
///
/// Returns [`TransformError::InvalidParameter`] if `input_seq_len` or `step_size`
/// is zero, and [`TransformError::NonContiguousHours`] for a location whose hours
/// do not step by exactly one hour. Series too short for a single window are not
/// an error.
///
/// # Example
///
/// ```
/// use chrono::{NaiveDate, TimeDelta};
/// use taxi_demand::{transform_ts_data_into_features_and_target, DenseSeries, LocationSeries};
///
/// let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let rides = vec![5, 0, 0, 7, 2, 9, 1];
/// let hours = (0..rides.len() as i64).map(|h| start + TimeDelta::hours(h)).collect();
/// let ts_data = DenseSeries::new(vec![LocationSeries { location_id: 1, hours, rides }]);
///
/// let windows = transform_ts_data_into_features_and_target(&ts_data, 3, 1).unwrap();
/// let first = windows.get(0).unwrap();
/// assert_eq!(first.features, &[5, 0, 0]);
/// assert_eq!(first.target, 7);
/// ```
pub fn transform_ts_data_into_features_and_target(
    ts_data: &DenseSeries,
    input_seq_len: usize,
    step_size: usize,
) -> Result<FeaturesAndTargets, TransformError> {
    check_positive("input_seq_len", input_seq_len)?;
    check_positive("step_size", step_size)?;

    let per_location = ts_data
        .locations()
        .par_iter()
        .map(|series| slice_location(series, input_seq_len, step_size))
        .collect::<Result<Vec<_>, _>>()?;

    let total = per_location.iter().map(FeaturesAndTargets::len).sum();
    let mut windows = FeaturesAndTargets::with_capacity(input_seq_len, total);
    for location_windows in per_location {
        windows.append(location_windows);
    }

    debug!(
        "Sliced {} locations into {} windows (input_seq_len={}, step_size={})",
        ts_data.locations().len(),
        windows.len(),
        input_seq_len,
        step_size
    );
    Ok(windows)
}

/// Tabular variant of [`transform_ts_data_into_features_and_target`].
///
/// `ts_data` must have exactly the columns `pickup_hour`, `pickup_location_id` and
/// `rides`. Returns the features table and the `target_rides_next_hour` series.
///
/// # Errors
///
/// Returns [`TransformError::Schema`] for any other column set, in addition to the
/// errors of [`transform_ts_data_into_features_and_target`].
pub fn transform_ts_frame_into_features_and_target(
    ts_data: &DataFrame,
    input_seq_len: usize,
    step_size: usize,
) -> Result<(DataFrame, Series), TransformError> {
    let series = DenseSeries::from_frame(ts_data)?;
    let windows = transform_ts_data_into_features_and_target(&series, input_seq_len, step_size)?;
    Ok((windows.features_frame()?, windows.targets_series()))
}
