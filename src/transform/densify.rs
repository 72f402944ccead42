//! Fills the (hour, location) slots that had no rides with explicit zero counts.

use crate::transform::error::TransformError;
use crate::types::dense_series::{DenseSeries, LocationSeries};
use crate::types::observation::Observation;
use chrono::{NaiveDateTime, TimeDelta, Timelike};
use log::debug;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Global `(min, max)` pickup hour over all observations, or `None` when empty.
pub fn hour_range(observations: &[Observation]) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let min = observations.iter().map(|obs| obs.pickup_hour).min()?;
    let max = observations.iter().map(|obs| obs.pickup_hour).max()?;
    Some((min, max))
}

fn is_whole_hour(datetime: NaiveDateTime) -> bool {
    datetime.minute() == 0 && datetime.second() == 0 && datetime.nanosecond() == 0
}

/// Builds a dense hourly series for every location in `observations`.
///
/// The hour range is computed once over *all* locations, so every location gets one
/// row per hour in `[min_hour, max_hour]`, including locations with a single
/// observation. Hours without an observation get a count of 0; duplicate
/// observations for the same (hour, location) are summed. Locations are returned
/// sorted by id.
///
/// # Errors
///
/// * [`TransformError::EmptyInput`] if `observations` is empty.
/// * [`TransformError::UnalignedHour`] if an observation is not on a whole hour.
/// * [`TransformError::CountOverflow`] if summed duplicates overflow `u32`.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use taxi_demand::{add_missing_slots, Observation};
///
/// let hour = |h| NaiveDate::from_ymd_opt(2022, 1, 1).unwrap().and_hms_opt(h, 0, 0).unwrap();
/// let series = add_missing_slots(&[
///     Observation::new(hour(0), 42, 4),
///     Observation::new(hour(3), 42, 6),
/// ])
/// .unwrap();
///
/// assert_eq!(series.location(42).unwrap().rides, [4, 0, 0, 6]);
/// ```
pub fn add_missing_slots(observations: &[Observation]) -> Result<DenseSeries, TransformError> {
    let (min_hour, max_hour) = hour_range(observations).ok_or(TransformError::EmptyInput)?;
    let n_hours = (max_hour - min_hour).num_hours() as usize + 1;

    // Slot index and count of every observation, grouped per location.
    let mut by_location: BTreeMap<u32, Vec<(usize, u32)>> = BTreeMap::new();
    for obs in observations {
        if !is_whole_hour(obs.pickup_hour) {
            return Err(TransformError::UnalignedHour(obs.pickup_hour));
        }
        let slot = (obs.pickup_hour - min_hour).num_hours() as usize;
        by_location
            .entry(obs.pickup_location_id)
            .or_default()
            .push((slot, obs.rides));
    }

    let grid: Vec<NaiveDateTime> = (0..n_hours)
        .map(|offset| min_hour + TimeDelta::hours(offset as i64))
        .collect();

    debug!(
        "Filling missing slots for {} locations over {} hours ({} to {})",
        by_location.len(),
        n_hours,
        min_hour,
        max_hour
    );

    let groups: Vec<(u32, Vec<(usize, u32)>)> = by_location.into_iter().collect();
    let locations = groups
        .into_par_iter()
        .map(|(location_id, slots)| -> Result<LocationSeries, TransformError> {
            let mut rides = vec![0u32; n_hours];
            for (slot, count) in slots {
                rides[slot] = rides[slot]
                    .checked_add(count)
                    .ok_or(TransformError::CountOverflow {
                        location_id,
                        hour: grid[slot],
                    })?;
            }
            Ok(LocationSeries {
                location_id,
                hours: grid.clone(),
                rides,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DenseSeries::new(locations))
}
