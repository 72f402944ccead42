//! Hourly ride counts with one row per (hour, location), as produced by
//! [`crate::add_missing_slots`] and consumed by the window slicer.

use crate::transform::error::TransformError;
use crate::transform::frame_utils::{check_columns, datetime_column, datetime_values, u32_values};
use crate::types::columns::{PICKUP_HOUR, PICKUP_LOCATION_ID, RIDES, TS_DATA_COLUMNS};
use crate::types::observation::Observation;
use chrono::{NaiveDateTime, TimeDelta};
use polars::prelude::*;
use std::collections::HashMap;

/// Hourly ride counts of a single pickup location.
///
/// `hours` and `rides` always have the same length; row `i` says that `rides[i]`
/// trips started at this location during `hours[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationSeries {
    pub location_id: u32,
    pub hours: Vec<NaiveDateTime>,
    pub rides: Vec<u32>,
}

impl LocationSeries {
    pub fn len(&self) -> usize {
        self.rides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rides.is_empty()
    }

    /// Fails with [`TransformError::NonContiguousHours`] unless every hour is
    /// exactly one hour after the previous one.
    pub fn check_hourly(&self) -> Result<(), TransformError> {
        for pair in self.hours.windows(2) {
            if pair[1] - pair[0] != TimeDelta::hours(1) {
                return Err(TransformError::NonContiguousHours {
                    location_id: self.location_id,
                    previous: pair[0],
                    next: pair[1],
                });
            }
        }
        Ok(())
    }
}

/// Hourly ride counts for every location, grouped by location.
///
/// When built by [`crate::add_missing_slots`], every location covers the same
/// contiguous hour range and locations are sorted by id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DenseSeries {
    locations: Vec<LocationSeries>,
}

impl DenseSeries {
    pub fn new(locations: Vec<LocationSeries>) -> Self {
        Self { locations }
    }

    pub fn locations(&self) -> &[LocationSeries] {
        &self.locations
    }

    pub fn location(&self, location_id: u32) -> Option<&LocationSeries> {
        self.locations
            .iter()
            .find(|series| series.location_id == location_id)
    }

    /// Total number of (hour, location) rows.
    pub fn len(&self) -> usize {
        self.locations.iter().map(LocationSeries::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over all rows, location by location.
    pub fn observations(&self) -> impl Iterator<Item = Observation> + '_ {
        self.locations.iter().flat_map(|series| {
            series
                .hours
                .iter()
                .zip(&series.rides)
                .map(|(&hour, &rides)| Observation::new(hour, series.location_id, rides))
        })
    }

    /// Converts to a table with columns `pickup_hour`, `rides` and `pickup_location_id`.
    pub fn to_frame(&self) -> Result<DataFrame, TransformError> {
        let rows = self.len();
        let mut hours = Vec::with_capacity(rows);
        let mut rides = Vec::with_capacity(rows);
        let mut location_ids = Vec::with_capacity(rows);

        for series in &self.locations {
            hours.extend_from_slice(&series.hours);
            rides.extend_from_slice(&series.rides);
            location_ids.extend(std::iter::repeat(series.location_id).take(series.len()));
        }

        let df = DataFrame::new(vec![
            datetime_column(PICKUP_HOUR, &hours)?,
            Series::new(RIDES.into(), rides).into_column(),
            Series::new(PICKUP_LOCATION_ID.into(), location_ids).into_column(),
        ])?;
        Ok(df)
    }

    /// Reads a time-series table back into per-location series.
    ///
    /// The frame must have exactly the columns `pickup_hour`, `rides` and
    /// `pickup_location_id`. Locations keep the order of their first row; the rows
    /// of each location are sorted by hour and must then step by exactly one hour.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::Schema`] for any other column set,
    /// [`TransformError::NonContiguousHours`] for a location with missing or
    /// repeated hours, and [`TransformError::NullValue`] /
    /// [`TransformError::InvalidValue`] for rows that cannot be represented.
    pub fn from_frame(frame: &DataFrame) -> Result<Self, TransformError> {
        check_columns(frame, &TS_DATA_COLUMNS)?;

        let hours = datetime_values(frame, PICKUP_HOUR)?;
        let rides = u32_values(frame, RIDES)?;
        let location_ids = u32_values(frame, PICKUP_LOCATION_ID)?;

        let mut index_of: HashMap<u32, usize> = HashMap::new();
        let mut rows: Vec<(u32, Vec<(NaiveDateTime, u32)>)> = Vec::new();

        for ((hour, count), location_id) in hours.into_iter().zip(rides).zip(location_ids) {
            let idx = *index_of.entry(location_id).or_insert_with(|| {
                rows.push((location_id, Vec::new()));
                rows.len() - 1
            });
            rows[idx].1.push((hour, count));
        }

        let locations = rows
            .into_iter()
            .map(|(location_id, mut location_rows)| -> Result<LocationSeries, TransformError> {
                location_rows.sort_by_key(|(hour, _)| *hour);
                let (hours, rides) = location_rows.into_iter().unzip();
                let series = LocationSeries {
                    location_id,
                    hours,
                    rides,
                };
                series.check_hourly()?;
                Ok(series)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { locations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 1, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn two_locations() -> DenseSeries {
        DenseSeries::new(vec![
            LocationSeries {
                location_id: 4,
                hours: vec![at(0), at(1), at(2)],
                rides: vec![1, 0, 3],
            },
            LocationSeries {
                location_id: 7,
                hours: vec![at(0), at(1), at(2)],
                rides: vec![0, 2, 0],
            },
        ])
    }

    #[test]
    fn test_to_frame_schema() -> Result<(), Box<dyn std::error::Error>> {
        let df = two_locations().to_frame()?;

        assert_eq!(df.shape(), (6, 3));
        let columns: Vec<&str> = df.get_column_names().iter().map(|c| c.as_str()).collect();
        assert_eq!(columns, ["pickup_hour", "rides", "pickup_location_id"]);
        assert!(matches!(
            df.column(PICKUP_HOUR)?.dtype(),
            DataType::Datetime(TimeUnit::Milliseconds, None)
        ));
        Ok(())
    }

    #[test]
    fn test_frame_roundtrip_keeps_location_grouping() -> Result<(), Box<dyn std::error::Error>> {
        let series = two_locations();
        let back = DenseSeries::from_frame(&series.to_frame()?)?;
        assert_eq!(back, series);
        Ok(())
    }

    #[test]
    fn test_from_frame_groups_interleaved_rows() -> Result<(), Box<dyn std::error::Error>> {
        let df = DataFrame::new(vec![
            datetime_column(PICKUP_HOUR, &[at(0), at(0), at(1), at(1)])?,
            Series::new(RIDES.into(), vec![1u32, 2, 3, 4]).into_column(),
            Series::new(PICKUP_LOCATION_ID.into(), vec![9u32, 5, 9, 5]).into_column(),
        ])?;

        let series = DenseSeries::from_frame(&df)?;
        let ids: Vec<u32> = series.locations().iter().map(|l| l.location_id).collect();
        assert_eq!(ids, [9, 5]);
        assert_eq!(series.location(9).unwrap().rides, [1, 3]);
        assert_eq!(series.location(5).unwrap().rides, [2, 4]);
        Ok(())
    }

    #[test]
    fn test_from_frame_sorts_shuffled_rows() -> Result<(), Box<dyn std::error::Error>> {
        let df = DataFrame::new(vec![
            datetime_column(PICKUP_HOUR, &[at(2), at(0), at(1)])?,
            Series::new(RIDES.into(), vec![30u32, 10, 20]).into_column(),
            Series::new(PICKUP_LOCATION_ID.into(), vec![7u32, 7, 7]).into_column(),
        ])?;

        let series = DenseSeries::from_frame(&df)?;
        let location = series.location(7).unwrap();
        assert_eq!(location.hours, [at(0), at(1), at(2)]);
        assert_eq!(location.rides, [10, 20, 30]);
        Ok(())
    }

    #[test]
    fn test_from_frame_rejects_missing_hour() -> Result<(), Box<dyn std::error::Error>> {
        let df = DataFrame::new(vec![
            datetime_column(PICKUP_HOUR, &[at(3), at(0), at(4), at(1), at(5)])?,
            Series::new(RIDES.into(), vec![30u32, 0, 40, 10, 50]).into_column(),
            Series::new(PICKUP_LOCATION_ID.into(), vec![7u32; 5]).into_column(),
        ])?;

        let err = DenseSeries::from_frame(&df).unwrap_err();
        assert!(matches!(
            err,
            TransformError::NonContiguousHours { location_id: 7, previous, next }
                if previous == at(1) && next == at(3)
        ));
        Ok(())
    }

    #[test]
    fn test_from_frame_rejects_repeated_hour() -> Result<(), Box<dyn std::error::Error>> {
        let df = DataFrame::new(vec![
            datetime_column(PICKUP_HOUR, &[at(0), at(1), at(1)])?,
            Series::new(RIDES.into(), vec![1u32, 2, 3]).into_column(),
            Series::new(PICKUP_LOCATION_ID.into(), vec![4u32, 4, 4]).into_column(),
        ])?;

        assert!(matches!(
            DenseSeries::from_frame(&df),
            Err(TransformError::NonContiguousHours { location_id: 4, .. })
        ));
        Ok(())
    }

    #[test]
    fn test_from_frame_rejects_extra_column() -> Result<(), Box<dyn std::error::Error>> {
        let mut df = two_locations().to_frame()?;
        df.with_column(Series::new("foo".into(), vec![0i64; 6]))?;

        let err = DenseSeries::from_frame(&df).unwrap_err();
        assert!(matches!(err, TransformError::Schema { .. }));
        Ok(())
    }

    #[test]
    fn test_observations_flatten_in_location_order() {
        let rows: Vec<Observation> = two_locations().observations().collect();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0], Observation::new(at(0), 4, 1));
        assert_eq!(rows[4], Observation::new(at(1), 7, 2));
    }
}
