//! Sliding-window training examples: `input_seq_len` past hourly counts as
//! features, the count of the following hour as target.

use crate::types::columns::{
    rides_previous_hour, PICKUP_HOUR, PICKUP_LOCATION_ID, TARGET_RIDES_NEXT_HOUR,
};
use crate::transform::frame_utils::datetime_column;
use chrono::NaiveDateTime;
use polars::prelude::*;

/// Row indices delimiting one window within a location's series.
///
/// Features are rows `start..mid`, the target is rows `mid..end` (always the single
/// row `mid`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutoffIndices {
    pub start: usize,
    pub mid: usize,
    pub end: usize,
}

/// A borrowed view of one training example.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureWindow<'a> {
    pub location_id: u32,
    /// Hour of the target, directly after the last feature hour.
    pub target_hour: NaiveDateTime,
    /// Oldest count first; the last entry is the hour right before `target_hour`.
    pub features: &'a [u32],
    pub target: u32,
}

/// All training examples of a run, stored column-wise.
///
/// Features are kept in one row-major buffer of `len() * input_seq_len()` counts.
/// Counts stay integers here; [`FeaturesAndTargets::features_frame`] and
/// [`FeaturesAndTargets::targets_series`] convert to `Float64`, which holds every `u32` count exactly, for model input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeaturesAndTargets {
    input_seq_len: usize,
    features: Vec<u32>,
    targets: Vec<u32>,
    target_hours: Vec<NaiveDateTime>,
    location_ids: Vec<u32>,
}

impl FeaturesAndTargets {
    pub fn with_capacity(input_seq_len: usize, windows: usize) -> Self {
        Self {
            input_seq_len,
            features: Vec::with_capacity(windows * input_seq_len),
            targets: Vec::with_capacity(windows),
            target_hours: Vec::with_capacity(windows),
            location_ids: Vec::with_capacity(windows),
        }
    }

    /// Appends one window. `features` must hold exactly `input_seq_len` counts.
    pub(crate) fn push(
        &mut self,
        location_id: u32,
        target_hour: NaiveDateTime,
        features: &[u32],
        target: u32,
    ) {
        debug_assert_eq!(features.len(), self.input_seq_len);
        self.features.extend_from_slice(features);
        self.targets.push(target);
        self.target_hours.push(target_hour);
        self.location_ids.push(location_id);
    }

    /// Moves all windows of `other` to the end of `self`.
    pub(crate) fn append(&mut self, mut other: FeaturesAndTargets) {
        debug_assert_eq!(other.input_seq_len, self.input_seq_len);
        self.features.append(&mut other.features);
        self.targets.append(&mut other.targets);
        self.target_hours.append(&mut other.target_hours);
        self.location_ids.append(&mut other.location_ids);
    }

    pub fn input_seq_len(&self) -> usize {
        self.input_seq_len
    }

    /// Number of windows.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn targets(&self) -> &[u32] {
        &self.targets
    }

    pub fn target_hours(&self) -> &[NaiveDateTime] {
        &self.target_hours
    }

    pub fn location_ids(&self) -> &[u32] {
        &self.location_ids
    }

    pub fn get(&self, idx: usize) -> Option<FeatureWindow<'_>> {
        let target = *self.targets.get(idx)?;
        let offset = idx * self.input_seq_len;
        Some(FeatureWindow {
            location_id: self.location_ids[idx],
            target_hour: self.target_hours[idx],
            features: &self.features[offset..offset + self.input_seq_len],
            target,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = FeatureWindow<'_>> + '_ {
        (0..self.len()).filter_map(move |idx| self.get(idx))
    }

    /// Builds the features table.
    ///
    /// Columns are `rides_previous_{input_seq_len}_hour` down to
    /// `rides_previous_1_hour` (`Float64`), followed by `pickup_hour` (the target
    /// hour) and `pickup_location_id`.
    pub fn features_frame(&self) -> PolarsResult<DataFrame> {
        let rows = self.len();
        let mut columns = Vec::with_capacity(self.input_seq_len + 2);

        for position in 0..self.input_seq_len {
            let values: Vec<f64> = (0..rows)
                .map(|row| f64::from(self.features[row * self.input_seq_len + position]))
                .collect();
            let name = rides_previous_hour(self.input_seq_len - position);
            columns.push(Series::new(name.into(), values).into_column());
        }
        columns.push(datetime_column(PICKUP_HOUR, &self.target_hours)?);
        columns.push(Series::new(PICKUP_LOCATION_ID.into(), self.location_ids.clone()).into_column());

        DataFrame::new(columns)
    }

    /// Builds the `target_rides_next_hour` series, aligned row by row with
    /// [`FeaturesAndTargets::features_frame`].
    pub fn targets_series(&self) -> Series {
        let values: Vec<f64> = self.targets.iter().map(|&t| f64::from(t)).collect();
        Series::new(TARGET_RIDES_NEXT_HOUR.into(), values)
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

    fn sample() -> FeaturesAndTargets {
        let mut windows = FeaturesAndTargets::with_capacity(3, 2);
        windows.push(42, at(3), &[5, 0, 0], 7);
        windows.push(42, at(4), &[0, 0, 7], 2);
        windows
    }

    #[test]
    fn test_get_returns_window_view() {
        let windows = sample();
        assert_eq!(windows.input_seq_len(), 3);
        assert_eq!(windows.target_hours(), &[at(3), at(4)]);
        let second = windows.get(1).unwrap();
        assert_eq!(second.features, &[0, 0, 7]);
        assert_eq!(second.target, 2);
        assert_eq!(second.target_hour, at(4));
        assert!(windows.get(2).is_none());
    }

    #[test]
    fn test_features_frame_columns_are_oldest_first() -> Result<(), Box<dyn std::error::Error>> {
        let df = sample().features_frame()?;
        let columns: Vec<&str> = df.get_column_names().iter().map(|c| c.as_str()).collect();
        assert_eq!(
            columns,
            [
                "rides_previous_3_hour",
                "rides_previous_2_hour",
                "rides_previous_1_hour",
                "pickup_hour",
                "pickup_location_id"
            ]
        );

        // rides_previous_1_hour is the hour right before the target
        let previous_1: Vec<Option<f64>> = df.column("rides_previous_1_hour")?.f64()?.into_iter().collect();
        assert_eq!(previous_1, [Some(0.0), Some(7.0)]);
        let previous_3: Vec<Option<f64>> = df.column("rides_previous_3_hour")?.f64()?.into_iter().collect();
        assert_eq!(previous_3, [Some(5.0), Some(0.0)]);
        Ok(())
    }

    #[test]
    fn test_targets_series_matches_rows() -> Result<(), Box<dyn std::error::Error>> {
        let windows = sample();
        let targets = windows.targets_series();
        assert_eq!(targets.name().as_str(), "target_rides_next_hour");
        assert_eq!(targets.len(), windows.features_frame()?.height());
        let values: Vec<Option<f64>> = targets.f64()?.into_iter().collect();
        assert_eq!(values, [Some(7.0), Some(2.0)]);
        Ok(())
    }

    #[test]
    fn test_append_concatenates_windows() {
        let mut first = sample();
        let mut second = FeaturesAndTargets::with_capacity(3, 1);
        second.push(9, at(10), &[1, 2, 3], 4);

        first.append(second);
        assert_eq!(first.len(), 3);
        assert_eq!(first.location_ids(), &[42, 42, 9]);
        assert_eq!(first.get(2).unwrap().features, &[1, 2, 3]);
    }

    #[test]
    fn test_empty_frame_keeps_schema() -> Result<(), Box<dyn std::error::Error>> {
        let df = FeaturesAndTargets::with_capacity(2, 0).features_frame()?;
        assert_eq!(df.shape(), (0, 4));
        Ok(())
    }
}
