//! Main entry point: downloads monthly taxi trips and turns them into hourly
//! time series and sliding-window training examples.

use crate::error::TaxiDemandError;
use crate::ingest::raw_data_loader::RawDataLoader;
use crate::transform::aggregate::transform_raw_data_into_ts_data;
use crate::transform::windows::{check_positive, transform_ts_data_into_features_and_target};
use crate::types::dense_series::DenseSeries;
use crate::types::feature_window::FeaturesAndTargets;
use crate::utils::{ensure_dir_exists, get_data_dir};
use bon::bon;
use std::path::PathBuf;
use tokio::task;

/// The main client for building taxi demand training data.
///
/// Downloaded and validated files are kept in a data folder and reused on later
/// runs. Create an instance with [`TaxiDemand::new()`] to use the default folder
/// (`taxi_demand_cache` in the user's cache directory) or with
/// [`TaxiDemand::with_data_folder()`] to choose one.
///
/// # Examples
///
/// ```rust,no_run
/// # use taxi_demand::{TaxiDemand, TaxiDemandError};
/// # #[tokio::main]
/// # async fn main() -> Result<(), TaxiDemandError> {
/// let client = TaxiDemand::new().await?;
///
/// let windows = client
///     .features_and_target()
///     .year(2022)
///     .months(vec![1])
///     .input_seq_len(24)
///     .call()
///     .await?;
///
/// let features = windows.features_frame().map_err(taxi_demand::TransformError::from)?;
/// let targets = windows.targets_series();
/// assert_eq!(features.height(), targets.len());
/// # Ok(())
/// # }
/// ```
pub struct TaxiDemand {
    loader: RawDataLoader,
}

#[bon]
impl TaxiDemand {
    /// Creates a client storing its files under `data_folder`.
    ///
    /// The folder is created if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`TaxiDemandError::DataDirCreation`] if the folder cannot be created.
    pub async fn with_data_folder(data_folder: PathBuf) -> Result<Self, TaxiDemandError> {
        ensure_dir_exists(&data_folder)
            .await
            .map_err(|e| TaxiDemandError::DataDirCreation(data_folder.clone(), e))?;
        Ok(Self {
            loader: RawDataLoader::builder().data_dir(data_folder).build(),
        })
    }

    /// Creates a client using the default data folder.
    ///
    /// # Errors
    ///
    /// Returns [`TaxiDemandError::DataDirResolution`] if the user's cache directory
    /// cannot be found, or [`TaxiDemandError::DataDirCreation`] if the folder cannot
    /// be created.
    pub async fn new() -> Result<Self, TaxiDemandError> {
        let data_folder = get_data_dir().map_err(TaxiDemandError::DataDirResolution)?;
        Self::with_data_folder(data_folder).await
    }

    /// Creates a client around an already configured loader, e.g. one pointing at
    /// a mirror of the trip files.
    pub fn from_loader(loader: RawDataLoader) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &RawDataLoader {
        &self.loader
    }

    /// Loads the trips of `year` and converts them into a dense hourly series per
    /// pickup location.
    ///
    /// # Arguments
    ///
    /// * `.year(i32)`: **Required.**
    /// * `.months(Vec<u32>)`: Optional. Months to load; all twelve by default.
    ///   Months that are not published yet are skipped.
    /// * `.persist(bool)`: Optional. Also save the series to
    ///   `transformed/ts_data_{YYYY}[_{MM}...].parquet`. Defaults to `false`.
    ///
    /// # Errors
    ///
    /// Returns [`TaxiDemandError::Ingest`] if no month could be downloaded or
    /// validated, and [`TaxiDemandError::Transform`] if the trips cannot be
    /// aggregated (e.g. no trip at all).
    #[builder]
    pub async fn ts_data(
        &self,
        year: i32,
        months: Option<Vec<u32>>,
        persist: Option<bool>,
    ) -> Result<DenseSeries, TaxiDemandError> {
        let label = ts_data_label(year, months.as_deref());
        let trips = self.loader.load_raw_data(year, months).await?;

        let ts_data =
            task::spawn_blocking(move || transform_raw_data_into_ts_data(&trips)).await??;

        if persist.unwrap_or(false) {
            self.loader.save_ts_data(&ts_data, &label).await?;
        }
        Ok(ts_data)
    }

    /// Builds sliding-window training examples for `year`.
    ///
    /// # Arguments
    ///
    /// * `.year(i32)`: **Required.**
    /// * `.months(Vec<u32>)`: Optional. Months to load; all twelve by default.
    /// * `.input_seq_len(usize)`: **Required.** Number of past hours per example.
    /// * `.step_size(usize)`: Optional. Hours between consecutive windows of a
    ///   location. Defaults to `1`.
    ///
    /// # Errors
    ///
    /// Returns [`TaxiDemandError::Transform`] with
    /// [`crate::TransformError::InvalidParameter`] for a zero `input_seq_len` or
    /// `step_size` (before anything is downloaded), plus the errors of
    /// [`TaxiDemand::ts_data`].
    #[builder]
    pub async fn features_and_target(
        &self,
        year: i32,
        months: Option<Vec<u32>>,
        input_seq_len: usize,
        step_size: Option<usize>,
    ) -> Result<FeaturesAndTargets, TaxiDemandError> {
        let step_size = step_size.unwrap_or(1);
        check_positive("input_seq_len", input_seq_len)?;
        check_positive("step_size", step_size)?;

        let ts_data = self.ts_data().year(year).maybe_months(months).call().await?;

        let windows = task::spawn_blocking(move || {
            transform_ts_data_into_features_and_target(&ts_data, input_seq_len, step_size)
        })
        .await??;
        Ok(windows)
    }
}

/// `2022` for a whole year, `2022_01_03` for January and March.
fn ts_data_label(year: i32, months: Option<&[u32]>) -> String {
    match months {
        None => format!("{:04}", year),
        Some(months) => months.iter().fold(format!("{:04}", year), |label, month| {
            format!("{}_{:02}", label, month)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::error::TransformError;
    use crate::types::columns::{RAW_PICKUP_DATETIME, RAW_PICKUP_LOCATION_ID};
    use chrono::{NaiveDate, NaiveDateTime};
    use polars::prelude::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 1, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    /// Location 1 has [1, 2, 0, 3, 1, 1] rides over hours 0..=5, location 2 a
    /// single ride in hour 0.
    fn january_parquet() -> Vec<u8> {
        let trips = [
            (at(0, 10), 1i64),
            (at(0, 20), 2),
            (at(1, 0), 1),
            (at(1, 59), 1),
            (at(3, 5), 1),
            (at(3, 6), 1),
            (at(3, 7), 1),
            (at(4, 30), 1),
            (at(5, 45), 1),
        ];
        let mut df = DataFrame::new(vec![
            Series::new(
                RAW_PICKUP_DATETIME.into(),
                trips
                    .iter()
                    .map(|(dt, _)| dt.and_utc().timestamp_micros())
                    .collect::<Vec<_>>(),
            )
            .cast(&DataType::Datetime(TimeUnit::Microseconds, None))
            .unwrap()
            .into_column(),
            Series::new(
                RAW_PICKUP_LOCATION_ID.into(),
                trips.iter().map(|(_, id)| *id).collect::<Vec<_>>(),
            )
            .into_column(),
        ])
        .unwrap();

        let mut bytes = Vec::new();
        ParquetWriter::new(&mut bytes).finish(&mut df).unwrap();
        bytes
    }

    async fn client_with_january(dir: &std::path::Path) -> (TaxiDemand, MockServer) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/yellow_tripdata_2022-01.parquet"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(january_parquet()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .with_priority(10)
            .mount(&server)
            .await;

        let loader = RawDataLoader::builder()
            .data_dir(dir)
            .base_url(server.uri())
            .build();
        (TaxiDemand::from_loader(loader), server)
    }

    #[test]
    fn test_ts_data_label() {
        assert_eq!(ts_data_label(2022, None), "2022");
        assert_eq!(ts_data_label(2022, Some(&[1, 3])), "2022_01_03");
    }

    #[tokio::test]
    async fn test_with_data_folder_creates_folder() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let folder = dir.path().join("nested").join("data");

        let client = TaxiDemand::with_data_folder(folder.clone()).await?;
        assert!(folder.is_dir());
        assert_eq!(client.loader().data_dir(), folder.as_path());
        Ok(())
    }

    #[tokio::test]
    async fn test_ts_data_is_dense_and_persisted() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let (client, _server) = client_with_january(dir.path()).await;

        let ts_data = client
            .ts_data()
            .year(2022)
            .months(vec![1])
            .persist(true)
            .call()
            .await?;

        assert_eq!(ts_data.location(1).unwrap().rides, [1, 2, 0, 3, 1, 1]);
        assert_eq!(ts_data.location(2).unwrap().rides, [1, 0, 0, 0, 0, 0]);
        assert!(client.loader().ts_data_file_path("2022_01").is_file());
        Ok(())
    }

    #[tokio::test]
    async fn test_features_and_target_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let (client, _server) = client_with_january(dir.path()).await;

        // February is answered with 404 and skipped.
        let windows = client
            .features_and_target()
            .year(2022)
            .months(vec![1, 2])
            .input_seq_len(2)
            .call()
            .await?;

        assert_eq!(windows.len(), 6);
        assert_eq!(windows.location_ids(), &[1, 1, 1, 2, 2, 2]);

        let first = windows.get(0).unwrap();
        assert_eq!(first.features, &[1, 2]);
        assert_eq!(first.target, 0);
        assert_eq!(first.target_hour, at(2, 0));
        assert_eq!(windows.input_seq_len(), 2);
        assert_eq!(windows.target_hours()[..3], [at(2, 0), at(3, 0), at(4, 0)]);
        assert_eq!(windows.targets()[..3], [0, 3, 1]);
        Ok(())
    }

    #[tokio::test]
    async fn test_features_and_target_rejects_zero_window_before_download(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let (client, server) = client_with_january(dir.path()).await;

        let err = client
            .features_and_target()
            .year(2022)
            .months(vec![1])
            .input_seq_len(0)
            .call()
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TaxiDemandError::Transform(TransformError::InvalidParameter {
                name: "input_seq_len",
                value: 0
            })
        ));
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
        Ok(())
    }
}
