use crate::ingest::error::IngestError;
use crate::ingest::validation::validate_rides;
use crate::transform::aggregate::trips_from_frame;
use crate::types::dense_series::DenseSeries;
use crate::types::month::Month;
use crate::types::observation::Trip;
use bon::bon;
use futures_util::TryStreamExt;
use log::{info, warn};
use polars::prelude::*;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio::{fs, task};
use tokio_util::io::StreamReader;

/// Where the NYC Taxi & Limousine Commission publishes monthly trip records.
pub const DEFAULT_BASE_URL: &str = "https://d37ci6vzurychx.cloudfront.net/trip-data";

const RAW_DIR_NAME: &str = "raw";
const TRANSFORMED_DIR_NAME: &str = "transformed";

/// Downloads monthly yellow taxi trip files and validates them.
///
/// Files are kept under `data_dir`:
/// * `raw/rides_{YYYY}-{MM}.parquet`: the file as published.
/// * `transformed/validated_rides_{YYYY}-{MM}.parquet`: pickup timestamp and location
///   of the trips within the month.
/// * `transformed/ts_data_{label}.parquet`: hourly time series saved with
///   [`RawDataLoader::save_ts_data`].
pub struct RawDataLoader {
    data_dir: PathBuf,
    base_url: String,
    download_client: Client,
}

#[bon]
impl RawDataLoader {
    /// Creates a loader storing its files under `data_dir`.
    ///
    /// `base_url` defaults to [`DEFAULT_BASE_URL`].
    #[builder]
    pub fn new(#[builder(into)] data_dir: PathBuf, #[builder(into)] base_url: Option<String>) -> Self {
        Self {
            data_dir,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            download_client: Client::new(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join(RAW_DIR_NAME)
    }

    pub fn transformed_dir(&self) -> PathBuf {
        self.data_dir.join(TRANSFORMED_DIR_NAME)
    }

    pub fn raw_file_path(&self, month: Month) -> PathBuf {
        self.raw_dir().join(format!("rides_{}.parquet", month))
    }

    pub fn validated_file_path(&self, month: Month) -> PathBuf {
        self.transformed_dir()
            .join(format!("validated_rides_{}.parquet", month))
    }

    pub fn ts_data_file_path(&self, label: &str) -> PathBuf {
        self.transformed_dir().join(format!("ts_data_{}.parquet", label))
    }

    fn url_for(&self, month: Month) -> String {
        format!(
            "{}/yellow_tripdata_{}.parquet",
            self.base_url.trim_end_matches('/'),
            month
        )
    }

    /// Downloads the raw trip file of `month`, unless it is already on disk.
    ///
    /// Returns the path of the local file. The body is streamed into a temporary file
    /// next to the destination and only moved into place once complete.
    ///
    /// # Errors
    ///
    /// * [`IngestError::InvalidMonth`] for a month outside `1..=12`.
    /// * [`IngestError::HttpStatus`] if the file is not available (e.g. 404 for a
    ///   month that was not published yet).
    /// * [`IngestError::NetworkRequest`] / [`IngestError::DownloadIo`] for transport
    ///   failures. Nothing is retried.
    pub async fn download_one_file_of_raw_data(&self, month: Month) -> Result<PathBuf, IngestError> {
        if !month.is_valid() {
            return Err(IngestError::InvalidMonth(month));
        }
        let path = self.raw_file_path(month);

        if fs::metadata(&path).await.is_ok() {
            info!("Cache hit for raw trips of {} at {:?}", month, path);
            return Ok(path);
        }
        warn!("Cache miss for raw trips of {}. Downloading.", month);

        let raw_dir = self.raw_dir();
        fs::create_dir_all(&raw_dir)
            .await
            .map_err(|e| IngestError::DataDirCreation(raw_dir.clone(), e))?;

        let url = self.url_for(month);
        let bytes = self.download(&url, &path).await?;
        info!("Downloaded {} bytes from {} to {:?}", bytes, url, path);
        Ok(path)
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<u64, IngestError> {
        info!("Downloading data from {}", url);

        let response = self
            .download_client
            .get(url)
            .send()
            .await
            .map_err(|e| IngestError::NetworkRequest(url.to_string(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(if let Some(status) = e.status() {
                    IngestError::HttpStatus {
                        url: url.to_string(),
                        status,
                        source: e,
                    }
                } else {
                    IngestError::NetworkRequest(url.to_string(), e)
                });
            }
        };

        let io_error = |e| IngestError::DownloadIo(destination.to_path_buf(), e);
        let dir = destination.parent().unwrap_or(&self.data_dir);
        let temp_file = NamedTempFile::new_in(dir).map_err(io_error)?;
        let mut file = fs::File::from_std(temp_file.reopen().map_err(io_error)?);

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let mut reader = StreamReader::new(stream);
        let bytes = tokio::io::copy(&mut reader, &mut file)
            .await
            .map_err(io_error)?;
        file.flush().await.map_err(io_error)?;
        drop(file);

        temp_file
            .persist(destination)
            .map_err(|e| IngestError::Persist(destination.to_path_buf(), e))?;
        Ok(bytes)
    }

    /// Validates the downloaded raw file of `month` and saves the result.
    ///
    /// The returned frame has the columns `pickup_datetime` and `pickup_location_id`;
    /// every row lies within the month and has no null values. It is also written to
    /// [`RawDataLoader::validated_file_path`].
    pub async fn validate_raw_data(&self, month: Month) -> Result<DataFrame, IngestError> {
        let raw_path = self.raw_file_path(month);
        let validated_path = self.validated_file_path(month);

        let transformed_dir = self.transformed_dir();
        fs::create_dir_all(&transformed_dir)
            .await
            .map_err(|e| IngestError::DataDirCreation(transformed_dir.clone(), e))?;

        task::spawn_blocking(move || {
            let raw = LazyFrame::scan_parquet(&raw_path, Default::default())
                .map_err(|e| IngestError::ParquetScan(raw_path.clone(), e))?;
            let mut rides = validate_rides(raw, month)?.collect()?;

            write_parquet_blocking(&mut rides, &validated_path)?;
            info!(
                "Validated {} trips for {} into {:?}",
                rides.height(),
                month,
                validated_path
            );
            Ok::<DataFrame, IngestError>(rides)
        })
        .await?
    }

    /// Downloads (if needed) and validates one month, returning its trips.
    pub async fn load_month(&self, month: Month) -> Result<Vec<Trip>, IngestError> {
        self.download_one_file_of_raw_data(month).await?;
        let rides = self.validate_raw_data(month).await?;
        Ok(trips_from_frame(&rides)?)
    }

    /// Loads several months of `year`, or all twelve when `months` is `None`.
    ///
    /// Months that are not published upstream ([`IngestError::HttpStatus`]) are skipped
    /// with a warning as long as at least one month loads; any other error aborts.
    pub async fn load_raw_data(
        &self,
        year: i32,
        months: Option<Vec<u32>>,
    ) -> Result<Vec<Trip>, IngestError> {
        let months: Vec<Month> = match months {
            Some(months) => months.into_iter().map(|m| Month(year, m)).collect(),
            None => Month::all_of_year(year),
        };

        let mut trips = Vec::new();
        let mut loaded = 0usize;
        let mut last_error: Option<IngestError> = None;

        for month in months {
            match self.load_month(month).await {
                Ok(month_trips) => {
                    loaded += 1;
                    trips.extend(month_trips);
                }
                Err(e @ IngestError::HttpStatus { .. }) => {
                    warn!("Skipping {}: {}", month, e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        if loaded == 0 {
            if let Some(e) = last_error {
                return Err(e);
            }
        }
        Ok(trips)
    }

    /// Saves a time series table to [`RawDataLoader::ts_data_file_path`].
    pub async fn save_ts_data(
        &self,
        ts_data: &DenseSeries,
        label: &str,
    ) -> Result<PathBuf, IngestError> {
        let transformed_dir = self.transformed_dir();
        fs::create_dir_all(&transformed_dir)
            .await
            .map_err(|e| IngestError::DataDirCreation(transformed_dir.clone(), e))?;

        let path = self.ts_data_file_path(label);
        let df = ts_data.to_frame()?;
        write_parquet(df, &path).await?;
        info!("Saved {} time series rows to {:?}", ts_data.len(), path);
        Ok(path)
    }
}

fn write_parquet_blocking(df: &mut DataFrame, path: &Path) -> Result<(), IngestError> {
    let file = std::fs::File::create(path)
        .map_err(|e| IngestError::ParquetWriteIo(path.to_path_buf(), e))?;
    ParquetWriter::new(file)
        .with_compression(ParquetCompression::Snappy)
        .finish(df)
        .map_err(|e| IngestError::ParquetWritePolars(path.to_path_buf(), e))?;
    Ok(())
}

/// Writes a DataFrame to a Parquet file on the blocking thread pool.
async fn write_parquet(mut df: DataFrame, path: &Path) -> Result<(), IngestError> {
    let path_buf = path.to_path_buf();
    task::spawn_blocking(move || write_parquet_blocking(&mut df, &path_buf)).await??;
    Ok(())
}
