mod error;
mod ingest;
mod taxi_demand;
mod transform;
mod types;
mod utils;

pub use error::TaxiDemandError;
pub use taxi_demand::*;

pub use ingest::error::IngestError;
pub use ingest::raw_data_loader::{RawDataLoader, DEFAULT_BASE_URL};
pub use ingest::validation::{validate_rides, RidesFrameExt};

pub use transform::aggregate::{
    aggregate_hourly, transform_raw_data_into_ts_data, trips_from_frame, truncate_to_hour,
};
pub use transform::densify::{add_missing_slots, hour_range};
pub use transform::error::TransformError;
pub use transform::windows::{
    get_cutoff_indices_features_and_target, transform_ts_data_into_features_and_target,
    transform_ts_frame_into_features_and_target, window_count,
};

pub use types::columns;
pub use types::dense_series::{DenseSeries, LocationSeries};
pub use types::feature_window::{CutoffIndices, FeatureWindow, FeaturesAndTargets};
pub use types::month::Month;
pub use types::observation::{Observation, Trip};
