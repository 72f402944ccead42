//! Column names of the raw, validated, time-series and feature tables.

// Raw yellow taxi trip records
pub const RAW_PICKUP_DATETIME: &str = "tpep_pickup_datetime";
pub const RAW_PICKUP_LOCATION_ID: &str = "PULocationID";

// Validated trips
pub const PICKUP_DATETIME: &str = "pickup_datetime";
pub const PICKUP_LOCATION_ID: &str = "pickup_location_id";

// Hourly time series
pub const PICKUP_HOUR: &str = "pickup_hour";
pub const RIDES: &str = "rides";

// Features and target
pub const TARGET_RIDES_NEXT_HOUR: &str = "target_rides_next_hour";

/// Column set of an hourly time-series table.
pub const TS_DATA_COLUMNS: [&str; 3] = [PICKUP_HOUR, RIDES, PICKUP_LOCATION_ID];

/// Name of the feature column holding the count `hours_back` hours before the target.
pub fn rides_previous_hour(hours_back: usize) -> String {
    format!("rides_previous_{}_hour", hours_back)
}
