use chrono::NaiveDateTime;

/// One validated trip record: when and where the passenger was picked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trip {
    pub pickup_datetime: NaiveDateTime,
    pub pickup_location_id: u32,
}

/// Number of rides that started at a location within one hour.
///
/// `pickup_hour` is truncated to the whole hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Observation {
    pub pickup_hour: NaiveDateTime,
    pub pickup_location_id: u32,
    pub rides: u32,
}

impl Observation {
    pub fn new(pickup_hour: NaiveDateTime, pickup_location_id: u32, rides: u32) -> Self {
        Self {
            pickup_hour,
            pickup_location_id,
            rides,
        }
    }
}
