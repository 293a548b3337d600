use serde::{Deserialize, Serialize};

/// Column order the model was trained on. Serving must build rows in exactly this order.
pub const FEATURE_COLUMNS: [&str; 5] = [
    "trip_distance_km",
    "hour_of_day",
    "day_of_week",
    "month",
    "passenger_count",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRequest {
    pub pickup_longitude: f64,
    pub pickup_latitude: f64,
    pub dropoff_longitude: f64,
    pub dropoff_latitude: f64,
    pub passenger_count: i64,
    /// Naive local timestamp, e.g. `"2024-06-15 12:00:00"`.
    pub pickup_datetime: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub trip_distance_km: f64,
    pub hour_of_day: u32,
    /// Monday=0.
    pub day_of_week: u32,
    pub month: u32,
    pub passenger_count: i64,
}

impl FeatureVector {
    /// Model input row, ordered as [`FEATURE_COLUMNS`].
    pub fn to_row(&self) -> [f64; 5] {
        [
            self.trip_distance_km,
            f64::from(self.hour_of_day),
            f64::from(self.day_of_week),
            f64::from(self.month),
            self.passenger_count as f64,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FareEstimate {
    pub fare_amount: f64,
}
