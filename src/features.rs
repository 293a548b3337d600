//! Feature derivation shared by the prediction endpoint and the offline
//! feature builder. Everything here is pure.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::dataset::TripRecord;
use crate::error::FeatureError;
use crate::types::{FeatureVector, TripRequest};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

pub const MAX_PASSENGERS: i64 = 6;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Great-circle distance between two points given in degrees.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1, lat2, lon2) = (
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    );
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // rounding can push `a` a hair past 1.0 for antipodal points
    let c = 2.0 * a.min(1.0).sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// Parses a pickup timestamp as a naive wall-clock time.
///
/// Zone markers (` UTC`, `Z`, `+02:00`) are accepted but ignored: the
/// hour/day/month used for features are the ones written in the string.
pub fn parse_pickup_datetime(raw: &str) -> Result<NaiveDateTime, FeatureError> {
    let s = raw.trim();
    let s = s.strip_suffix("UTC").map(str::trim_end).unwrap_or(s);

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_local());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt.naive_local());
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| FeatureError::InvalidTimestamp(raw.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalFeatures {
    pub hour_of_day: u32,
    pub day_of_week: u32,
    pub month: u32,
}

impl TemporalFeatures {
    pub fn from_datetime(dt: &NaiveDateTime) -> Self {
        Self {
            hour_of_day: dt.hour(),
            day_of_week: dt.weekday().num_days_from_monday(),
            month: dt.month(),
        }
    }
}

/// Caps at six riders. There is no lower bound: zero and negative counts pass through.
pub fn clamp_passenger_count(count: i64) -> i64 {
    count.min(MAX_PASSENGERS)
}

pub fn derive_features(trip: &TripRequest) -> Result<FeatureVector, FeatureError> {
    let pickup = parse_pickup_datetime(&trip.pickup_datetime)?;
    let temporal = TemporalFeatures::from_datetime(&pickup);

    Ok(FeatureVector {
        trip_distance_km: haversine_km(
            trip.pickup_latitude,
            trip.pickup_longitude,
            trip.dropoff_latitude,
            trip.dropoff_longitude,
        ),
        hour_of_day: temporal.hour_of_day,
        day_of_week: temporal.day_of_week,
        month: temporal.month,
        passenger_count: clamp_passenger_count(trip.passenger_count),
    })
}

/// A processed trip with its derived feature columns appended. Passenger
/// count is clamped in place; temporal columns are empty when the pickup
/// time was unparsable.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeatureRecord {
    pub key: Option<String>,
    pub fare_amount: f64,
    pub pickup_datetime: Option<String>,
    pub pickup_longitude: f64,
    pub pickup_latitude: f64,
    pub dropoff_longitude: f64,
    pub dropoff_latitude: f64,
    pub passenger_count: Option<i64>,
    pub trip_distance_km: f64,
    pub hour_of_day: Option<u32>,
    pub day_of_week: Option<u32>,
    pub month: Option<u32>,
}

impl FeatureRecord {
    pub const COLUMNS: usize = 12;
}

pub fn build_feature_records(trips: Vec<TripRecord>) -> Vec<FeatureRecord> {
    trips
        .into_iter()
        .map(|t| {
            let temporal = t
                .pickup_datetime
                .as_deref()
                .and_then(|s| parse_pickup_datetime(s).ok())
                .map(|dt| TemporalFeatures::from_datetime(&dt));
            FeatureRecord {
                trip_distance_km: haversine_km(
                    t.pickup_latitude,
                    t.pickup_longitude,
                    t.dropoff_latitude,
                    t.dropoff_longitude,
                ),
                hour_of_day: temporal.map(|f| f.hour_of_day),
                day_of_week: temporal.map(|f| f.day_of_week),
                month: temporal.map(|f| f.month),
                passenger_count: t.passenger_count.map(clamp_passenger_count),
                key: t.key,
                fare_amount: t.fare_amount,
                pickup_datetime: t.pickup_datetime,
                pickup_longitude: t.pickup_longitude,
                pickup_latitude: t.pickup_latitude,
                dropoff_longitude: t.dropoff_longitude,
                dropoff_latitude: t.dropoff_latitude,
            }
        })
        .collect()
}
