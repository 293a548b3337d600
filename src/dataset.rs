//! Raw trip table loading and cleaning.
//!
//! Raw files come from an outside export, so every cell is read as text and
//! coerced here. Cleaning rules:
//!
//! - duplicate rows are dropped, first occurrence kept; numeric cells compare by value
//! - short rows are padded with missing cells
//! - numeric cells that do not parse become missing
//! - an unparsable `pickup_datetime` becomes missing, the row is kept
//! - rows missing `fare_amount` or any coordinate are dropped
//! - rows whose pickup longitude or latitude is exactly `0` are dropped

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Writer};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File};
use std::path::Path;

use crate::features::parse_pickup_datetime;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One uncoerced row of the raw export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(default)]
pub struct RawTrip {
    pub key: Option<String>,
    pub fare_amount: Option<String>,
    pub pickup_datetime: Option<String>,
    pub pickup_longitude: Option<String>,
    pub pickup_latitude: Option<String>,
    pub dropoff_longitude: Option<String>,
    pub dropoff_latitude: Option<String>,
    pub passenger_count: Option<String>,
}

/// A cleaned row, as written to the processed table.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TripRecord {
    pub key: Option<String>,
    pub fare_amount: f64,
    pub pickup_datetime: Option<String>,
    pub pickup_longitude: f64,
    pub pickup_latitude: f64,
    pub dropoff_longitude: f64,
    pub dropoff_latitude: f64,
    pub passenger_count: Option<i64>,
}

/// Reads every row of a CSV file with headers. Short rows are allowed; their
/// missing trailing cells are left to the row type's serde defaults.
pub fn read_csv<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<Vec<T>> {
    let file = File::open(&path)
        .with_context(|| format!("Failed to open file: {:?}", path.as_ref()))?;
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(file);
    let mut rows = Vec::new();
    for (i, result) in reader.deserialize().enumerate() {
        let row: T = result.with_context(|| format!("Failed to parse row {} of {:?}", i + 1, path.as_ref()))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Writes rows with a header line, creating parent directories as needed.
pub fn write_csv<T: Serialize, P: AsRef<Path>>(rows: &[T], path: P) -> Result<()> {
    if let Some(dir) = path.as_ref().parent() {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create directory: {:?}", dir))?;
    }
    let file = File::create(&path)
        .with_context(|| format!("Failed to create file: {:?}", path.as_ref()))?;
    let mut writer = Writer::from_writer(file);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Loads the raw export. A missing file is not an error: it yields an empty table.
pub fn load_raw_data(path: &Path) -> Result<Vec<RawTrip>> {
    if !path.exists() {
        tracing::warn!("raw data file not found at {}; returning empty table", path.display());
        return Ok(Vec::new());
    }
    let rows: Vec<RawTrip> = read_csv(path)?;
    tracing::info!("loaded raw data with {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

fn to_number(cell: &Option<String>) -> Option<f64> {
    cell.as_deref()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| !v.is_nan())
}

fn to_count(cell: &Option<String>) -> Option<i64> {
    to_number(cell)
        .filter(|v| v.fract() == 0.0 && v.abs() < i64::MAX as f64)
        .map(|v| v as i64)
}

/// Duplicate key: numeric cells compare by value (`12.5` == `12.50`), others by trimmed text.
fn dedup_key(row: &RawTrip) -> Vec<Option<String>> {
    let norm = |cell: &Option<String>| {
        cell.as_deref().map(|s| match s.trim().parse::<f64>() {
            Ok(v) => format!("{:?}", v),
            Err(_) => s.trim().to_string(),
        })
    };
    vec![
        norm(&row.key),
        norm(&row.fare_amount),
        norm(&row.pickup_datetime),
        norm(&row.pickup_longitude),
        norm(&row.pickup_latitude),
        norm(&row.dropoff_longitude),
        norm(&row.dropoff_latitude),
        norm(&row.passenger_count),
    ]
}

fn to_timestamp(cell: &Option<String>) -> Option<String> {
    let raw = cell.as_deref()?;
    parse_pickup_datetime(raw)
        .ok()
        .map(|dt| dt.format(DATETIME_FORMAT).to_string())
}

fn coerce(raw: &RawTrip) -> Option<TripRecord> {
    Some(TripRecord {
        key: raw.key.clone(),
        fare_amount: to_number(&raw.fare_amount)?,
        pickup_datetime: to_timestamp(&raw.pickup_datetime),
        pickup_longitude: to_number(&raw.pickup_longitude)?,
        pickup_latitude: to_number(&raw.pickup_latitude)?,
        dropoff_longitude: to_number(&raw.dropoff_longitude)?,
        dropoff_latitude: to_number(&raw.dropoff_latitude)?,
        passenger_count: to_count(&raw.passenger_count),
    })
}

pub fn clean_data(rows: Vec<RawTrip>) -> Vec<TripRecord> {
    let mut seen = HashSet::with_capacity(rows.len());
    let cleaned: Vec<TripRecord> = rows
        .into_iter()
        .filter(|row| seen.insert(dedup_key(row)))
        .filter_map(|row| coerce(&row))
        .filter(|t| t.pickup_longitude != 0.0 && t.pickup_latitude != 0.0)
        .collect();
    tracing::info!("cleaned data: {} rows remaining after cleaning", cleaned.len());
    cleaned
}

pub fn save_processed_data(rows: &[TripRecord], path: &Path) -> Result<()> {
    write_csv(rows, path)?;
    tracing::info!("processed data saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn raw(key: &str, fare: &str, dt: &str, coords: [&str; 4], pax: &str) -> RawTrip {
        let cell = |s: &str| (!s.is_empty()).then(|| s.to_string());
        RawTrip {
            key: cell(key),
            fare_amount: cell(fare),
            pickup_datetime: cell(dt),
            pickup_longitude: cell(coords[0]),
            pickup_latitude: cell(coords[1]),
            dropoff_longitude: cell(coords[2]),
            dropoff_latitude: cell(coords[3]),
            passenger_count: cell(pax),
        }
    }

    const NYC: [&str; 4] = ["-73.98", "40.75", "-73.78", "40.64"];

    #[test]
    fn cleaning_rules() {
        let rows = vec![
            raw("a", "12.5", "2015-01-27 13:08:24 UTC", NYC, "1"),
            raw("a", "12.5", "2015-01-27 13:08:24 UTC", NYC, "1"),
            raw("b", "", "2015-01-27 13:08:24", NYC, "1"),
            raw("c", "abc", "2015-01-27 13:08:24", NYC, "1"),
            raw("d", "7.0", "2015-01-27 13:08:24", ["0", "40.75", "-73.78", "40.64"], "1"),
            raw("e", "7.0", "2015-01-27 13:08:24", ["-73.98", "0.0", "-73.78", "40.64"], "1"),
            raw("f", "7.0", "2015-01-27 13:08:24", ["-73.98", "40.75", "0", "0"], "2"),
            raw("g", "9.0", "garbage", NYC, "x"),
            raw("h", "9.0", "2015-01-27", ["-73.98", "", "-73.78", "40.64"], "1"),
        ];
        let cleaned = clean_data(rows);
        let keys: Vec<_> = cleaned.iter().map(|t| t.key.as_deref().unwrap()).collect();
        assert_eq!(keys, vec!["a", "f", "g"]);

        assert_eq!(cleaned[0].pickup_datetime.as_deref(), Some("2015-01-27 13:08:24"));
        assert_eq!(cleaned[0].passenger_count, Some(1));
        // dropoff at (0,0) survives; only pickup is filtered
        assert_eq!(cleaned[1].dropoff_longitude, 0.0);
        assert_eq!(cleaned[2].pickup_datetime, None);
        assert_eq!(cleaned[2].passenger_count, None);
    }

    #[test]
    fn duplicates_compare_numbers_by_value() {
        let rows = vec![
            raw("a", "12.5", "2015-01-27 13:08:24", NYC, "1"),
            raw("a", "12.50", "2015-01-27 13:08:24", ["-73.980", "40.75", "-73.78", "40.640"], "1.0"),
            raw("a", "12.51", "2015-01-27 13:08:24", NYC, "1"),
        ];
        let cleaned = clean_data(rows);
        let fares: Vec<f64> = cleaned.iter().map(|t| t.fare_amount).collect();
        assert_eq!(fares, vec![12.5, 12.51]);
    }

    #[test]
    fn short_raw_rows_fill_with_missing_cells() {
        let dir = tempdir().unwrap();
        let raw_path = dir.path().join("raw.csv");
        fs::write(
            &raw_path,
            "key,fare_amount,pickup_datetime,pickup_longitude,pickup_latitude,dropoff_longitude,dropoff_latitude,passenger_count\n\
             k1,4.5,2009-06-15 17:26:21 UTC,-73.844311,40.721319,-73.84161,40.712278,1\n\
             k2,16.9,2010-01-05 16:52:16 UTC,-74.016048,40.711303,-73.979268,40.782004\n\
             k3,5.7,2011-08-18 00:35:00 UTC,-73.982738,40.76127\n",
        )
        .unwrap();

        let rows = load_raw_data(&raw_path).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].passenger_count, None);
        assert_eq!(rows[2].dropoff_longitude, None);

        let cleaned = clean_data(rows);
        let keys: Vec<_> = cleaned.iter().map(|t| t.key.as_deref().unwrap()).collect();
        assert_eq!(keys, vec!["k1", "k2"]);
        assert_eq!(cleaned[1].passenger_count, None);
    }

    #[test]
    fn missing_raw_file_is_empty() {
        let dir = tempdir().unwrap();
        let rows = load_raw_data(&dir.path().join("nope.csv")).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn reads_raw_export_and_writes_processed() {
        let dir = tempdir().unwrap();
        let raw_path = dir.path().join("raw.csv");
        fs::write(
            &raw_path,
            "key,fare_amount,pickup_datetime,pickup_longitude,pickup_latitude,dropoff_longitude,dropoff_latitude,passenger_count\n\
             k1,4.5,2009-06-15 17:26:21 UTC,-73.844311,40.721319,-73.84161,40.712278,1\n\
             k2,16.9,2010-01-05 16:52:16 UTC,-74.016048,40.711303,-73.979268,40.782004,1\n\
             k3,5.7,2011-08-18 00:35:00 UTC,0,0,-73.991242,40.750562,2\n",
        )
        .unwrap();

        let cleaned = clean_data(load_raw_data(&raw_path).unwrap());
        assert_eq!(cleaned.len(), 2);

        let out = dir.path().join("processed/processed.csv");
        save_processed_data(&cleaned, &out).unwrap();
        let back: Vec<TripRecord> = read_csv(&out).unwrap();
        assert_eq!(back, cleaned);
    }
}
