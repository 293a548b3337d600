use std::sync::Arc;

use crate::error::{ModelError, PredictError};
use crate::features::derive_features;
use crate::model::Regressor;
use crate::types::{FareEstimate, TripRequest};

/// Process-lifetime context handed to the router. The model is loaded once
/// before serving and never mutated afterwards.
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<dyn Regressor>,
}

impl AppState {
    pub fn new(model: Arc<dyn Regressor>) -> Self {
        Self { model }
    }
}

/// One request, one model invocation. No retries, no caching.
pub fn predict_fare(model: &dyn Regressor, trip: &TripRequest) -> Result<FareEstimate, PredictError> {
    let features = derive_features(trip)?;
    let row = features.to_row();
    tracing::debug!(
        trip_distance_km = row[0],
        hour_of_day = row[1],
        day_of_week = row[2],
        month = row[3],
        passenger_count = row[4],
        "derived features"
    );

    let out = model.predict(&row)?;
    let fare_amount = *out.first().ok_or(ModelError::EmptyOutput)?;
    if !fare_amount.is_finite() {
        return Err(ModelError::NonFinite(fare_amount).into());
    }
    Ok(FareEstimate { fare_amount })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeatureError;
    use std::sync::Mutex;

    struct Recorder {
        names: Vec<String>,
        seen: Mutex<Vec<Vec<f64>>>,
        out: Vec<f64>,
    }

    impl Recorder {
        fn returning(out: Vec<f64>) -> Self {
            Self {
                names: crate::types::FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect(),
                seen: Mutex::new(Vec::new()),
                out,
            }
        }
    }

    impl Regressor for Recorder {
        fn feature_names(&self) -> &[String] {
            &self.names
        }

        fn predict(&self, row: &[f64]) -> Result<Vec<f64>, ModelError> {
            self.seen.lock().unwrap().push(row.to_vec());
            Ok(self.out.clone())
        }
    }

    fn trip(pickup_datetime: &str) -> TripRequest {
        TripRequest {
            pickup_longitude: -73.985428,
            pickup_latitude: 40.748817,
            dropoff_longitude: -73.985428,
            dropoff_latitude: 40.748817,
            passenger_count: 8,
            pickup_datetime: pickup_datetime.into(),
        }
    }

    #[test]
    fn takes_first_prediction_and_passes_ordered_row() {
        let model = Recorder::returning(vec![7.25, 99.0]);
        let fare = predict_fare(&model, &trip("2024-06-15 12:00:00")).unwrap();
        assert_eq!(fare.fare_amount, 7.25);
        assert_eq!(*model.seen.lock().unwrap(), vec![vec![0.0, 12.0, 5.0, 6.0, 6.0]]);
    }

    #[test]
    fn negative_fares_are_returned_as_is() {
        let model = Recorder::returning(vec![-1.5]);
        let fare = predict_fare(&model, &trip("2024-06-15 12:00:00")).unwrap();
        assert_eq!(fare.fare_amount, -1.5);
    }

    #[test]
    fn bad_timestamp_never_reaches_the_model() {
        let model = Recorder::returning(vec![1.0]);
        let err = predict_fare(&model, &trip("not-a-date")).unwrap_err();
        assert_eq!(
            err,
            PredictError::Feature(FeatureError::InvalidTimestamp("not-a-date".into()))
        );
        assert!(model.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn empty_or_nan_output_is_an_inference_error() {
        let empty = Recorder::returning(vec![]);
        assert_eq!(
            predict_fare(&empty, &trip("2024-06-15 12:00:00")),
            Err(PredictError::Inference(ModelError::EmptyOutput))
        );
        let nan = Recorder::returning(vec![f64::NAN]);
        assert!(matches!(
            predict_fare(&nan, &trip("2024-06-15 12:00:00")),
            Err(PredictError::Inference(ModelError::NonFinite(_)))
        ));
    }
}
