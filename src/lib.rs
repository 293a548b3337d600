//! Taxi fare prediction service and the offline data pipeline that feeds it.

pub mod api;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod service;
pub mod types;

pub use error::{FeatureError, ModelError, PredictError};
pub use features::derive_features;
pub use model::{LinearModel, Regressor};
pub use service::{predict_fare, AppState};
pub use types::{FareEstimate, FeatureVector, TripRequest, FEATURE_COLUMNS};
