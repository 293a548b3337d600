use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FeatureError {
    #[error("invalid pickup_datetime {0:?}: expected an ISO-8601 timestamp such as \"2024-06-15 12:00:00\"")]
    InvalidTimestamp(String),
}

/// Failures raised inside a model's predict call.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("feature length mismatch: got {got}, expected {expected}")]
    FeatureLength { got: usize, expected: usize },
    #[error("model returned no prediction")]
    EmptyOutput,
    #[error("model returned a non-finite prediction ({0})")]
    NonFinite(f64),
}

#[derive(Debug, Error, PartialEq)]
pub enum PredictError {
    #[error(transparent)]
    Feature(#[from] FeatureError),
    #[error("inference failed: {0}")]
    Inference(#[from] ModelError),
}
