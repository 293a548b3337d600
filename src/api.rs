//! HTTP surface: `POST /predict` and `GET /health`.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::error::{FeatureError, PredictError};
use crate::service::{predict_fare, AppState};
use crate::types::{FareEstimate, TripRequest};

// ---------- Validation ----------

/// One entry of a 422 `detail` list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl FieldError {
    fn body(msg: impl Into<String>, kind: &'static str) -> Self {
        Self {
            loc: vec!["body".into()],
            msg: msg.into(),
            kind,
        }
    }

    fn field(name: &str, msg: impl Into<String>, kind: &'static str) -> Self {
        Self {
            loc: vec!["body".into(), name.into()],
            msg: msg.into(),
            kind,
        }
    }
}

#[derive(Clone, Copy)]
enum Expect {
    Number,
    Integer,
    Text,
}

const TRIP_FIELDS: [(&str, Expect); 6] = [
    ("pickup_longitude", Expect::Number),
    ("pickup_latitude", Expect::Number),
    ("dropoff_longitude", Expect::Number),
    ("dropoff_latitude", Expect::Number),
    ("passenger_count", Expect::Integer),
    ("pickup_datetime", Expect::Text),
];

fn int_from(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn number_from(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Checks one field and rewrites lax forms (`1.0`, `"2"`, `"-73.98"`) into their typed value.
fn coerce_field(obj: &mut Map<String, Value>, name: &str, expect: Expect) -> Option<FieldError> {
    let Some(v) = obj.get_mut(name) else {
        return Some(FieldError::field(name, "Field required", "missing"));
    };
    let coerced = match expect {
        Expect::Number => number_from(v).and_then(serde_json::Number::from_f64).map(Value::Number),
        Expect::Integer => int_from(v).map(Value::from),
        Expect::Text => v.is_string().then(|| v.clone()),
    };
    match coerced {
        Some(c) => {
            *v = c;
            None
        }
        None => {
            let (msg, kind) = match expect {
                Expect::Number => ("Input should be a valid number", "float_type"),
                Expect::Integer => ("Input should be a valid integer", "int_type"),
                Expect::Text => ("Input should be a valid string", "string_type"),
            };
            Some(FieldError::field(name, msg, kind))
        }
    }
}

/// Checks shape and types of a `/predict` body, reporting every bad field at once.
pub fn validate_trip(body: &[u8]) -> Result<TripRequest, Vec<FieldError>> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| vec![FieldError::body(format!("JSON decode error: {}", e), "json_invalid")])?;
    let Value::Object(mut obj) = value else {
        return Err(vec![FieldError::body(
            "Input should be a valid dictionary or object",
            "model_attributes_type",
        )]);
    };

    let errors: Vec<FieldError> = TRIP_FIELDS
        .iter()
        .filter_map(|(name, expect)| coerce_field(&mut obj, name, *expect))
        .collect();
    if !errors.is_empty() {
        return Err(errors);
    }

    serde_json::from_value(Value::Object(obj))
        .map_err(|e| vec![FieldError::body(e.to_string(), "value_error")])
}

// ---------- Errors ----------

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request validation failed")]
    Validation(Vec<FieldError>),
    #[error(transparent)]
    Predict(#[from] PredictError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(detail) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "detail": detail }))).into_response()
            }
            ApiError::Predict(PredictError::Feature(e @ FeatureError::InvalidTimestamp(_))) => {
                let detail = [FieldError::field("pickup_datetime", e.to_string(), "invalid_timestamp")];
                (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "detail": detail }))).into_response()
            }
            ApiError::Predict(e @ PredictError::Inference(_)) => {
                tracing::error!("prediction failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": e.to_string() })),
                )
                    .into_response()
            }
        }
    }
}

// ---------- Handlers ----------

async fn predict(State(state): State<AppState>, body: Bytes) -> Result<Json<FareEstimate>, ApiError> {
    let trip = validate_trip(&body).map_err(ApiError::Validation)?;
    let fare = predict_fare(state.model.as_ref(), &trip)?;
    Ok(Json(fare))
}

/// Liveness only; does not look at the model.
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
