//! JSON-over-HTTP transport for the prediction services.

use crate::application::ml::{IrisService, ModelStatus, PredictionService};
use crate::domain::errors::{FieldViolation, PredictionError};
use crate::domain::validation::schema::Schema;
use crate::infrastructure::observability::Metrics;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, error, info_span};
use uuid::Uuid;

/// Shared, read-only state handed to every handler
pub struct AppState {
    pub liquidity: PredictionService,
    pub iris: IrisService,
    pub records: Schema,
    pub metrics: Metrics,
    pub metrics_enabled: bool,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        liquidity: PredictionService,
        iris: IrisService,
        metrics: Metrics,
        metrics_enabled: bool,
    ) -> Self {
        Self {
            liquidity,
            iris,
            records: Schema::patient_record(),
            metrics,
            metrics_enabled,
            started_at: Utc::now(),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/predict", post(predict_handler))
        .route("/iris/predict", post(iris_predict_handler))
        .route("/records/validate", post(validate_record_handler))
        .route("/metrics", get(metrics_handler))
        .fallback(fallback_handler)
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    violations: Option<Vec<FieldViolation>>,
}

#[derive(Debug)]
pub enum ApiError {
    Prediction(PredictionError),
    Malformed(String),
    NotFound,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Prediction(PredictionError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Prediction(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Malformed(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Prediction(e) => e.kind(),
            ApiError::Malformed(_) => "malformed_request",
            ApiError::NotFound => "not_found",
        }
    }

    fn body(&self) -> ErrorBody {
        let (message, violations) = match self {
            ApiError::Prediction(PredictionError::Validation(e)) => {
                (e.to_string(), Some(e.violations.clone()))
            }
            ApiError::Prediction(e) => (e.to_string(), None),
            ApiError::Malformed(reason) => (format!("Malformed request: {}", reason), None),
            ApiError::NotFound => ("No such resource".to_string(), None),
        };
        ErrorBody {
            kind: self.kind(),
            message,
            violations,
        }
    }
}

impl From<PredictionError> for ApiError {
    fn from(e: PredictionError) -> Self {
        ApiError::Prediction(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Malformed(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

type JsonObject = Result<Json<Map<String, Value>>, JsonRejection>;

async fn index_handler() -> impl IntoResponse {
    Json(json!({ "message": "riskserve: liquidity risk predictions" }))
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    uptime_seconds: i64,
    liquidity_model: ModelStatus,
    iris_model: ModelStatus,
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = if state.liquidity.is_available() {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthBody {
        status,
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
        liquidity_model: state.liquidity.status(),
        iris_model: state.iris.status(),
    })
}

async fn predict_handler(
    State(state): State<Arc<AppState>>,
    body: JsonObject,
) -> Result<impl IntoResponse, ApiError> {
    let Json(raw) = body?;
    let span = info_span!("predict", request_id = %Uuid::new_v4(), model = "liquidity");

    span.in_scope(|| -> Result<_, ApiError> {
        let result = state.liquidity.predict(&raw).inspect_err(log_failure)?;
        debug!("Prediction {:.6} -> {}", result.raw_prediction, result.tier);
        Ok(Json(result))
    })
}

async fn iris_predict_handler(
    State(state): State<Arc<AppState>>,
    body: JsonObject,
) -> Result<impl IntoResponse, ApiError> {
    let Json(raw) = body?;
    let span = info_span!("predict", request_id = %Uuid::new_v4(), model = "iris");

    span.in_scope(|| -> Result<_, ApiError> {
        let prediction = state.iris.predict(&raw).inspect_err(log_failure)?;
        Ok(Json(prediction))
    })
}

async fn validate_record_handler(
    State(state): State<Arc<AppState>>,
    body: JsonObject,
) -> Result<impl IntoResponse, ApiError> {
    let Json(raw) = body?;
    let record = state
        .records
        .validate(&raw)
        .map_err(PredictionError::from)
        .inspect_err(log_failure)?;
    Ok(Json(record))
}

async fn metrics_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.metrics_enabled {
        return Err(ApiError::NotFound);
    }
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    ))
}

async fn fallback_handler() -> ApiError {
    ApiError::NotFound
}

fn log_failure(e: &PredictionError) {
    match e {
        PredictionError::Validation(_) => debug!("Rejected input: {}", e),
        _ => error!("Prediction failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{InferenceError, LoadError, ValidationError};

    #[test]
    fn test_status_mapping() {
        let validation = ApiError::from(PredictionError::Validation(ValidationError::single(
            FieldViolation::missing("month"),
        )));
        assert_eq!(validation.status(), StatusCode::BAD_REQUEST);
        assert_eq!(validation.kind(), "validation_error");

        let load = ApiError::from(PredictionError::Load(LoadError::NotFound {
            candidates: vec![],
        }));
        assert_eq!(load.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let inference = ApiError::from(PredictionError::Inference(InferenceError::new("nan")));
        assert_eq!(inference.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(inference.kind(), "inference_error");

        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Malformed("x".into()).kind(), "malformed_request");
    }

    #[test]
    fn test_only_validation_errors_carry_violations() {
        let validation = ApiError::from(PredictionError::Validation(ValidationError::single(
            FieldViolation::missing("month"),
        )));
        let body = validation.body();
        assert_eq!(body.violations.map(|v| v.len()), Some(1));

        assert!(ApiError::NotFound.body().violations.is_none());
    }

    #[test]
    fn test_fallback_is_not_found() {
        let error = tokio_test::block_on(fallback_handler());
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        assert_eq!(error.kind(), "not_found");
    }
}
