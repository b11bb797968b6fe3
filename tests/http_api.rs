use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use riskserve::application::ml::prediction_service::LoadedModel;
use riskserve::application::ml::{IrisService, MLPredictor, PredictionService};
use riskserve::domain::errors::LoadError;
use riskserve::domain::ml::tier_ladder::TierLadder;
use riskserve::infrastructure::mock::{ConstantPredictor, FailingPredictor};
use riskserve::infrastructure::observability::Metrics;
use riskserve::interfaces::http::{AppState, router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn app_with(liquidity_output: Option<f64>, metrics_enabled: bool) -> Router {
    let metrics = Metrics::new().unwrap();
    let model: LoadedModel = match liquidity_output {
        Some(output) => Ok(Arc::new(ConstantPredictor::new(output)) as Arc<dyn MLPredictor>),
        None => Err(LoadError::NotFound {
            candidates: vec!["models/liquidity_model.json".into()],
        }),
    };
    let liquidity =
        PredictionService::new(model, 0.0, TierLadder::default()).with_metrics(metrics.clone());
    let iris =
        IrisService::new(Ok(Arc::new(ConstantPredictor::new(2.0)))).with_metrics(metrics.clone());

    router(Arc::new(AppState::new(liquidity, iris, metrics, metrics_enabled)))
}

fn app() -> Router {
    app_with(Some(0.05), true)
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

const BITCOIN: &str = r#"{"price": 40000, "volume_24h": 25000000000, "market_cap": 750000000000,
    "change_24h": 2.5, "change_7d": 5.5, "day_of_week": 0, "month": 1}"#;

#[tokio::test]
async fn test_predict_returns_ratio_tier_and_features() {
    let (status, body) = send_json(app(), post_json("/predict", BITCOIN)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["raw_prediction"], json!(0.05));
    assert_eq!(body["tier"], json!("MEDIUM_RISK"));

    let features = body["features"].as_object().unwrap();
    assert_eq!(features.len(), 8);
    let ratio = features["volume_market_ratio"].as_f64().unwrap();
    assert!((ratio - 0.0333).abs() < 1e-4);
}

#[tokio::test]
async fn test_predict_validation_error_is_400() {
    let (status, body) = send_json(
        app(),
        post_json("/predict", r#"{"price": "abc", "volume_24h": 1}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], json!("validation_error"));

    let violations = body["violations"].as_array().unwrap();
    let price = violations.iter().find(|v| v["field"] == "price").unwrap();
    assert_eq!(price["kind"], json!("type_mismatch"));
    assert!(violations.iter().any(|v| v["field"] == "month" && v["kind"] == "missing_field"));
}

#[tokio::test]
async fn test_predict_without_model_is_500_load_error() {
    let app = app_with(None, true);
    let (status, body) = send_json(app.clone(), post_json("/predict", BITCOIN)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], json!("load_error"));

    let (status, health) = send_json(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], json!("degraded"));
    assert_eq!(health["liquidity_model"]["loaded"], json!(false));
    assert_eq!(health["iris_model"]["loaded"], json!(true));
}

#[tokio::test]
async fn test_inference_failure_is_500() {
    let metrics = Metrics::new().unwrap();
    let liquidity = PredictionService::new(
        Ok(Arc::new(FailingPredictor::new("shape mismatch"))),
        0.0,
        TierLadder::default(),
    );
    let iris = IrisService::new(Err(LoadError::NotFound { candidates: vec![] }));
    let app = router(Arc::new(AppState::new(liquidity, iris, metrics, true)));

    let (status, body) = send_json(app, post_json("/predict", BITCOIN)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], json!("inference_error"));
    assert!(body["message"].as_str().unwrap().contains("shape mismatch"));
}

#[tokio::test]
async fn test_malformed_bodies_are_400() {
    for body in ["not json", "[1, 2, 3]", "42"] {
        let (status, response) = send_json(app(), post_json("/predict", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {}", body);
        assert_eq!(response["kind"], json!("malformed_request"));
    }
}

#[tokio::test]
async fn test_iris_prediction() {
    let body = r#"{"sepal_length": 6.3, "sepal_width": 3.3, "petal_length": 6.0, "petal_width": 2.5}"#;
    let (status, response) = send_json(app(), post_json("/iris/predict", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({"class_index": 2, "label": "virginica"}));
}

#[tokio::test]
async fn test_record_validation() {
    let valid = r#"{"name": "Nitish", "email": "abc@gmail.com", "linkedin_url": "http://linkedin.com/1322",
        "age": "30", "weight": 75.2, "contact_details": {"phone": "2353462"}}"#;
    let (status, record) = send_json(app(), post_json("/records/validate", valid)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["age"], json!(30));
    assert_eq!(record["married"], json!(false));

    let invalid = r#"{"name": "Nitish", "email": "not-an-email", "linkedin_url": "http://linkedin.com/1322",
        "age": 30, "weight": 130, "contact_details": {}}"#;
    let (status, body) = send_json(app(), post_json("/records/validate", invalid)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = body["violations"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v["field"].as_str())
        .collect();
    assert_eq!(fields, vec!["email", "weight"]);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = app();
    let (status, _) = send(app.clone(), post_json("/predict", BITCOIN)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, bytes) = send(app, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains(
        r#"riskserve_predictions_total{model="liquidity",tier="MEDIUM_RISK"} 1"#
    ));

    let (status, body) = send_json(app_with(Some(0.05), false), get("/metrics")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], json!("not_found"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (status, body) = send_json(app(), get("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], json!("not_found"));

    let (status, body) = send_json(app(), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());
}
