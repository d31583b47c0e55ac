use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::ServiceError;
use crate::predictor::PredictionResult;
use crate::sample::{SoilReading, SoilSample};
use crate::state::ServiceContext;

pub fn router(ctx: ServiceContext) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to Crop Prediction API",
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "health": "/health",
        "predict": "/predict",
    }))
}

async fn health(State(ctx): State<ServiceContext>) -> Response {
    if ctx.is_ready() {
        Json(json!({ "status": "healthy" })).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "detail": "Model or scaler not loaded. Please ensure model files exist in the correct location."
            })),
        )
            .into_response()
    }
}

async fn predict(
    State(ctx): State<ServiceContext>,
    payload: Result<Json<SoilReading>, JsonRejection>,
) -> Result<Json<PredictionResult>, ServiceError> {
    let Json(reading) = payload?;
    let sample = SoilSample::new(reading).map_err(|e| {
        tracing::debug!("rejected reading: {}", e);
        e
    })?;

    let predictor = ctx.predictor()?;

    let result = predictor.predict(&sample).map_err(|e| {
        tracing::error!("{}", e);
        e
    })?;
    tracing::debug!(
        "predicted {} ({:.1}%) for {:?}",
        result.prediction,
        result.confidence,
        sample.features()
    );
    Ok(Json(result))
}
