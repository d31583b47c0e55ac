use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::sample::{FieldViolation, ValidationError, Violation};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Model or scaler not loaded. Please check health endpoint for status.")]
    ServiceUnavailable,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("invalid request body: {message}")]
    MalformedBody { status: StatusCode, message: String },
    #[error("Error making prediction: {0}")]
    PredictionFailed(String),
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        // unparseable and mistyped bodies are both validation failures
        let status = match rejection {
            JsonRejection::JsonSyntaxError(_) | JsonRejection::JsonDataError(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ref other => other.status(),
        };
        Self::MalformedBody {
            status,
            message: rejection.body_text(),
        }
    }
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::MalformedBody { status, .. } => *status,
            Self::PredictionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> Value {
        match self {
            Self::Validation(err) => Value::Array(err.violations.iter().map(violation_detail).collect()),
            Self::MalformedBody { message, .. } => json!([{
                "loc": ["body"],
                "msg": message,
                "type": "value_error.jsonpayload",
            }]),
            other => Value::String(other.to_string()),
        }
    }
}

fn violation_detail(v: &FieldViolation) -> Value {
    match v.kind {
        Violation::BelowMin => json!({
            "loc": ["body", v.field],
            "msg": format!("ensure this value is greater than or equal to {}", v.bounds.min),
            "type": "value_error.number.not_ge",
            "ctx": { "limit_value": v.bounds.min },
        }),
        Violation::AboveMax => json!({
            "loc": ["body", v.field],
            "msg": format!("ensure this value is less than or equal to {}", v.bounds.max),
            "type": "value_error.number.not_le",
            "ctx": { "limit_value": v.bounds.max },
        }),
        Violation::NotFinite => json!({
            "loc": ["body", v.field],
            "msg": "value is not a valid finite number",
            "type": "type_error.float",
        }),
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "detail": self.detail() }))).into_response()
    }
}
