use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use readings::{PointFailure, SamplerError, UpstreamError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of every gateway response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: u16,
    pub description: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(description: impl Into<String>, data: T) -> Self {
        Self {
            code: StatusCode::OK.as_u16(),
            description: description.into(),
            data: Some(data),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("every grid point failed upstream")]
    AllPointsFailed(Vec<PointFailure>),
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),
    #[error("{0}")]
    Unavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<SamplerError> for ApiError {
    fn from(value: SamplerError) -> Self {
        match value {
            SamplerError::TotalFailure { failures } => ApiError::AllPointsFailed(failures),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::AllPointsFailed(_) | ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (description, data) = match self {
            ApiError::Validation(msg) | ApiError::Unavailable(msg) => (msg, None),
            ApiError::AllPointsFailed(failures) => {
                error!("request failed, no grid point answered: {} failures", failures.len());
                (
                    "every grid point failed upstream".to_string(),
                    serde_json::to_value(failures).ok(),
                )
            }
            ApiError::Upstream(e) => {
                error!("upstream request failed: {}", e);
                ("upstream provider error".to_string(), Some(Value::String(e.to_string())))
            }
            ApiError::Internal(msg) => {
                // details stay in the log
                error!("internal error: {}", msg);
                ("internal error".to_string(), None)
            }
        };

        let body = Envelope::<Value> {
            code: status.as_u16(),
            description,
            data,
        };
        (status, Json(body)).into_response()
    }
}
