//! HTTP error mapping
//!
//! Every failure leaves the server as `{"error": <kind>, "message": <text>}`
//! plus `"field"` for input validation failures.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use usta_core::{ErrorKind, UstaError};
use utoipa::ToSchema;

/// Error body returned by every endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = "invalid_input")]
    pub error: String,
    #[schema(example = "invalid verification code")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "code")]
    pub field: Option<String>,
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub UstaError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(UstaError::InvalidInput {
            message: rejection.body_text(),
            field: None,
            context: usta_core::ErrorContext::new("http").with_operation("decode_body"),
        })
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError(UstaError::InvalidInput {
            message: rejection.body_text(),
            field: None,
            context: usta_core::ErrorContext::new("http").with_operation("decode_path"),
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.0.log();

        let status = self.status();
        let message = match self.0.kind() {
            // storage details stay in the log
            ErrorKind::Internal => "internal server error".to_string(),
            _ => match &self.0 {
                UstaError::Unauthenticated { message, .. }
                | UstaError::Forbidden { message, .. }
                | UstaError::InvalidInput { message, .. }
                | UstaError::Conflict { message, .. }
                | UstaError::Internal { message, .. } => message.clone(),
                UstaError::NotFound { resource, .. } => format!("{} not found", resource),
            },
        };

        let body = ErrorBody {
            error: self.0.kind().as_str().to_string(),
            message,
            field: self.0.field().map(str::to_string),
        };

        (status, Json(body)).into_response()
    }
}
