//! Types shared across handlers

use crate::error::ApiError;
use axum::extract::{FromRequest, FromRequestParts};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use usta_core::UstaError;
use utoipa::ToSchema;

/// JSON body extractor whose rejections use the API error body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejections use the API error body
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[schema(example = "0.1.0")]
    pub version: String,
}

/// Acknowledgement for commands without a payload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    #[schema(example = true)]
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Parse an enum carried as a string, naming the field on failure
pub fn parse_field<T: FromStr<Err = String>>(value: &str, field: &str) -> Result<T, ApiError> {
    value
        .parse()
        .map_err(|message: String| ApiError(UstaError::invalid_input(message, field, "http")))
}
