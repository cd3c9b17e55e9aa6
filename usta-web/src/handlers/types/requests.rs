//! Service request types

use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRequestBody {
    /// Target master profile id
    pub master_id: Uuid,
    #[schema(example = "Kitchen sink leaks")]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusBody {
    #[schema(example = "accepted")]
    pub status: String,
    /// Version the caller last saw; the change fails with 409 if it moved
    #[schema(example = 0)]
    pub expected_version: Option<i64>,
}
