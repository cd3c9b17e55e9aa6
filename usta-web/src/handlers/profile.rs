//! Profile and master directory handlers

use super::types::{ApiJson, ApiPath, MasterQuery, SuccessResponse, UpdateProfileRequest};
use crate::{
    auth::CurrentAccount,
    error::{ApiError, ErrorBody},
    AppState,
};
use axum::{
    extract::{Query, State},
    response::Json,
};
use usta_core::MasterProfile;
use uuid::Uuid;

/// Update the caller's own profile
#[utoipa::path(
    put,
    path = "/api/profile",
    tag = "Profile",
    summary = "Update own profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = SuccessResponse),
        (status = 400, description = "Blank or invalid field", body = ErrorBody),
        (status = 401, description = "No valid session", body = ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentAccount,
    ApiJson(request): ApiJson<UpdateProfileRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state
        .application
        .update_profile(&current.account, request.into())
        .await?;
    Ok(Json(SuccessResponse::ok()))
}

/// List masters with completed profiles
#[utoipa::path(
    get,
    path = "/api/masters",
    tag = "Directory",
    summary = "List masters",
    params(MasterQuery),
    responses(
        (status = 200, description = "Matching masters", body = [MasterProfile])
    )
)]
pub async fn list_masters(
    State(state): State<AppState>,
    Query(query): Query<MasterQuery>,
) -> Result<Json<Vec<MasterProfile>>, ApiError> {
    let masters = state.application.list_masters(&query.into()).await?;
    Ok(Json(masters))
}

/// One master profile
#[utoipa::path(
    get,
    path = "/api/masters/{id}",
    tag = "Directory",
    summary = "Get master",
    params(("id" = Uuid, Path, description = "Master profile id")),
    responses(
        (status = 200, description = "Master profile", body = MasterProfile),
        (status = 404, description = "No such master", body = ErrorBody)
    )
)]
pub async fn get_master(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<MasterProfile>, ApiError> {
    Ok(Json(state.application.get_master(id).await?))
}
