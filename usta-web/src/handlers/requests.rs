//! Service request handlers

use super::types::{parse_field, ApiJson, ApiPath, CreateRequestBody, UpdateStatusBody};
use crate::{
    auth::CurrentAccount,
    error::{ApiError, ErrorBody},
    AppState,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use usta_core::{RequestStatus, ServiceRequest};
use uuid::Uuid;

/// Open a request to a master
#[utoipa::path(
    post,
    path = "/api/requests",
    tag = "Requests",
    summary = "Create request",
    request_body = CreateRequestBody,
    responses(
        (status = 201, description = "Request created", body = ServiceRequest),
        (status = 400, description = "Message too long or own profile", body = ErrorBody),
        (status = 401, description = "No valid session", body = ErrorBody),
        (status = 404, description = "No such master", body = ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_request(
    State(state): State<AppState>,
    current: CurrentAccount,
    ApiJson(body): ApiJson<CreateRequestBody>,
) -> Result<(StatusCode, Json<ServiceRequest>), ApiError> {
    let request = state
        .application
        .create_request(&current.account, body.master_id, body.message)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// Requests the caller takes part in, newest first
#[utoipa::path(
    get,
    path = "/api/requests",
    tag = "Requests",
    summary = "List own requests",
    responses(
        (status = 200, description = "Requests", body = [ServiceRequest]),
        (status = 401, description = "No valid session", body = ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_requests(
    State(state): State<AppState>,
    current: CurrentAccount,
) -> Result<Json<Vec<ServiceRequest>>, ApiError> {
    Ok(Json(
        state.application.list_requests(&current.account).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/requests/{id}",
    tag = "Requests",
    summary = "Get request",
    params(("id" = Uuid, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request", body = ServiceRequest),
        (status = 401, description = "No valid session", body = ErrorBody),
        (status = 403, description = "Caller is not a party", body = ErrorBody),
        (status = 404, description = "No such request", body = ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_request(
    State(state): State<AppState>,
    current: CurrentAccount,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ServiceRequest>, ApiError> {
    Ok(Json(
        state.application.get_request(&current.account, id).await?,
    ))
}

/// Move a request along its lifecycle
#[utoipa::path(
    patch,
    path = "/api/requests/{id}/status",
    tag = "Requests",
    summary = "Change request status",
    params(("id" = Uuid, Path, description = "Request id")),
    request_body = UpdateStatusBody,
    responses(
        (status = 200, description = "Updated request", body = ServiceRequest),
        (status = 400, description = "Transition not allowed", body = ErrorBody),
        (status = 401, description = "No valid session", body = ErrorBody),
        (status = 403, description = "Caller is not a party", body = ErrorBody),
        (status = 404, description = "No such request", body = ErrorBody),
        (status = 409, description = "Request changed concurrently", body = ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn set_status(
    State(state): State<AppState>,
    current: CurrentAccount,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateStatusBody>,
) -> Result<Json<ServiceRequest>, ApiError> {
    let status: RequestStatus = parse_field(&body.status, "status")?;
    let request = state
        .application
        .set_status(&current.account, id, status, body.expected_version)
        .await?;
    Ok(Json(request))
}
