//! Login, session and identity handlers

use super::types::{
    parse_field, ApiJson, MeResponse, OtpRequest, SuccessResponse, VerifyRequest, VerifyResponse,
};
use crate::{
    auth::{CurrentAccount, OptionalAccount},
    error::{ApiError, ErrorBody},
    AppState,
};
use axum::{extract::State, response::Json};
use tracing::info;
use usta_core::Role;

fn parse_role(role: Option<&str>) -> Result<Option<Role>, ApiError> {
    role.map(|role| parse_field(role, "role")).transpose()
}

/// Send a one-time code to a phone number
#[utoipa::path(
    post,
    path = "/api/auth/otp",
    tag = "Auth",
    summary = "Request a one-time code",
    request_body = OtpRequest,
    responses(
        (status = 200, description = "Code issued", body = SuccessResponse),
        (status = 400, description = "Invalid phone or role", body = ErrorBody)
    )
)]
pub async fn request_otp(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<OtpRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let role = parse_role(request.role.as_deref())?;
    state.application.request_otp(&request.phone, role).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// Verify a code and open a session, registering the phone on first login
#[utoipa::path(
    post,
    path = "/api/auth/verify",
    tag = "Auth",
    summary = "Verify code and log in",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Session issued", body = VerifyResponse),
        (status = 400, description = "Invalid phone, code or role", body = ErrorBody)
    )
)]
pub async fn verify_otp(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let role = parse_role(request.role.as_deref())?;
    let outcome = state
        .application
        .login(&request.phone, &request.code, role)
        .await?;

    let account = state.application.account_view(outcome.account).await?;
    Ok(Json(VerifyResponse {
        token: outcome.session.token,
        expires_at: outcome.session.expires_at,
        account,
        registered: outcome.registered,
    }))
}

/// Current account, or null without a valid session
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    summary = "Current account",
    responses(
        (status = 200, description = "Resolved identity", body = MeResponse)
    ),
    security((), ("bearer_auth" = []))
)]
pub async fn me(
    State(state): State<AppState>,
    OptionalAccount(account): OptionalAccount,
) -> Result<Json<MeResponse>, ApiError> {
    let account = match account {
        Some(account) => Some(state.application.account_view(account).await?),
        None => None,
    };
    Ok(Json(MeResponse { account }))
}

/// End the presented session
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    summary = "Log out",
    responses(
        (status = 200, description = "Session deleted", body = SuccessResponse),
        (status = 401, description = "No valid session", body = ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn logout(
    State(state): State<AppState>,
    current: CurrentAccount,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.application.logout(&current.token).await?;
    info!(account_id = %current.account.id, "Logged out");
    Ok(Json(SuccessResponse::ok()))
}
