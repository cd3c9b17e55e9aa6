//! Bearer-token extractors
//!
//! [`CurrentAccount`] rejects the request with 401 when the session cannot be
//! resolved; [`OptionalAccount`] turns a missing or stale session into `None`.

use crate::{error::ApiError, AppState};
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::debug;
use usta_core::{Account, ErrorKind, UstaError};

const COMPONENT: &str = "http_auth";

/// Pull the token out of `Authorization: Bearer <token>`
pub fn bearer_token(parts: &Parts) -> Result<Option<String>, ApiError> {
    let Some(header) = parts.headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = header.to_str().map_err(|_| {
        ApiError(UstaError::unauthenticated(
            "malformed authorization header",
            COMPONENT,
        ))
    })?;

    // the scheme name is case-insensitive
    match value.split_once(' ') {
        Some((scheme, token))
            if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() =>
        {
            Ok(Some(token.trim().to_string()))
        }
        _ => Err(ApiError(UstaError::unauthenticated(
            "authorization header must be 'Bearer <token>'",
            COMPONENT,
        ))),
    }
}

/// The account behind a valid session, plus the raw token used
#[derive(Debug, Clone)]
pub struct CurrentAccount {
    pub account: Account,
    pub token: String,
}

impl FromRequestParts<AppState> for CurrentAccount {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or_else(|| {
            ApiError(UstaError::unauthenticated(
                "missing authorization header",
                COMPONENT,
            ))
        })?;

        let account = state.application.resolve_session(&token).await?;
        Ok(Self { account, token })
    }
}

/// Session owner when one is presented and valid
#[derive(Debug, Clone)]
pub struct OptionalAccount(pub Option<Account>);

impl FromRequestParts<AppState> for OptionalAccount {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = match bearer_token(parts) {
            Ok(Some(token)) => token,
            Ok(None) => return Ok(Self(None)),
            Err(_) => {
                debug!("Ignoring malformed authorization header");
                return Ok(Self(None));
            }
        };

        match state.application.resolve_session(&token).await {
            Ok(account) => Ok(Self(Some(account))),
            Err(e) if e.kind() == ErrorKind::Unauthenticated => Ok(Self(None)),
            Err(e) => Err(e.into()),
        }
    }
}
