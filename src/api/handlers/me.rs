//! Profile of the caller identified by a provider access token.

use super::bearer_token;
use crate::{
    gateway::AuthGateway,
    identity::{ErrorCode, ProviderError},
};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct MeResponse {
    pub username: String,
    pub email: Option<String>,
}

#[utoipa::path(
    get,
    path = "/v1/auth/me",
    responses(
        (status = 200, description = "Return the caller's profile.", body = MeResponse),
        (status = 401, description = "Missing, invalid or expired access token."),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn get_me(headers: HeaderMap, gateway: Extension<AuthGateway>) -> impl IntoResponse {
    let Some(access_token) = bearer_token(&headers) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    match gateway.provider().get_user(access_token).await {
        Ok(profile) => {
            let response = MeResponse {
                email: profile.attribute("email").map(str::to_string),
                username: profile.username,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(ProviderError::Rejected {
            code: ErrorCode::NotAuthorized,
            ..
        }) => StatusCode::UNAUTHORIZED.into_response(),
        Err(err) => {
            error!("Failed to fetch /me profile: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
