//! Login endpoint backed by the authentication gateway.
//!
//! Password and refresh-token logins share one route; the `refresh` field
//! picks the flow. An expired password is replaced in the same request when
//! `new_password` is supplied, after which the caller has to log in again.

use crate::{
    gateway::{
        AuthFailure, AuthGateway, CredentialSubmission, GatewayError, GatewayResult,
        IssuedAccessToken,
    },
    identity::SessionTokens,
};
use axum::{
    extract::Extension,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

/// Response header carrying the locally issued access token.
pub const AUTH_HEADER: &str = "auth";

pub const MSG_AUTHENTICATED: &str = "Authentication successful";
pub const MSG_PASSWORD_UPDATED: &str = "Password updated successfully. Please log in again.";
pub const MSG_PASSWORD_EXPIRED: &str = "Password expired. Please reset your password.";

/// `refresh` may be sent as a flag or as any non-empty string.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum RefreshFlag {
    Flag(bool),
    Text(String),
}

impl RefreshFlag {
    #[must_use]
    pub fn is_requested(&self) -> bool {
        match self {
            Self::Flag(flag) => *flag,
            Self::Text(text) => !text.trim().is_empty(),
        }
    }
}

#[derive(ToSchema, Deserialize, Default)]
#[serde(default)]
pub struct LoginRequest {
    username: String,
    password: String,
    refresh: Option<RefreshFlag>,
    refresh_token: String,
    new_password: Option<String>,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("refresh", &self.refresh)
            .field("refresh_token_set", &!self.refresh_token.is_empty())
            .field("new_password_set", &self.new_password.is_some())
            .finish_non_exhaustive()
    }
}

impl From<LoginRequest> for CredentialSubmission {
    fn from(request: LoginRequest) -> Self {
        Self {
            identifier: request.username,
            secret: SecretString::from(request.password),
            refresh_requested: request
                .refresh
                .as_ref()
                .is_some_and(RefreshFlag::is_requested),
            refresh_material: SecretString::from(request.refresh_token),
            replacement_secret: request.new_password.map(SecretString::from),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_result: Option<SessionTokens>,
}

#[utoipa::path(
    post,
    path= "/v1/auth/login",
    request_body = LoginRequest,
    responses (
        (status = 200, description = "Authenticated, or expired password replaced", body = LoginResponse,
            headers(("auth" = String, description = "Locally issued access token"))),
        (status = 400, description = "Invalid submission, expired password or failed replacement"),
        (status = 401, description = "Authentication failed"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Identity provider unavailable"),
    ),
    tag= "auth"
)]
#[instrument(skip(gateway, payload))]
pub async fn login(
    gateway: Extension<AuthGateway>,
    payload: Option<Json<LoginRequest>>,
) -> Response {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Invalid request payload".to_string()).into_response(),
    };

    debug!("login request: {:?}", request);

    let submission = CredentialSubmission::from(request);
    match gateway.authenticate(&submission).await {
        Ok(result) => respond(result),
        Err(GatewayError::Validation(err)) => {
            debug!("Rejected login submission: {err}");
            (StatusCode::BAD_REQUEST, err.to_string()).into_response()
        }
        Err(GatewayError::System(err)) => {
            error!("Login failed: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication service unavailable".to_string(),
            )
                .into_response()
        }
    }
}

fn respond(result: GatewayResult) -> Response {
    match result {
        GatewayResult::Authenticated { tokens, issued } => authenticated(tokens, &issued),
        GatewayResult::PasswordUpdated => (
            StatusCode::OK,
            Json(LoginResponse {
                message: MSG_PASSWORD_UPDATED.to_string(),
                auth_result: None,
            }),
        )
            .into_response(),
        GatewayResult::CredentialExpired => {
            (StatusCode::BAD_REQUEST, MSG_PASSWORD_EXPIRED.to_string()).into_response()
        }
        GatewayResult::RemediationFailed { message } => (
            StatusCode::BAD_REQUEST,
            format!(
                "Password update failed: {message}. Resubmit login to determine current state."
            ),
        )
            .into_response(),
        GatewayResult::Rejected(failure) => rejected(failure),
    }
}

fn authenticated(tokens: SessionTokens, issued: &IssuedAccessToken) -> Response {
    let Ok(mut token) = HeaderValue::from_str(issued.expose()) else {
        error!("Issued access token is not a valid header value");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Authentication service unavailable".to_string(),
        )
            .into_response();
    };
    token.set_sensitive(true);

    (
        StatusCode::OK,
        [(HeaderName::from_static(AUTH_HEADER), token)],
        Json(LoginResponse {
            message: MSG_AUTHENTICATED.to_string(),
            auth_result: Some(tokens),
        }),
    )
        .into_response()
}

fn rejected(failure: AuthFailure) -> Response {
    let (status, body) = match failure {
        AuthFailure::NotFound => (StatusCode::NOT_FOUND, "User not found".to_string()),
        AuthFailure::InvalidParameters => {
            (StatusCode::BAD_REQUEST, "Invalid credentials".to_string())
        }
        AuthFailure::ValidationRejected(message) => (
            StatusCode::BAD_REQUEST,
            format!("Lambda validation failed: {message}"),
        ),
        AuthFailure::Unclassified => {
            (StatusCode::UNAUTHORIZED, "Authentication failed".to_string())
        }
    };
    (status, body).into_response()
}
