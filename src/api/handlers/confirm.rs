use super::MessageResponse;
use crate::{
    gateway::AuthGateway,
    identity::{ErrorCode, ProviderError},
};
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use tracing::{error, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug, Default)]
#[serde(default)]
pub struct ConfirmSignUp {
    username: String,
    confirmation_code: String,
}

#[utoipa::path(
    post,
    path= "/v1/auth/confirm",
    request_body = ConfirmSignUp,
    responses (
        (status = 200, description = "Sign up confirmed", body = MessageResponse),
        (status = 400, description = "Code expired, wrong or missing"),
        (status = 500, description = "Confirmation failed"),
    ),
    tag= "auth"
)]
#[instrument(skip(gateway, payload))]
pub async fn confirm(
    gateway: Extension<AuthGateway>,
    payload: Option<Json<ConfirmSignUp>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let username = request.username.trim();
    let code = request.confirmation_code.trim();
    if username.is_empty() || code.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            "username and confirmation_code are required".to_string(),
        )
            .into_response();
    }

    let result = gateway
        .provider()
        .confirm_sign_up(&gateway.config().client_id, username, code)
        .await;

    match result {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse::new("User signup confirmed")),
        )
            .into_response(),
        Err(ProviderError::Rejected {
            code: ErrorCode::ExpiredCode,
            ..
        }) => (StatusCode::BAD_REQUEST, "Validation code expired".to_string()).into_response(),
        Err(ProviderError::Rejected {
            code: ErrorCode::CodeMismatch,
            ..
        }) => (StatusCode::BAD_REQUEST, "Invalid validation code".to_string()).into_response(),
        Err(err) => {
            error!("Confirm sign up failed: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error confirming user".to_string(),
            )
                .into_response()
        }
    }
}
