use super::{bearer_token, secrets_match};
use crate::{
    gateway::AuthGateway,
    identity::{ErrorCode, ProviderError},
};
use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{error, info, instrument, warn};

/// Shared secret guarding the admin routes.
#[derive(Debug, Clone)]
pub struct AdminToken(pub SecretString);

#[utoipa::path(
    delete,
    path = "/v1/admin/users/{username}",
    params(("username" = String, Path, description = "User to delete")),
    responses(
        (status = 204, description = "User deleted."),
        (status = 401, description = "Missing or wrong admin token."),
        (status = 404, description = "No such user, or admin routes disabled."),
        (status = 500, description = "Identity provider unavailable."),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
#[instrument(skip(headers, gateway, admin))]
pub async fn delete_user(
    Path(username): Path<String>,
    headers: HeaderMap,
    gateway: Extension<AuthGateway>,
    admin: Extension<AdminToken>,
) -> impl IntoResponse {
    let AdminToken(expected) = &admin.0;
    let authorized =
        bearer_token(&headers).is_some_and(|token| secrets_match(token, expected.expose_secret()));
    if !authorized {
        warn!("Rejected admin request with missing or wrong token");
        return StatusCode::UNAUTHORIZED;
    }

    match gateway.provider().admin_delete_user(&username).await {
        Ok(()) => {
            info!("Deleted user {username}");
            StatusCode::NO_CONTENT
        }
        Err(ProviderError::Rejected {
            code: ErrorCode::UserNotFound,
            ..
        }) => StatusCode::NOT_FOUND,
        Err(err) => {
            error!("Failed to delete user {username}: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
