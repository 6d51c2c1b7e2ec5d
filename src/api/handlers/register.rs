use super::{valid_email, MessageResponse};
use crate::{
    gateway::AuthGateway,
    identity::{ErrorCode, ProviderError, SignUpRequest, UserAttribute},
};
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use secrecy::SecretString;
use serde::Deserialize;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Default)]
#[serde(default)]
pub struct UserRegister {
    username: String,
    password: String,
    email: String,
    family_name: String,
    given_name: String,
    phone_number: String,
}

impl std::fmt::Debug for UserRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRegister")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl UserRegister {
    /// Attributes to store with the account; blank optional ones are left out.
    fn attributes(&self) -> Vec<UserAttribute> {
        [
            ("email", &self.email),
            ("family_name", &self.family_name),
            ("given_name", &self.given_name),
            ("phone_number", &self.phone_number),
        ]
        .into_iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .map(|(name, value)| UserAttribute::new(name, value.trim()))
        .collect()
    }
}

#[utoipa::path(
    post,
    path= "/v1/auth/register",
    request_body = UserRegister,
    responses (
        (status = 200, description = "Registration successful", body = MessageResponse),
        (status = 400, description = "Invalid email, password or parameters"),
        (status = 409, description = "Username already exists"),
        (status = 500, description = "Registration failed"),
    ),
    tag= "auth"
)]
#[instrument(skip(gateway, payload))]
pub async fn register(
    gateway: Extension<AuthGateway>,
    payload: Option<Json<UserRegister>>,
) -> impl IntoResponse {
    let user: UserRegister = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    debug!("user: {:?}", user);

    if user.username.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "Invalid username".to_string()).into_response();
    }

    if !valid_email(user.email.trim()) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }

    if user.password.is_empty() {
        return (StatusCode::BAD_REQUEST, "Invalid password".to_string()).into_response();
    }

    let request = SignUpRequest {
        username: user.username.trim().to_string(),
        attributes: user.attributes(),
        password: SecretString::from(user.password),
    };

    match gateway
        .provider()
        .sign_up(&gateway.config().client_id, &request)
        .await
    {
        Ok(receipt) => {
            debug!(confirmed = receipt.user_confirmed, "user registered");
            (
                StatusCode::OK,
                Json(MessageResponse::new("User registration successful")),
            )
                .into_response()
        }
        Err(ProviderError::Rejected { code, message }) => match code {
            ErrorCode::UsernameExists => {
                (StatusCode::CONFLICT, "Username already exists".to_string()).into_response()
            }
            ErrorCode::InvalidPassword | ErrorCode::InvalidParameter => {
                (StatusCode::BAD_REQUEST, message).into_response()
            }
            other => {
                error!("Sign up rejected: {other}: {message}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error registering user".to_string(),
                )
                    .into_response()
            }
        },
        Err(err) => {
            error!("Sign up failed: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error registering user".to_string(),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_attributes_are_skipped() {
        let user: UserRegister = serde_json::from_str(
            r#"{"username": "alice", "password": "pw", "email": "alice@example.com", "given_name": "Alice", "phone_number": " "}"#,
        )
        .unwrap_or_default();
        let names: Vec<String> = user
            .attributes()
            .into_iter()
            .map(|attribute| attribute.name)
            .collect();
        assert_eq!(names, vec!["email", "given_name"]);
    }
}
