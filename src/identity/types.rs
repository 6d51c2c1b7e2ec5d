//! Values exchanged with the identity provider.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Credential-to-session conversion path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeFlow {
    PrimaryCredential,
    RefreshToken,
}

impl ExchangeFlow {
    /// Flow name on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PrimaryCredential => "USER_PASSWORD_AUTH",
            Self::RefreshToken => "REFRESH_TOKEN_AUTH",
        }
    }
}

impl std::fmt::Display for ExchangeFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const PARAM_USERNAME: &str = "USERNAME";
pub const PARAM_PASSWORD: &str = "PASSWORD";
pub const PARAM_REFRESH_TOKEN: &str = "REFRESH_TOKEN";

/// Flow-specific parameters sent with an exchange.
///
/// Values are secrets (passwords, refresh tokens), so `Debug` only lists keys.
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AuthParameters(BTreeMap<&'static str, String>);

impl AuthParameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.0.insert(key, value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for AuthParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

/// Provider-issued session material, relayed verbatim to the caller.
#[derive(ToSchema, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionTokens {
    pub access_token: String,
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Absent on refresh exchanges, which reuse the caller's refresh token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_type: String,
}

impl std::fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access_token", &"***")
            .field("expires_in", &self.expires_in)
            .field("id_token", &self.id_token.as_ref().map(|_| "***"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// What a successful exchange call returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeResponse {
    Session(SessionTokens),
    /// The provider wants another round trip (e.g. `NEW_PASSWORD_REQUIRED`).
    Challenge(String),
}

/// Password replacement for a user whose password has expired.
#[derive(Debug, Clone)]
pub struct SecretReplacement {
    pub username: String,
    pub previous: SecretString,
    pub proposed: SecretString,
    /// Session material authorising the change, when the caller has any.
    ///
    /// This is the refresh token submitted with the login, not an access
    /// token. Cognito's `ChangePassword` only accepts access tokens, so a
    /// replacement sent this way is expected to be rejected with
    /// `NotAuthorizedException`.
    pub access_token: Option<SecretString>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserAttribute {
    pub name: String,
    pub value: String,
}

impl UserAttribute {
    #[must_use]
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub username: String,
    pub password: SecretString,
    pub attributes: Vec<UserAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpReceipt {
    pub user_confirmed: bool,
    pub user_sub: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub username: String,
    pub attributes: Vec<UserAttribute>,
}

impl UserProfile {
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name == name)
            .map(|attribute| attribute.value.as_str())
    }
}
