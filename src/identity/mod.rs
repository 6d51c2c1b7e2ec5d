//! Identity provider collaborator.
//!
//! [`IdentityProvider`] is the seam between request handling and the managed
//! user directory. [`cognito::CognitoClient`] implements it over the Cognito
//! JSON API; tests substitute stubs.

pub mod cognito;
pub mod types;

pub use cognito::CognitoClient;
pub use types::{
    AuthParameters, ExchangeFlow, ExchangeResponse, SecretReplacement, SessionTokens,
    SignUpReceipt, SignUpRequest, UserAttribute, UserProfile,
};

use crate::aws::AwsError;
use async_trait::async_trait;
use thiserror::Error;

/// Provider error codes this service reacts to. Anything else is `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    NotAuthorized,
    UserNotFound,
    InvalidParameter,
    UserLambdaValidation,
    UsernameExists,
    InvalidPassword,
    CodeMismatch,
    ExpiredCode,
    Other(String),
}

impl ErrorCode {
    #[must_use]
    pub fn parse(code: &str) -> Self {
        match code {
            "NotAuthorizedException" => Self::NotAuthorized,
            "UserNotFoundException" => Self::UserNotFound,
            "InvalidParameterException" => Self::InvalidParameter,
            "UserLambdaValidationException" => Self::UserLambdaValidation,
            "UsernameExistsException" => Self::UsernameExists,
            "InvalidPasswordException" => Self::InvalidPassword,
            "CodeMismatchException" => Self::CodeMismatch,
            "ExpiredCodeException" => Self::ExpiredCode,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::NotAuthorized => "NotAuthorizedException",
            Self::UserNotFound => "UserNotFoundException",
            Self::InvalidParameter => "InvalidParameterException",
            Self::UserLambdaValidation => "UserLambdaValidationException",
            Self::UsernameExists => "UsernameExistsException",
            Self::InvalidPassword => "InvalidPasswordException",
            Self::CodeMismatch => "CodeMismatchException",
            Self::ExpiredCode => "ExpiredCodeException",
            Self::Other(code) => code,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider understood the request and refused it.
    #[error("{code}: {message}")]
    Rejected { code: ErrorCode, message: String },
    /// Network, timeout, decoding or provider-side failure.
    #[error("identity provider unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
}

impl ProviderError {
    #[must_use]
    pub fn rejected(code: &str, message: &str) -> Self {
        Self::Rejected {
            code: ErrorCode::parse(code),
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn code(&self) -> Option<&ErrorCode> {
        match self {
            Self::Rejected { code, .. } => Some(code),
            Self::Unavailable(_) => None,
        }
    }
}

impl From<AwsError> for ProviderError {
    fn from(err: AwsError) -> Self {
        match err {
            AwsError::Service {
                status,
                code,
                message,
            } if !status.is_server_error() => Self::Rejected {
                code: ErrorCode::parse(&code),
                message,
            },
            other => Self::Unavailable(other.into()),
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Trade credentials for a session using `flow`.
    async fn exchange_credentials(
        &self,
        flow: ExchangeFlow,
        params: &AuthParameters,
        client_id: &str,
    ) -> Result<ExchangeResponse, ProviderError>;

    /// Replace an expired password.
    async fn replace_secret(&self, replacement: &SecretReplacement) -> Result<(), ProviderError>;

    async fn sign_up(
        &self,
        client_id: &str,
        request: &SignUpRequest,
    ) -> Result<SignUpReceipt, ProviderError>;

    async fn confirm_sign_up(
        &self,
        client_id: &str,
        username: &str,
        confirmation_code: &str,
    ) -> Result<(), ProviderError>;

    async fn admin_delete_user(&self, username: &str) -> Result<(), ProviderError>;

    async fn get_user(&self, access_token: &str) -> Result<UserProfile, ProviderError>;
}
