use thiserror::Error;

/// Submission problems detected before any provider call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("username is required")]
    MissingUsername,
    #[error("password is required")]
    MissingPassword,
    #[error("refresh_token is required when refresh is requested")]
    MissingRefreshToken,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Transport, timeout, decoding or provider-side failure.
    #[error("authentication system failure: {0:#}")]
    System(#[source] anyhow::Error),
}
