//! Exchange execution and provider failure classification.

use super::error::GatewayError;
use crate::identity::{
    AuthParameters, ErrorCode, ExchangeFlow, ExchangeResponse, IdentityProvider, ProviderError,
    SessionTokens,
};
use tracing::{debug, instrument};

/// Message fragment marking a password that must be replaced before use.
pub const EXPIRED_MARKER: &str = "expired and must be reset";

/// Closed set of results of one credential exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    Authenticated(SessionTokens),
    CredentialExpired,
    NotFound,
    InvalidParameters,
    ValidationRejected { message: String },
    Unclassified { provider_message: String },
}

/// Map a provider rejection onto an outcome. Order matters: the expiry check
/// has to win over the generic `NotAuthorized` case.
#[must_use]
pub fn classify(code: &ErrorCode, message: &str) -> ExchangeOutcome {
    match code {
        ErrorCode::NotAuthorized if message.to_lowercase().contains(EXPIRED_MARKER) => {
            ExchangeOutcome::CredentialExpired
        }
        ErrorCode::UserNotFound => ExchangeOutcome::NotFound,
        ErrorCode::InvalidParameter => ExchangeOutcome::InvalidParameters,
        ErrorCode::UserLambdaValidation => ExchangeOutcome::ValidationRejected {
            message: message.to_string(),
        },
        _ => ExchangeOutcome::Unclassified {
            provider_message: format!("{code}: {message}"),
        },
    }
}

/// Run one exchange against `provider`, scoped to `client_id`.
///
/// # Errors
/// Returns [`GatewayError::System`] when the provider could not be reached or
/// answered with something unusable.
#[instrument(skip(provider, params, client_id))]
pub async fn execute(
    provider: &dyn IdentityProvider,
    client_id: &str,
    flow: ExchangeFlow,
    params: &AuthParameters,
) -> Result<ExchangeOutcome, GatewayError> {
    match provider.exchange_credentials(flow, params, client_id).await {
        Ok(ExchangeResponse::Session(tokens)) => Ok(ExchangeOutcome::Authenticated(tokens)),
        Ok(ExchangeResponse::Challenge(challenge)) => Ok(ExchangeOutcome::Unclassified {
            provider_message: format!("unexpected challenge {challenge}"),
        }),
        Err(ProviderError::Rejected { code, message }) => {
            debug!(%code, "credential exchange rejected");
            Ok(classify(&code, &message))
        }
        Err(ProviderError::Unavailable(err)) => Err(GatewayError::System(err)),
    }
}
