//! Remediation of expired passwords and token issuance.

use super::{
    error::GatewayError, executor::ExchangeOutcome, selector::CredentialSubmission,
    token::IssuedAccessToken,
};
use crate::identity::{IdentityProvider, ProviderError, SecretReplacement, SessionTokens};
use tracing::{info, instrument, warn};

/// Authentication failures that are reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    NotFound,
    InvalidParameters,
    ValidationRejected(String),
    Unclassified,
}

#[derive(Debug)]
pub enum GatewayResult {
    Authenticated {
        tokens: SessionTokens,
        issued: IssuedAccessToken,
    },
    /// The expired password was replaced; the caller must log in again.
    PasswordUpdated,
    CredentialExpired,
    /// The replacement was refused. The credential may be in either state.
    RemediationFailed {
        message: String,
    },
    Rejected(AuthFailure),
}

/// Turn an exchange outcome into the final result, replacing an expired
/// password first when the submission proposes one.
///
/// # Errors
/// Returns [`GatewayError::System`] when remediation cannot reach the provider
/// or the token cannot be generated.
#[instrument(skip_all)]
pub async fn finalize(
    provider: &dyn IdentityProvider,
    outcome: ExchangeOutcome,
    submission: &CredentialSubmission,
) -> Result<GatewayResult, GatewayError> {
    let result = match outcome {
        ExchangeOutcome::Authenticated(tokens) => GatewayResult::Authenticated {
            tokens,
            issued: IssuedAccessToken::generate().map_err(GatewayError::System)?,
        },
        ExchangeOutcome::CredentialExpired => match submission.replacement() {
            Some(proposed) => remediate(provider, submission, proposed.clone()).await?,
            None => GatewayResult::CredentialExpired,
        },
        ExchangeOutcome::NotFound => GatewayResult::Rejected(AuthFailure::NotFound),
        ExchangeOutcome::InvalidParameters => {
            GatewayResult::Rejected(AuthFailure::InvalidParameters)
        }
        ExchangeOutcome::ValidationRejected { message } => {
            GatewayResult::Rejected(AuthFailure::ValidationRejected(message))
        }
        ExchangeOutcome::Unclassified { provider_message } => {
            warn!(%provider_message, "authentication failed");
            GatewayResult::Rejected(AuthFailure::Unclassified)
        }
    };
    Ok(result)
}

async fn remediate(
    provider: &dyn IdentityProvider,
    submission: &CredentialSubmission,
    proposed: secrecy::SecretString,
) -> Result<GatewayResult, GatewayError> {
    let replacement = SecretReplacement {
        username: submission.identifier.clone(),
        previous: submission.secret.clone(),
        proposed,
        access_token: submission.session_material().cloned(),
    };

    match provider.replace_secret(&replacement).await {
        Ok(()) => {
            info!(username = %replacement.username, "expired password replaced");
            Ok(GatewayResult::PasswordUpdated)
        }
        Err(ProviderError::Rejected { code, message }) => {
            warn!(%code, username = %replacement.username, "password replacement refused");
            Ok(GatewayResult::RemediationFailed { message })
        }
        Err(ProviderError::Unavailable(err)) => Err(GatewayError::System(err)),
    }
}
