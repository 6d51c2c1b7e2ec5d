//! Authentication gateway.
//!
//! A login runs through three steps:
//! 1) [`selector::select`] picks the exchange flow and its parameters.
//! 2) [`executor::execute`] calls the provider and classifies the answer.
//! 3) [`finalize::finalize`] optionally replaces an expired password and
//!    issues a local access token on success.
//!
//! Each step calls the provider at most once, so a login makes at most two
//! provider calls. Nothing is retained between requests.

pub mod error;
pub mod executor;
pub mod finalize;
pub mod selector;
pub mod token;

pub use error::{GatewayError, ValidationError};
pub use executor::ExchangeOutcome;
pub use finalize::{AuthFailure, GatewayResult};
pub use selector::CredentialSubmission;
pub use token::IssuedAccessToken;

use crate::identity::IdentityProvider;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Application client the exchanges are scoped to.
    pub client_id: String,
}

impl GatewayConfig {
    #[must_use]
    pub fn new(client_id: String) -> Self {
        Self { client_id }
    }
}

#[derive(Clone)]
pub struct AuthGateway {
    config: GatewayConfig,
    provider: Arc<dyn IdentityProvider>,
}

impl AuthGateway {
    #[must_use]
    pub fn new(config: GatewayConfig, provider: Arc<dyn IdentityProvider>) -> Self {
        Self { config, provider }
    }

    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    #[must_use]
    pub fn provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.provider
    }

    /// Authenticate one submission end to end.
    ///
    /// # Errors
    /// [`GatewayError::Validation`] before any provider call when the
    /// submission is incomplete, [`GatewayError::System`] when the provider
    /// cannot be used.
    #[instrument(skip_all, fields(refresh = submission.refresh_requested))]
    pub async fn authenticate(
        &self,
        submission: &CredentialSubmission,
    ) -> Result<GatewayResult, GatewayError> {
        let (flow, params) = selector::select(submission)?;
        let outcome =
            executor::execute(self.provider.as_ref(), &self.config.client_id, flow, &params)
                .await?;
        finalize::finalize(self.provider.as_ref(), outcome, submission).await
    }
}

impl std::fmt::Debug for AuthGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGateway")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
