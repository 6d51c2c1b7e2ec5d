//! Credential resolution for signed calls.
//!
//! Static keys from the command line are one provider among others; without
//! them the standard AWS chain is used (environment, shared profile, web
//! identity, ECS and instance roles). Resolved credentials are cached until
//! shortly before they expire.

use super::sigv4::Credentials;
use aws_config::{default_provider::credentials::DefaultCredentialsChain, Region};
use aws_credential_types::{
    provider::{error::CredentialsError, ProvideCredentials, SharedCredentialsProvider},
    Credentials as ResolvedCredentials,
};
use secrecy::{ExposeSecret, SecretString};
use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};
use tokio::sync::RwLock;
use tracing::debug;

/// Temporary credentials are refreshed this long before they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(300);

const STATIC_PROVIDER_NAME: &str = "noticeboard-static";

/// A credentials provider plus the last value it returned.
#[derive(Clone)]
pub struct CredentialSource {
    provider: SharedCredentialsProvider,
    cached: Arc<RwLock<Option<ResolvedCredentials>>>,
}

impl CredentialSource {
    #[must_use]
    pub fn new(provider: SharedCredentialsProvider) -> Self {
        Self {
            provider,
            cached: Arc::new(RwLock::new(None)),
        }
    }

    /// Fixed keys, e.g. from `--aws-access-key-id`.
    #[must_use]
    pub fn from_static(credentials: &Credentials) -> Self {
        Self::new(SharedCredentialsProvider::new(ResolvedCredentials::new(
            credentials.access_key_id(),
            credentials.secret_access_key().expose_secret(),
            credentials
                .session_token()
                .map(|token| token.expose_secret().to_string()),
            None,
            STATIC_PROVIDER_NAME,
        )))
    }

    /// The default AWS provider chain for `region`.
    pub async fn default_chain(region: &str) -> Self {
        let chain = DefaultCredentialsChain::builder()
            .region(Region::new(region.to_string()))
            .build()
            .await;
        Self::new(SharedCredentialsProvider::new(chain))
    }

    /// Current credentials, asking the provider only when the cached value is
    /// missing or about to expire.
    ///
    /// # Errors
    /// Returns the provider's error when no credentials can be resolved.
    pub async fn resolve(&self) -> Result<Credentials, CredentialsError> {
        if let Some(current) = self.cached.read().await.as_ref() {
            if is_fresh(current, SystemTime::now()) {
                return Ok(to_signing(current));
            }
        }

        let mut cached = self.cached.write().await;
        // Another request may have refreshed while we waited for the lock.
        if let Some(current) = cached.as_ref() {
            if is_fresh(current, SystemTime::now()) {
                return Ok(to_signing(current));
            }
        }

        let resolved = self.provider.provide_credentials().await?;
        debug!(expiry = ?resolved.expiry(), "resolved AWS credentials");
        let signing = to_signing(&resolved);
        *cached = Some(resolved);
        Ok(signing)
    }
}

impl std::fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSource")
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

fn is_fresh(credentials: &ResolvedCredentials, now: SystemTime) -> bool {
    credentials
        .expiry()
        .map_or(true, |expiry| now + REFRESH_MARGIN < expiry)
}

fn to_signing(resolved: &ResolvedCredentials) -> Credentials {
    Credentials::new(
        resolved.access_key_id().to_string(),
        SecretString::from(resolved.secret_access_key()),
        resolved.session_token().map(SecretString::from),
    )
}
