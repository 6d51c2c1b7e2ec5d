//! Flow selection: which exchange to attempt and with what parameters.

use super::error::ValidationError;
use crate::identity::{
    types::{PARAM_PASSWORD, PARAM_REFRESH_TOKEN, PARAM_USERNAME},
    AuthParameters, ExchangeFlow,
};
use secrecy::{ExposeSecret, SecretString};

/// One login attempt as submitted by the caller.
#[derive(Debug, Clone)]
pub struct CredentialSubmission {
    pub identifier: String,
    pub secret: SecretString,
    pub refresh_requested: bool,
    pub refresh_material: SecretString,
    /// Proposed password, only used when the current one has expired.
    pub replacement_secret: Option<SecretString>,
}

impl CredentialSubmission {
    #[must_use]
    pub fn new(identifier: &str, secret: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            secret: SecretString::from(secret),
            refresh_requested: false,
            refresh_material: SecretString::from(""),
            replacement_secret: None,
        }
    }

    #[must_use]
    pub fn with_refresh(mut self, refresh_material: &str) -> Self {
        self.refresh_requested = true;
        self.refresh_material = SecretString::from(refresh_material);
        self
    }

    #[must_use]
    pub fn with_replacement(mut self, replacement_secret: &str) -> Self {
        self.replacement_secret = Some(SecretString::from(replacement_secret));
        self
    }

    /// Refresh material, when the submission carries any.
    #[must_use]
    pub fn session_material(&self) -> Option<&SecretString> {
        (!is_blank(self.refresh_material.expose_secret())).then_some(&self.refresh_material)
    }

    /// Replacement secret, when one was supplied and is not blank.
    #[must_use]
    pub fn replacement(&self) -> Option<&SecretString> {
        self.replacement_secret
            .as_ref()
            .filter(|secret| !is_blank(secret.expose_secret()))
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Pick the exchange flow for `submission` and build its parameters.
///
/// # Errors
/// Returns a [`ValidationError`] when a field the chosen flow needs is empty
/// or whitespace.
pub fn select(
    submission: &CredentialSubmission,
) -> Result<(ExchangeFlow, AuthParameters), ValidationError> {
    if submission.refresh_requested {
        let material = submission.refresh_material.expose_secret();
        if is_blank(material) {
            return Err(ValidationError::MissingRefreshToken);
        }
        return Ok((
            ExchangeFlow::RefreshToken,
            AuthParameters::new().with(PARAM_REFRESH_TOKEN, material),
        ));
    }

    if is_blank(&submission.identifier) {
        return Err(ValidationError::MissingUsername);
    }
    let secret = submission.secret.expose_secret();
    if is_blank(secret) {
        return Err(ValidationError::MissingPassword);
    }

    Ok((
        ExchangeFlow::PrimaryCredential,
        AuthParameters::new()
            .with(PARAM_USERNAME, submission.identifier.as_str())
            .with(PARAM_PASSWORD, secret),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_flow_carries_username_and_password_only() {
        let submission = CredentialSubmission::new("alice", "correct");
        let (flow, params) = select(&submission).unwrap_or_else(|err| panic!("{err}"));

        assert_eq!(flow, ExchangeFlow::PrimaryCredential);
        assert_eq!(params.keys().collect::<Vec<_>>(), vec![PARAM_PASSWORD, PARAM_USERNAME]);
        assert_eq!(params.get(PARAM_USERNAME), Some("alice"));
        assert_eq!(params.get(PARAM_PASSWORD), Some("correct"));
    }

    #[test]
    fn refresh_flow_carries_refresh_token_only() {
        let submission = CredentialSubmission::new("", "").with_refresh("RT1");
        let (flow, params) = select(&submission).unwrap_or_else(|err| panic!("{err}"));

        assert_eq!(flow, ExchangeFlow::RefreshToken);
        assert_eq!(params.len(), 1);
        assert_eq!(params.get(PARAM_REFRESH_TOKEN), Some("RT1"));
    }

    #[test]
    fn refresh_without_material_is_rejected() {
        for material in ["", "   "] {
            let submission = CredentialSubmission::new("alice", "correct").with_refresh(material);
            assert_eq!(
                select(&submission).err(),
                Some(ValidationError::MissingRefreshToken)
            );
        }
    }

    #[test]
    fn blank_fields_are_rejected() {
        assert_eq!(
            select(&CredentialSubmission::new(" ", "correct")).err(),
            Some(ValidationError::MissingUsername)
        );
        assert_eq!(
            select(&CredentialSubmission::new("alice", "\t")).err(),
            Some(ValidationError::MissingPassword)
        );
    }

    #[test]
    fn blank_replacement_counts_as_absent() {
        let submission = CredentialSubmission::new("alice", "old").with_replacement("  ");
        assert!(submission.replacement().is_none());
        assert!(submission.session_material().is_none());
    }
}
