//! Cognito user pool client.

use super::{
    AuthParameters, ExchangeFlow, ExchangeResponse, IdentityProvider, ProviderError,
    SecretReplacement, SessionTokens, SignUpReceipt, SignUpRequest, UserAttribute, UserProfile,
};
use crate::aws::{AwsJsonClient, AwsSettings, Signing, COGNITO_IDP};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthInput<'a> {
    auth_flow: &'static str,
    auth_parameters: &'a AuthParameters,
    client_id: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthOutput {
    authentication_result: Option<AuthenticationResult>,
    challenge_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    access_token: String,
    #[serde(default)]
    expires_in: i64,
    id_token: Option<String>,
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: String,
}

impl From<AuthenticationResult> for SessionTokens {
    fn from(result: AuthenticationResult) -> Self {
        Self {
            access_token: result.access_token,
            expires_in: result.expires_in,
            id_token: result.id_token,
            refresh_token: result.refresh_token,
            token_type: result.token_type,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AttributeType {
    name: String,
    #[serde(default)]
    value: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SignUpOutput {
    #[serde(default)]
    user_confirmed: bool,
    user_sub: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetUserOutput {
    username: String,
    #[serde(default)]
    user_attributes: Vec<AttributeType>,
}

#[derive(Debug, Clone)]
pub struct CognitoClient {
    client: AwsJsonClient,
    user_pool_id: Option<String>,
}

impl CognitoClient {
    /// # Errors
    /// Returns an error if the endpoint or HTTP client cannot be set up.
    pub fn new(settings: &AwsSettings, endpoint: Option<&str>) -> Result<Self> {
        Ok(Self {
            client: AwsJsonClient::new(COGNITO_IDP, settings, endpoint)?,
            user_pool_id: None,
        })
    }

    /// Admin operations need the user pool id; without it they fail.
    #[must_use]
    pub fn with_user_pool_id(mut self, user_pool_id: Option<String>) -> Self {
        self.user_pool_id = user_pool_id;
        self
    }

    fn user_pool_id(&self, operation: &str) -> Result<&str, ProviderError> {
        self.user_pool_id.as_deref().ok_or_else(|| {
            ProviderError::Unavailable(anyhow!("{operation} requires a configured user pool id"))
        })
    }
}

#[async_trait]
impl IdentityProvider for CognitoClient {
    #[instrument(skip(self, params))]
    async fn exchange_credentials(
        &self,
        flow: ExchangeFlow,
        params: &AuthParameters,
        client_id: &str,
    ) -> Result<ExchangeResponse, ProviderError> {
        let input = InitiateAuthInput {
            auth_flow: flow.as_str(),
            auth_parameters: params,
            client_id,
        };
        let output: InitiateAuthOutput = self
            .client
            .call("InitiateAuth", &input, Signing::Anonymous)
            .await?;

        match (output.authentication_result, output.challenge_name) {
            (Some(result), _) => Ok(ExchangeResponse::Session(result.into())),
            (None, Some(challenge)) => {
                debug!(challenge = %challenge, "InitiateAuth answered with a challenge");
                Ok(ExchangeResponse::Challenge(challenge))
            }
            (None, None) => Err(ProviderError::Unavailable(anyhow!(
                "InitiateAuth returned neither a session nor a challenge"
            ))),
        }
    }

    #[instrument(skip(self, replacement), fields(username = %replacement.username))]
    async fn replace_secret(&self, replacement: &SecretReplacement) -> Result<(), ProviderError> {
        // With session material the user changes their own password; without it
        // only the pool administrator can set one.
        if let Some(access_token) = &replacement.access_token {
            warn!("ChangePassword authorised by refresh material; Cognito expects an access token");
            let _: Value = self
                .client
                .call(
                    "ChangePassword",
                    &json!({
                        "AccessToken": access_token.expose_secret(),
                        "PreviousPassword": replacement.previous.expose_secret(),
                        "ProposedPassword": replacement.proposed.expose_secret(),
                    }),
                    Signing::Anonymous,
                )
                .await?;
        } else {
            let user_pool_id = self.user_pool_id("AdminSetUserPassword")?;
            let _: Value = self
                .client
                .call(
                    "AdminSetUserPassword",
                    &json!({
                        "UserPoolId": user_pool_id,
                        "Username": replacement.username,
                        "Password": replacement.proposed.expose_secret(),
                        "Permanent": true,
                    }),
                    Signing::Signed,
                )
                .await?;
        }
        Ok(())
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    async fn sign_up(
        &self,
        client_id: &str,
        request: &SignUpRequest,
    ) -> Result<SignUpReceipt, ProviderError> {
        let attributes: Vec<AttributeType> = request
            .attributes
            .iter()
            .map(|attribute| AttributeType {
                name: attribute.name.clone(),
                value: attribute.value.clone(),
            })
            .collect();
        let output: SignUpOutput = self
            .client
            .call(
                "SignUp",
                &json!({
                    "ClientId": client_id,
                    "Username": request.username,
                    "Password": request.password.expose_secret(),
                    "UserAttributes": attributes,
                }),
                Signing::Anonymous,
            )
            .await?;

        Ok(SignUpReceipt {
            user_confirmed: output.user_confirmed,
            user_sub: output.user_sub,
        })
    }

    #[instrument(skip(self, confirmation_code))]
    async fn confirm_sign_up(
        &self,
        client_id: &str,
        username: &str,
        confirmation_code: &str,
    ) -> Result<(), ProviderError> {
        let _: Value = self
            .client
            .call(
                "ConfirmSignUp",
                &json!({
                    "ClientId": client_id,
                    "Username": username,
                    "ConfirmationCode": confirmation_code,
                }),
                Signing::Anonymous,
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn admin_delete_user(&self, username: &str) -> Result<(), ProviderError> {
        let user_pool_id = self.user_pool_id("AdminDeleteUser")?;
        let _: Value = self
            .client
            .call(
                "AdminDeleteUser",
                &json!({ "UserPoolId": user_pool_id, "Username": username }),
                Signing::Signed,
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self, access_token))]
    async fn get_user(&self, access_token: &str) -> Result<UserProfile, ProviderError> {
        let output: GetUserOutput = self
            .client
            .call(
                "GetUser",
                &json!({ "AccessToken": access_token }),
                Signing::Anonymous,
            )
            .await?;

        Ok(UserProfile {
            username: output.username,
            attributes: output
                .user_attributes
                .into_iter()
                .map(|attribute| UserAttribute {
                    name: attribute.name,
                    value: attribute.value,
                })
                .collect(),
        })
    }
}
