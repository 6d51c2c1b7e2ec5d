//! Client plumbing for AWS JSON 1.x protocol services.
//!
//! Cognito user pools and `DynamoDB` both accept `POST /` with an
//! `X-Amz-Target` header naming the operation and a JSON body. Errors come
//! back as a JSON document whose `__type` names the error code.

pub mod credentials;
pub mod sigv4;

pub use credentials::CredentialSource;
pub use sigv4::Credentials;

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::{
    header::{HeaderMap, CONTENT_TYPE},
    Client, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

/// Wire details that differ between services.
#[derive(Debug, Clone, Copy)]
pub struct ServiceSpec {
    /// Name used in the `SigV4` credential scope.
    pub signing_name: &'static str,
    /// Prefix of the `X-Amz-Target` header.
    pub target_prefix: &'static str,
    pub content_type: &'static str,
}

pub const COGNITO_IDP: ServiceSpec = ServiceSpec {
    signing_name: "cognito-idp",
    target_prefix: "AWSCognitoIdentityProviderService",
    content_type: "application/x-amz-json-1.1",
};

pub const DYNAMODB: ServiceSpec = ServiceSpec {
    signing_name: "dynamodb",
    target_prefix: "DynamoDB_20120810",
    content_type: "application/x-amz-json-1.0",
};

/// Whether a call carries an IAM signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signing {
    /// Public operations authorised by their own payload (client id, access token).
    Anonymous,
    Signed,
}

#[derive(Debug, Error)]
pub enum AwsError {
    /// The service answered with an error document.
    #[error("{code}: {message}")]
    Service {
        status: StatusCode,
        code: String,
        message: String,
    },
    #[error("request to {target} failed: {source}")]
    Transport {
        target: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid response to {target}: {reason}")]
    Decode { target: String, reason: String },
    #[error("{target} requires AWS credentials but none are configured")]
    MissingCredentials { target: String },
    #[error("could not resolve AWS credentials for {target}: {source}")]
    Credentials {
        target: String,
        #[source]
        source: aws_credential_types::provider::error::CredentialsError,
    },
}

impl AwsError {
    /// Service-side failures (5xx) say nothing about the request itself.
    #[must_use]
    pub fn is_server_fault(&self) -> bool {
        match self {
            Self::Service { status, .. } => status.is_server_error(),
            _ => true,
        }
    }
}

/// Region, credentials and timeouts shared by every AWS client.
#[derive(Debug, Clone)]
pub struct AwsSettings {
    pub region: String,
    pub credentials: Option<CredentialSource>,
    pub timeout: Duration,
}

impl AwsSettings {
    #[must_use]
    pub fn new(region: String) -> Self {
        Self {
            region,
            credentials: None,
            timeout: Duration::from_secs(10),
        }
    }

    /// Sign with fixed keys.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials.as_ref().map(CredentialSource::from_static);
        self
    }

    #[must_use]
    pub fn with_credential_source(mut self, source: CredentialSource) -> Self {
        self.credentials = Some(source);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct AwsJsonClient {
    http: Client,
    service: ServiceSpec,
    region: String,
    endpoint: Url,
    host: String,
    credentials: Option<CredentialSource>,
}

impl AwsJsonClient {
    /// Build a client for `service`, using the regional endpoint unless
    /// `endpoint` overrides it (e.g. a local emulator).
    ///
    /// # Errors
    /// Returns an error if the endpoint is not a valid URL or the HTTP client
    /// cannot be built.
    pub fn new(service: ServiceSpec, settings: &AwsSettings, endpoint: Option<&str>) -> Result<Self> {
        let endpoint = match endpoint {
            Some(endpoint) => Url::parse(endpoint)
                .with_context(|| format!("Invalid {} endpoint: {endpoint}", service.signing_name))?,
            None => Url::parse(&format!(
                "https://{}.{}.amazonaws.com/",
                service.signing_name, settings.region
            ))
            .with_context(|| format!("Invalid AWS region: {}", settings.region))?,
        };

        let host = endpoint
            .host_str()
            .map(|host| match endpoint.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            })
            .with_context(|| format!("Endpoint has no host: {endpoint}"))?;

        let http = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .connect_timeout(settings.timeout)
            .timeout(settings.timeout)
            .build()
            .context("Failed to build AWS HTTP client")?;

        Ok(Self {
            http,
            service,
            region: settings.region.clone(),
            endpoint,
            host,
            credentials: settings.credentials.clone(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Invoke `operation` with a JSON body and decode the JSON response.
    ///
    /// # Errors
    /// Returns [`AwsError::Service`] for error documents, and the other
    /// variants for transport, decoding or credential problems.
    #[instrument(skip(self, body), fields(service = self.service.signing_name))]
    pub async fn call<B, R>(&self, operation: &str, body: &B, signing: Signing) -> Result<R, AwsError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let target = format!("{}.{operation}", self.service.target_prefix);
        let payload = serde_json::to_vec(body).map_err(|err| AwsError::Decode {
            target: target.clone(),
            reason: format!("request body: {err}"),
        })?;

        let mut request = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, self.service.content_type)
            .header("x-amz-target", &target);

        if signing == Signing::Signed {
            let source = self
                .credentials
                .as_ref()
                .ok_or_else(|| AwsError::MissingCredentials {
                    target: target.clone(),
                })?;
            let credentials =
                source
                    .resolve()
                    .await
                    .map_err(|source| AwsError::Credentials {
                        target: target.clone(),
                        source,
                    })?;
            let headers = sigv4::sign(&sigv4::SigningRequest {
                credentials: &credentials,
                region: &self.region,
                service: self.service.signing_name,
                host: &self.host,
                target: &target,
                content_type: self.service.content_type,
                body: &payload,
                time: Utc::now(),
            });
            for (name, value) in headers {
                request = request.header(name, value);
            }
        }

        let response = request
            .body(payload)
            .send()
            .await
            .map_err(|source| AwsError::Transport {
                target: target.clone(),
                source,
            })?;

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .bytes()
            .await
            .map_err(|source| AwsError::Transport {
                target: target.clone(),
                source,
            })?;

        debug!(%status, bytes = bytes.len(), "{target} responded");

        if !status.is_success() {
            return Err(parse_error(status, &headers, &bytes));
        }

        // Some operations (e.g. DeleteItem) answer with an empty body.
        let bytes: &[u8] = if bytes.is_empty() { b"{}" } else { &bytes };
        serde_json::from_slice(bytes).map_err(|err| AwsError::Decode {
            target,
            reason: err.to_string(),
        })
    }
}

/// Extract the error code and message from an AWS JSON error response.
fn parse_error(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> AwsError {
    let document: Value = serde_json::from_slice(body).unwrap_or(Value::Null);

    let from_header = headers
        .get("x-amzn-errortype")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(':').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let from_body = document
        .get("__type")
        .and_then(Value::as_str)
        .and_then(|value| value.rsplit('#').next())
        .filter(|value| !value.is_empty());

    let code = from_header
        .or(from_body)
        .map_or_else(|| format!("Http{}", status.as_u16()), str::to_string);

    let message = ["message", "Message"]
        .iter()
        .find_map(|key| document.get(*key).and_then(Value::as_str))
        .map_or_else(
            || String::from_utf8_lossy(body).trim().to_string(),
            str::to_string,
        );

    AwsError::Service {
        status,
        code,
        message,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::{
        matchers::{header, header_exists, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn settings() -> AwsSettings {
        AwsSettings::new("eu-west-1".to_string()).with_timeout(Duration::from_secs(2))
    }

    #[test]
    fn default_endpoint_is_regional() {
        let client = AwsJsonClient::new(DYNAMODB, &settings(), None).unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "https://dynamodb.eu-west-1.amazonaws.com/"
        );
        assert_eq!(client.host, "dynamodb.eu-west-1.amazonaws.com");
    }

    #[test]
    fn endpoint_override_keeps_port_in_host() {
        let client =
            AwsJsonClient::new(COGNITO_IDP, &settings(), Some("http://localhost:9229")).unwrap();
        assert_eq!(client.host, "localhost:9229");
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        assert!(AwsJsonClient::new(COGNITO_IDP, &settings(), Some("not a url")).is_err());
    }

    #[test]
    fn parse_error_reads_type_suffix_and_message() {
        let body = br#"{"__type":"com.amazonaws.cognito#UserNotFoundException","message":"User does not exist."}"#;
        let err = parse_error(StatusCode::BAD_REQUEST, &HeaderMap::new(), body);
        match err {
            AwsError::Service { code, message, .. } => {
                assert_eq!(code, "UserNotFoundException");
                assert_eq!(message, "User does not exist.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_error_prefers_error_type_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-amzn-errortype",
            HeaderValue::from_static("NotAuthorizedException:http://internal.amazon.com/"),
        );
        let body = br#"{"Message":"Incorrect username or password."}"#;
        let err = parse_error(StatusCode::BAD_REQUEST, &headers, body);
        match err {
            AwsError::Service { code, message, .. } => {
                assert_eq!(code, "NotAuthorizedException");
                assert_eq!(message, "Incorrect username or password.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_error_falls_back_to_status() {
        let err = parse_error(StatusCode::BAD_GATEWAY, &HeaderMap::new(), b"upstream down");
        assert!(err.is_server_fault());
        match err {
            AwsError::Service { code, message, .. } => {
                assert_eq!(code, "Http502");
                assert_eq!(message, "upstream down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn anonymous_call_sends_target_and_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("x-amz-target", "AWSCognitoIdentityProviderService.GetUser"))
            .and(header("content-type", "application/x-amz-json-1.1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Username": "alice"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = AwsJsonClient::new(COGNITO_IDP, &settings(), Some(&server.uri())).unwrap();
        let value: Value = client
            .call("GetUser", &json!({"AccessToken": "AT"}), Signing::Anonymous)
            .await
            .unwrap();
        assert_eq!(value["Username"], "alice");
    }

    #[tokio::test]
    async fn signed_call_without_credentials_fails_locally() {
        let client =
            AwsJsonClient::new(DYNAMODB, &settings(), Some("http://127.0.0.1:9")).unwrap();
        let result: Result<Value, AwsError> = client
            .call("GetItem", &json!({}), Signing::Signed)
            .await;
        assert!(matches!(result, Err(AwsError::MissingCredentials { .. })));
    }

    #[tokio::test]
    async fn signed_call_carries_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header_exists("authorization"))
            .and(header_exists("x-amz-date"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let settings = settings().with_credentials(Some(Credentials::new(
            "AKID".to_string(),
            SecretString::from("secret"),
            None,
        )));
        let client = AwsJsonClient::new(DYNAMODB, &settings, Some(&server.uri())).unwrap();
        let value: Value = client
            .call("DeleteItem", &json!({}), Signing::Signed)
            .await
            .unwrap();
        assert_eq!(value, json!({}));
    }

    #[tokio::test]
    async fn signed_call_resolves_role_credentials() {
        use aws_credential_types::{
            credential_fn::provide_credentials_fn, provider::SharedCredentialsProvider,
        };

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-amz-security-token", "role-session"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let role = SharedCredentialsProvider::new(provide_credentials_fn(|| async {
            Ok(aws_credential_types::Credentials::new(
                "ASIAROLE",
                "role-secret",
                Some("role-session".to_string()),
                None,
                "instance-role",
            ))
        }));
        let settings = settings().with_credential_source(CredentialSource::new(role));
        let client = AwsJsonClient::new(DYNAMODB, &settings, Some(&server.uri())).unwrap();
        let value: Value = client
            .call("GetItem", &json!({}), Signing::Signed)
            .await
            .unwrap();
        assert_eq!(value, json!({}));
    }

    #[tokio::test]
    async fn unresolvable_credentials_fail_before_sending() {
        use aws_credential_types::{
            credential_fn::provide_credentials_fn,
            provider::{error::CredentialsError, SharedCredentialsProvider},
        };

        let empty = SharedCredentialsProvider::new(provide_credentials_fn(|| async {
            Err(CredentialsError::not_loaded("no provider in the chain"))
        }));
        let settings = settings().with_credential_source(CredentialSource::new(empty));
        let client =
            AwsJsonClient::new(DYNAMODB, &settings, Some("http://127.0.0.1:9")).unwrap();
        let result: Result<Value, AwsError> = client
            .call("GetItem", &json!({}), Signing::Signed)
            .await;
        assert!(matches!(result, Err(AwsError::Credentials { .. })));
    }

    #[tokio::test]
    async fn error_document_becomes_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "__type": "NotAuthorizedException",
                "message": "Password has expired and must be reset by an administrator."
            })))
            .mount(&server)
            .await;

        let client = AwsJsonClient::new(COGNITO_IDP, &settings(), Some(&server.uri())).unwrap();
        let result: Result<Value, AwsError> = client
            .call("InitiateAuth", &json!({}), Signing::Anonymous)
            .await;
        match result {
            Err(AwsError::Service { status, code, .. }) => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(code, "NotAuthorizedException");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
