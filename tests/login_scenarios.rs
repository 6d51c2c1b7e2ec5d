//! Drives the HTTP router end to end against a faked Cognito endpoint.

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use noticeboard::{
    api::{self, handlers::admin::AdminToken, AppState},
    aws::{AwsSettings, Credentials},
    gateway::{AuthGateway, GatewayConfig},
    identity::CognitoClient,
    store::MemoryStore,
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::{
    matchers::{body_partial_json, header, header_exists, method},
    Mock, MockServer, ResponseTemplate,
};

const CLIENT_ID: &str = "client-1";
const POOL_ID: &str = "eu-west-1_pool";
const ADMIN_TOKEN: &str = "admin-secret";

fn target(operation: &str) -> String {
    format!("AWSCognitoIdentityProviderService.{operation}")
}

fn app(cognito: &MockServer) -> Result<Router> {
    let settings = AwsSettings::new("eu-west-1".to_string()).with_credentials(Some(
        Credentials::new("AKID".to_string(), SecretString::from("secret"), None),
    ));
    let provider = CognitoClient::new(&settings, Some(&cognito.uri()))?
        .with_user_pool_id(Some(POOL_ID.to_string()));

    Ok(api::router(AppState {
        gateway: AuthGateway::new(GatewayConfig::new(CLIENT_ID.to_string()), Arc::new(provider)),
        store: Arc::new(MemoryStore::default()),
        admin_token: Some(AdminToken(SecretString::from(ADMIN_TOKEN))),
    }))
}

fn post_json(uri: &str, body: &Value) -> Result<Request<Body>> {
    Ok(Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body)?))?)
}

async fn body_text(response: Response) -> Result<String> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

async fn mock_expired_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(header("x-amz-target", target("InitiateAuth").as_str()))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "__type": "NotAuthorizedException",
            "message": "Password has expired and must be reset by an administrator."
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn successful_login_relays_tokens_and_issues_header() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", target("InitiateAuth").as_str()))
        .and(body_partial_json(json!({
            "AuthFlow": "USER_PASSWORD_AUTH",
            "ClientId": CLIENT_ID,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "AuthenticationResult": {
                "AccessToken": "AT1",
                "ExpiresIn": 3600,
                "IdToken": "ID1",
                "RefreshToken": "RT1",
                "TokenType": "Bearer"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = app(&server)?
        .oneshot(post_json(
            "/v1/auth/login",
            &json!({"username": "alice", "password": "correct"}),
        )?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let issued = response
        .headers()
        .get("auth")
        .context("missing auth header")?
        .to_str()?
        .to_string();
    assert_eq!(issued.len(), 44);

    let body: Value = serde_json::from_str(&body_text(response).await?)?;
    assert_eq!(body["message"], "Authentication successful");
    assert_eq!(body["auth_result"]["access_token"], "AT1");
    assert_eq!(body["auth_result"]["refresh_token"], "RT1");
    Ok(())
}

#[tokio::test]
async fn expired_password_without_replacement_is_reported() -> Result<()> {
    let server = MockServer::start().await;
    mock_expired_login(&server).await;

    let response = app(&server)?
        .oneshot(post_json(
            "/v1/auth/login",
            &json!({"username": "alice", "password": "old"}),
        )?)
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get("auth").is_none());
    assert!(body_text(response).await?.starts_with("Password expired"));
    Ok(())
}

#[tokio::test]
async fn expired_password_is_replaced_when_new_password_given() -> Result<()> {
    let server = MockServer::start().await;
    mock_expired_login(&server).await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", target("AdminSetUserPassword").as_str()))
        .and(header_exists("authorization"))
        .and(body_partial_json(json!({
            "UserPoolId": POOL_ID,
            "Username": "alice",
            "Password": "NewSecret1!",
            "Permanent": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let response = app(&server)?
        .oneshot(post_json(
            "/v1/auth/login",
            &json!({"username": "alice", "password": "old", "new_password": "NewSecret1!"}),
        )?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("auth").is_none());
    let body: Value = serde_json::from_str(&body_text(response).await?)?;
    assert_eq!(
        body["message"],
        "Password updated successfully. Please log in again."
    );
    assert!(body.get("auth_result").is_none());
    Ok(())
}

#[tokio::test]
async fn unknown_user_hides_provider_details() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "__type": "UserNotFoundException",
            "message": "User does not exist."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = app(&server)?
        .oneshot(post_json(
            "/v1/auth/login",
            &json!({"username": "ghost", "password": "whatever"}),
        )?)
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let text = body_text(response).await?;
    assert_eq!(text, "User not found");
    assert!(!text.contains("UserNotFoundException"));
    Ok(())
}

#[tokio::test]
async fn missing_password_never_reaches_provider() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let response = app(&server)?
        .oneshot(post_json("/v1/auth/login", &json!({"username": "alice"}))?)
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn provider_outage_is_a_server_error() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "__type": "ServiceUnavailableException",
            "message": "try later"
        })))
        .mount(&server)
        .await;

    let response = app(&server)?
        .oneshot(post_json(
            "/v1/auth/login",
            &json!({"username": "alice", "password": "correct"}),
        )?)
        .await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    Ok(())
}

#[tokio::test]
async fn admin_delete_requires_token() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", target("AdminDeleteUser").as_str()))
        .and(body_partial_json(json!({"UserPoolId": POOL_ID, "Username": "alice"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let router = app(&server)?;

    let denied = router
        .clone()
        .oneshot(
            Request::delete("/v1/admin/users/alice")
                .header("authorization", "Bearer wrong")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

    let deleted = router
        .oneshot(
            Request::delete("/v1/admin/users/alice")
                .header("authorization", format!("Bearer {ADMIN_TOKEN}"))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn items_round_trip_through_the_api() -> Result<()> {
    let server = MockServer::start().await;
    let router = app(&server)?;

    for id in [1, 2] {
        let stored = router
            .clone()
            .oneshot(post_json(
                "/v1/items",
                &json!({"Id": id, "title": format!("notice {id}")}),
            )?)
            .await?;
        assert_eq!(stored.status(), StatusCode::OK);
    }

    let fetched = router
        .clone()
        .oneshot(Request::get("/v1/items/1").body(Body::empty())?)
        .await?;
    assert_eq!(fetched.status(), StatusCode::OK);
    let item: Value = serde_json::from_str(&body_text(fetched).await?)?;
    assert_eq!(item["title"], "notice 1");

    let batch = router
        .clone()
        .oneshot(post_json("/v1/items/batch", &json!({"ids": [1, 2, 3, 2]}))?)
        .await?;
    assert_eq!(batch.status(), StatusCode::OK);
    let batch: Value = serde_json::from_str(&body_text(batch).await?)?;
    assert_eq!(batch["items"].as_array().map(Vec::len), Some(2));

    let deleted = router
        .clone()
        .oneshot(Request::delete("/v1/items/1").body(Body::empty())?)
        .await?;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let missing = router
        .oneshot(Request::get("/v1/items/1").body(Body::empty())?)
        .await?;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    Ok(())
}
