//! HTTP surface: routes, middleware and the server loop.

pub mod handlers;
mod openapi;

pub use openapi::openapi;

use crate::{gateway::AuthGateway, store::ItemStore};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use handlers::{admin, confirm, health, items, login, me, register};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{debug_span, info, Span};
use ulid::Ulid;

const REQUEST_ID: &str = "x-request-id";

/// Collaborators shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub gateway: AuthGateway,
    pub store: Arc<dyn ItemStore>,
    /// Set only when user administration is possible (token and pool id).
    pub admin_token: Option<admin::AdminToken>,
}

/// Build the application router with its middleware stack.
#[must_use]
pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health::health).options(health::health))
        .route("/openapi.json", get(|| async { Json(openapi()) }))
        .route("/v1/auth/login", post(login::login))
        .route("/v1/auth/register", post(register::register))
        .route("/v1/auth/confirm", post(confirm::confirm))
        .route("/v1/auth/me", get(me::get_me))
        .route("/v1/items", post(items::put_item))
        .route("/v1/items/batch", post(items::batch_get_items))
        .route(
            "/v1/items/:id",
            get(items::get_item).delete(items::delete_item),
        );

    if let Some(admin_token) = state.admin_token {
        router = router
            .route("/v1/admin/users/:username", delete(admin::delete_user))
            .layer(Extension(admin_token));
    }

    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static(REQUEST_ID),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                REQUEST_ID,
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(Extension(state.gateway))
            .layer(Extension(state.store)),
    )
}

/// Serve the API on `port` until interrupted.
/// # Errors
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn new(port: u16, state: AppState) -> Result<()> {
    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let path = request.uri().path();
    let method = request.method().as_str();
    let request_id = request
        .headers()
        .get(REQUEST_ID)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", method, path, request_id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        gateway::GatewayConfig,
        identity::CognitoClient,
        aws::AwsSettings,
        store::MemoryStore,
    };
    use axum::{body::to_bytes, http::StatusCode};
    use secrecy::SecretString;
    use tower::ServiceExt;

    fn state(admin: bool) -> AppState {
        // Never called: these tests only exercise routing and middleware.
        let provider =
            CognitoClient::new(&AwsSettings::new("eu-west-1".to_string()), Some("http://127.0.0.1:9"))
                .unwrap();
        AppState {
            gateway: AuthGateway::new(GatewayConfig::new("client".to_string()), Arc::new(provider)),
            store: Arc::new(MemoryStore::default()),
            admin_token: admin.then(|| admin::AdminToken(SecretString::from("admin-secret"))),
        }
    }

    #[tokio::test]
    async fn request_id_is_generated_and_propagated() {
        let response = router(state(false))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let request_id = response.headers().get(REQUEST_ID).unwrap().to_str().unwrap();
        assert!(Ulid::from_string(request_id).is_ok());
    }

    #[tokio::test]
    async fn caller_request_id_is_kept() {
        let response = router(state(false))
            .oneshot(
                Request::get("/health")
                    .header(REQUEST_ID, "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers().get(REQUEST_ID).unwrap(), "abc-123");
    }

    #[tokio::test]
    async fn openapi_is_served() {
        let response = router(state(false))
            .oneshot(Request::get("/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(doc["paths"]["/v1/auth/login"].is_object());
    }

    #[tokio::test]
    async fn admin_route_absent_without_token() {
        let request = || {
            Request::delete("/v1/admin/users/alice")
                .body(Body::empty())
                .unwrap()
        };

        let disabled = router(state(false)).oneshot(request()).await.unwrap();
        assert_eq!(disabled.status(), StatusCode::NOT_FOUND);

        let enabled = router(state(true)).oneshot(request()).await.unwrap();
        assert_eq!(enabled.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_login_body_is_bad_request() {
        let response = router(state(false))
            .oneshot(
                Request::post("/v1/auth/login")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
