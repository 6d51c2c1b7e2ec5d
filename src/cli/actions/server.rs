use crate::{
    api::{self, handlers::admin::AdminToken, AppState},
    aws::CredentialSource,
    cli::{
        commands::{aws, identity, store},
        telemetry,
    },
    gateway::{AuthGateway, GatewayConfig},
    identity::CognitoClient,
    store::DynamoStore,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub aws: aws::Options,
    pub identity: identity::Options,
    pub store: store::Options,
}

/// Execute the server action.
///
/// Without static keys, credentials come from the default AWS chain and are
/// resolved on the first signed call.
/// # Errors
/// Returns an error if the AWS clients cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let mut settings = args.aws.settings();
    if settings.credentials.is_none() {
        settings = settings
            .with_credential_source(CredentialSource::default_chain(&args.aws.region).await);
    }

    let provider = CognitoClient::new(&settings, args.identity.endpoint.as_deref())
        .context("Failed to build Cognito client")?
        .with_user_pool_id(args.identity.user_pool_id.clone());

    let store = DynamoStore::new(&settings, args.store.endpoint.as_deref(), args.store.table)
        .context("Failed to build DynamoDB client")?
        .with_key_attribute(args.store.key_attribute);

    let admin_token = if args.identity.admin_enabled() {
        args.identity.admin_token.clone().map(AdminToken)
    } else {
        if args.identity.admin_token.is_some() {
            warn!("admin token set without a user pool id; admin routes disabled");
        }
        None
    };

    let gateway = AuthGateway::new(
        GatewayConfig::new(args.identity.app_client_id),
        Arc::new(provider),
    );

    let state = AppState {
        gateway,
        store: Arc::new(store),
        admin_token,
    };

    let result = api::new(args.port, state).await;

    telemetry::shutdown_tracer();

    result
}

fn log_startup_args(args: &Args) {
    let or_default = |value: Option<&String>| {
        value.map_or_else(|| "default".to_string(), ToString::to_string)
    };

    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("aws_region", args.aws.region.clone()),
        (
            "aws_credentials",
            args.aws.credentials.as_ref().map_or_else(
                || "default chain".to_string(),
                |c| format!("static ({})", c.access_key_id()),
            ),
        ),
        ("http_timeout", format!("{}s", args.aws.timeout.as_secs())),
        ("app_client_id", args.identity.app_client_id.clone()),
        (
            "user_pool_id",
            args.identity
                .user_pool_id
                .clone()
                .unwrap_or_else(|| "none".to_string()),
        ),
        ("cognito_endpoint", or_default(args.identity.endpoint.as_ref())),
        ("admin_routes", args.identity.admin_enabled().to_string()),
        ("dynamo_table", args.store.table.clone()),
        ("dynamo_key_attribute", args.store.key_attribute.clone()),
        ("dynamo_endpoint", or_default(args.store.endpoint.as_ref())),
    ];

    info!("{}", startup_message(&entries));
}

fn startup_message(entries: &[(&str, String)]) -> String {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "noticeboard {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    message
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    trimmed.chars().take(7).collect()
}
