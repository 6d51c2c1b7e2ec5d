use anyhow::{bail, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_APP_CLIENT_ID: &str = "app-client-id";
pub const ARG_USER_POOL_ID: &str = "user-pool-id";
pub const ARG_COGNITO_ENDPOINT: &str = "cognito-endpoint";
pub const ARG_ADMIN_TOKEN: &str = "admin-token";

#[derive(Debug, Clone)]
pub struct Options {
    pub app_client_id: String,
    pub user_pool_id: Option<String>,
    pub endpoint: Option<String>,
    pub admin_token: Option<SecretString>,
}

impl Options {
    /// Parse user pool arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the app client id is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let Some(app_client_id) = get_non_empty(ARG_APP_CLIENT_ID) else {
            bail!("missing required argument: --{ARG_APP_CLIENT_ID}");
        };

        Ok(Self {
            app_client_id,
            user_pool_id: get_non_empty(ARG_USER_POOL_ID),
            endpoint: get_non_empty(ARG_COGNITO_ENDPOINT),
            admin_token: get_non_empty(ARG_ADMIN_TOKEN).map(SecretString::from),
        })
    }

    /// User administration needs both a pool to act on and a token to guard it.
    #[must_use]
    pub fn admin_enabled(&self) -> bool {
        self.admin_token.is_some() && self.user_pool_id.is_some()
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_APP_CLIENT_ID)
                .long(ARG_APP_CLIENT_ID)
                .help("Cognito app client id used for sign up and login")
                .env("AWS_APP_CLIENT_ID")
                .required(true),
        )
        .arg(
            Arg::new(ARG_USER_POOL_ID)
                .long(ARG_USER_POOL_ID)
                .help("Cognito user pool id, needed for admin operations")
                .long_help(
                    "Cognito user pool id. Needed by admin operations: deleting users and replacing an expired password when the login carries no refresh token.",
                )
                .env("AWS_USER_POOL_ID"),
        )
        .arg(
            Arg::new(ARG_COGNITO_ENDPOINT)
                .long(ARG_COGNITO_ENDPOINT)
                .help("Override the regional Cognito endpoint (e.g. a local emulator)")
                .env("NOTICEBOARD_COGNITO_ENDPOINT"),
        )
        .arg(
            Arg::new(ARG_ADMIN_TOKEN)
                .long(ARG_ADMIN_TOKEN)
                .help("Bearer token for the admin routes; they are disabled when unset")
                .env("NOTICEBOARD_ADMIN_TOKEN")
                .hide_env_values(true),
        )
}
