use crate::cli::{
    actions::{server::Args, Action},
    commands::{aws, identity, store, ARG_PORT},
};
use anyhow::{Context, Result};

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let aws = aws::Options::parse(matches).context("invalid AWS configuration")?;
    let identity = identity::Options::parse(matches).context("invalid user pool configuration")?;
    let store = store::Options::parse(matches).context("invalid table configuration")?;

    Ok(Action::Server(Args {
        port,
        aws,
        identity,
        store,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::commands;

    #[test]
    fn builds_server_action() {
        temp_env::with_vars(
            [
                ("NOTICEBOARD_PORT", None::<&str>),
                ("AWS_ACCESS_KEY_ID", None),
                ("AWS_SECRET_ACCESS_KEY", None),
                ("NOTICEBOARD_ADMIN_TOKEN", None),
                ("AWS_USER_POOL_ID", None),
                ("NOTICEBOARD_DYNAMO_KEY_ATTRIBUTE", None),
            ],
            || {
                let matches = commands::new().get_matches_from(vec![
                    "noticeboard",
                    "--aws-region",
                    "eu-west-1",
                    "--app-client-id",
                    "client",
                    "--dynamo-table",
                    "items",
                    "--dynamo-key-attribute",
                    "NoticeId",
                ]);

                let Action::Server(args) = handler(&matches).unwrap();
                assert_eq!(args.port, 8080);
                assert_eq!(args.aws.region, "eu-west-1");
                assert_eq!(args.identity.app_client_id, "client");
                assert!(!args.identity.admin_enabled());
                assert_eq!(args.store.table, "items");
                assert_eq!(args.store.key_attribute, "NoticeId");
            },
        );
    }

    #[test]
    fn blank_required_value_is_rejected() {
        temp_env::with_vars(
            [
                ("AWS_REGION", Some("eu-west-1")),
                ("AWS_APP_CLIENT_ID", Some(" ")),
                ("AWS_DYNAMO_TABLE_NAME", Some("items")),
            ],
            || {
                let matches = commands::new().get_matches_from(vec!["noticeboard"]);
                assert!(handler(&matches).is_err());
            },
        );
    }
}
