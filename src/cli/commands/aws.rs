use crate::aws::{AwsSettings, Credentials};
use anyhow::{bail, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use std::time::Duration;

pub const ARG_AWS_REGION: &str = "aws-region";
pub const ARG_AWS_ACCESS_KEY_ID: &str = "aws-access-key-id";
pub const ARG_AWS_SECRET_ACCESS_KEY: &str = "aws-secret-access-key";
pub const ARG_AWS_SESSION_TOKEN: &str = "aws-session-token";
pub const ARG_HTTP_TIMEOUT_SECONDS: &str = "http-timeout-seconds";

#[derive(Debug, Clone)]
pub struct Options {
    pub region: String,
    pub credentials: Option<Credentials>,
    pub timeout: Duration,
}

impl Options {
    /// Parse AWS arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the region is missing or only half of a key pair
    /// is given.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        // clap passes through env vars that are set to ""
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let Some(region) = get_non_empty(ARG_AWS_REGION) else {
            bail!("missing required argument: --{ARG_AWS_REGION}");
        };

        let credentials = match (
            get_non_empty(ARG_AWS_ACCESS_KEY_ID),
            get_non_empty(ARG_AWS_SECRET_ACCESS_KEY),
        ) {
            (Some(access_key_id), Some(secret)) => Some(Credentials::new(
                access_key_id,
                SecretString::from(secret),
                get_non_empty(ARG_AWS_SESSION_TOKEN).map(SecretString::from),
            )),
            (None, None) => None,
            _ => bail!(
                "--{ARG_AWS_ACCESS_KEY_ID} and --{ARG_AWS_SECRET_ACCESS_KEY} must be given together"
            ),
        };

        let timeout = matches
            .get_one::<u64>(ARG_HTTP_TIMEOUT_SECONDS)
            .copied()
            .unwrap_or(10);
        if timeout == 0 {
            bail!("--{ARG_HTTP_TIMEOUT_SECONDS} must be greater than zero");
        }

        Ok(Self {
            region,
            credentials,
            timeout: Duration::from_secs(timeout),
        })
    }

    #[must_use]
    pub fn settings(&self) -> AwsSettings {
        AwsSettings::new(self.region.clone())
            .with_credentials(self.credentials.clone())
            .with_timeout(self.timeout)
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_AWS_REGION)
                .long(ARG_AWS_REGION)
                .help("AWS region of the user pool and table")
                .env("AWS_REGION")
                .required(true),
        )
        .arg(
            Arg::new(ARG_AWS_ACCESS_KEY_ID)
                .long(ARG_AWS_ACCESS_KEY_ID)
                .help("Access key id used to sign admin and table requests")
                .long_help(
                    "Access key id used to sign admin and table requests. When no key pair is given, the default AWS credential chain is used (shared profile, web identity, ECS or instance role).",
                )
                .env("AWS_ACCESS_KEY_ID"),
        )
        .arg(
            Arg::new(ARG_AWS_SECRET_ACCESS_KEY)
                .long(ARG_AWS_SECRET_ACCESS_KEY)
                .help("Secret access key paired with the access key id")
                .env("AWS_SECRET_ACCESS_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_AWS_SESSION_TOKEN)
                .long(ARG_AWS_SESSION_TOKEN)
                .help("Session token for temporary credentials")
                .env("AWS_SESSION_TOKEN")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_HTTP_TIMEOUT_SECONDS)
                .long(ARG_HTTP_TIMEOUT_SECONDS)
                .help("Connect and request timeout for AWS calls, in seconds")
                .env("NOTICEBOARD_HTTP_TIMEOUT_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(args: &[&str]) -> ArgMatches {
        with_args(Command::new("test")).get_matches_from(
            std::iter::once("test").chain(args.iter().copied()),
        )
    }

    #[test]
    fn key_pair_builds_credentials() {
        temp_env::with_vars_unset(
            ["AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY", "AWS_SESSION_TOKEN"],
            || {
                let options = Options::parse(&matches(&[
                    "--aws-region",
                    "eu-west-1",
                    "--aws-access-key-id",
                    "AKID",
                    "--aws-secret-access-key",
                    "secret",
                ]))
                .unwrap_or_else(|err| panic!("{err}"));

                assert_eq!(options.region, "eu-west-1");
                assert_eq!(
                    options.credentials.as_ref().map(Credentials::access_key_id),
                    Some("AKID")
                );
                assert_eq!(options.timeout, Duration::from_secs(10));
                assert_eq!(options.settings().region, "eu-west-1");
            },
        );
    }

    #[test]
    fn half_a_key_pair_is_rejected() {
        temp_env::with_vars_unset(["AWS_SECRET_ACCESS_KEY", "AWS_ACCESS_KEY_ID"], || {
            let result = Options::parse(&matches(&[
                "--aws-region",
                "eu-west-1",
                "--aws-access-key-id",
                "AKID",
            ]));
            assert!(result.is_err());
        });
    }

    #[test]
    fn no_keys_means_unsigned_only() {
        temp_env::with_vars(
            [
                ("AWS_REGION", Some("us-east-1")),
                ("AWS_ACCESS_KEY_ID", None),
                ("AWS_SECRET_ACCESS_KEY", Some("")),
                ("NOTICEBOARD_HTTP_TIMEOUT_SECONDS", Some("3")),
            ],
            || {
                let options = Options::parse(&matches(&[])).unwrap_or_else(|err| panic!("{err}"));
                assert!(options.credentials.is_none());
                assert_eq!(options.timeout, Duration::from_secs(3));
            },
        );
    }
}
