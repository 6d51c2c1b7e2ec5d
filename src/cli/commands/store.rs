use anyhow::{bail, Result};
use clap::{Arg, ArgMatches, Command};

pub const ARG_DYNAMO_TABLE: &str = "dynamo-table";
pub const ARG_DYNAMO_KEY_ATTRIBUTE: &str = "dynamo-key-attribute";
pub const ARG_DYNAMO_ENDPOINT: &str = "dynamo-endpoint";

#[derive(Debug, Clone)]
pub struct Options {
    pub table: String,
    pub key_attribute: String,
    pub endpoint: Option<String>,
}

impl Options {
    /// Parse table arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the table name is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let Some(table) = get_non_empty(ARG_DYNAMO_TABLE) else {
            bail!("missing required argument: --{ARG_DYNAMO_TABLE}");
        };

        Ok(Self {
            table,
            key_attribute: get_non_empty(ARG_DYNAMO_KEY_ATTRIBUTE).unwrap_or_else(|| "Id".to_string()),
            endpoint: get_non_empty(ARG_DYNAMO_ENDPOINT),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_DYNAMO_TABLE)
                .long(ARG_DYNAMO_TABLE)
                .help("DynamoDB table holding the items")
                .env("AWS_DYNAMO_TABLE_NAME")
                .required(true),
        )
        .arg(
            Arg::new(ARG_DYNAMO_KEY_ATTRIBUTE)
                .long(ARG_DYNAMO_KEY_ATTRIBUTE)
                .help("Name of the numeric partition key attribute")
                .env("NOTICEBOARD_DYNAMO_KEY_ATTRIBUTE")
                .default_value("Id"),
        )
        .arg(
            Arg::new(ARG_DYNAMO_ENDPOINT)
                .long(ARG_DYNAMO_ENDPOINT)
                .help("Override the regional DynamoDB endpoint (e.g. DynamoDB Local)")
                .env("NOTICEBOARD_DYNAMO_ENDPOINT"),
        )
}
