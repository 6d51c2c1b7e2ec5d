//! # Noticeboard (authentication gateway and item API)
//!
//! `noticeboard` fronts an Amazon Cognito user pool and a `DynamoDB` table
//! with a small HTTP API.
//!
//! ## Authentication gateway
//!
//! Login requests go through [`gateway::AuthGateway`], which:
//!
//! - **Selects a flow:** `USER_PASSWORD_AUTH` for username/password, or
//!   `REFRESH_TOKEN_AUTH` when the caller asks for a refresh.
//! - **Classifies provider errors** into a closed set of outcomes
//!   ([`gateway::ExchangeOutcome`]); unknown codes fall into `Unclassified`.
//! - **Remediates expired passwords** when the caller supplies `new_password`.
//! - **Issues a local bearer token** on success, returned in the `auth` header.
//!   It is random, carries no claims and is never stored.
//!
//! Each request makes at most two provider calls (exchange, then optional
//! password replacement) and nothing is retried.
//!
//! ## Pass-through handlers
//!
//! Sign-up, confirmation, user lookup, admin deletion and item CRUD map one
//! request to one provider or store call and relay the remote error.

pub mod api;
pub mod aws;
pub mod cli;
pub mod gateway;
pub mod identity;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
