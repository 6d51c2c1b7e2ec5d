//! Locally issued opaque bearer tokens.

use anyhow::{anyhow, Context, Result};
use base64ct::{Base64Url, Encoding};
use once_cell::sync::Lazy;
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};

const TOKEN_BYTES: usize = 32;

/// Characters outside the token alphabet.
static DISALLOWED: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9\-_=.]"));

/// 256 random bits, URL-safe base64 with padding. Never stored.
#[derive(Debug, Clone)]
pub struct IssuedAccessToken(SecretString);

impl IssuedAccessToken {
    /// Draw a fresh token from the OS CSPRNG.
    ///
    /// # Errors
    /// Returns an error if the OS random source fails.
    pub fn generate() -> Result<Self> {
        Self::generate_with(&mut OsRng)
    }

    /// # Errors
    /// Returns an error if `rng` cannot produce bytes.
    pub fn generate_with<R: RngCore + ?Sized>(rng: &mut R) -> Result<Self> {
        let mut bytes = [0u8; TOKEN_BYTES];
        rng.try_fill_bytes(&mut bytes)
            .context("failed to generate access token")?;

        let encoded = Base64Url::encode_string(&bytes);
        let disallowed = DISALLOWED
            .as_ref()
            .map_err(|err| anyhow!("invalid access token character filter: {err}"))?;
        let token = disallowed.replace_all(&encoded, "").into_owned();

        Ok(Self(SecretString::from(token)))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}
