//! AWS Signature Version 4 for JSON protocol `POST /` requests.
//!
//! Only the subset needed here is implemented: no query strings, a fixed
//! path of `/`, and a small set of signed headers.

use chrono::{DateTime, Utc};
use ring::{digest, hmac};
use secrecy::{ExposeSecret, SecretString};

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// IAM credentials used to sign one request.
#[derive(Clone)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: SecretString,
    session_token: Option<SecretString>,
}

impl Credentials {
    #[must_use]
    pub fn new(
        access_key_id: String,
        secret_access_key: SecretString,
        session_token: Option<SecretString>,
    ) -> Self {
        Self {
            access_key_id,
            secret_access_key,
            session_token,
        }
    }

    #[must_use]
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    #[must_use]
    pub fn secret_access_key(&self) -> &SecretString {
        &self.secret_access_key
    }

    #[must_use]
    pub fn session_token(&self) -> Option<&SecretString> {
        self.session_token.as_ref()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "***"),
            )
            .finish()
    }
}

/// Everything that goes into one signature.
pub struct SigningRequest<'a> {
    pub credentials: &'a Credentials,
    pub region: &'a str,
    pub service: &'a str,
    pub host: &'a str,
    pub target: &'a str,
    pub content_type: &'a str,
    pub body: &'a [u8],
    pub time: DateTime<Utc>,
}

/// Headers to attach to a signed request, including `authorization`.
pub fn sign(request: &SigningRequest<'_>) -> Vec<(&'static str, String)> {
    let amz_date = request.time.format("%Y%m%dT%H%M%SZ").to_string();
    let date = request.time.format("%Y%m%d").to_string();
    let session_token = request
        .credentials
        .session_token
        .as_ref()
        .map(|token| token.expose_secret().to_string());

    // Canonical headers must be sorted by lowercase name.
    let mut canonical: Vec<(&'static str, String)> = vec![
        ("content-type", request.content_type.to_string()),
        ("host", request.host.to_string()),
        ("x-amz-date", amz_date.clone()),
    ];
    if let Some(token) = &session_token {
        canonical.push(("x-amz-security-token", token.clone()));
    }
    canonical.push(("x-amz-target", request.target.to_string()));

    let canonical_headers: String = canonical
        .iter()
        .map(|(name, value)| format!("{name}:{}\n", value.trim()))
        .collect();
    let signed_headers = canonical
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "POST\n/\n\n{canonical_headers}\n{signed_headers}\n{}",
        sha256_hex(request.body)
    );

    let scope = format!(
        "{date}/{}/{}/aws4_request",
        request.region, request.service
    );
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        sha256_hex(canonical_request.as_bytes())
    );

    let key = signing_key(
        request.credentials.secret_access_key.expose_secret(),
        &date,
        request.region,
        request.service,
    );
    let signature = hex::encode(hmac::sign(&key, string_to_sign.as_bytes()).as_ref());

    let authorization = format!(
        "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
        request.credentials.access_key_id
    );

    let mut headers = vec![("x-amz-date", amz_date), ("authorization", authorization)];
    if let Some(token) = session_token {
        headers.push(("x-amz-security-token", token));
    }
    headers
}

fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> hmac::Key {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    let k_signing = hmac_sha256(&k_service, b"aws4_request");
    hmac::Key::new(hmac::HMAC_SHA256, &k_signing)
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let key = hmac::Key::new(hmac::HMAC_SHA256, key);
    hmac::sign(&key, data).as_ref().to_vec()
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(digest::digest(&digest::SHA256, data).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn credentials(session_token: Option<&str>) -> Credentials {
        Credentials::new(
            "AKIDEXAMPLE".to_string(),
            SecretString::from("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY"),
            session_token.map(SecretString::from),
        )
    }

    fn request<'a>(credentials: &'a Credentials, body: &'a [u8]) -> SigningRequest<'a> {
        SigningRequest {
            credentials,
            region: "us-east-1",
            service: "dynamodb",
            host: "dynamodb.us-east-1.amazonaws.com",
            target: "DynamoDB_20120810.GetItem",
            content_type: "application/x-amz-json-1.0",
            body,
            time: Utc
                .with_ymd_and_hms(2015, 8, 30, 12, 36, 0)
                .single()
                .unwrap_or_default(),
        }
    }

    fn header<'a>(headers: &'a [(&'static str, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    #[test]
    fn sha256_of_empty_payload() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn sign_produces_known_signature() {
        let credentials = credentials(None);
        let body = br#"{"TableName":"items","Key":{"Id":{"N":"1"}}}"#;
        let headers = sign(&request(&credentials, body));

        assert_eq!(header(&headers, "x-amz-date"), Some("20150830T123600Z"));
        assert_eq!(
            header(&headers, "authorization"),
            Some(
                "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/dynamodb/aws4_request, \
                 SignedHeaders=content-type;host;x-amz-date;x-amz-target, \
                 Signature=7a8ea970fc6068ecbe31ddb8844e8847dc0a08c0b5c1f20968efd8eb6a097b1b"
            )
        );
        assert_eq!(header(&headers, "x-amz-security-token"), None);
    }

    #[test]
    fn session_token_is_signed_and_forwarded() {
        let credentials = credentials(Some("session-token"));
        let headers = sign(&request(&credentials, b"{}"));

        assert_eq!(header(&headers, "x-amz-security-token"), Some("session-token"));
        let authorization = header(&headers, "authorization").unwrap_or_default();
        assert!(authorization
            .contains("SignedHeaders=content-type;host;x-amz-date;x-amz-security-token;x-amz-target"));
    }

    #[test]
    fn debug_redacts_secrets() {
        let output = format!("{:?}", credentials(Some("session-token")));
        assert!(output.contains("AKIDEXAMPLE"));
        assert!(!output.contains("wJalrXUtnFEMI"));
        assert!(!output.contains("session-token"));
    }
}
