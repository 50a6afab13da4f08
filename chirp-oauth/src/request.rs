use std::time::{SystemTime, UNIX_EPOCH};

use sha1::{Digest, Sha1};

use crate::encode::percent_encode;
use crate::{Credentials, HmacSha1Signature, OAuthError};

/// Value of the `oauth_version` parameter.
pub const OAUTH_VERSION: &str = "1.0";

/// Generate a single-use nonce: the SHA-1 hex digest of a random value.
pub fn generate_nonce() -> String {
    let seed: f64 = rand::random();
    hex::encode(Sha1::digest(seed.to_string().as_bytes()))
}

/// Seconds since the Unix epoch.
///
/// A clock set before 1970 yields `0`, which the server will reject as stale.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// A fully signed request: method, URL and every parameter to send.
///
/// `params` holds the OAuth fields, then the caller's request parameters,
/// then `oauth_signature` last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// Uppercase HTTP method.
    pub method: String,
    /// Target URL as supplied.
    pub url: String,
    /// All parameters, including `oauth_signature`.
    pub params: Vec<(String, String)>,
}

impl SignedRequest {
    /// Sign a request with a freshly generated nonce and the current time.
    ///
    /// Call this once per connection attempt; nonces must never be reused.
    pub fn new<I, K, V>(
        credentials: &Credentials,
        method: &str,
        url: &str,
        request_params: I,
    ) -> Result<Self, OAuthError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::with_nonce_and_timestamp(
            credentials,
            method,
            url,
            request_params,
            &generate_nonce(),
            current_timestamp(),
        )
    }

    /// Sign a request with a caller-chosen nonce and timestamp.
    pub fn with_nonce_and_timestamp<I, K, V>(
        credentials: &Credentials,
        method: &str,
        url: &str,
        request_params: I,
        nonce: &str,
        timestamp: u64,
    ) -> Result<Self, OAuthError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let signature = HmacSha1Signature::new();

        let mut params = vec![
            ("oauth_consumer_key".to_string(), credentials.consumer_key().to_string()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            ("oauth_signature_method".to_string(), signature.name().to_string()),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            ("oauth_version".to_string(), OAUTH_VERSION.to_string()),
            ("oauth_token".to_string(), credentials.token().to_string()),
        ];
        params.extend(request_params.into_iter().map(|(k, v)| (k.into(), v.into())));

        let oauth_signature = signature.sign(
            credentials.consumer_secret(),
            method,
            url,
            Some(credentials.token_secret()),
            params.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        )?;
        params.push(("oauth_signature".to_string(), oauth_signature));

        Ok(Self {
            method: method.to_uppercase(),
            url: url.to_string(),
            params,
        })
    }

    /// Look up the first parameter named `name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The `oauth_signature` value.
    pub fn signature(&self) -> Option<&str> {
        self.param("oauth_signature")
    }

    /// Render the `oauth_*` parameters as an `Authorization` header value.
    ///
    /// Request parameters are left out; they still travel in the query or
    /// body. See RFC 5849 §3.5.1.
    pub fn authorization_header(&self) -> String {
        let fields = self
            .params
            .iter()
            .filter(|(k, _)| k.starts_with("oauth_"))
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("OAuth {fields}")
    }
}
