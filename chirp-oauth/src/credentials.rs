use zeroize::Zeroizing;

/// The four OAuth 1.0a credentials for one application/user pair.
///
/// Immutable once built. The two secrets are zeroed on drop and redacted
/// from `Debug` output. Keys and tokens are identifiers, not secrets, and are
/// shown as is.
#[derive(Clone)]
pub struct Credentials {
    consumer_key: String,
    consumer_secret: Zeroizing<String>,
    token: String,
    token_secret: Zeroizing<String>,
}

impl Credentials {
    /// Create credentials from the consumer pair and the access token pair.
    pub fn new(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        token: impl Into<String>,
        token_secret: impl Into<String>,
    ) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: Zeroizing::new(consumer_secret.into()),
            token: token.into(),
            token_secret: Zeroizing::new(token_secret.into()),
        }
    }

    /// The `oauth_consumer_key` value.
    pub fn consumer_key(&self) -> &str {
        &self.consumer_key
    }

    /// The consumer secret, first half of the signing key.
    pub fn consumer_secret(&self) -> &str {
        &self.consumer_secret
    }

    /// The `oauth_token` value.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The token secret, second half of the signing key.
    pub fn token_secret(&self) -> &str {
        &self.token_secret
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .field("token", &self.token)
            .field("token_secret", &"[REDACTED]")
            .finish()
    }
}
