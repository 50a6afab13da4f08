use thiserror::Error;

/// Errors from building or signing an OAuth 1.0a request.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum OAuthError {
    /// The target URL could not be parsed.
    #[error("invalid url {url}: {reason}")]
    InvalidUrl {
        /// The URL as supplied.
        url: String,
        /// Why parsing failed.
        reason: String,
    },

    /// The signing key was rejected by the MAC implementation.
    #[error("invalid signing key: {0}")]
    InvalidKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_all_variants() {
        let err = OAuthError::InvalidUrl {
            url: "::".into(),
            reason: "relative URL without a base".into(),
        };
        assert_eq!(err.to_string(), "invalid url ::: relative URL without a base");
        assert_eq!(
            OAuthError::InvalidKey("bad length".into()).to_string(),
            "invalid signing key: bad length"
        );
    }
}
