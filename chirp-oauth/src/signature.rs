//! The HMAC-SHA1 signature method (RFC 5849 §3.4.2).

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::OAuthError;
use crate::encode::{normalize_url, parameter_string, percent_encode};

/// Build the signature base string: `METHOD&url&params`, each part encoded.
///
/// The method is uppercased and the URL loses its query component before
/// encoding. `params` must already include every `oauth_*` field except
/// `oauth_signature`.
pub fn signature_base_string<I, K, V>(
    method: &str,
    url: &str,
    params: I,
) -> Result<String, OAuthError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let method = method.to_uppercase();
    let url = normalize_url(url)?;
    let params = parameter_string(params);

    Ok([method, url, params]
        .iter()
        .map(|part| percent_encode(part))
        .collect::<Vec<_>>()
        .join("&"))
}

/// Build the signing key: `consumer_secret&token_secret`, each part encoded.
///
/// A missing or empty token secret still leaves the trailing `&`.
pub fn signing_key(consumer_secret: &str, token_secret: Option<&str>) -> String {
    format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret.unwrap_or_default())
    )
}

/// The `HMAC-SHA1` signature method.
///
/// Stateless apart from its name. See [`HmacSha1Signature::sign`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HmacSha1Signature;

impl HmacSha1Signature {
    /// Value of the `oauth_signature_method` parameter.
    pub const NAME: &'static str = "HMAC-SHA1";

    /// Create the signature method.
    pub fn new() -> Self {
        Self
    }

    /// The method name sent as `oauth_signature_method`.
    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Compute the base64-encoded signature for a request.
    ///
    /// `params` is the full unsorted parameter set (OAuth fields plus any
    /// request parameters), as raw unencoded strings.
    pub fn sign<I, K, V>(
        &self,
        consumer_secret: &str,
        method: &str,
        url: &str,
        token_secret: Option<&str>,
        params: I,
    ) -> Result<String, OAuthError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let base = signature_base_string(method, url, params)?;
        let key = signing_key(consumer_secret, token_secret);

        let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes())
            .map_err(|e| OAuthError::InvalidKey(e.to_string()))?;
        mac.update(base.as_bytes());

        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}
