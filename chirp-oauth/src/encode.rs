//! RFC 3986 percent-encoding and OAuth parameter normalization.
//!
//! OAuth 1.0a signs a canonical form of the request. Every name and value is
//! encoded from its raw form with the unreserved set (`A-Z a-z 0-9 - . _ ~`)
//! left as is, so input that already looks percent-encoded is encoded again
//! rather than trusted.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use url::Url;

use crate::OAuthError;

/// Everything except the RFC 3986 unreserved characters.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode `input` for use in a signature base string or header.
///
/// Space becomes `%20` (never `+`) and hex digits are uppercase.
pub fn percent_encode(input: &str) -> String {
    utf8_percent_encode(input, OAUTH_ENCODE_SET).to_string()
}

/// Return the base string URI for `url`: the URL without its query component.
///
/// Parsing also lowercases the scheme and host and drops a default port, which
/// matches RFC 5849 §3.4.1.2.
pub fn normalize_url(url: &str) -> Result<String, OAuthError> {
    let mut parsed = Url::parse(url).map_err(|e| OAuthError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    parsed.set_query(None);
    Ok(parsed.into())
}

/// Build the normalized parameter string.
///
/// Names and values are encoded, the pairs sorted by name and then by value,
/// and joined as `name=value` with `&`. Insertion order never matters.
pub fn parameter_string<I, K, V>(params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut encoded: Vec<(String, String)> = params
        .into_iter()
        .map(|(k, v)| (percent_encode(k.as_ref()), percent_encode(v.as_ref())))
        .collect();
    encoded.sort();

    encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreserved_characters_pass_through() {
        let unreserved = "ABCxyz019-._~";
        assert_eq!(percent_encode(unreserved), unreserved);
    }

    #[test]
    fn space_is_percent_twenty() {
        assert_eq!(percent_encode("a b"), "a%20b");
    }

    #[test]
    fn reserved_characters_are_escaped() {
        assert_eq!(percent_encode("a+b,c!/?&="), "a%2Bb%2Cc%21%2F%3F%26%3D");
    }

    #[test]
    fn unicode_is_utf8_escaped_uppercase() {
        assert_eq!(percent_encode("café"), "caf%C3%A9");
        assert_eq!(percent_encode("☃"), "%E2%98%83");
    }

    #[test]
    fn existing_escapes_are_encoded_again() {
        assert_eq!(percent_encode("a%20b"), "a%2520b");
    }

    #[test]
    fn normalize_url_strips_query() {
        let url =
            normalize_url("https://stream.twitter.com/1.1/statuses/filter.json?track=rust&x=1")
                .unwrap();
        assert_eq!(url, "https://stream.twitter.com/1.1/statuses/filter.json");
    }

    #[test]
    fn normalize_url_lowercases_host_and_drops_default_port() {
        let url = normalize_url("HTTPS://Stream.Twitter.com:443/1.1/statuses/filter.json").unwrap();
        assert_eq!(url, "https://stream.twitter.com/1.1/statuses/filter.json");
    }

    #[test]
    fn normalize_url_keeps_non_default_port() {
        let url = normalize_url("http://127.0.0.1:8080/stream?a=b").unwrap();
        assert_eq!(url, "http://127.0.0.1:8080/stream");
    }

    #[test]
    fn normalize_url_rejects_garbage() {
        let err = normalize_url("not a url").unwrap_err();
        assert!(matches!(err, OAuthError::InvalidUrl { url, .. } if url == "not a url"));
    }

    #[test]
    fn parameter_string_sorts_by_name_then_value() {
        let params = [("b", "2"), ("a", "z"), ("a", "y"), ("c", "")];
        assert_eq!(parameter_string(params), "a=y&a=z&b=2&c=");
    }

    #[test]
    fn parameter_string_encodes_values() {
        let params = [("status", "Hello Ladies + Gentlemen")];
        assert_eq!(
            parameter_string(params),
            "status=Hello%20Ladies%20%2B%20Gentlemen"
        );
    }

    #[test]
    fn parameter_names_are_encoded_and_sorted_encoded() {
        // Raw "a-" sorts before "a/", but "a%2F" sorts before "a-".
        let params = [("a-", "1"), ("a/", "2")];
        assert_eq!(parameter_string(params), "a%2F=2&a-=1");
    }

    #[test]
    fn parameter_string_of_nothing_is_empty() {
        let params: [(&str, &str); 0] = [];
        assert_eq!(parameter_string(params), "");
    }
}
