//! Consumer configuration supplied by the host application.
//!
//! The host hands over a settings object; [`StreamConfig::from_settings`]
//! validates it up front so that a missing credential fails before any
//! connection is attempted.

use std::time::Duration;

use chirp_oauth::Credentials;
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Default streaming endpoint.
pub const FILTER_ENDPOINT: &str = "https://stream.twitter.com/1.1/statuses/filter.json";

/// Default number of bytes requested per body read.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Application key setting.
pub const CONSUMER_KEY: &str = "TWITTER_CONSUMER_KEY";
/// Application secret setting.
pub const CONSUMER_SECRET: &str = "TWITTER_CONSUMER_SECRET";
/// Filter parameter mapping setting.
pub const FILTER: &str = "TWITTER_FILTER";
/// Access token setting.
pub const OAUTH_TOKEN: &str = "TWITTER_OAUTH_TOKEN";
/// Access token secret setting.
pub const OAUTH_TOKEN_SECRET: &str = "TWITTER_OAUTH_TOKEN_SECRET";

/// Every setting that must be present before connecting.
pub const REQUIRED_SETTINGS: [&str; 5] = [
    CONSUMER_KEY,
    CONSUMER_SECRET,
    FILTER,
    OAUTH_TOKEN,
    OAUTH_TOKEN_SECRET,
];

/// Insertion-ordered request parameters, such as `track` or `follow`.
///
/// Copied into every signed request and never modified by the consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterParams(Vec<(String, String)>);

impl FilterParams {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Append a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Iterate over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FilterParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Everything a [`StreamConsumer`](crate::StreamConsumer) needs to connect.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub(crate) credentials: Credentials,
    pub(crate) filter: FilterParams,
    pub(crate) endpoint: String,
    pub(crate) chunk_size: usize,
    pub(crate) connect_timeout: Option<Duration>,
}

impl StreamConfig {
    /// Create a config for the default endpoint.
    pub fn new(credentials: Credentials, filter: FilterParams) -> Self {
        Self {
            credentials,
            filter,
            endpoint: FILTER_ENDPOINT.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            connect_timeout: None,
        }
    }

    /// Override the streaming endpoint.
    ///
    /// Useful for testing with a local mock server or a proxy.
    #[must_use]
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    /// Override the number of bytes requested per body read.
    ///
    /// Only affects how many reads a message takes. Zero is treated as one.
    #[must_use]
    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes.max(1);
        self
    }

    /// Bound the time allowed to establish the connection.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// The OAuth credentials.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The request parameters sent with every connection.
    pub fn filter(&self) -> &FilterParams {
        &self.filter
    }

    /// The streaming endpoint URL.
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint
    }

    /// Validate a host settings object keyed by [`REQUIRED_SETTINGS`].
    ///
    /// Credentials must be strings. The filter must be an object whose values
    /// are strings, numbers or booleans; non-strings are stringified.
    pub fn from_settings(settings: &Map<String, Value>) -> Result<Self, ConfigError> {
        if let Some(missing) = REQUIRED_SETTINGS
            .iter()
            .find(|key| settings.get(**key).is_none_or(Value::is_null))
        {
            return Err(ConfigError::MissingSetting((*missing).to_string()));
        }

        let credentials = Credentials::new(
            string_setting(settings, CONSUMER_KEY)?,
            string_setting(settings, CONSUMER_SECRET)?,
            string_setting(settings, OAUTH_TOKEN)?,
            string_setting(settings, OAUTH_TOKEN_SECRET)?,
        );
        let filter = filter_setting(&settings[FILTER])?;

        Ok(Self::new(credentials, filter))
    }

    /// Read the settings from process environment variables.
    ///
    /// `TWITTER_FILTER` holds a JSON object, e.g. `{"track":"rust"}`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the settings through an arbitrary lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut settings = Map::new();
        for key in REQUIRED_SETTINGS {
            let Some(raw) = lookup(key) else {
                continue;
            };
            let value = if key == FILTER {
                serde_json::from_str(&raw).map_err(|e| ConfigError::InvalidSetting {
                    key: key.to_string(),
                    reason: format!("expected a JSON object: {e}"),
                })?
            } else {
                Value::String(raw)
            };
            settings.insert(key.to_string(), value);
        }
        Self::from_settings(&settings)
    }
}

fn string_setting(settings: &Map<String, Value>, key: &str) -> Result<String, ConfigError> {
    match settings.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ConfigError::InvalidSetting {
            key: key.to_string(),
            reason: format!("expected a string, got {}", kind(other)),
        }),
        None => Err(ConfigError::MissingSetting(key.to_string())),
    }
}

fn filter_setting(value: &Value) -> Result<FilterParams, ConfigError> {
    let Value::Object(map) = value else {
        return Err(ConfigError::InvalidSetting {
            key: FILTER.to_string(),
            reason: format!("expected an object, got {}", kind(value)),
        });
    };

    map.iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => {
                    return Err(ConfigError::InvalidSetting {
                        key: format!("{FILTER}.{k}"),
                        reason: format!("expected a scalar, got {}", kind(other)),
                    });
                }
            };
            Ok((k.clone(), v))
        })
        .collect()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;

    fn full_settings() -> Map<String, Value> {
        let Value::Object(map) = json!({
            "TWITTER_CONSUMER_KEY": "ck",
            "TWITTER_CONSUMER_SECRET": "cs",
            "TWITTER_FILTER": { "track": "rust", "follow": 12, "stall_warnings": true },
            "TWITTER_OAUTH_TOKEN": "tok",
            "TWITTER_OAUTH_TOKEN_SECRET": "ts",
        }) else {
            unreachable!()
        };
        map
    }

    #[test]
    fn defaults() {
        let config = StreamConfig::new(Credentials::new("a", "b", "c", "d"), FilterParams::new());
        assert_eq!(config.endpoint_url(), FILTER_ENDPOINT);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(config.connect_timeout.is_none());
    }

    #[test]
    fn builder_overrides() {
        let config = StreamConfig::new(Credentials::new("a", "b", "c", "d"), FilterParams::new())
            .endpoint("http://localhost:9999/stream")
            .chunk_size(0)
            .connect_timeout(Duration::from_secs(3));
        assert_eq!(config.endpoint_url(), "http://localhost:9999/stream");
        assert_eq!(config.chunk_size, 1);
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn from_settings_reads_everything() {
        let config = StreamConfig::from_settings(&full_settings()).unwrap();
        assert_eq!(config.credentials().consumer_key(), "ck");
        assert_eq!(config.credentials().consumer_secret(), "cs");
        assert_eq!(config.credentials().token(), "tok");
        assert_eq!(config.credentials().token_secret(), "ts");

        let filter: HashMap<_, _> = config.filter().iter().collect();
        assert_eq!(filter["track"], "rust");
        assert_eq!(filter["follow"], "12");
        assert_eq!(filter["stall_warnings"], "true");
    }

    #[test]
    fn each_missing_key_is_named() {
        for key in REQUIRED_SETTINGS {
            let mut settings = full_settings();
            settings.remove(key);
            let err = StreamConfig::from_settings(&settings).unwrap_err();
            assert!(
                matches!(&err, ConfigError::MissingSetting(k) if k == key),
                "expected MissingSetting({key}), got {err:?}"
            );
        }
    }

    #[test]
    fn null_counts_as_missing() {
        let mut settings = full_settings();
        settings.insert(OAUTH_TOKEN.into(), Value::Null);
        let err = StreamConfig::from_settings(&settings).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSetting(k) if k == OAUTH_TOKEN));
    }

    #[test]
    fn non_string_credential_is_invalid() {
        let mut settings = full_settings();
        settings.insert(CONSUMER_KEY.into(), json!(42));
        let err = StreamConfig::from_settings(&settings).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { key, .. } if key == CONSUMER_KEY));
    }

    #[test]
    fn filter_must_be_an_object() {
        let mut settings = full_settings();
        settings.insert(FILTER.into(), json!("track=rust"));
        let err = StreamConfig::from_settings(&settings).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { key, .. } if key == FILTER));
    }

    #[test]
    fn nested_filter_values_are_invalid() {
        let mut settings = full_settings();
        settings.insert(FILTER.into(), json!({ "track": ["rust"] }));
        let err = StreamConfig::from_settings(&settings).unwrap_err();
        assert!(
            matches!(
                &err,
                ConfigError::InvalidSetting { key, .. } if key == "TWITTER_FILTER.track"
            ),
            "got {err:?}"
        );
    }

    #[test]
    fn from_lookup_parses_filter_json() {
        let env: HashMap<&str, &str> = HashMap::from([
            (CONSUMER_KEY, "ck"),
            (CONSUMER_SECRET, "cs"),
            (FILTER, r#"{"track":"rust,tokio"}"#),
            (OAUTH_TOKEN, "tok"),
            (OAUTH_TOKEN_SECRET, "ts"),
        ]);
        let config = StreamConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.filter().iter().collect::<Vec<_>>(), vec![("track", "rust,tokio")]);
    }

    #[test]
    fn from_lookup_reports_missing_key() {
        let env: HashMap<&str, &str> = HashMap::from([(CONSUMER_KEY, "ck"), (FILTER, "{}")]);
        let err = StreamConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSetting(k) if k == CONSUMER_SECRET));
    }

    #[test]
    fn from_lookup_rejects_bad_filter_json() {
        let env: HashMap<&str, &str> = HashMap::from([(FILTER, "track=rust")]);
        let err = StreamConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { key, .. } if key == FILTER));
    }

    #[test]
    fn filter_params_keep_insertion_order() {
        let filter = FilterParams::new()
            .with("track", "rust")
            .with("follow", "1")
            .with("language", "en");
        let keys: Vec<_> = filter.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["track", "follow", "language"]);
        assert_eq!(filter.len(), 3);
        assert!(!filter.is_empty());
    }
}
