//! Error taxonomy for the stream consumer.

use std::time::Duration;

use chirp_oauth::OAuthError;
use thiserror::Error;

/// A required setting is absent or malformed.
///
/// Always raised before any network I/O.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The named setting was not supplied.
    #[error("missing required setting: {0}")]
    MissingSetting(String),

    /// The named setting was supplied with the wrong shape.
    #[error("invalid setting {key}: {reason}")]
    InvalidSetting {
        /// Setting name.
        key: String,
        /// What was wrong with it.
        reason: String,
    },
}

/// Opening the stream failed.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The endpoint answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Response status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// Network-level failure (DNS, TLS, connection reset).
    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The connection attempt timed out.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// The request could not be signed.
    #[error("signing failed: {0}")]
    Signing(#[from] OAuthError),
}

impl ConnectionError {
    /// Whether a fresh connection attempt could plausibly succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status == 420 || *status == 429 || *status >= 500,
            Self::Signing(_) => false,
        }
    }
}

/// A complete record could not be decoded.
///
/// The offending bytes are already dropped from the buffer, so the next read
/// continues with the following record.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The record is not valid UTF-8.
    #[error("record is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// The record is not valid JSON.
    #[error("record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Upstream closed the stream without sending a single record.
    #[error("stream closed before any message was received")]
    EmptyStream,
}

/// Errors surfaced by [`StreamConsumer`](crate::StreamConsumer).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StreamError {
    /// A required setting is missing or malformed.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The stream could not be opened or read.
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// A record could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The consumer was torn down.
    #[error("consumer closed")]
    Closed,

    /// Upstream finished and every buffered record has been delivered.
    #[error("end of stream")]
    EndOfStream,

    /// The consumer's cancellation token fired during a read.
    #[error("read cancelled")]
    Cancelled,
}

impl StreamError {
    /// Whether the caller may reasonably retry.
    ///
    /// Decode errors count as retryable: the next read moves on to the next
    /// record. Everything else is terminal for this consumer.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(e) => e.is_retryable(),
            Self::Decode(DecodeError::EmptyStream) => false,
            Self::Decode(_) => true,
            _ => false,
        }
    }
}

/// Map a [`reqwest::Error`] to a [`ConnectionError`].
pub(crate) fn map_reqwest_error(err: reqwest::Error, timeout: Option<Duration>) -> ConnectionError {
    if err.is_timeout() {
        ConnectionError::Timeout(timeout.unwrap_or(Duration::from_secs(30)))
    } else {
        ConnectionError::Network(Box::new(err))
    }
}
