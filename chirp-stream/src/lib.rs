#![deny(missing_docs)]
//! Consumer for OAuth 1.0a authenticated, `\r`-delimited JSON streams.
//!
//! [`StreamConsumer`] owns one long-lived connection to a streaming endpoint
//! (by default Twitter's `statuses/filter`). The first read signs a request
//! with [`chirp_oauth`], opens the connection, and from then on each read
//! returns the next complete JSON message.
//!
//! ## Design
//!
//! - Connection state is an explicit state machine:
//!   [`ConnectionState::Unconnected`] → [`ConnectionState::Connected`] →
//!   [`ConnectionState::Closed`]. Reads after close fail with
//!   [`StreamError::Closed`].
//! - Framing buffers raw bytes and only decodes complete records, so chunk
//!   boundaries never affect which messages come out.
//! - The network sits behind the [`Transport`] trait. [`HttpTransport`] is
//!   the `reqwest` implementation; the `test-utils` feature adds an
//!   in-memory one.
//! - Nothing is retried and nothing is logged above `debug`. Every error goes
//!   back to the caller.

pub mod config;
mod consumer;
pub mod error;
pub mod framing;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod transport;

pub use chirp_oauth::Credentials;
pub use config::{FilterParams, REQUIRED_SETTINGS, StreamConfig};
pub use consumer::{ConnectionState, StreamConsumer};
pub use error::{ConfigError, ConnectionError, DecodeError, StreamError};
pub use transport::{HttpTransport, ResponseBody, Transport};

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
