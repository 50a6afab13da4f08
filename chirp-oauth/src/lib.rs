#![deny(missing_docs)]
//! OAuth 1.0a request signing for chirp.
//!
//! This crate implements the HMAC-SHA1 signature method of OAuth 1.0a
//! (RFC 5849 §3.4) as used by streaming endpoints, plus the pieces around it:
//! [`Credentials`] with redacted secrets, nonce and timestamp generation, and
//! [`SignedRequest`] assembly.
//!
//! ## Design
//!
//! - [`HmacSha1Signature`] is pure: identical inputs (including the nonce and
//!   timestamp carried in the parameters) always produce the same signature.
//! - Freshness lives in [`SignedRequest::new`], which draws a new nonce and
//!   timestamp on every call.
//! - Secrets are zeroed on drop and never appear in `Debug` output.

mod credentials;
pub mod encode;
mod error;
mod request;
pub mod signature;

pub use credentials::Credentials;
pub use error::OAuthError;
pub use request::{OAUTH_VERSION, SignedRequest, current_timestamp, generate_nonce};
pub use signature::HmacSha1Signature;
