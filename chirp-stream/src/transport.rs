//! The network seam: opening the stream and pulling bytes off its body.
//!
//! [`HttpTransport`] is the production implementation over `reqwest`.
//! Anything else (a recorded capture, an in-memory script) can stand in by
//! implementing [`Transport`] and [`ResponseBody`].

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chirp_oauth::SignedRequest;

use crate::error::{ConnectionError, StreamError, map_reqwest_error};

/// Opens the long-lived streaming response.
///
/// A transport is the session: it may open at most one body at a time for
/// its consumer, and `close` ends it for good.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue the signed request and return its body once a 2xx arrives.
    async fn open(&mut self, request: &SignedRequest) -> Result<Box<dyn ResponseBody>, StreamError>;

    /// Close the underlying session. Called at most once.
    async fn close(&mut self);
}

/// The body of an open streaming response.
#[async_trait]
pub trait ResponseBody: Send {
    /// Read at most `max` bytes. An empty result means upstream closed.
    async fn read(&mut self, max: usize) -> Result<Bytes, StreamError>;

    /// Give the connection back before the session is closed.
    async fn release(self: Box<Self>);
}

/// [`Transport`] over a `reqwest` client.
///
/// Sends the signed parameters as query parameters of the request.
pub struct HttpTransport {
    client: Option<reqwest::Client>,
    connect_timeout: Option<Duration>,
}

impl HttpTransport {
    /// Create a transport with a default client.
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Create a transport around an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client: Some(client),
            connect_timeout: None,
        }
    }

    /// Create a transport whose client gives up connecting after `timeout`.
    ///
    /// Only the connect phase is bounded; the stream itself stays open
    /// indefinitely.
    pub fn with_connect_timeout(timeout: Duration) -> Result<Self, StreamError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| map_reqwest_error(e, Some(timeout)))?;
        Ok(Self {
            client: Some(client),
            connect_timeout: Some(timeout),
        })
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(
        &mut self,
        request: &SignedRequest,
    ) -> Result<Box<dyn ResponseBody>, StreamError> {
        let client = self.client.as_ref().ok_or(StreamError::Closed)?;
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| ConnectionError::Network(Box::new(e)))?;

        tracing::debug!(url = %request.url, method = %method, "opening stream");

        let response = client
            .request(method, &request.url)
            .query(&request.params)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.connect_timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| map_reqwest_error(e, self.connect_timeout))?;
            return Err(ConnectionError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        Ok(Box::new(HttpBody {
            response,
            pending: Bytes::new(),
        }))
    }

    async fn close(&mut self) {
        if self.client.take().is_some() {
            tracing::debug!("http session closed");
        }
    }
}

/// A streaming `reqwest` response, re-sliced into bounded reads.
struct HttpBody {
    response: reqwest::Response,
    /// Bytes from the last network chunk not yet handed out.
    pending: Bytes,
}

#[async_trait]
impl ResponseBody for HttpBody {
    async fn read(&mut self, max: usize) -> Result<Bytes, StreamError> {
        while self.pending.is_empty() {
            match self
                .response
                .chunk()
                .await
                .map_err(|e| map_reqwest_error(e, None))?
            {
                Some(chunk) => self.pending = chunk,
                None => return Ok(Bytes::new()),
            }
        }
        let n = max.max(1).min(self.pending.len());
        Ok(self.pending.split_to(n))
    }

    async fn release(self: Box<Self>) {
        tracing::debug!(unread = self.pending.len(), "releasing response body");
    }
}
