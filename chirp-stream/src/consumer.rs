//! The stream consumer: lazy connection, framing and teardown.

use bytes::Bytes;
use chirp_oauth::SignedRequest;
use futures::Stream;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::config::StreamConfig;
use crate::error::{ConnectionError, DecodeError, StreamError};
use crate::framing::{StreamBuffer, decode_record};
use crate::transport::{HttpTransport, ResponseBody, Transport};

/// Where a [`StreamConsumer`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No request has been issued yet.
    Unconnected,
    /// A response body is open for reading.
    Connected,
    /// Torn down. Terminal.
    Closed,
}

enum Connection {
    Unconnected,
    Connected(Box<dyn ResponseBody>),
    Closed,
}

/// Reads one decoded JSON message at a time from an authenticated stream.
///
/// The first [`read`](Self::read) signs a fresh request and opens the
/// connection; later reads reuse it until [`close`](Self::close). Reads take
/// `&mut self`, so a consumer always has a single reader.
///
/// There is no reconnect logic. When a read fails with a connection error the
/// consumer is still unconnected and the next read tries again; whether to do
/// so is the caller's call.
///
/// # Example
///
/// ```no_run
/// use chirp_oauth::Credentials;
/// use chirp_stream::{FilterParams, StreamConfig, StreamConsumer};
///
/// # async fn run() -> Result<(), chirp_stream::StreamError> {
/// let config = StreamConfig::new(
///     Credentials::new("consumer-key", "consumer-secret", "token", "token-secret"),
///     FilterParams::new().with("track", "rust"),
/// );
/// let mut consumer = StreamConsumer::new(config)?;
/// let tweet = consumer.read().await?;
/// println!("{}", tweet["text"]);
/// consumer.close().await;
/// # Ok(())
/// # }
/// ```
pub struct StreamConsumer {
    config: StreamConfig,
    transport: Box<dyn Transport>,
    connection: Connection,
    buffer: StreamBuffer,
    upstream_done: bool,
    received_record: bool,
    delivered: u64,
    cancel: CancellationToken,
}

impl StreamConsumer {
    /// Create a consumer that connects over HTTP.
    pub fn new(config: StreamConfig) -> Result<Self, StreamError> {
        let transport = match config.connect_timeout {
            Some(timeout) => HttpTransport::with_connect_timeout(timeout)?,
            None => HttpTransport::new(),
        };
        Ok(Self::with_transport(config, transport))
    }

    /// Create a consumer over an arbitrary transport.
    pub fn with_transport(config: StreamConfig, transport: impl Transport + 'static) -> Self {
        Self {
            config,
            transport: Box::new(transport),
            connection: Connection::Unconnected,
            buffer: StreamBuffer::new(),
            upstream_done: false,
            received_record: false,
            delivered: 0,
            cancel: CancellationToken::new(),
        }
    }

    /// Validate host settings and create an HTTP consumer.
    ///
    /// Fails with [`StreamError::Config`] naming the first missing key; no
    /// connection is attempted in that case.
    pub fn from_settings(settings: &Map<String, Value>) -> Result<Self, StreamError> {
        Self::new(StreamConfig::from_settings(settings)?)
    }

    /// The configuration this consumer connects with.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        match self.connection {
            Connection::Unconnected => ConnectionState::Unconnected,
            Connection::Connected(_) => ConnectionState::Connected,
            Connection::Closed => ConnectionState::Closed,
        }
    }

    /// Number of messages returned so far.
    pub fn messages_delivered(&self) -> u64 {
        self.delivered
    }

    /// A token that interrupts reads when cancelled.
    ///
    /// Hand it to whatever coordinates shutdown; cancel it, then call
    /// [`close`](Self::close) once the read returns [`StreamError::Cancelled`].
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Return the next complete message.
    ///
    /// Connects on first use. Whitespace-only records (keep-alives) are
    /// skipped. A record that fails to decode is dropped and reported; the
    /// following read resumes with the next record.
    ///
    /// When upstream closes, any unterminated trailing bytes are returned as
    /// a final message. After that every read fails with
    /// [`StreamError::EndOfStream`]. A stream that closes without sending a
    /// record (keep-alives aside) fails with [`DecodeError::EmptyStream`]
    /// first.
    pub async fn read(&mut self) -> Result<Value, StreamError> {
        match self.connection {
            Connection::Closed => return Err(StreamError::Closed),
            _ if self.cancel.is_cancelled() => return Err(StreamError::Cancelled),
            Connection::Unconnected => self.connect().await?,
            Connection::Connected(_) => {}
        }

        loop {
            while let Some(record) = self.buffer.next_record() {
                match self.decode(&record)? {
                    Some(message) => {
                        self.delivered += 1;
                        return Ok(message);
                    }
                    None => tracing::trace!("skipping keep-alive"),
                }
            }

            if self.upstream_done {
                return Err(StreamError::EndOfStream);
            }

            let chunk = self.read_increment().await?;
            if chunk.is_empty() {
                return self.finish();
            }
            self.buffer.extend(&chunk);
        }
    }

    /// Tear down the connection.
    ///
    /// Releases the response body, if any, then closes the session. Safe to
    /// call before any read and safe to call repeatedly; only the first call
    /// does anything.
    pub async fn close(&mut self) {
        match std::mem::replace(&mut self.connection, Connection::Closed) {
            Connection::Closed => return,
            Connection::Connected(body) => body.release().await,
            Connection::Unconnected => {}
        }
        self.transport.close().await;
        self.cancel.cancel();
        tracing::debug!(delivered = self.delivered, "stream consumer closed");
    }

    /// Turn the consumer into a stream of messages.
    ///
    /// Decode errors are yielded and the stream carries on. The stream ends
    /// at end of stream, on cancellation, or after yielding any other error,
    /// and closes the consumer when it does.
    pub fn into_messages(mut self) -> impl Stream<Item = Result<Value, StreamError>> + Send {
        async_stream::stream! {
            loop {
                match self.read().await {
                    Ok(message) => yield Ok(message),
                    Err(StreamError::EndOfStream | StreamError::Cancelled) => break,
                    Err(e @ StreamError::Decode(DecodeError::Utf8(_) | DecodeError::Json(_))) => {
                        yield Err(e);
                    }
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
            self.close().await;
        }
    }

    async fn connect(&mut self) -> Result<(), StreamError> {
        let request = SignedRequest::new(
            &self.config.credentials,
            "POST",
            &self.config.endpoint,
            self.config.filter.iter(),
        )
        .map_err(ConnectionError::from)?;

        tracing::debug!(
            endpoint = %self.config.endpoint,
            params = self.config.filter.len(),
            "connecting to stream"
        );

        let opened = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(StreamError::Cancelled),
            opened = self.transport.open(&request) => opened,
        };

        match opened {
            Ok(body) => {
                self.connection = Connection::Connected(body);
                Ok(())
            }
            Err(e) => {
                tracing::debug!(error = %e, "stream connection failed");
                Err(e)
            }
        }
    }

    async fn read_increment(&mut self) -> Result<Bytes, StreamError> {
        let Connection::Connected(body) = &mut self.connection else {
            return Err(StreamError::Closed);
        };
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(StreamError::Cancelled),
            chunk = body.read(self.config.chunk_size) => chunk,
        }
    }

    /// Decode one record, noting that upstream sent something other than a
    /// keep-alive even when the record turns out to be malformed.
    fn decode(&mut self, record: &[u8]) -> Result<Option<Value>, DecodeError> {
        let decoded = decode_record(record);
        if !matches!(decoded, Ok(None)) {
            self.received_record = true;
        }
        decoded
    }

    fn finish(&mut self) -> Result<Value, StreamError> {
        self.upstream_done = true;
        tracing::debug!(delivered = self.delivered, "upstream closed the stream");

        if let Some(rest) = self.buffer.take_remainder() {
            if let Some(message) = self.decode(&rest)? {
                self.delivered += 1;
                return Ok(message);
            }
        }

        if !self.received_record {
            Err(DecodeError::EmptyStream.into())
        } else {
            Err(StreamError::EndOfStream)
        }
    }
}

impl std::fmt::Debug for StreamConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamConsumer")
            .field("endpoint", &self.config.endpoint)
            .field("state", &self.state())
            .field("buffered", &self.buffer.len())
            .field("delivered", &self.delivered)
            .finish()
    }
}
