//! In-memory transport for testing consumers without a network.
//!
//! Available behind the `test-utils` feature flag.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chirp_oauth::SignedRequest;

use crate::error::{ConnectionError, StreamError};
use crate::transport::{ResponseBody, Transport};

/// Counters shared between a [`ScriptedTransport`] and the test observing it.
#[derive(Debug, Clone, Default)]
pub struct TransportStats {
    opens: Arc<AtomicUsize>,
    reads: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<SignedRequest>>>,
}

impl TransportStats {
    /// Connection attempts, successful or not.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Body reads, including the final empty one.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Bodies released.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Sessions closed.
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Every request passed to `open`, oldest first.
    pub fn requests(&self) -> Vec<SignedRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

/// A [`Transport`] that replays a fixed body split at fixed boundaries.
///
/// Every `open` starts the script from the beginning.
#[derive(Debug, Clone)]
pub struct ScriptedTransport {
    chunks: Vec<Bytes>,
    failure: Option<(u16, String)>,
    stall_at_end: bool,
    stats: TransportStats,
}

impl ScriptedTransport {
    /// Replay `body` in pieces of `split` bytes.
    pub fn new(body: impl AsRef<[u8]>, split: usize) -> Self {
        let chunks = body
            .as_ref()
            .chunks(split.max(1))
            .map(Bytes::copy_from_slice)
            .collect();
        Self::from_chunks(chunks)
    }

    /// Replay exactly these chunks. Empty chunks are dropped.
    pub fn from_chunks(chunks: Vec<Bytes>) -> Self {
        Self {
            chunks: chunks.into_iter().filter(|c| !c.is_empty()).collect(),
            failure: None,
            stall_at_end: false,
            stats: TransportStats::default(),
        }
    }

    /// Refuse every `open` with the given HTTP status.
    pub fn failing(status: u16, body: impl Into<String>) -> Self {
        Self {
            failure: Some((status, body.into())),
            ..Self::from_chunks(Vec::new())
        }
    }

    /// Block forever after the last chunk instead of reporting end of stream.
    #[must_use]
    pub fn stall_at_end(mut self) -> Self {
        self.stall_at_end = true;
        self
    }

    /// A handle on the counters, valid after the transport is moved.
    pub fn stats(&self) -> TransportStats {
        self.stats.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(
        &mut self,
        request: &SignedRequest,
    ) -> Result<Box<dyn ResponseBody>, StreamError> {
        self.stats.opens.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.stats.requests.lock() {
            requests.push(request.clone());
        }

        if let Some((status, body)) = &self.failure {
            return Err(ConnectionError::Status {
                status: *status,
                body: body.clone(),
            }
            .into());
        }

        Ok(Box::new(ScriptedBody {
            chunks: self.chunks.clone().into_iter().collect(),
            stall_at_end: self.stall_at_end,
            stats: self.stats.clone(),
        }))
    }

    async fn close(&mut self) {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
    }
}

struct ScriptedBody {
    chunks: std::collections::VecDeque<Bytes>,
    stall_at_end: bool,
    stats: TransportStats,
}

#[async_trait]
impl ResponseBody for ScriptedBody {
    async fn read(&mut self, max: usize) -> Result<Bytes, StreamError> {
        self.stats.reads.fetch_add(1, Ordering::SeqCst);
        match self.chunks.front_mut() {
            Some(chunk) => {
                let piece = chunk.split_to(max.max(1).min(chunk.len()));
                if chunk.is_empty() {
                    self.chunks.pop_front();
                }
                Ok(piece)
            }
            None if self.stall_at_end => std::future::pending().await,
            None => Ok(Bytes::new()),
        }
    }

    async fn release(self: Box<Self>) {
        self.stats.releases.fetch_add(1, Ordering::SeqCst);
    }
}
