//! Reassembly of `\r`-delimited JSON records from arbitrary byte chunks.
//!
//! The upstream sends one JSON object per record, each terminated by a
//! carriage return (usually followed by a newline that ends up as leading
//! whitespace of the next record). Network reads split that stream at
//! arbitrary points, including inside a multi-byte UTF-8 sequence, so bytes
//! are buffered raw and only decoded once a whole record is available.

use bytes::{Bytes, BytesMut};
use serde_json::Value;

use crate::error::DecodeError;

/// Record terminator.
pub const DELIMITER: u8 = b'\r';

/// Bytes received since the last complete record.
#[derive(Debug, Default)]
pub struct StreamBuffer {
    buf: BytesMut,
    /// Prefix of `buf` already known to contain no delimiter.
    scanned: usize,
}

impl StreamBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes from one read.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Split off the next complete record, without its delimiter.
    ///
    /// Bytes after the delimiter stay buffered as the start of the next
    /// record.
    pub fn next_record(&mut self) -> Option<Bytes> {
        match self.buf[self.scanned..].iter().position(|&b| b == DELIMITER) {
            Some(offset) => {
                let record = self.buf.split_to(self.scanned + offset).freeze();
                // Drop the delimiter itself.
                let _ = self.buf.split_to(1);
                self.scanned = 0;
                Some(record)
            }
            None => {
                self.scanned = self.buf.len();
                None
            }
        }
    }

    /// Take whatever is left once upstream has closed.
    pub fn take_remainder(&mut self) -> Option<Bytes> {
        self.scanned = 0;
        if self.buf.is_empty() {
            None
        } else {
            Some(self.buf.split().freeze())
        }
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Decode one complete record.
///
/// Whitespace-only records are keep-alives and yield `Ok(None)`.
pub fn decode_record(record: &[u8]) -> Result<Option<Value>, DecodeError> {
    let text = std::str::from_utf8(record)?;
    if text.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(text)?))
}
