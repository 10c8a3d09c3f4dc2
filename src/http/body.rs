//! Replayable body capture.
//!
//! # Responsibilities
//! - Drain a live HTTP body into memory exactly once
//! - Enforce a size limit while draining
//! - Hand out independent cursors over the captured bytes
//!
//! # Design Decisions
//! - The buffer is an immutable `Bytes`; clones share it without copying
//! - Each consumer owns its own cursor, there is no shared read position
//! - An oversized body is an error, never a truncated capture

use std::io;

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body as HttpBody, Bytes};

/// Error raised while draining a body.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The body exceeded the configured size limit.
    #[error("body exceeds limit of {limit} bytes")]
    TooLarge { limit: usize },

    /// The underlying stream failed before the body was complete.
    #[error("failed to read body: {0}")]
    Read(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A body read once from the wire and replayable any number of times.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedBody {
    bytes: Bytes,
}

impl CapturedBody {
    /// Drain `body` fully, failing if it is longer than `limit` bytes.
    pub async fn capture<B>(body: B, limit: usize) -> Result<Self, CaptureError>
    where
        B: HttpBody,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        match Limited::new(body, limit).collect().await {
            Ok(collected) => Ok(Self {
                bytes: collected.to_bytes(),
            }),
            Err(e) if e.is::<LengthLimitError>() => Err(CaptureError::TooLarge { limit }),
            Err(e) => Err(CaptureError::Read(e)),
        }
    }

    /// Number of captured bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// A new cursor positioned at the start of the buffer.
    pub fn cursor(&self) -> BodyCursor {
        BodyCursor {
            bytes: self.bytes.clone(),
            position: 0,
        }
    }

    /// Shared handle to the captured bytes.
    pub fn bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    /// A fresh outbound body carrying the captured bytes.
    pub fn to_body(&self) -> axum::body::Body {
        axum::body::Body::from(self.bytes.clone())
    }

    /// Lossy UTF-8 rendering, used for mismatch payload snapshots.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

impl From<Bytes> for CapturedBody {
    fn from(bytes: Bytes) -> Self {
        Self { bytes }
    }
}

impl From<&'static str> for CapturedBody {
    fn from(s: &'static str) -> Self {
        Self {
            bytes: Bytes::from_static(s.as_bytes()),
        }
    }
}

impl From<Vec<u8>> for CapturedBody {
    fn from(v: Vec<u8>) -> Self {
        Self { bytes: Bytes::from(v) }
    }
}

/// Read position over a [`CapturedBody`].
///
/// Cursors never observe each other: reading or resetting one leaves every
/// other cursor over the same buffer where it was.
#[derive(Debug, Clone)]
pub struct BodyCursor {
    bytes: Bytes,
    position: usize,
}

impl BodyCursor {
    /// Move back to the first byte.
    pub fn reset(&mut self) {
        self.position = 0;
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes not yet consumed by this cursor.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    /// Consume everything from the current position to the end.
    pub fn read_remaining(&mut self) -> Bytes {
        let rest = self.bytes.slice(self.position..);
        self.position = self.bytes.len();
        rest
    }
}

impl io::Read for BodyCursor {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.remaining());
        buf[..n].copy_from_slice(&self.bytes[self.position..self.position + n]);
        self.position += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;
    use std::io::Read;

    #[tokio::test]
    async fn capture_reads_whole_body() {
        let body = Full::new(Bytes::from_static(b"hello world"));
        let captured = CapturedBody::capture(body, 1024).await.unwrap();
        assert_eq!(captured.len(), 11);
        assert_eq!(captured.bytes(), Bytes::from_static(b"hello world"));
    }

    #[tokio::test]
    async fn capture_rejects_oversized_body() {
        let body = Full::new(Bytes::from_static(b"0123456789"));
        let err = CapturedBody::capture(body, 4).await.unwrap_err();
        assert!(matches!(err, CaptureError::TooLarge { limit: 4 }));
    }

    #[tokio::test]
    async fn empty_body_is_captured() {
        let captured = CapturedBody::capture(Full::new(Bytes::new()), 16).await.unwrap();
        assert!(captured.is_empty());
        assert!(captured.cursor().read_remaining().is_empty());
    }

    #[test]
    fn reset_replays_same_bytes() {
        let captured = CapturedBody::from("replay me");
        let mut cursor = captured.cursor();

        let mut first = Vec::new();
        cursor.read_to_end(&mut first).unwrap();
        assert_eq!(cursor.remaining(), 0);

        cursor.reset();
        let mut second = Vec::new();
        cursor.read_to_end(&mut second).unwrap();

        assert_eq!(first, b"replay me");
        assert_eq!(first, second);
    }

    #[test]
    fn cursors_are_independent() {
        let captured = CapturedBody::from("abcdef");
        let mut primary = captured.cursor();
        let mut shadow = captured.cursor();

        let mut buf = [0u8; 4];
        primary.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"abcd");
        assert_eq!(primary.position(), 4);
        assert_eq!(shadow.position(), 0);

        assert_eq!(shadow.read_remaining(), Bytes::from_static(b"abcdef"));
        assert_eq!(primary.read_remaining(), Bytes::from_static(b"ef"));

        primary.reset();
        assert_eq!(primary.position(), 0);
        assert_eq!(shadow.remaining(), 0);
    }
}
