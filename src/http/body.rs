//! Replayable bodies.
//!
//! Request and response bodies are single-pass streams, but both the loggers
//! and the forwarding step need the full content. A body is drained once into
//! memory and every consumer is then handed its own `Body` over the same
//! `Bytes`.

use axum::body::{Body, Bytes};
use http_body_util::BodyExt;

/// Outcome of draining a body into memory.
#[derive(Debug, Clone, Default)]
pub struct BufferedBody {
    /// Every data byte read before the end of the stream (or the failure).
    pub bytes: Bytes,
    /// Set when the stream failed part-way; `bytes` then holds the prefix.
    pub error: Option<String>,
}

impl BufferedBody {
    /// A fresh, independently readable body over the buffered bytes.
    pub fn replay(&self) -> Body {
        Body::from(self.bytes.clone())
    }

    /// Body content rendered as text for the log channels.
    pub fn as_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

/// Read `body` to the end, keeping whatever arrived before an error.
///
/// Trailers are ignored.
pub async fn buffer_body<B>(mut body: B) -> BufferedBody
where
    B: hyper::body::Body<Data = Bytes> + Unpin,
    B::Error: std::fmt::Display,
{
    let mut collected = Vec::new();
    while let Some(frame) = body.frame().await {
        match frame {
            Ok(frame) => {
                if let Ok(data) = frame.into_data() {
                    collected.extend_from_slice(&data);
                }
            }
            Err(e) => {
                return BufferedBody {
                    bytes: Bytes::from(collected),
                    error: Some(e.to_string()),
                };
            }
        }
    }

    BufferedBody {
        bytes: Bytes::from(collected),
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[tokio::test]
    async fn test_buffer_full_body() {
        let buffered = buffer_body(Body::from("hello world")).await;
        assert_eq!(buffered.bytes, Bytes::from_static(b"hello world"));
        assert!(buffered.error.is_none());
        assert_eq!(buffered.as_text(), "hello world");
    }

    #[tokio::test]
    async fn test_replay_is_independent() {
        let buffered = buffer_body(Body::from("payload")).await;

        let first = axum::body::to_bytes(buffered.replay(), usize::MAX).await.unwrap();
        let second = axum::body::to_bytes(buffered.replay(), usize::MAX).await.unwrap();
        assert_eq!(first, "payload");
        assert_eq!(second, "payload");
    }

    #[tokio::test]
    async fn test_partial_body_on_error() {
        let chunks: Vec<Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from_static(b"abc")),
            Ok(Bytes::from_static(b"def")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer reset")),
        ];
        let body = Body::from_stream(futures_util::stream::iter(chunks));

        let buffered = buffer_body(body).await;
        assert_eq!(buffered.bytes, Bytes::from_static(b"abcdef"));
        assert!(buffered.error.unwrap().contains("peer reset"));
    }

    #[tokio::test]
    async fn test_empty_body() {
        let buffered = buffer_body(Body::empty()).await;
        assert!(buffered.bytes.is_empty());
        assert!(buffered.error.is_none());
    }
}
