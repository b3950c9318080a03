//! HTTP transport boundary: the execution capability and its responses.
//!
//! - [`client`]: default transport backed by `reqwest::Client`
//! - [`middleware`]: tower layers wrapped around every execution

pub mod client;
pub mod middleware;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bridge_core::{ContentType, Headers};
use bytes::{Bytes, BytesMut};
use http::header::CONTENT_TYPE;
use http::HeaderMap;

use crate::codec::WireRequest;
use crate::error::{BodyError, TransportError};

pub use client::ReqwestTransport;

// ---------------------------------------------------------------------------
// HttpTransport
// ---------------------------------------------------------------------------

/// Executes a single HTTP exchange.
///
/// Implementations yield as soon as status and headers are known; the body
/// stays unread until the response is interpreted.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// # Errors
    ///
    /// Returns `TransportError::Network` if the exchange fails before a response arrives.
    async fn execute(&self, request: WireRequest) -> Result<WireResponse, TransportError>;
}

// ---------------------------------------------------------------------------
// BodySource
// ---------------------------------------------------------------------------

/// Lazily produced response entity.
#[async_trait]
pub trait BodySource: Send {
    /// Next chunk of the entity, or `None` once it is exhausted.
    ///
    /// # Errors
    ///
    /// Returns `BodyError::Read` if the underlying stream fails.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, BodyError>;
}

/// An entity that is already in memory.
struct BufferedBody(Option<Bytes>);

#[async_trait]
impl BodySource for BufferedBody {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, BodyError> {
        Ok(self.0.take().filter(|bytes| !bytes.is_empty()))
    }
}

// ---------------------------------------------------------------------------
// WireResponse
// ---------------------------------------------------------------------------

/// Status, headers and lazy entity of an HTTP response.
///
/// The status is kept raw; validating it is the interpreter's job. The
/// entity's content type is held apart from the header map.
pub struct WireResponse {
    status: u16,
    headers: HeaderMap,
    content_type: ContentType,
    body: Box<dyn BodySource>,
}

impl WireResponse {
    /// Splits the `content-type` header off `headers`. A missing or unreadable
    /// content type means `application/octet-stream`.
    #[must_use]
    pub fn new(status: u16, mut headers: HeaderMap, body: Box<dyn BodySource>) -> Self {
        let content_type = headers
            .remove(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok().map(ContentType::parse))
            .unwrap_or_else(ContentType::application_octet_stream);
        Self {
            status,
            headers,
            content_type,
            body,
        }
    }

    /// A response whose entity is already in memory.
    #[must_use]
    pub fn buffered(status: u16, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self::new(status, headers, Box::new(BufferedBody(Some(body.into()))))
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Response headers, without `content-type`.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// Response headers as domain headers. Values that are not visible ASCII are skipped.
    #[must_use]
    pub fn domain_headers(&self) -> Headers {
        self.headers
            .iter()
            .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?)))
            .collect()
    }

    /// Reads the whole entity, failing once it exceeds `max_bytes` or takes longer than `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `BodyError::TooLarge`, `BodyError::Timeout`, or `BodyError::Read`.
    pub async fn read_limited(
        &mut self,
        max_bytes: usize,
        timeout: Duration,
    ) -> Result<Bytes, BodyError> {
        let body = &mut self.body;
        let read = async move {
            let mut buffer = BytesMut::new();
            while let Some(chunk) = body.next_chunk().await? {
                if buffer.len() + chunk.len() > max_bytes {
                    return Err(BodyError::TooLarge { limit: max_bytes });
                }
                buffer.extend_from_slice(&chunk);
            }
            Ok(buffer.freeze())
        };
        tokio::time::timeout(timeout, read)
            .await
            .map_err(|_elapsed| BodyError::Timeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })?
    }

    /// Drains the entity without keeping it, bounded by `timeout`.
    pub async fn discard(mut self, timeout: Duration) {
        let body = &mut self.body;
        let drain = async move { while let Ok(Some(_)) = body.next_chunk().await {} };
        let _ = tokio::time::timeout(timeout, drain).await;
    }
}

impl fmt::Debug for WireResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WireResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use http::HeaderValue;

    use super::*;

    /// Body that yields a fixed number of chunks, then never completes.
    struct ChunkedBody {
        chunks: Vec<Bytes>,
        stall: bool,
    }

    #[async_trait]
    impl BodySource for ChunkedBody {
        async fn next_chunk(&mut self) -> Result<Option<Bytes>, BodyError> {
            if self.chunks.is_empty() {
                if self.stall {
                    std::future::pending::<()>().await;
                }
                return Ok(None);
            }
            Ok(Some(self.chunks.remove(0)))
        }
    }

    fn headers_with_content_type(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(value));
        headers.insert("x-trace", HeaderValue::from_static("t-1"));
        headers
    }

    #[test]
    fn content_type_is_split_from_headers() {
        let response = WireResponse::buffered(200, headers_with_content_type("application/json"), "{}");
        assert_eq!(response.content_type().media_type(), "application/json");
        assert!(response.headers().get(CONTENT_TYPE).is_none());
        assert_eq!(response.domain_headers().get("x-trace"), Some("t-1"));
    }

    #[test]
    fn missing_content_type_defaults_to_octet_stream() {
        let response = WireResponse::buffered(200, HeaderMap::new(), "");
        assert!(response.content_type().is_binary());
    }

    #[tokio::test]
    async fn read_limited_collects_chunks() {
        let body = ChunkedBody {
            chunks: vec![Bytes::from_static(b"ab"), Bytes::from_static(b"cd")],
            stall: false,
        };
        let mut response = WireResponse::new(200, HeaderMap::new(), Box::new(body));
        let bytes = response.read_limited(4, Duration::from_secs(1)).await.unwrap();
        assert_eq!(bytes.as_ref(), b"abcd");
    }

    #[tokio::test]
    async fn read_limited_rejects_oversized_entity() {
        let mut response = WireResponse::buffered(200, HeaderMap::new(), "too long");
        let err = response.read_limited(3, Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err, BodyError::TooLarge { limit: 3 });
    }

    #[tokio::test(start_paused = true)]
    async fn read_limited_times_out_on_stalled_entity() {
        let body = ChunkedBody {
            chunks: vec![Bytes::from_static(b"ab")],
            stall: true,
        };
        let mut response = WireResponse::new(200, HeaderMap::new(), Box::new(body));
        let err = response
            .read_limited(1024, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert_eq!(err, BodyError::Timeout { timeout_ms: 50 });
    }
}
