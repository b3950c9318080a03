//! Pluggable request signing applied right before execution.

use async_trait::async_trait;

use crate::codec::WireRequest;
use crate::error::TransportError;

/// Transforms a built request before it is sent.
///
/// Implementations must keep method and body intact and may only add or alter
/// headers and URI components.
#[async_trait]
pub trait RequestSigning: Send + Sync {
    /// # Errors
    ///
    /// Returns `TransportError::Signing` if the request cannot be signed.
    async fn sign(&self, request: WireRequest) -> Result<WireRequest, TransportError>;
}

/// Passes requests through unchanged. Used when no credentials are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSigning;

#[async_trait]
impl RequestSigning for NoOpSigning {
    async fn sign(&self, request: WireRequest) -> Result<WireRequest, TransportError> {
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::Request;

    use super::*;

    #[tokio::test]
    async fn no_op_signing_preserves_request() {
        let request = Request::post("http://example.com/x")
            .header("x-a", "1")
            .body(Bytes::from_static(b"body"))
            .unwrap();
        let signed = NoOpSigning.sign(request).await.unwrap();
        assert_eq!(signed.method(), http::Method::POST);
        assert_eq!(signed.uri(), "http://example.com/x");
        assert_eq!(signed.headers()["x-a"], "1");
        assert_eq!(signed.body().as_ref(), b"body");
    }
}
