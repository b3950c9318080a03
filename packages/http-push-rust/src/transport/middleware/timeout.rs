//! Timeout middleware for HTTP exchanges.
//!
//! Wraps `tower::timeout::Timeout` and maps its boxed errors back to
//! `TransportError`, so an elapsed exchange fails with `TransportError::Timeout`.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tower::timeout::error::Elapsed;
use tower::timeout::Timeout;
use tower::{BoxError, Layer, Service};

use crate::codec::WireRequest;
use crate::error::TransportError;
use crate::transport::WireResponse;

// ---------------------------------------------------------------------------
// TimeoutLayer
// ---------------------------------------------------------------------------

/// Tower layer that bounds every exchange by a fixed request timeout.
///
/// Only the exchange up to the response head is bounded; reading the entity
/// has its own timeout.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutLayer {
    timeout: Duration,
}

impl TimeoutLayer {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl<S> Layer<S> for TimeoutLayer {
    type Service = TimeoutService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimeoutService {
            inner: Timeout::new(inner, self.timeout),
            timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

// ---------------------------------------------------------------------------
// TimeoutService
// ---------------------------------------------------------------------------

/// `tower::timeout::Timeout` with `TransportError` as its error type.
#[derive(Debug, Clone)]
pub struct TimeoutService<S> {
    inner: Timeout<S>,
    timeout_ms: u64,
}

impl<S> Service<WireRequest> for TimeoutService<S>
where
    S: Service<WireRequest, Response = WireResponse, Error = TransportError> + Send,
    S::Future: Send + 'static,
{
    type Response = WireResponse;
    type Error = TransportError;
    type Future = Pin<Box<dyn Future<Output = Result<WireResponse, TransportError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        let timeout_ms = self.timeout_ms;
        self.inner
            .poll_ready(cx)
            .map_err(|e| to_transport_error(e, timeout_ms))
    }

    fn call(&mut self, request: WireRequest) -> Self::Future {
        let timeout_ms = self.timeout_ms;
        let fut = self.inner.call(request);
        Box::pin(async move { fut.await.map_err(|e| to_transport_error(e, timeout_ms)) })
    }
}

fn to_transport_error(error: BoxError, timeout_ms: u64) -> TransportError {
    match error.downcast::<TransportError>() {
        Ok(error) => *error,
        Err(error) if error.is::<Elapsed>() => TransportError::Timeout { timeout_ms },
        Err(error) => TransportError::Network(error.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::HeaderMap;
    use tower::ServiceExt;

    use super::*;

    /// Service that takes a configurable delay before responding.
    struct SlowService {
        delay_ms: u64,
    }

    impl Service<WireRequest> for SlowService {
        type Response = WireResponse;
        type Error = TransportError;
        type Future =
            Pin<Box<dyn Future<Output = Result<WireResponse, TransportError>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _request: WireRequest) -> Self::Future {
            let delay = self.delay_ms;
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(WireResponse::buffered(204, HeaderMap::new(), Bytes::new()))
            })
        }
    }

    fn make_request() -> WireRequest {
        http::Request::post("http://example.com/")
            .body(Bytes::new())
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn completes_within_timeout() {
        let svc = TimeoutLayer::new(Duration::from_secs(1)).layer(SlowService { delay_ms: 10 });
        let response = svc.oneshot(make_request()).await.unwrap();
        assert_eq!(response.status(), 204);
    }

    #[tokio::test(start_paused = true)]
    async fn exceeds_timeout_returns_error() {
        let svc = TimeoutLayer::new(Duration::from_millis(50)).layer(SlowService { delay_ms: 200 });
        let err = svc.oneshot(make_request()).await.unwrap_err();
        assert_eq!(err, TransportError::Timeout { timeout_ms: 50 });
    }

    #[tokio::test(start_paused = true)]
    async fn inner_errors_pass_through_unchanged() {
        let svc = TimeoutLayer::new(Duration::from_secs(1))
            .layer(tower::service_fn(|_request: WireRequest| async {
                Err::<WireResponse, _>(TransportError::Network("refused".to_string()))
            }));
        let err = svc.oneshot(make_request()).await.unwrap_err();
        assert_eq!(err, TransportError::Network("refused".to_string()));
    }
}
