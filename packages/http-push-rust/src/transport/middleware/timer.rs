//! Request-duration measurement for HTTP exchanges.
//!
//! Records `http_publish_request_time` (seconds, label `id`) through the
//! `metrics` facade and wraps each exchange in a `tracing` span.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use tower::{Layer, Service};
use tracing::{debug, debug_span, Instrument};

use crate::codec::{strip_user_info, WireRequest};
use crate::error::TransportError;
use crate::transport::WireResponse;

/// Name of the request-duration histogram.
pub const REQUEST_TIME_METRIC: &str = "http_publish_request_time";

// ---------------------------------------------------------------------------
// RequestTimerLayer
// ---------------------------------------------------------------------------

/// Tower layer that measures each exchange, clamping the measurement to `max_duration`.
#[derive(Debug, Clone)]
pub struct RequestTimerLayer {
    connection_id: String,
    max_duration: Duration,
}

impl RequestTimerLayer {
    #[must_use]
    pub fn new(connection_id: impl Into<String>, max_duration: Duration) -> Self {
        Self {
            connection_id: connection_id.into(),
            max_duration,
        }
    }
}

impl<S> Layer<S> for RequestTimerLayer {
    type Service = RequestTimerService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestTimerService {
            inner,
            connection_id: self.connection_id.clone(),
            max_duration: self.max_duration,
        }
    }
}

// ---------------------------------------------------------------------------
// RequestTimerService
// ---------------------------------------------------------------------------

/// Service wrapper that records request duration and outcome.
#[derive(Debug, Clone)]
pub struct RequestTimerService<S> {
    inner: S,
    connection_id: String,
    max_duration: Duration,
}

impl<S> Service<WireRequest> for RequestTimerService<S>
where
    S: Service<WireRequest, Response = WireResponse, Error = TransportError> + Send,
    S::Future: Send + 'static,
{
    type Response = WireResponse;
    type Error = TransportError;
    type Future = Pin<Box<dyn Future<Output = Result<WireResponse, TransportError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: WireRequest) -> Self::Future {
        let span = debug_span!(
            "http_request",
            connection_id = %self.connection_id,
            method = %request.method(),
            uri = %strip_user_info(request.uri()),
            status = tracing::field::Empty,
        );
        let connection_id = self.connection_id.clone();
        let max_duration = self.max_duration;
        let fut = self.inner.call(request);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;
                let elapsed = start.elapsed().min(max_duration);

                if let Ok(response) = &result {
                    tracing::Span::current().record("status", response.status());
                }
                metrics::histogram!(REQUEST_TIME_METRIC, "id" => connection_id.clone())
                    .record(elapsed.as_secs_f64());
                debug!(
                    connection_id = %connection_id,
                    "HTTP request took {} ms.",
                    elapsed.as_millis()
                );

                result
            }
            .instrument(span),
        )
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

    /// Immediately-completing service for timer testing.
    struct ImmediateService {
        fail: bool,
    }

    impl Service<WireRequest> for ImmediateService {
        type Response = WireResponse;
        type Error = TransportError;
        type Future =
            Pin<Box<dyn Future<Output = Result<WireResponse, TransportError>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _request: WireRequest) -> Self::Future {
            let fail = self.fail;
            Box::pin(async move {
                if fail {
                    Err(TransportError::Network("refused".to_string()))
                } else {
                    Ok(WireResponse::buffered(200, HeaderMap::new(), "ok"))
                }
            })
        }
    }

    fn make_request() -> WireRequest {
        http::Request::get("http://user:pw@example.com/x")
            .body(Bytes::new())
            .unwrap()
    }

    #[tokio::test]
    async fn timer_passes_through_response() {
        let layer = RequestTimerLayer::new("conn-1", Duration::from_secs(65));
        let response = layer
            .layer(ImmediateService { fail: false })
            .oneshot(make_request())
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn timer_passes_through_failure() {
        let layer = RequestTimerLayer::new("conn-1", Duration::from_secs(65));
        let err = layer
            .layer(ImmediateService { fail: true })
            .oneshot(make_request())
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Network("refused".to_string()));
    }
}
