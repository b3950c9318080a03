//! Execution stack composition: wraps a transport with the middleware layers.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::{Service, ServiceBuilder};

use super::timeout::{TimeoutLayer, TimeoutService};
use super::timer::{RequestTimerLayer, RequestTimerService};
use crate::codec::WireRequest;
use crate::config::PublisherConfig;
use crate::error::TransportError;
use crate::transport::{HttpTransport, WireResponse};

/// The composed stack every signed request is executed through.
pub type ExecuteStack = RequestTimerService<TimeoutService<TransportService>>;

// ---------------------------------------------------------------------------
// TransportService
// ---------------------------------------------------------------------------

/// Adapts an [`HttpTransport`] to a tower service.
#[derive(Clone)]
pub struct TransportService {
    transport: Arc<dyn HttpTransport>,
}

impl TransportService {
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

impl std::fmt::Debug for TransportService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportService").finish_non_exhaustive()
    }
}

impl Service<WireRequest> for TransportService {
    type Response = WireResponse;
    type Error = TransportError;
    type Future = Pin<Box<dyn Future<Output = Result<WireResponse, TransportError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: WireRequest) -> Self::Future {
        let transport = Arc::clone(&self.transport);
        Box::pin(async move { transport.execute(request).await })
    }
}

/// Build the execution stack around `transport`.
///
/// Layer order (outermost to innermost):
/// 1. `RequestTimerLayer` -- measure the exchange, timeouts included
/// 2. `TimeoutLayer` -- enforce the request timeout
///
/// Concurrency is bounded by the pipeline stage, not by the stack.
#[must_use]
pub fn build_execute_stack(
    transport: Arc<dyn HttpTransport>,
    config: &PublisherConfig,
) -> ExecuteStack {
    ServiceBuilder::new()
        .layer(RequestTimerLayer::new(
            config.connection_id.clone(),
            config.http_push.timer_max_duration(),
        ))
        .layer(TimeoutLayer::new(config.http_push.request_timeout))
        .service(TransportService::new(transport))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
