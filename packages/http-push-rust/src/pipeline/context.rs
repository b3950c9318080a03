//! Correlation between a queued request and the caller waiting for its result.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use bridge_core::{ExternalMessage, Signal};
use http::Method;
use tokio::sync::oneshot;

use crate::codec::{strip_user_info, WireRequest};
use crate::error::PublishError;
use crate::interpret::SendResult;
use crate::outbound::{AutoAckTarget, OutboundMessage};

/// Outcome delivered to a publish caller.
pub type PublishResult = Result<SendResult, PublishError>;

/// Method and credential-free URI of a request, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSummary {
    pub method: Method,
    pub uri: String,
}

impl RequestSummary {
    #[must_use]
    pub fn of(request: &WireRequest) -> Self {
        Self {
            method: request.method().clone(),
            uri: strip_user_info(request.uri()),
        }
    }
}

/// Everything the response handler needs, plus the caller's promise.
///
/// Exactly one context exists per queued request. `complete` consumes it, so
/// the promise resolves at most once; dropping an unresolved context resolves
/// it with `TransportError::Closed`, so it never stays pending.
#[derive(Debug)]
pub struct DispatchContext {
    pub signal: Signal,
    pub auto_ack_target: Option<AutoAckTarget>,
    pub request: RequestSummary,
    pub message: ExternalMessage,
    pub max_total_message_size: usize,
    pub ack_size_quota: usize,
    promise: Option<oneshot::Sender<PublishResult>>,
}

impl DispatchContext {
    /// Creates the context for `outbound` and the future its caller awaits.
    #[must_use]
    pub fn new(outbound: OutboundMessage, request: &WireRequest) -> (Self, PendingSend) {
        let (tx, rx) = oneshot::channel();
        let context = Self {
            signal: outbound.signal,
            auto_ack_target: outbound.auto_ack_target,
            request: RequestSummary::of(request),
            message: outbound.message,
            max_total_message_size: outbound.max_total_message_size,
            ack_size_quota: outbound.ack_size_quota,
            promise: Some(tx),
        };
        (context, PendingSend { rx })
    }

    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        self.message
            .correlation_id()
            .or_else(|| self.signal.headers().correlation_id())
    }

    /// Resolves the caller's promise.
    pub fn complete(mut self, result: PublishResult) {
        if let Some(promise) = self.promise.take() {
            // Caller may have stopped waiting
            let _ = promise.send(result);
        }
    }
}

impl Drop for DispatchContext {
    fn drop(&mut self) {
        if let Some(promise) = self.promise.take() {
            let _ = promise.send(Err(PublishError::closed()));
        }
    }
}

/// Future of a publish call's result.
///
/// Resolves with `TransportError::Closed` if the publisher goes away first.
#[derive(Debug)]
#[must_use = "the publish result is only observable through this future"]
pub struct PendingSend {
    rx: oneshot::Receiver<PublishResult>,
}

impl PendingSend {
    /// A result that is known before anything was queued.
    pub fn ready(result: PublishResult) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self { rx }
    }
}

impl Future for PendingSend {
    type Output = PublishResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(PublishError::closed())))
    }
}

#[cfg(test)]
mod tests {
    use bridge_core::{GenericSignal, Headers};
    use bytes::Bytes;

    use super::*;
    use crate::codec::HttpPublishTarget;

    fn outbound() -> OutboundMessage {
        let signal = Signal::Generic(GenericSignal {
            type_tag: "test".to_string(),
            entity_id: None,
            headers: Headers::new().with("correlation-id", "sig-1"),
            value: None,
        });
        OutboundMessage::new(
            signal,
            HttpPublishTarget::parse("POST:/x").unwrap(),
            ExternalMessage::text("hi"),
        )
    }

    fn request() -> WireRequest {
        http::Request::post("http://user:pw@example.com/x")
            .body(Bytes::new())
            .unwrap()
    }

    #[tokio::test]
    async fn complete_resolves_pending_send() {
        let (context, pending) = DispatchContext::new(outbound(), &request());
        assert_eq!(context.request.uri, "http://example.com/x");
        assert_eq!(context.correlation_id(), Some("sig-1"));
        context.complete(Err(PublishError::UnknownStatus { code: 42 }));
        assert_eq!(pending.await.unwrap_err(), PublishError::UnknownStatus { code: 42 });
    }

    #[test]
    fn correlation_id_prefers_internal_headers() {
        let mut outbound = outbound();
        outbound.message = ExternalMessage::text("hi").with_internal_header("correlation-id", "int-1");
        let (context, _pending) = DispatchContext::new(outbound, &request());
        assert_eq!(context.correlation_id(), Some("int-1"));
    }

    #[tokio::test]
    async fn dropped_context_resolves_as_closed() {
        let (context, pending) = DispatchContext::new(outbound(), &request());
        drop(context);
        assert_eq!(pending.await.unwrap_err(), PublishError::closed());
    }

    #[tokio::test]
    async fn ready_resolves_immediately() {
        let pending = PendingSend::ready(Err(PublishError::too_many_in_flight(None)));
        assert!(pending.await.unwrap_err().is_rejected());
    }
}
