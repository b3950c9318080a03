//! The HTTP publisher: admission, dispatch and lifecycle for one connection target.

use std::sync::Arc;

use bridge_core::{DittoProtocolAdapter, ProtocolAdapter};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::codec::{build_request, PushEndpoint};
use crate::config::PublisherConfig;
use crate::error::{PublishError, TOO_MANY_IN_FLIGHT_MESSAGE};
use crate::interpret::{CommandResponseValidator, ResponseInterpreter};
use crate::outbound::OutboundMessage;
use crate::pipeline::{
    DispatchContext, DispatchQueue, KillSwitch, OfferError, PendingSend, PipelineState,
    QueuedDispatch, StageExit, TransportStage,
};
use crate::signing::{NoOpSigning, RequestSigning};
use crate::supervision::{ConnectionFailure, FailureReporter};
use crate::transport::middleware::build_execute_stack;
use crate::transport::{HttpTransport, ReqwestTransport};

/// Cause reported once the transport stage has ended.
pub const STREAM_TERMINATED: &str = "HTTP publisher stream terminated";

/// Cause reported when the dispatch queue fails.
pub const QUEUE_FAILURE: &str = "Source queue failure";

// ---------------------------------------------------------------------------
// PublisherBuilder
// ---------------------------------------------------------------------------

/// Assembles an [`HttpPublisher`] from its collaborators.
///
/// Defaults: `ReqwestTransport`, `NoOpSigning`, `DittoProtocolAdapter`.
pub struct PublisherBuilder {
    config: PublisherConfig,
    endpoint: PushEndpoint,
    transport: Arc<dyn HttpTransport>,
    signer: Arc<dyn RequestSigning>,
    adapter: Arc<dyn ProtocolAdapter>,
}

impl PublisherBuilder {
    #[must_use]
    pub fn new(config: PublisherConfig, endpoint: PushEndpoint) -> Self {
        Self {
            config,
            endpoint,
            transport: Arc::new(ReqwestTransport::new()),
            signer: Arc::new(NoOpSigning),
            adapter: Arc::new(DittoProtocolAdapter::new()),
        }
    }

    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = transport;
        self
    }

    #[must_use]
    pub fn signer(mut self, signer: Arc<dyn RequestSigning>) -> Self {
        self.signer = signer;
        self
    }

    #[must_use]
    pub fn adapter(mut self, adapter: Arc<dyn ProtocolAdapter>) -> Self {
        self.adapter = adapter;
        self
    }

    /// Starts the transport stage and returns the publisher together with the
    /// receiver its owner watches for the single connection failure.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    #[must_use]
    pub fn start(self) -> (HttpPublisher, oneshot::Receiver<ConnectionFailure>) {
        let Self {
            config,
            endpoint,
            transport,
            signer,
            adapter,
        } = self;
        let connection_id = config.connection_id.clone();
        let (reporter, failures) = FailureReporter::channel(connection_id.clone());
        let reporter = Arc::new(reporter);
        let kill_switch = Arc::new(KillSwitch::new());
        let (queue, rx) = DispatchQueue::bounded(config.http_push.max_queue_size);

        let interpreter = Arc::new(ResponseInterpreter::new(
            connection_id.clone(),
            adapter,
            CommandResponseValidator::new(connection_id.clone()),
        ));
        let stage = TransportStage::new(
            connection_id.clone(),
            Arc::clone(&kill_switch),
            signer,
            build_execute_stack(transport, &config),
            interpreter,
            config.http_push.effective_parallelism(),
        );
        let handle = tokio::spawn(stage.run(rx));
        observe_termination(
            handle,
            Arc::clone(&kill_switch),
            Arc::clone(&reporter),
            origin_of(&connection_id),
        );

        info!(
            connection_id = %connection_id,
            endpoint = %crate::codec::strip_user_info(endpoint.uri()),
            max_queue_size = queue.capacity(),
            parallelism = config.http_push.effective_parallelism(),
            "HTTP publisher started"
        );

        let publisher = HttpPublisher {
            config,
            endpoint,
            queue,
            kill_switch,
            reporter,
        };
        (publisher, failures)
    }
}

// ---------------------------------------------------------------------------
// HttpPublisher
// ---------------------------------------------------------------------------

/// Publishes signals to one HTTP endpoint through a standing pipeline.
///
/// `publish` never blocks: it returns a [`PendingSend`] that resolves with the
/// interpreted response or with the reason the request was not delivered.
/// Dropping the publisher triggers its kill switch.
pub struct HttpPublisher {
    config: PublisherConfig,
    endpoint: PushEndpoint,
    queue: DispatchQueue,
    kill_switch: Arc<KillSwitch>,
    reporter: Arc<FailureReporter>,
}

impl HttpPublisher {
    /// Builds the request for `outbound` and enqueues it.
    ///
    /// A full queue rejects the request with a remediation hint. A failed queue
    /// is additionally escalated to the owner.
    pub fn publish(&self, outbound: OutboundMessage) -> PendingSend {
        let connection_id = self.connection_id();
        let correlation_id = outbound.correlation_id().map(str::to_string);

        if self.kill_switch.is_triggered() {
            return PendingSend::ready(Err(PublishError::closed()));
        }
        let request = match build_request(
            connection_id,
            &self.endpoint,
            &outbound.target,
            &outbound.message,
        ) {
            Ok(request) => request,
            Err(e) => {
                warn!(
                    connection_id,
                    correlation_id = correlation_id.as_deref().unwrap_or_default(),
                    error = %e,
                    "Failed to build HTTP request for target <{}>.",
                    outbound.target
                );
                return PendingSend::ready(Err(e.into()));
            }
        };

        let (context, pending) = DispatchContext::new(outbound, &request);
        match self.queue.offer(QueuedDispatch { request, context }) {
            Ok(()) => debug!(
                connection_id,
                correlation_id = correlation_id.as_deref().unwrap_or_default(),
                "HTTP request enqueued"
            ),
            Err(OfferError::Dropped(dispatch)) => {
                warn!(
                    connection_id,
                    correlation_id = correlation_id.as_deref().unwrap_or_default(),
                    "{TOO_MANY_IN_FLIGHT_MESSAGE}"
                );
                dispatch
                    .context
                    .complete(Err(PublishError::too_many_in_flight(correlation_id)));
            }
            Err(OfferError::Closed(dispatch)) => {
                let error = PublishError::QueueFault("dispatch queue is closed".to_string());
                if !self.kill_switch.is_triggered() {
                    self.reporter.report(ConnectionFailure::new(
                        origin_of(connection_id),
                        QUEUE_FAILURE,
                        Some(error.to_string()),
                    ));
                }
                dispatch.context.complete(Err(error));
            }
        }
        pending
    }

    /// Triggers the kill switch. Queued and running requests resolve as closed.
    ///
    /// Returns `false` if the publisher was already shut down.
    pub fn shutdown(&self) -> bool {
        let triggered = self.kill_switch.shutdown();
        if triggered {
            info!(connection_id = self.connection_id(), "HTTP publisher shutting down");
        }
        triggered
    }

    #[must_use]
    pub fn connection_id(&self) -> &str {
        &self.config.connection_id
    }

    #[must_use]
    pub fn endpoint(&self) -> &PushEndpoint {
        &self.endpoint
    }

    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.kill_switch.state()
    }

    /// Requests currently being executed or interpreted.
    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.kill_switch.in_flight_count()
    }

    /// Requests admitted but not yet picked up by the pipeline.
    #[must_use]
    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }
}

impl Drop for HttpPublisher {
    fn drop(&mut self) {
        self.kill_switch.shutdown();
    }
}

fn origin_of(connection_id: &str) -> String {
    format!("http-publisher:{connection_id}")
}

/// Reports the end of the transport stage to the owner, exactly once.
fn observe_termination(
    handle: JoinHandle<StageExit>,
    kill_switch: Arc<KillSwitch>,
    reporter: Arc<FailureReporter>,
    origin: String,
) {
    tokio::spawn(async move {
        let error = match handle.await {
            Ok(exit) => {
                debug!(origin = %origin, exit = ?exit, "HTTP publisher stage ended");
                None
            }
            Err(e) => Some(e.to_string()),
        };
        kill_switch.mark_terminated();
        reporter.report(ConnectionFailure::new(origin, STREAM_TERMINATED, error));
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use bridge_core::{ExternalMessage, GenericSignal, Headers, Signal};
    use http::HeaderMap;
    use proptest::prelude::*;
    use tokio::sync::Notify;

    use super::*;
    use crate::codec::{HttpPublishTarget, WireRequest};
    use crate::error::TransportError;
    use crate::transport::WireResponse;

    /// Transport that holds every request until released.
    struct GatedTransport {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl HttpTransport for GatedTransport {
        async fn execute(&self, _request: WireRequest) -> Result<WireResponse, TransportError> {
            self.gate.notified().await;
            Ok(WireResponse::buffered(204, HeaderMap::new(), ""))
        }
    }

    /// Transport that answers 204 after a fixed delay.
    struct DelayedTransport {
        delay: Duration,
    }

    #[async_trait]
    impl HttpTransport for DelayedTransport {
        async fn execute(&self, _request: WireRequest) -> Result<WireResponse, TransportError> {
            tokio::time::sleep(self.delay).await;
            Ok(WireResponse::buffered(204, HeaderMap::new(), ""))
        }
    }

    /// Signer that panics, taking the stage down with it.
    struct PanickingSigner;

    #[async_trait]
    impl RequestSigning for PanickingSigner {
        async fn sign(&self, _request: WireRequest) -> Result<WireRequest, TransportError> {
            panic!("signer bug")
        }
    }

    /// Signer that always fails.
    struct FailingSigner;

    #[async_trait]
    impl RequestSigning for FailingSigner {
        async fn sign(&self, _request: WireRequest) -> Result<WireRequest, TransportError> {
            Err(TransportError::Signing("no key".to_string()))
        }
    }

    fn outbound(tag: &str) -> OutboundMessage {
        let signal = Signal::Generic(GenericSignal {
            type_tag: tag.to_string(),
            entity_id: None,
            headers: Headers::new().with("correlation-id", tag),
            value: None,
        });
        OutboundMessage::new(
            signal,
            HttpPublishTarget::parse("POST:/events").unwrap(),
            ExternalMessage::text("payload"),
        )
    }

    fn builder(max_queue_size: usize) -> PublisherBuilder {
        let mut config = PublisherConfig::new("conn-1");
        config.http_push.max_queue_size = max_queue_size;
        PublisherBuilder::new(config, PushEndpoint::parse("http://localhost:1").unwrap())
    }

    #[tokio::test]
    async fn signing_failure_fails_only_that_request() {
        let (publisher, mut failures) = builder(4).signer(Arc::new(FailingSigner)).start();
        let err = publisher.publish(outbound("a")).await.unwrap_err();
        assert_eq!(err, PublishError::Transport(TransportError::Signing("no key".to_string())));
        assert_eq!(publisher.state(), PipelineState::Running);
        assert!(failures.try_recv().is_err());
    }

    #[tokio::test]
    async fn invalid_request_fails_immediately() {
        let (publisher, _failures) = builder(4).start();
        let mut message = outbound("a");
        message.message = message.message.with_header("http.path", "/with space");
        let err = publisher.publish(message).await.unwrap_err();
        assert!(matches!(err, PublishError::Codec(_)));
    }

    #[tokio::test]
    async fn shutdown_resolves_queued_and_running_requests() {
        let gate = Arc::new(Notify::new());
        let (publisher, failures) = builder(4)
            .transport(Arc::new(GatedTransport { gate: Arc::clone(&gate) }))
            .start();
        let pending: Vec<_> = (0..4).map(|i| publisher.publish(outbound(&i.to_string()))).collect();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(publisher.shutdown());
        assert!(!publisher.shutdown());
        for result in futures_results(pending).await {
            assert_eq!(result.unwrap_err(), PublishError::closed());
        }
        let failure = failures.await.unwrap();
        assert_eq!(failure.cause, STREAM_TERMINATED);
        assert_eq!(failure.origin, "http-publisher:conn-1");
        assert_eq!(publisher.state(), PipelineState::Terminated);
        assert_eq!(publisher.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn publish_after_shutdown_is_closed() {
        let (publisher, _failures) = builder(4).start();
        publisher.shutdown();
        let err = publisher.publish(outbound("late")).await.unwrap_err();
        assert_eq!(err, PublishError::closed());
    }

    #[tokio::test]
    async fn dropping_publisher_reports_termination() {
        let (publisher, failures) = builder(4).start();
        drop(publisher);
        let failure = tokio::time::timeout(Duration::from_secs(1), failures)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(failure.cause, STREAM_TERMINATED);
        assert!(failure.error.is_none());
    }

    #[tokio::test]
    async fn dead_stage_is_reported_then_queue_fault_escalates() {
        let (publisher, failures) = builder(4).signer(Arc::new(PanickingSigner)).start();

        let first = tokio::time::timeout(Duration::from_secs(1), publisher.publish(outbound("a")))
            .await
            .unwrap();
        assert_eq!(first.unwrap_err(), PublishError::closed());

        let failure = tokio::time::timeout(Duration::from_secs(1), failures)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(failure.cause, STREAM_TERMINATED);
        assert!(failure.error.as_deref().is_some_and(|e| e.contains("panicked")));
        assert_eq!(publisher.state(), PipelineState::Terminated);

        let second = publisher.publish(outbound("b")).await.unwrap_err();
        assert!(matches!(second, PublishError::QueueFault(_)));
        assert!(publisher.reporter.has_reported());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn every_publish_resolves_exactly_once_around_shutdown(
            max_queue_size in 1usize..8,
            parallelism in 1usize..4,
            publishes in 0usize..13,
            delay_ms in 0u64..30,
            shutdown_after_ms in 0u64..60,
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .start_paused(true)
                .build()
                .unwrap();
            runtime.block_on(async move {
                let mut config = PublisherConfig::new("conn-1");
                config.http_push.max_queue_size = max_queue_size;
                config.http_push.parallelism = parallelism;
                let (publisher, failures) =
                    PublisherBuilder::new(config, PushEndpoint::parse("http://localhost:1").unwrap())
                        .transport(Arc::new(DelayedTransport {
                            delay: Duration::from_millis(delay_ms),
                        }))
                        .start();

                let pending: Vec<_> = (0..publishes)
                    .map(|i| publisher.publish(outbound(&i.to_string())))
                    .collect();
                tokio::time::sleep(Duration::from_millis(shutdown_after_ms)).await;
                publisher.shutdown();

                let (mut delivered, mut rejected, mut closed) = (0usize, 0usize, 0usize);
                for send in pending {
                    let resolved = tokio::time::timeout(Duration::from_secs(5), send).await;
                    prop_assert!(resolved.is_ok(), "publish left unresolved after shutdown");
                    match resolved.unwrap() {
                        Ok(result) => {
                            prop_assert!(result.is_success());
                            delivered += 1;
                        }
                        Err(e) if e.is_rejected() => rejected += 1,
                        Err(e) => {
                            prop_assert_eq!(e, PublishError::closed());
                            closed += 1;
                        }
                    }
                }
                prop_assert_eq!(delivered + rejected + closed, publishes);
                prop_assert!(rejected <= publishes.saturating_sub(max_queue_size));

                let failure = tokio::time::timeout(Duration::from_secs(5), failures).await;
                prop_assert!(matches!(failure, Ok(Ok(ref f)) if f.cause == STREAM_TERMINATED));
                prop_assert_eq!(publisher.state(), PipelineState::Terminated);
                prop_assert_eq!(publisher.in_flight_count(), 0);
                Ok(())
            })?;
        }
    }

    async fn futures_results(pending: Vec<PendingSend>) -> Vec<crate::pipeline::PublishResult> {
        let mut results = Vec::with_capacity(pending.len());
        for send in pending {
            results.push(tokio::time::timeout(Duration::from_secs(1), send).await.unwrap());
        }
        results
    }
}
