//! The standing transport stage: queue -> sign -> execute -> interpret -> complete.

use std::sync::Arc;

use tokio::sync::{mpsc, watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tower::ServiceExt;
use tracing::{debug, error, info, warn};

use super::context::{DispatchContext, PublishResult};
use super::kill_switch::{cancelled, KillSwitch};
use super::queue::QueuedDispatch;
use crate::codec::WireRequest;
use crate::error::PublishError;
use crate::interpret::ResponseInterpreter;
use crate::signing::RequestSigning;
use crate::transport::middleware::ExecuteStack;

/// Why the stage loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageExit {
    /// Every producer of the queue went away.
    QueueClosed,
    /// The kill switch was triggered.
    Cancelled,
}

/// Consumes the dispatch queue with bounded parallelism.
///
/// Signing runs one dispatch at a time in queue order, so each request stays
/// paired with its context. Execution and interpretation run as separate tasks,
/// at most `parallelism` at once; completion order is not preserved.
pub struct TransportStage {
    connection_id: String,
    kill_switch: Arc<KillSwitch>,
    signer: Arc<dyn RequestSigning>,
    stack: ExecuteStack,
    interpreter: Arc<ResponseInterpreter>,
    permits: Arc<Semaphore>,
}

impl TransportStage {
    #[must_use]
    pub fn new(
        connection_id: impl Into<String>,
        kill_switch: Arc<KillSwitch>,
        signer: Arc<dyn RequestSigning>,
        stack: ExecuteStack,
        interpreter: Arc<ResponseInterpreter>,
        parallelism: usize,
    ) -> Self {
        Self {
            connection_id: connection_id.into(),
            kill_switch,
            signer,
            stack,
            interpreter,
            permits: Arc::new(Semaphore::new(parallelism.max(1))),
        }
    }

    /// Runs until the kill switch is triggered or the queue closes.
    ///
    /// On exit, dispatches still queued resolve as closed and running exchanges
    /// are awaited (they resolve as closed too once cancelled).
    pub async fn run(self, mut rx: mpsc::Receiver<QueuedDispatch>) -> StageExit {
        let mut cancel = self.kill_switch.subscribe();
        let mut in_flight = JoinSet::new();

        let exit = loop {
            let next = tokio::select! {
                biased;
                () = cancelled(&mut cancel) => break StageExit::Cancelled,
                Some(joined) = in_flight.join_next() => {
                    self.reap(joined);
                    continue;
                }
                next = next_dispatch(&self.permits, &mut rx) => next,
            };
            let Some((permit, QueuedDispatch { request, context })) = next else {
                break StageExit::QueueClosed;
            };

            let signed = tokio::select! {
                biased;
                () = cancelled(&mut cancel) => {
                    context.complete(Err(PublishError::closed()));
                    break StageExit::Cancelled;
                }
                signed = self.signer.sign(request) => signed,
            };
            match signed {
                Ok(request) => {
                    in_flight.spawn(self.exchange(request, context, permit, cancel.clone()));
                }
                Err(e) => {
                    warn!(
                        connection_id = %self.connection_id,
                        correlation_id = context.correlation_id().unwrap_or_default(),
                        error = %e,
                        "Failed to sign HTTP request to <{}>.",
                        context.request.uri
                    );
                    context.complete(Err(e.into()));
                }
            }
        };

        rx.close();
        let mut abandoned = 0usize;
        while let Some(QueuedDispatch { context, .. }) = rx.recv().await {
            context.complete(Err(PublishError::closed()));
            abandoned += 1;
        }
        while let Some(joined) = in_flight.join_next().await {
            self.reap(joined);
        }
        info!(
            connection_id = %self.connection_id,
            exit = ?exit,
            abandoned,
            "HTTP publisher stage stopped"
        );
        exit
    }

    /// Executes one signed request and resolves its context, unless cancelled first.
    fn exchange(
        &self,
        request: WireRequest,
        context: DispatchContext,
        permit: OwnedSemaphorePermit,
        mut cancel: watch::Receiver<bool>,
    ) -> impl std::future::Future<Output = ()> + Send + 'static {
        let stack = self.stack.clone();
        let interpreter = Arc::clone(&self.interpreter);
        let guard = self.kill_switch.in_flight_guard();
        let connection_id = self.connection_id.clone();

        async move {
            let _permit = permit;
            let _guard = guard;
            let result = tokio::select! {
                biased;
                () = cancelled(&mut cancel) => Err(PublishError::closed()),
                result = execute_and_interpret(&connection_id, stack, &interpreter, request, &context) => result,
            };
            if let Err(e) = &result {
                log_failure(&connection_id, &context, e);
            }
            context.complete(result);
        }
    }

    fn reap(&self, joined: Result<(), JoinError>) {
        if let Err(e) = joined {
            // The panicking task's context resolved as closed while unwinding
            error!(
                connection_id = %self.connection_id,
                error = %e,
                "HTTP exchange task failed"
            );
        }
    }
}

/// Waits for an execution slot, then for the next dispatch. Cancel safe.
async fn next_dispatch(
    permits: &Arc<Semaphore>,
    rx: &mut mpsc::Receiver<QueuedDispatch>,
) -> Option<(OwnedSemaphorePermit, QueuedDispatch)> {
    let permit = Arc::clone(permits).acquire_owned().await.ok()?;
    let dispatch = rx.recv().await?;
    Some((permit, dispatch))
}

async fn execute_and_interpret(
    connection_id: &str,
    stack: ExecuteStack,
    interpreter: &ResponseInterpreter,
    request: WireRequest,
    context: &DispatchContext,
) -> PublishResult {
    let response = stack.oneshot(request).await?;
    info!(
        connection_id,
        correlation_id = context.correlation_id().unwrap_or_default(),
        "Got response status <{}>",
        response.status()
    );
    interpreter
        .interpret(
            &context.signal,
            context.auto_ack_target.as_ref(),
            response,
            context.max_total_message_size,
            context.ack_size_quota,
        )
        .await
}

fn log_failure(connection_id: &str, context: &DispatchContext, error: &PublishError) {
    let correlation_id = context.correlation_id().unwrap_or_default();
    if tracing::enabled!(tracing::Level::DEBUG) {
        debug!(
            connection_id,
            correlation_id,
            "Failed to send message <{:?}> to <{} {}> due to <{error}>",
            context.message,
            context.request.method,
            context.request.uri
        );
    } else {
        info!(
            connection_id,
            correlation_id,
            "Failed to send message to <{} {}> due to <{error}>",
            context.request.method,
            context.request.uri
        );
    }
}
