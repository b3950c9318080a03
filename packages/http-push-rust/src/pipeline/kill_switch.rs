//! Cooperative shutdown of the transport pipeline.
//!
//! Uses `ArcSwap` for lock-free state transitions, a `watch` channel to
//! broadcast cancellation, and an atomic counter with RAII guards for
//! in-flight exchange tracking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::watch;

/// Pipeline state, transitioned by the kill switch and the termination observer.
///
/// State machine: Running -> ShuttingDown -> Terminated, or Running -> Terminated
/// when the pipeline ends on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Accepting and executing requests.
    Running,
    /// Kill switch triggered; remaining work resolves as closed.
    ShuttingDown,
    /// The pipeline task has ended.
    Terminated,
}

/// Single cancellation control shared by the publisher and every pipeline task.
///
/// Triggering is idempotent: only the first `shutdown()` has an effect.
#[derive(Debug)]
pub struct KillSwitch {
    signal: watch::Sender<bool>,
    in_flight: Arc<AtomicU64>,
    state: ArcSwap<PipelineState>,
}

impl KillSwitch {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            signal: tx,
            in_flight: Arc::new(AtomicU64::new(0)),
            state: ArcSwap::from_pointee(PipelineState::Running),
        }
    }

    /// Returns a receiver observed by pipeline tasks. See [`cancelled`].
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.signal.subscribe()
    }

    /// Triggers cancellation. Returns `false` if it was already triggered.
    pub fn shutdown(&self) -> bool {
        if self.signal.send_replace(true) {
            return false;
        }
        self.state.rcu(|state| match **state {
            PipelineState::Running => PipelineState::ShuttingDown,
            other => other,
        });
        true
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.signal.borrow()
    }

    /// Marks the pipeline task as ended.
    pub fn mark_terminated(&self) {
        self.state.store(Arc::new(PipelineState::Terminated));
    }

    #[must_use]
    pub fn state(&self) -> PipelineState {
        **self.state.load()
    }

    /// Creates an RAII guard that tracks an in-flight exchange.
    #[must_use]
    pub fn in_flight_guard(&self) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    /// Returns the current number of in-flight exchanges.
    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }
}

impl Default for KillSwitch {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once the kill switch is triggered or dropped.
pub async fn cancelled(rx: &mut watch::Receiver<bool>) {
    // A dropped switch counts as triggered
    let _ = rx.wait_for(|triggered| *triggered).await;
}

/// RAII guard that decrements the in-flight counter when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    in_flight: Arc<AtomicU64>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}
