//! Bounded dispatch queue with drop-new admission control.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::context::DispatchContext;
use crate::codec::WireRequest;

/// A built request paired with its correlation context.
#[derive(Debug)]
pub struct QueuedDispatch {
    pub request: WireRequest,
    pub context: DispatchContext,
}

/// Why an offer was not admitted. The rejected dispatch is handed back.
#[derive(Debug)]
pub enum OfferError {
    /// The queue is at capacity; the newest offer is dropped.
    Dropped(QueuedDispatch),
    /// The consuming pipeline is gone.
    Closed(QueuedDispatch),
}

/// Producer side of the queue feeding the transport pipeline.
///
/// Offers never wait: a full queue rejects immediately and leaves the items
/// already queued untouched. Capacity is fixed at construction.
#[derive(Debug, Clone)]
pub struct DispatchQueue {
    tx: mpsc::Sender<QueuedDispatch>,
    capacity: usize,
}

impl DispatchQueue {
    /// Creates a queue holding at most `capacity` (at least 1) dispatches, and its consumer end.
    #[must_use]
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<QueuedDispatch>) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx, capacity }, rx)
    }

    /// Attempts to enqueue without waiting.
    ///
    /// # Errors
    ///
    /// Returns `OfferError::Dropped` if the queue is full and
    /// `OfferError::Closed` if the consumer has gone away.
    pub fn offer(&self, dispatch: QueuedDispatch) -> Result<(), OfferError> {
        self.tx.try_send(dispatch).map_err(|e| match e {
            TrySendError::Full(dispatch) => OfferError::Dropped(dispatch),
            TrySendError::Closed(dispatch) => OfferError::Closed(dispatch),
        })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of dispatches waiting to be picked up.
    #[must_use]
    pub fn len(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use bridge_core::{ExternalMessage, GenericSignal, Headers, Signal};
    use bytes::Bytes;
    use proptest::prelude::*;

    use super::*;
    use crate::codec::HttpPublishTarget;
    use crate::outbound::OutboundMessage;

    fn dispatch(tag: usize) -> QueuedDispatch {
        let signal = Signal::Generic(GenericSignal {
            type_tag: tag.to_string(),
            entity_id: None,
            headers: Headers::new(),
            value: None,
        });
        let outbound = OutboundMessage::new(
            signal,
            HttpPublishTarget::parse("POST:/x").unwrap(),
            ExternalMessage::text("x"),
        );
        let request = http::Request::post("http://example.com/x")
            .body(Bytes::new())
            .unwrap();
        let (context, _pending) = DispatchContext::new(outbound, &request);
        QueuedDispatch { request, context }
    }

    fn tag_of(dispatch: &QueuedDispatch) -> String {
        dispatch.context.signal.type_tag()
    }

    #[test]
    fn full_queue_drops_newest() {
        let (queue, mut rx) = DispatchQueue::bounded(2);
        queue.offer(dispatch(0)).unwrap();
        queue.offer(dispatch(1)).unwrap();
        assert_eq!(queue.len(), 2);

        let Err(OfferError::Dropped(rejected)) = queue.offer(dispatch(2)) else {
            panic!("third offer must be dropped");
        };
        assert_eq!(tag_of(&rejected), "2");
        assert_eq!(tag_of(&rx.try_recv().unwrap()), "0");
        assert_eq!(tag_of(&rx.try_recv().unwrap()), "1");
    }

    #[test]
    fn closed_consumer_is_reported() {
        let (queue, rx) = DispatchQueue::bounded(1);
        drop(rx);
        assert!(queue.is_closed());
        assert!(matches!(queue.offer(dispatch(0)), Err(OfferError::Closed(_))));
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let (queue, _rx) = DispatchQueue::bounded(0);
        assert_eq!(queue.capacity(), 1);
        assert!(queue.is_empty());
    }

    proptest! {
        #[test]
        fn admitted_offers_keep_submission_order(capacity in 1usize..16, offers in 0usize..32) {
            let (queue, mut rx) = DispatchQueue::bounded(capacity);
            let mut admitted = Vec::new();
            for tag in 0..offers {
                match queue.offer(dispatch(tag)) {
                    Ok(()) => admitted.push(tag.to_string()),
                    Err(OfferError::Dropped(_)) => prop_assert!(admitted.len() == capacity),
                    Err(OfferError::Closed(_)) => prop_assert!(false, "consumer is alive"),
                }
            }
            prop_assert_eq!(admitted.len(), offers.min(capacity));
            let mut received = Vec::new();
            while let Ok(dispatch) = rx.try_recv() {
                received.push(tag_of(&dispatch));
            }
            prop_assert_eq!(received, admitted);
        }
    }
}
