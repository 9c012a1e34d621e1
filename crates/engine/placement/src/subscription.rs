//! Cancellable tracking subscriptions
//!
//! The surface detector delivers hit results from its own execution context.
//! It never touches an object directly: it gets a [`DeliverySink`] that pushes
//! tagged [`Delivery`] values into the tracker's queue, and the tracker applies
//! them on the render context during [`PoseTracker::pump`].
//!
//! Every subscription carries the object's [`Generation`] at the time it was
//! opened. Starting a new subscription bumps the generation, so anything the
//! old one left in flight is recognised as stale and discarded.
//!
//! [`PoseTracker::pump`]: crate::PoseTracker::pump

use crate::command::PoseCommand;
use crate::object::ObjectId;
use crate::query::HitResult;
use crate::service::ServiceSubscription;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Monotonic per-object subscription counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Identifies one live subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    pub object: ObjectId,
    pub generation: Generation,
}

/// One batch of results from a tracking subscription
#[derive(Debug, Clone)]
pub struct Delivery {
    pub object: ObjectId,
    pub generation: Generation,
    pub results: Vec<HitResult>,
}

/// Everything that crosses into the render context
#[derive(Debug)]
pub(crate) enum Message {
    Delivery(Delivery),
    Command(PoseCommand),
}

/// Producer side of a subscription, handed to the surface detector
#[derive(Clone)]
pub struct DeliverySink {
    id: SubscriptionId,
    cancelled: Arc<AtomicBool>,
    tx: UnboundedSender<Message>,
}

impl DeliverySink {
    pub(crate) fn new(
        id: SubscriptionId,
        cancelled: Arc<AtomicBool>,
        tx: UnboundedSender<Message>,
    ) -> Self {
        Self { id, cancelled, tx }
    }

    pub fn subscription(&self) -> SubscriptionId {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Queue a batch of results for the render context
    ///
    /// Returns `false` if the subscription was cancelled or the tracker is gone;
    /// the results are dropped in that case.
    pub fn push(&self, results: Vec<HitResult>) -> bool {
        if self.is_cancelled() {
            return false;
        }

        self.tx
            .send(Message::Delivery(Delivery {
                object: self.id.object,
                generation: self.id.generation,
                results,
            }))
            .is_ok()
    }
}

impl fmt::Debug for DeliverySink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliverySink")
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Owner side of a subscription
///
/// Cancelling (or dropping) the handle stops the sink from queueing anything
/// further and releases the detector's own subscription.
pub struct TrackingHandle {
    id: SubscriptionId,
    cancelled: Arc<AtomicBool>,
    service: Option<Box<dyn ServiceSubscription>>,
}

impl TrackingHandle {
    pub(crate) fn new(
        id: SubscriptionId,
        cancelled: Arc<AtomicBool>,
        service: Box<dyn ServiceSubscription>,
    ) -> Self {
        Self {
            id,
            cancelled,
            service: Some(service),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Cancel the subscription; calling it again is a no-op
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(mut service) = self.service.take() {
            service.cancel();
        }
    }
}

impl Drop for TrackingHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for TrackingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackingHandle")
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::mpsc::unbounded_channel;

    struct CountingSubscription(Arc<AtomicUsize>);

    impl ServiceSubscription for CountingSubscription {
        fn cancel(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn id() -> SubscriptionId {
        SubscriptionId {
            object: ObjectId(1),
            generation: Generation(3),
        }
    }

    #[test]
    fn sink_tags_deliveries() {
        let (tx, mut rx) = unbounded_channel();
        let sink = DeliverySink::new(id(), Arc::new(AtomicBool::new(false)), tx);

        assert!(sink.push(Vec::new()));
        match rx.try_recv().unwrap() {
            Message::Delivery(d) => {
                assert_eq!(d.object, ObjectId(1));
                assert_eq!(d.generation, Generation(3));
                assert!(d.results.is_empty());
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn cancel_silences_sink_and_releases_service_once() {
        let (tx, mut rx) = unbounded_channel();
        let flag = Arc::new(AtomicBool::new(false));
        let released = Arc::new(AtomicUsize::new(0));
        let sink = DeliverySink::new(id(), flag.clone(), tx);
        let mut handle = TrackingHandle::new(
            id(),
            flag,
            Box::new(CountingSubscription(released.clone())),
        );

        handle.cancel();
        handle.cancel();
        drop(handle);

        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert!(sink.is_cancelled());
        assert!(!sink.push(Vec::new()));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropping_handle_cancels() {
        let (tx, _rx) = unbounded_channel();
        let flag = Arc::new(AtomicBool::new(false));
        let sink = DeliverySink::new(id(), flag.clone(), tx);
        drop(TrackingHandle::new(id(), flag, Box::new(())));
        assert!(sink.is_cancelled());
    }

    #[test]
    fn generation_wraps() {
        assert_eq!(Generation(u64::MAX).next(), Generation(0));
        assert_eq!(Generation(1).next(), Generation(2));
    }
}
