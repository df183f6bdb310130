//! Notifier contract (mechanics only).
//!
//! A notifier is the pub/sub capability attached to one object — a job or
//! a queue. Subscribers each get a copy of every message emitted after
//! they subscribe; messages already sent to a subscriber stay readable
//! after the notifier detaches, so a terminal event is never lost to the
//! subscriber that was waiting for it.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::error::TryRecvError;

/// A subscription to one object's event stream.
///
/// Receives buffered messages until the stream is closed by
/// [`Notifier::detach_all`] (or the notifier is dropped), after which
/// [`Subscription::recv`] returns `None`.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: UnboundedReceiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: UnboundedReceiver<M>) -> Self {
        Self { receiver }
    }

    /// Wait for the next message. `None` once the stream is closed and
    /// drained.
    pub async fn recv(&mut self) -> Option<M> {
        self.receiver.recv().await
    }

    /// Take a message without waiting.
    pub fn try_recv(&mut self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }
}

/// Emit failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The subscriber list lock was poisoned.
    Poisoned,
}

/// Object-scoped pub/sub capability.
pub trait Notifier<M>: Send + Sync {
    /// Fan a message out to every live subscriber.
    fn emit(&self, message: M) -> Result<(), NotifyError>;

    /// Attach a new subscriber.
    fn subscribe(&self) -> Subscription<M>;

    /// Detach every subscriber. Buffered messages remain readable on the
    /// subscriber side.
    fn detach_all(&self);
}

impl<M, N> Notifier<M> for Arc<N>
where
    N: Notifier<M> + ?Sized,
{
    fn emit(&self, message: M) -> Result<(), NotifyError> {
        (**self).emit(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }

    fn detach_all(&self) {
        (**self).detach_all()
    }
}
