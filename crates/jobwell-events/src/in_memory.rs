//! In-memory notifier backed by unbounded tokio channels.

use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::notifier::{NotifyError, Notifier, Subscription};

/// In-process fan-out notifier.
///
/// - No IO; senders live behind a mutex held only for the fan-out itself
/// - Unbounded channels: emitting never waits on slow subscribers
/// - Dropped subscriptions are pruned on the next emit
#[derive(Debug)]
pub struct InMemoryNotifier<M> {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<M>>>,
}

impl<M> InMemoryNotifier<M> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M> Default for InMemoryNotifier<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<M> Notifier<M> for InMemoryNotifier<M>
where
    M: Clone + Send + 'static,
{
    fn emit(&self, message: M) -> Result<(), NotifyError> {
        let mut subs = self
            .subscribers
            .lock()
            .map_err(|_| NotifyError::Poisoned)?;

        // Drop any dead subscribers while publishing.
        subs.retain(|tx| tx.send(message.clone()).is_ok());

        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::unbounded_channel();

        // If the lock is poisoned, we still return a subscription;
        // it just never receives messages.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }

        Subscription::new(rx)
    }

    fn detach_all(&self) {
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.clear();
        }
    }
}
