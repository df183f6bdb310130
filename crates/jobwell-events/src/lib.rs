//! Per-object publish/subscribe capability.
//!
//! Jobs and queues announce their progress through a [`Notifier`]; callers
//! observe it through [`Subscription`]s. The capability is deliberately
//! lightweight: in-process fan-out, no persistence, no delivery ordering
//! across publishers.

pub mod in_memory;
pub mod notifier;

pub use in_memory::InMemoryNotifier;
pub use notifier::{NotifyError, Notifier, Subscription};
