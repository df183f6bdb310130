//! Connectivity probe for `online()` tasks.

/// Answers "is the process online right now?" before each attempt of a
/// task that requires connectivity.
pub trait ConnectivityProbe: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Default probe: always online. Tasks without `online()` never consult
/// the probe at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

impl ConnectivityProbe for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}
