//! Human-readable duration resolution.
//!
//! Policy intervals are plain `std::time::Duration`; this is the one place
//! where strings like `"10ms"` or `"1m 30s"` become durations.

use std::time::Duration;

use thiserror::Error;

/// Duration-string parse failure.
#[derive(Debug, Error)]
#[error("invalid duration `{input}`: {source}")]
pub struct DurationParseError {
    input: String,
    #[source]
    source: humantime::DurationError,
}

/// Parse a human-readable interval (`"500ms"`, `"2s"`, `"1h 15m"`).
pub fn parse_duration(s: &str) -> Result<Duration, DurationParseError> {
    humantime::parse_duration(s).map_err(|source| DurationParseError {
        input: s.to_string(),
        source,
    })
}
