//! Per-request timing records

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Outcome of a single HTTP exchange.
///
/// Produced by workers, owned by the aggregator. `status_code` is 0 when the
/// transport failed before a status line was read; `error` is `None` on
/// transport success regardless of the status code.
#[derive(Debug, Clone)]
pub struct RequestStat {
    /// Wall-clock instant the exchange started
    pub start: DateTime<Utc>,
    /// Wall-clock instant the exchange ended
    pub end: DateTime<Utc>,
    /// Monotonic duration of the network call (send through body read)
    pub duration: Duration,

    /// Bytes of response body received
    pub body_size: usize,

    /// Numeric HTTP status, or 0 on transport failure
    pub status_code: u16,
    /// Transport error, if the exchange failed below the HTTP layer
    pub error: Option<String>,
}

impl RequestStat {
    /// A request counts as successful only with status 200 and no
    /// transport error.
    pub fn is_success(&self) -> bool {
        self.status_code == 200 && self.error.is_none()
    }

    /// Key under which this request is aggregated in the error histogram:
    /// the transport error message when present, otherwise the canonical
    /// HTTP status text.
    pub fn error_key(&self) -> String {
        if let Some(err) = &self.error {
            return err.clone();
        }

        reqwest::StatusCode::from_u16(self.status_code)
            .ok()
            .and_then(|status| status.canonical_reason())
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP status {}", self.status_code))
    }
}
