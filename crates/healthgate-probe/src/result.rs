//! Probe result types.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use http::StatusCode;
use serde::{Deserialize, Serialize};

/// Binary health classification of a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// A response arrived with exactly the expected status code.
    Healthy,
    /// Anything else: wrong status, transport failure, timeout, cancellation.
    Unhealthy,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Healthy => "healthy",
            Outcome::Unhealthy => "unhealthy",
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, Outcome::Healthy)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an unhealthy probe failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A response arrived but its status differed from the expected one.
    StatusMismatch,
    /// The connection could not be established or was terminated abnormally.
    Transport,
    /// No terminal response before the deadline.
    Timeout,
    /// The check was cancelled while the probe was in flight.
    Cancelled,
}

/// Result of a single probe. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    /// The target probed.
    pub url: String,
    #[serde(rename = "status")]
    pub outcome: Outcome,
    /// Absent when no response was received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Start of the probe to its terminal event, in milliseconds.
    #[serde(rename = "responseTime")]
    pub response_time_ms: u64,
    pub message: String,
    /// Underlying error text. Only set on transport failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    /// Drained body length in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_size: Option<u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Completion instant, milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl ProbeResult {
    /// Classify a received response against the expected status.
    pub fn from_status(
        url: &str,
        expected: StatusCode,
        status: StatusCode,
        elapsed: Duration,
    ) -> Self {
        let code = status.as_u16();
        let (outcome, message, failure) = if status == expected {
            (
                Outcome::Healthy,
                format!("Health check passed ({code})"),
                None,
            )
        } else {
            (
                Outcome::Unhealthy,
                format!(
                    "Health check failed. Expected {}, got {code}",
                    expected.as_u16()
                ),
                Some(FailureKind::StatusMismatch),
            )
        };

        Self {
            url: url.to_string(),
            outcome,
            status_code: Some(code),
            response_time_ms: millis(elapsed),
            message,
            error: None,
            failure,
            body_size: None,
            headers: BTreeMap::new(),
            timestamp: epoch_millis(),
        }
    }

    /// Attach the drained body size and response headers.
    pub fn with_body(mut self, body_size: u64, headers: BTreeMap<String, String>) -> Self {
        self.body_size = Some(body_size);
        self.headers = headers;
        self
    }

    /// The request never produced a response.
    pub fn transport_failure(url: &str, error: impl fmt::Display, elapsed: Duration) -> Self {
        let error = error.to_string();
        Self {
            url: url.to_string(),
            outcome: Outcome::Unhealthy,
            status_code: None,
            response_time_ms: millis(elapsed),
            message: format!("Health check failed: {error}"),
            error: Some(error),
            failure: Some(FailureKind::Transport),
            body_size: None,
            headers: BTreeMap::new(),
            timestamp: epoch_millis(),
        }
    }

    /// The deadline passed before a terminal response.
    pub fn timed_out(url: &str, timeout: Duration, elapsed: Duration) -> Self {
        Self {
            url: url.to_string(),
            outcome: Outcome::Unhealthy,
            status_code: None,
            response_time_ms: millis(elapsed),
            message: format!("Health check timed out after {}ms", millis(timeout)),
            error: None,
            failure: Some(FailureKind::Timeout),
            body_size: None,
            headers: BTreeMap::new(),
            timestamp: epoch_millis(),
        }
    }

    /// The surrounding check was cancelled mid-probe.
    pub fn cancelled(url: &str, elapsed: Duration) -> Self {
        Self {
            url: url.to_string(),
            outcome: Outcome::Unhealthy,
            status_code: None,
            response_time_ms: millis(elapsed),
            message: format!("Health check cancelled after {}ms", millis(elapsed)),
            error: None,
            failure: Some(FailureKind::Cancelled),
            body_size: None,
            headers: BTreeMap::new(),
            timestamp: epoch_millis(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.outcome.is_healthy()
    }
}

pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn epoch_millis() -> u64 {
    let since = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    millis(since)
}
