//! Health check probe logic.
//!
//! A probe is one `GET` against the target bounded by a deadline. Every
//! outcome, including connection errors and timeouts, is classified into
//! a [`ProbeResult`]; nothing escapes as an error and nothing is retried
//! here.

use std::future::Future;
use std::time::Duration;

use http::{StatusCode, Uri};
use tokio::time::Instant;
use tracing::debug;

use crate::error::ClientError;
use crate::result::ProbeResult;
use crate::transport::Transport;

/// Identifying `User-Agent` sent with every probe.
pub const USER_AGENT: &str = concat!("healthgate/", env!("CARGO_PKG_VERSION"));

/// Something that can probe a target once.
///
/// Implemented by [`HttpProber`]; the retry loop is generic over it.
pub trait Probe {
    fn probe(
        &self,
        url: &Uri,
        timeout: Duration,
        expected: StatusCode,
    ) -> impl Future<Output = ProbeResult> + Send;
}

/// HTTP(S) prober over hyper.
pub struct HttpProber {
    transport: Transport,
}

impl HttpProber {
    pub fn new() -> Result<Self, ClientError> {
        Ok(Self {
            transport: Transport::new(USER_AGENT)?,
        })
    }

    /// Perform an HTTP health probe against `url`.
    ///
    /// Returns `Healthy` only if a response arrives within `timeout` with
    /// exactly the `expected` status. The response body is drained before
    /// the clock stops. On timeout the in-flight request is dropped.
    pub async fn probe(&self, url: &Uri, timeout: Duration, expected: StatusCode) -> ProbeResult {
        let target = url.to_string();
        let start = Instant::now();

        match tokio::time::timeout(timeout, self.transport.get(url)).await {
            Ok(Ok(response)) => {
                let elapsed = start.elapsed();
                if response.status != expected {
                    debug!(
                        status = %response.status,
                        expected = %expected,
                        url = %target,
                        "health probe status mismatch"
                    );
                }
                ProbeResult::from_status(&target, expected, response.status, elapsed)
                    .with_body(response.body_size, response.headers)
            }
            Ok(Err(e)) => {
                debug!(error = %e, url = %target, "health probe request failed");
                ProbeResult::transport_failure(&target, e, start.elapsed())
            }
            Err(_) => {
                debug!(
                    url = %target,
                    timeout_ms = timeout.as_millis() as u64,
                    "request timed out"
                );
                ProbeResult::timed_out(&target, timeout, start.elapsed())
            }
        }
    }
}

impl Probe for HttpProber {
    fn probe(
        &self,
        url: &Uri,
        timeout: Duration,
        expected: StatusCode,
    ) -> impl Future<Output = ProbeResult> + Send {
        HttpProber::probe(self, url, timeout, expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{FailureKind, Outcome};

    #[test]
    fn user_agent_names_the_tool() {
        assert!(USER_AGENT.starts_with("healthgate/"));
    }

    #[tokio::test]
    async fn unsupported_scheme_is_a_transport_failure() {
        let prober = HttpProber::new().unwrap();
        let url: Uri = "ftp://127.0.0.1/file".parse().unwrap();

        let result = prober.probe(&url, Duration::from_secs(1), StatusCode::OK).await;
        assert_eq!(result.outcome, Outcome::Unhealthy);
        assert_eq!(result.failure, Some(FailureKind::Transport));
        assert!(result.status_code.is_none());
        assert!(result.error.as_deref().unwrap_or_default().contains("ftp"));
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_failure() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let prober = HttpProber::new().unwrap();
        let url: Uri = format!("http://{addr}/health").parse().unwrap();

        let result = prober.probe(&url, Duration::from_secs(5), StatusCode::OK).await;
        assert_eq!(result.outcome, Outcome::Unhealthy);
        assert_eq!(result.failure, Some(FailureKind::Transport));
        assert!(result.status_code.is_none());
        assert!(!result.error.unwrap_or_default().is_empty());
    }
}
