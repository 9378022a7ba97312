//! Bounded retry loop with exponential backoff.
//!
//! The controller runs one probe at a time, stops at the first healthy
//! result, and sleeps between failed attempts. It never raises: the final
//! result's outcome is the only failure signal.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::CheckConfig;
use crate::prober::{HttpProber, Probe};
use crate::result::{ProbeResult, millis};

/// Exponential backoff between failed attempts: `base * 2^(n-1)`, capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    pub const BASE_DELAY: Duration = Duration::from_millis(1000);
    pub const MAX_DELAY: Duration = Duration::from_millis(10_000);

    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay to wait after `attempt` failed attempts (1-based).
    ///
    /// 1 → base, 2 → 2×base, 3 → 4×base, … never above the max.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        2u32.checked_pow(exponent)
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.max, |d| d.min(self.max))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Self::BASE_DELAY, Self::MAX_DELAY)
    }
}

/// Final result of a check plus the number of attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub result: ProbeResult,
    pub attempts: u32,
}

impl CheckOutcome {
    pub fn is_healthy(&self) -> bool {
        self.result.is_healthy()
    }
}

/// Per-call retry state. Lives only for one `check`.
#[derive(Debug, Default)]
struct RetrySession {
    attempts_made: u32,
    last_result: Option<ProbeResult>,
}

impl RetrySession {
    fn begin_attempt(&mut self) -> u32 {
        self.attempts_made += 1;
        self.attempts_made
    }

    fn record(&mut self, result: ProbeResult) {
        self.last_result = Some(result);
    }

    fn finish(self, url: &str) -> CheckOutcome {
        let result = self
            .last_result
            .unwrap_or_else(|| ProbeResult::cancelled(url, Duration::ZERO));
        CheckOutcome {
            result,
            attempts: self.attempts_made,
        }
    }
}

/// Repeats a probe up to the configured attempt count.
pub struct RetryController<P = HttpProber> {
    prober: P,
    backoff: Backoff,
}

impl<P: Probe> RetryController<P> {
    pub fn new(prober: P) -> Self {
        Self {
            prober,
            backoff: Backoff::default(),
        }
    }

    /// Replace the backoff policy.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Run the check to completion.
    pub async fn check(&self, config: &CheckConfig) -> CheckOutcome {
        let (_never, cancel) = watch::channel(false);
        self.check_until(config, cancel).await
    }

    /// Run the check until it completes or `cancel` flips to `true`.
    ///
    /// Cancellation aborts the in-flight probe or backoff sleep and returns
    /// the last available result. A probe already started when the flag
    /// flips counts as an attempt and yields a `Cancelled` result; if the
    /// flag is set before the first probe, no attempt is made and the
    /// result is `Cancelled` with `attempts == 0`. Dropping the sender never
    /// cancels.
    pub async fn check_until(
        &self,
        config: &CheckConfig,
        mut cancel: watch::Receiver<bool>,
    ) -> CheckOutcome {
        let retry_count = config.retry_count.max(1);
        let url = config.url.to_string();
        let mut session = RetrySession::default();

        while session.attempts_made < retry_count {
            let already_cancelled = *cancel.borrow();
            if already_cancelled {
                warn!(attempts = session.attempts_made, "health check cancelled");
                break;
            }

            let attempt = session.begin_attempt();
            info!(attempt, retry_count, url = %url, "health check attempt");

            let start = Instant::now();
            let result = tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => {
                    warn!(attempt, "health check cancelled mid-probe");
                    session.record(ProbeResult::cancelled(&url, start.elapsed()));
                    break;
                }
                result = self.prober.probe(
                    &config.url,
                    config.timeout,
                    config.expected_status,
                ) => result,
            };

            if result.is_healthy() {
                info!(attempt, "health check passed");
                session.record(result);
                break;
            }

            warn!(attempt, message = %result.message, "health check failed");
            session.record(result);

            if attempt < retry_count {
                let delay = self.backoff.delay(attempt);
                info!(delay_ms = millis(delay), "waiting before retry");
                tokio::select! {
                    biased;
                    _ = cancelled(&mut cancel) => {
                        warn!(attempt, "health check cancelled during backoff");
                        break;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        session.finish(&url)
    }
}

/// Resolves once the flag is `true`. Never resolves if the sender is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    let closed = cancel.wait_for(|flag| *flag).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}
