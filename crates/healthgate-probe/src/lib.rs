//! healthgate-probe — single-target HTTP health checking.
//!
//! Provides an HTTP(S) probe with a hard deadline, a bounded retry loop
//! with exponential backoff, and the reporting helpers that turn the
//! final result into CI outputs and summaries.
//!
//! # Architecture
//!
//! ```text
//! RawCheckConfig ──validate()──► CheckConfig
//!                                    │
//!                          RetryController::check()
//!                            ├── RetrySession (attempts, last result)
//!                            ├── Probe::probe() → ProbeResult
//!                            │     └── transport::exchange (TCP / TLS / HTTP/1.1)
//!                            └── Backoff (1s → 10s)
//!                                    │
//!                            CheckOutcome ──► Reporter
//! ```
//!
//! Probe failures are values, not errors: every path through
//! [`HttpProber::probe`] ends in a [`ProbeResult`], and the retry loop
//! never escalates a failed attempt. Only the caller decides whether an
//! unhealthy final result is fatal.

pub mod config;
pub mod error;
pub mod prober;
pub mod report;
pub mod result;
pub mod retry;
mod transport;

pub use config::{CheckConfig, RawCheckConfig};
pub use error::{ClientError, ConfigError, ReportError};
pub use prober::{HttpProber, Probe};
pub use report::{Outputs, Reporter};
pub use result::{FailureKind, Outcome, ProbeResult};
pub use retry::{Backoff, CheckOutcome, RetryController};
