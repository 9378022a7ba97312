//! healthgate — probe one HTTP endpoint with retries and report the result.
//!
//! # Usage
//!
//! ```text
//! healthgate --url https://example.com/health --retry-count 5 --timeout 10
//! ```
//!
//! Inputs may also come from the environment using the CI action input
//! convention (`INPUT_URL`, `INPUT_TIMEOUT`, `INPUT_RETRY-COUNT`,
//! `INPUT_EXPECTED-STATUS`) or from the `[check]` table of a TOML file.
//!
//! Exit codes: `0` healthy, `1` unhealthy after all retries, `2` invalid
//! configuration.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tokio::sync::watch;
use tracing::{error, info, warn};

use healthgate_probe::report::format_summary;
use healthgate_probe::{
    CheckOutcome, ConfigError, HttpProber, Outputs, RawCheckConfig, Reporter, RetryController,
};

#[derive(Parser)]
#[command(
    name = "healthgate",
    about = "HTTP health check with bounded retries and exponential backoff",
    version
)]
struct Cli {
    /// Target URL (absolute http:// or https://)
    #[arg(short, long, env = "INPUT_URL")]
    url: Option<String>,

    /// Per-attempt timeout. Plain numbers are seconds; 500ms, 5s, 2m also work.
    /// [default: 30]
    #[arg(short, long, env = "INPUT_TIMEOUT")]
    timeout: Option<String>,

    /// Maximum number of attempts [default: 3]
    #[arg(short, long, env = "INPUT_RETRY-COUNT")]
    retry_count: Option<String>,

    /// HTTP status code that counts as healthy [default: 200]
    #[arg(short, long, env = "INPUT_EXPECTED-STATUS")]
    expected_status: Option<String>,

    /// TOML file with a [check] table; flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// What to print on stdout when done
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Log line format (logs go to stderr)
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Boxed human-readable summary.
    Text,
    /// The final probe result as JSON.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

impl Cli {
    /// Inputs given on the command line or through the environment.
    fn inputs(&self) -> RawCheckConfig {
        RawCheckConfig {
            url: self.url.clone(),
            timeout: self.timeout.clone(),
            retry_count: self.retry_count.clone(),
            expected_status: self.expected_status.clone(),
        }
    }

    /// Config file (if any) with command-line inputs layered on top.
    fn raw_config(&self) -> Result<RawCheckConfig, ConfigError> {
        let base = match &self.config {
            Some(path) => RawCheckConfig::from_file(path)?,
            None => RawCheckConfig::default(),
        };
        Ok(base.merge(self.inputs()))
    }
}

const EXIT_UNHEALTHY: u8 = 1;
const EXIT_CONFIG: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.log_format) {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::from(EXIT_CONFIG);
    }

    match run(&cli).await {
        Ok(outcome) if outcome.is_healthy() => {
            info!(
                attempts = outcome.attempts,
                "health check completed successfully"
            );
            ExitCode::SUCCESS
        }
        Ok(outcome) => {
            error!(
                attempts = outcome.attempts,
                message = %outcome.result.message,
                "health check failed"
            );
            ExitCode::from(EXIT_UNHEALTHY)
        }
        Err(e) if e.downcast_ref::<ConfigError>().is_some() => {
            error!(error = %e, "invalid configuration");
            ExitCode::from(EXIT_CONFIG)
        }
        Err(e) => {
            error!(error = %e, "health check aborted");
            ExitCode::from(EXIT_UNHEALTHY)
        }
    }
}

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("healthgate=info".parse()?)
        .add_directive("healthgate_probe=info".parse()?);

    match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
    Ok(())
}

async fn run(cli: &Cli) -> anyhow::Result<CheckOutcome> {
    let config = cli.raw_config()?.validate()?;
    info!(
        url = %config.url,
        timeout_ms = config.timeout.as_millis() as u64,
        retry_count = config.retry_count,
        expected_status = config.expected_status.as_u16(),
        "starting health check"
    );

    let controller = RetryController::new(HttpProber::new()?);

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling health check");
            let _ = cancel_tx.send(true);
        }
    });

    let outcome = controller.check_until(&config, cancel_rx).await;
    report(&outcome, cli.format)?;
    Ok(outcome)
}

fn report(outcome: &CheckOutcome, format: Format) -> anyhow::Result<()> {
    match format {
        Format::Text => println!("{}", format_summary(outcome)),
        Format::Json => println!("{}", Outputs::from_outcome(outcome)?.details),
    }

    let reporter = Reporter::from_env();
    if reporter.is_attached() {
        reporter.write(outcome)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_map_to_inputs() {
        let cli = Cli::try_parse_from([
            "healthgate",
            "--url",
            "http://localhost:3000/health",
            "--timeout",
            "5",
            "--retry-count",
            "4",
            "--expected-status",
            "204",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.format, Format::Json);
        let raw = cli.inputs();
        assert_eq!(raw.url.as_deref(), Some("http://localhost:3000/health"));
        assert_eq!(raw.timeout.as_deref(), Some("5"));
        assert_eq!(raw.retry_count.as_deref(), Some("4"));
        assert_eq!(raw.expected_status.as_deref(), Some("204"));
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("healthgate.toml");
        std::fs::write(
            &path,
            "[check]\nurl = \"http://from-file/health\"\nretry-count = 7\ntimeout = \"2s\"\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "healthgate",
            "--config",
            path.to_str().unwrap(),
            "--retry-count",
            "2",
        ])
        .unwrap();

        let config = cli.raw_config().unwrap().validate().unwrap();
        assert_eq!(config.url.host(), Some("from-file"));
        assert_eq!(config.retry_count, 2);
        assert_eq!(config.timeout, std::time::Duration::from_secs(2));
    }

    #[test]
    fn missing_config_file_is_a_config_error() {
        let cli = Cli::try_parse_from(["healthgate", "--config", "/nonexistent/healthgate.toml"])
            .unwrap();
        assert!(matches!(cli.raw_config(), Err(ConfigError::Read { .. })));
    }
}
