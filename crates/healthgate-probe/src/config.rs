//! Check configuration: raw inputs, the optional TOML file, validation.
//!
//! Inputs arrive as loosely-typed strings (CLI flags, CI action inputs,
//! a `[check]` table in a TOML file). [`RawCheckConfig::validate`] turns
//! them into a [`CheckConfig`] before any probing starts.

use std::path::Path;
use std::time::Duration;

use http::{StatusCode, Uri};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Validated settings for one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckConfig {
    /// Absolute `http` or `https` URL.
    pub url: Uri,
    /// Deadline for each probe.
    pub timeout: Duration,
    /// Maximum number of attempts, at least 1.
    pub retry_count: u32,
    pub expected_status: StatusCode,
}

/// Unvalidated check inputs. `None` and empty strings fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawCheckConfig {
    #[serde(default)]
    pub url: Option<String>,
    /// Plain numbers are seconds; `500ms`, `5s`, `2m` are also accepted.
    #[serde(default, deserialize_with = "scalar")]
    pub timeout: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub retry_count: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub expected_status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    check: RawCheckConfig,
}

impl RawCheckConfig {
    pub const DEFAULT_TIMEOUT: &'static str = "30";
    pub const DEFAULT_RETRY_COUNT: &'static str = "3";
    pub const DEFAULT_EXPECTED_STATUS: &'static str = "200";

    /// Load the `[check]` table from a TOML file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let file: ConfigFile = toml::from_str(content)?;
        Ok(file.check)
    }

    /// Layer `overrides` on top of `self`; set, non-empty values win.
    pub fn merge(self, overrides: RawCheckConfig) -> Self {
        fn pick(base: Option<String>, over: Option<String>) -> Option<String> {
            match over {
                Some(v) if !v.trim().is_empty() => Some(v),
                _ => base,
            }
        }
        Self {
            url: pick(self.url, overrides.url),
            timeout: pick(self.timeout, overrides.timeout),
            retry_count: pick(self.retry_count, overrides.retry_count),
            expected_status: pick(self.expected_status, overrides.expected_status),
        }
    }

    pub fn validate(&self) -> ConfigResult<CheckConfig> {
        let url = validate_url(non_empty(&self.url).ok_or(ConfigError::MissingUrl)?)?;

        let timeout_input = non_empty(&self.timeout).unwrap_or(Self::DEFAULT_TIMEOUT);
        let timeout = parse_duration(timeout_input)
            .filter(|d| !d.is_zero())
            .ok_or_else(|| ConfigError::InvalidTimeout(timeout_input.to_string()))?;

        let retry_input = non_empty(&self.retry_count).unwrap_or(Self::DEFAULT_RETRY_COUNT);
        let retry_count = retry_input
            .parse::<u32>()
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| ConfigError::InvalidRetryCount(retry_input.to_string()))?;

        let status_input =
            non_empty(&self.expected_status).unwrap_or(Self::DEFAULT_EXPECTED_STATUS);
        let expected_status = status_input
            .parse::<u16>()
            .ok()
            .filter(|code| (100..=599).contains(code))
            .and_then(|code| StatusCode::from_u16(code).ok())
            .ok_or_else(|| ConfigError::InvalidStatus(status_input.to_string()))?;

        Ok(CheckConfig {
            url,
            timeout,
            retry_count,
            expected_status,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn validate_url(input: &str) -> ConfigResult<Uri> {
    let url: Uri = input.parse().map_err(|e: http::uri::InvalidUri| ConfigError::InvalidUrl {
        url: input.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme_str() {
        Some("http") | Some("https") => {}
        Some(other) => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        None => {
            return Err(ConfigError::InvalidUrl {
                url: input.to_string(),
                reason: "not an absolute url".to_string(),
            });
        }
    }

    match url.host() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(ConfigError::MissingHost(input.to_string())),
    }
}

/// Parse a duration string like "5s", "500ms", "1m". Plain numbers are seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

/// TOML lets numbers through unquoted; keep everything as text until validation.
fn scalar<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Int(i64),
        Text(String),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|s| match s {
        Scalar::Int(n) => n.to_string(),
        Scalar::Text(t) => t,
    }))
}
