use std::time::Duration;

use clap::Parser;

use crate::error::{Result, SyncError};

/// Quiet period after the last edit before a save goes out.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Origin the `/api/` routes hang off. Stored without a trailing slash.
    pub base_url: String,
    pub debounce: Duration,
    pub request_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            debounce: DEFAULT_DEBOUNCE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl SyncConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url.into())?,
            ..Self::default()
        })
    }

    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

fn normalize_base_url(url: String) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(SyncError::InvalidBaseUrl {
            url,
            reason: "expected an http:// or https:// origin".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Command-line arguments of the `stickies-sync` binary.
#[derive(Debug, Parser)]
#[command(name = "stickies-sync", version, about = "Sticky notes kept in sync with a remote API")]
pub struct Cli {
    /// Base URL of the stickies API.
    #[arg(long, env = "STICKIES_API_URL", default_value = DEFAULT_BASE_URL)]
    pub api_url: String,

    /// Milliseconds of quiet after the last edit before saving.
    #[arg(long, env = "STICKIES_DEBOUNCE_MS", default_value_t = 1000)]
    pub debounce_ms: u64,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Page path to open, e.g. `/0123456789abcdef01234567`. Defaults to `/`.
    #[arg(default_value = "/")]
    pub path: String,
}

impl Cli {
    pub fn sync_config(&self) -> Result<SyncConfig> {
        let mut config = SyncConfig::with_base_url(self.api_url.clone())?
            .debounce(Duration::from_millis(self.debounce_ms));
        config.request_timeout = Duration::from_secs(self.timeout_secs);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_loses_trailing_slash() {
        let config = SyncConfig::with_base_url("https://notes.example/").unwrap();
        assert_eq!(config.base_url, "https://notes.example");
        assert_eq!(config.debounce, DEFAULT_DEBOUNCE);
    }

    #[test]
    fn base_url_must_be_http() {
        let err = SyncConfig::with_base_url("notes.example").unwrap_err();
        assert!(matches!(err, SyncError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn cli_flags_build_a_config() {
        let cli = Cli::try_parse_from([
            "stickies-sync",
            "--api-url",
            "http://127.0.0.1:8080/",
            "--debounce-ms",
            "250",
            "/0123456789abcdef01234567",
        ])
        .unwrap();
        let config = cli.sync_config().unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.debounce, Duration::from_millis(250));
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(cli.path, "/0123456789abcdef01234567");
    }
}
