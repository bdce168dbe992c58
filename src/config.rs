use std::time::Duration;

use anyhow::Context;

pub const DEFAULT_SERVER_URL: &str = "http://mts-prism.com";
pub const DEFAULT_SERVER_PORT: u16 = 8082;

/// Scoring server connection settings, read from the environment once at
/// startup. Only the API code has no default.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server_url: String,
    pub server_port: u16,
    pub api_code: Option<String>,
}

impl Settings {
    pub fn from_env() -> Self {
        let server_url = std::env::var("PRISM_SERVER_URL")
            .unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());
        let server_port = std::env::var("PRISM_SERVER_PORT")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_SERVER_PORT);
        let api_code = std::env::var("PRISM_API_CODE").ok();

        Self {
            server_url,
            server_port,
            api_code,
        }
    }

    pub fn require_api_code(&self) -> anyhow::Result<&str> {
        self.api_code
            .as_deref()
            .context("PRISM_API_CODE must be set")
    }
}

/// Pacing and retry knobs for the market data gateway.
#[derive(Debug, Clone)]
pub struct ProviderTuning {
    /// Delay inserted before every call to the upstream provider.
    pub pace: Duration,
    /// Total attempts for a profile lookup before giving up.
    pub retry_attempts: u32,
    /// Lower bound of the jittered backoff window.
    pub backoff_min: Duration,
    /// Upper bound of the jittered backoff window.
    pub backoff_max: Duration,
}

impl Default for ProviderTuning {
    fn default() -> Self {
        Self {
            pace: Duration::from_millis(200),
            retry_attempts: 3,
            backoff_min: Duration::from_secs(4),
            backoff_max: Duration::from_secs(10),
        }
    }
}
