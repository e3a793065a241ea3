use color_eyre::eyre::{eyre, WrapErr};
use dotenv::dotenv;
use std::env;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8087";

/// Runtime settings for the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Backend root, without the `/mdf` suffix and without a trailing slash
    pub api_base_url: String,
    /// No timeout unless configured
    pub request_timeout: Option<Duration>,
    pub debug: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: None,
            debug: false,
        }
    }
}

impl AppConfig {
    /// Builds the configuration from a variable lookup.
    ///
    /// Reads `API_BASE_URL`, `REQUEST_TIMEOUT_SECS` and `DEBUG`.
    pub fn from_lookup<F>(lookup: F) -> color_eyre::eyre::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = lookup("API_BASE_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(eyre!("API_BASE_URL must start with http:// or https://, got {base}"));
        }
        let api_base_url = base.trim_end_matches('/').to_string();

        let request_timeout = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(raw) if !raw.trim().is_empty() => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .wrap_err_with(|| format!("Invalid REQUEST_TIMEOUT_SECS: {raw}"))?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            _ => None,
        };

        let debug = lookup("DEBUG")
            .is_some_and(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"));

        Ok(Self {
            api_base_url,
            request_timeout,
            debug,
        })
    }
}

/// Initializes the application configuration from `.env` and the environment
pub fn init_app_config() -> color_eyre::eyre::Result<AppConfig> {
    // Load environment variables from .env file
    dotenv().ok();

    AppConfig::from_lookup(|key| env::var(key).ok())
}
