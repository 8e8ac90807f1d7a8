use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Root of the upstream pricing API, without a trailing slash.
    pub base_url: String,

    /// Bound on every upstream request (connect + response).
    ///
    /// There are no retries; a request that exceeds this is reported
    /// as a network failure and the caller decides what to show.
    pub request_timeout: Duration,

    /// Currency used when the caller does not pick one.
    pub default_currency: String,

    /// Chart window used when the caller does not pick one
    /// (`"max"` or a number of days).
    pub default_window: String,

    /// Emit JSON log lines instead of the compact human format.
    pub json_logs: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            default_currency: "usd".to_string(),
            default_window: "7".to_string(),
            json_logs: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Unset or
    /// unparsable values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let base_url = lookup("COINGECKO_BASE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.base_url);

        let request_timeout = lookup("COINWATCH_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let default_currency = lookup("COINWATCH_CURRENCY")
            .map(|v| v.trim().to_lowercase())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.default_currency);

        let default_window = lookup("COINWATCH_DAYS")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.default_window);

        let json_logs = lookup("APP_ENV").is_some_and(|v| v == "production");

        Self {
            base_url,
            request_timeout,
            default_currency,
            default_window,
            json_logs,
        }
    }
}
