use std::time::Duration;

use clap::{Parser, Subcommand};

use common::config::AppConfig;
use market::MarketDataError;
use market::types::{CurrencyCode, WindowSpec};

#[derive(Debug, Parser)]
#[clap(name = "coinwatch", version, about = "Crypto market data in the terminal")]
pub struct Cli {
    /// Upstream API root (overrides COINGECKO_BASE_URL)
    #[clap(long, global = true)]
    pub base_url: Option<String>,

    /// Per-request timeout in seconds (overrides COINWATCH_TIMEOUT_SECS)
    #[clap(long, global = true)]
    pub timeout_secs: Option<u64>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List coins from the catalog
    Coins {
        /// Case-insensitive filter on id, name or symbol
        #[clap(long)]
        search: Option<String>,

        #[clap(long, default_value_t = 25)]
        limit: usize,
    },

    /// List currencies prices can be quoted in
    Currencies,

    /// Top coins by market cap
    Top {
        #[clap(long)]
        currency: Option<String>,

        #[clap(long, default_value_t = 10)]
        limit: u32,
    },

    /// Metrics and price history for one coin
    Show {
        /// Catalog label, coin id, name or symbol
        coin: String,

        #[clap(long)]
        currency: Option<String>,

        /// Window in days, or `max`
        #[clap(long)]
        days: Option<String>,

        /// Join traded volume into the history
        #[clap(long)]
        volume: bool,

        /// History rows to print, sampled evenly across the window
        #[clap(long, default_value_t = 20)]
        rows: usize,

        /// Print the whole view as JSON instead of tables
        #[clap(long)]
        json: bool,
    },
}

impl Cli {
    pub(crate) fn base_url(&self, config: &AppConfig) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| config.base_url.clone())
    }

    pub(crate) fn timeout(&self, config: &AppConfig) -> Duration {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(config.request_timeout)
    }
}

/// Flag value if given, else the configured default.
pub(crate) fn pick_currency(
    flag: Option<&str>,
    config: &AppConfig,
) -> Result<CurrencyCode, MarketDataError> {
    CurrencyCode::new(flag.unwrap_or(&config.default_currency))
}

pub(crate) fn pick_window(
    flag: Option<&str>,
    config: &AppConfig,
) -> Result<WindowSpec, MarketDataError> {
    flag.unwrap_or(&config.default_window).parse()
}
