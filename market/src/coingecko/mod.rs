pub mod client;
pub mod wire;

use std::fmt::Display;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::catalog::Catalog;
use crate::error::MarketDataError;
use crate::types::{CurrencyCode, CurrencySet, Metrics, WindowSpec};

pub use client::CoinGeckoClient;

/// The upstream operations a render cycle needs.
///
/// `CoinGeckoClient` talks HTTP; tests substitute in-memory fakes.
#[async_trait]
pub trait MarketDataApi: Send + Sync {
    async fn fetch_catalog(&self) -> Result<Catalog, MarketDataError>;

    async fn fetch_currency_list(&self) -> Result<CurrencySet, MarketDataError>;

    async fn fetch_metrics(
        &self,
        coin_id: &str,
        currency: &CurrencyCode,
    ) -> Result<Metrics, MarketDataError>;

    /// Raw market-chart payload. Single-day windows are widened upstream,
    /// see [`WindowSpec::upstream_days`].
    async fn fetch_series(
        &self,
        coin_id: &str,
        currency: &CurrencyCode,
        window: WindowSpec,
    ) -> Result<Value, MarketDataError>;

    /// Supported currencies, or the fixed fallback set if they cannot be
    /// fetched. Currency selection must never block the caller.
    async fn fetch_supported_currencies(&self) -> CurrencySet {
        match self.fetch_currency_list().await {
            Ok(set) if !set.is_empty() => set,
            Ok(_) => fallback_currencies("upstream returned an empty list"),
            Err(e) => fallback_currencies(e),
        }
    }
}

fn fallback_currencies(reason: impl Display) -> CurrencySet {
    warn!(reason = %reason, "currency list unavailable; falling back to usd/inr/eur");
    CurrencySet::fallback()
}
