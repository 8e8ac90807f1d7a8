//! Response shapes of the upstream API and their conversion into
//! domain types.

use serde::Deserialize;
use serde_json::Value;

use crate::error::MarketDataError;
use crate::types::{CoinRef, CurrencyCode, MarketSummary, Metrics};

pub(crate) const COIN_ENDPOINT: &str = "/coins/{id}";
pub(crate) const SIMPLE_PRICE_ENDPOINT: &str = "/simple/price";
pub(crate) const COIN_LIST_ENDPOINT: &str = "/coins/list";
pub(crate) const MARKETS_ENDPOINT: &str = "/coins/markets";
pub(crate) const CURRENCIES_ENDPOINT: &str = "/simple/supported_vs_currencies";

/// One entry of `/coins/list`.
#[derive(Debug, Deserialize)]
pub struct CoinListEntry {
    pub id: String,
    pub symbol: String,
    pub name: String,
}

impl From<CoinListEntry> for CoinRef {
    fn from(e: CoinListEntry) -> Self {
        Self {
            id: e.id,
            display_name: e.name,
            symbol: e.symbol,
        }
    }
}

/// One entry of `/coins/markets`. Upstream sends `null` for coins it
/// cannot price yet.
#[derive(Debug, Deserialize)]
pub struct MarketsEntry {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
}

impl MarketsEntry {
    /// `None` when the coin has no price or market cap.
    pub fn into_summary(self) -> Option<MarketSummary> {
        Some(MarketSummary {
            price: self.current_price?,
            market_cap: self.market_cap?,
            change_24h_pct: self.price_change_percentage_24h,
            coin: CoinRef {
                id: self.id,
                display_name: self.name,
                symbol: self.symbol,
            },
        })
    }
}

/// Decodes a JSON body into a wire type. A shape mismatch means a key the
/// caller relies on is absent, so it is reported as a missing field.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    endpoint: &str,
    payload: Value,
) -> Result<T, MarketDataError> {
    serde_json::from_value(payload).map_err(|e| MarketDataError::missing(endpoint, e.to_string()))
}

/// Reads `market_data.{current_price,market_cap}.<cur>` and
/// `market_data.price_change_percentage_24h` from a `/coins/{id}` body.
pub fn metrics_from_coin(payload: &Value, currency: &CurrencyCode) -> Result<Metrics, MarketDataError> {
    let cur = currency.as_str();

    Ok(Metrics {
        price: required_f64(payload, &["market_data", "current_price", cur], COIN_ENDPOINT)?,
        change_24h_pct: required_f64(
            payload,
            &["market_data", "price_change_percentage_24h"],
            COIN_ENDPOINT,
        )?,
        market_cap: required_f64(payload, &["market_data", "market_cap", cur], COIN_ENDPOINT)?,
    })
}

/// Reads `<id>.<cur>`, `<id>.<cur>_24h_change` and `<id>.<cur>_market_cap`
/// from a `/simple/price` body.
pub fn metrics_from_simple_price(
    payload: &Value,
    coin_id: &str,
    currency: &CurrencyCode,
) -> Result<Metrics, MarketDataError> {
    let cur = currency.as_str();
    let change_key = format!("{cur}_24h_change");
    let cap_key = format!("{cur}_market_cap");

    Ok(Metrics {
        price: required_f64(payload, &[coin_id, cur], SIMPLE_PRICE_ENDPOINT)?,
        change_24h_pct: required_f64(payload, &[coin_id, change_key.as_str()], SIMPLE_PRICE_ENDPOINT)?,
        market_cap: required_f64(payload, &[coin_id, cap_key.as_str()], SIMPLE_PRICE_ENDPOINT)?,
    })
}

/// Walks `path` and returns the number found there. Absent keys and
/// `null` are both missing; the error names the full dotted path.
fn required_f64(payload: &Value, path: &[&str], endpoint: &str) -> Result<f64, MarketDataError> {
    path.iter()
        .try_fold(payload, |node, key| node.get(*key))
        .and_then(Value::as_f64)
        .ok_or_else(|| MarketDataError::missing(endpoint, path.join(".")))
}
