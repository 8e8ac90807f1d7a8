use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::catalog::Catalog;
use crate::coingecko::MarketDataApi;
use crate::coingecko::wire::{
    self, COIN_LIST_ENDPOINT, CURRENCIES_ENDPOINT, CoinListEntry, MARKETS_ENDPOINT, MarketsEntry,
    SIMPLE_PRICE_ENDPOINT,
};
use crate::error::MarketDataError;
use crate::types::{CoinRef, CurrencyCode, CurrencySet, Interval, MarketSummary, Metrics, WindowSpec};

/// HTTP client for a CoinGecko-compatible pricing API.
///
/// Every request is bounded by the timeout given at construction. Nothing
/// is retried.
#[derive(Clone)]
pub struct CoinGeckoClient {
    http: Client,
    base_url: String,
}

impl CoinGeckoClient {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Upper bound of `per_page` on `/coins/markets`.
    pub const MAX_PAGE_SIZE: u32 = 250;

    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, MarketDataError> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .user_agent(concat!("coinwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let base_url: String = base_url.into();

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Same as [`MarketDataApi::fetch_series`], with an explicit sampling
    /// interval.
    #[instrument(skip(self), fields(days = %window.upstream_days()), level = "debug")]
    pub async fn fetch_series_with_interval(
        &self,
        coin_id: &str,
        currency: &CurrencyCode,
        window: WindowSpec,
        interval: Option<Interval>,
    ) -> Result<Value, MarketDataError> {
        let path = format!("/coins/{}/market_chart", checked_coin_id(coin_id)?);
        let days = window.upstream_days();

        let mut query = vec![("vs_currency", currency.as_str()), ("days", days.as_str())];
        if let Some(interval) = interval {
            query.push(("interval", interval.as_str()));
        }

        let payload = self.get_json(&path, &query).await?;

        let prices = payload
            .get("prices")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        debug!(prices, "market chart fetched");

        Ok(payload)
    }

    /// Lightweight metrics from `/simple/price`.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_simple_metrics(
        &self,
        coin_id: &str,
        currency: &CurrencyCode,
    ) -> Result<Metrics, MarketDataError> {
        let coin_id = checked_coin_id(coin_id)?;

        let payload = self
            .get_json(
                SIMPLE_PRICE_ENDPOINT,
                &[
                    ("ids", coin_id),
                    ("vs_currencies", currency.as_str()),
                    ("include_24hr_change", "true"),
                    ("include_market_cap", "true"),
                ],
            )
            .await?;

        wire::metrics_from_simple_price(&payload, coin_id, currency)
    }

    /// Top coins by market cap, one page of `limit` entries (clamped to
    /// `1..=MAX_PAGE_SIZE`). Coins upstream cannot price yet are skipped.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_top_coins(
        &self,
        currency: &CurrencyCode,
        limit: u32,
    ) -> Result<Vec<MarketSummary>, MarketDataError> {
        let per_page = limit.clamp(1, Self::MAX_PAGE_SIZE).to_string();

        let payload = self
            .get_json(
                MARKETS_ENDPOINT,
                &[
                    ("vs_currency", currency.as_str()),
                    ("order", "market_cap_desc"),
                    ("per_page", per_page.as_str()),
                    ("page", "1"),
                    ("sparkline", "false"),
                ],
            )
            .await?;

        let entries: Vec<MarketsEntry> = wire::decode(MARKETS_ENDPOINT, payload)?;
        let total = entries.len();
        let rows: Vec<MarketSummary> = entries
            .into_iter()
            .filter_map(MarketsEntry::into_summary)
            .collect();

        debug!(total, priced = rows.len(), "top coins fetched");

        Ok(rows)
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, MarketDataError> {
        let url = format!("{}{}", self.base_url, path);

        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await?
            .error_for_status()?;

        Ok(resp.json::<Value>().await?)
    }
}

#[async_trait]
impl MarketDataApi for CoinGeckoClient {
    #[instrument(skip(self), level = "debug")]
    async fn fetch_catalog(&self) -> Result<Catalog, MarketDataError> {
        let payload = self.get_json(COIN_LIST_ENDPOINT, &[]).await?;
        let entries: Vec<CoinListEntry> = wire::decode(COIN_LIST_ENDPOINT, payload)?;

        debug!(coins = entries.len(), "coin list fetched");

        Ok(Catalog::from_coins(entries.into_iter().map(CoinRef::from)))
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch_currency_list(&self) -> Result<CurrencySet, MarketDataError> {
        let payload = self.get_json(CURRENCIES_ENDPOINT, &[]).await?;
        let codes: Vec<String> = wire::decode(CURRENCIES_ENDPOINT, payload)?;

        Ok(codes
            .iter()
            .filter_map(|c| CurrencyCode::new(c).ok())
            .collect())
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch_metrics(
        &self,
        coin_id: &str,
        currency: &CurrencyCode,
    ) -> Result<Metrics, MarketDataError> {
        let path = format!("/coins/{}", checked_coin_id(coin_id)?);

        let payload = self
            .get_json(
                &path,
                &[
                    ("localization", "false"),
                    ("tickers", "false"),
                    ("market_data", "true"),
                ],
            )
            .await?;

        wire::metrics_from_coin(&payload, currency)
    }

    async fn fetch_series(
        &self,
        coin_id: &str,
        currency: &CurrencyCode,
        window: WindowSpec,
    ) -> Result<Value, MarketDataError> {
        self.fetch_series_with_interval(coin_id, currency, window, None)
            .await
    }
}

/// Coin ids are interpolated into the request path, so only slug
/// characters are accepted.
fn checked_coin_id(coin_id: &str) -> Result<&str, MarketDataError> {
    let valid = !coin_id.is_empty()
        && coin_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(coin_id)
    } else {
        Err(MarketDataError::InvalidInput(format!(
            "`{coin_id}` is not a valid coin id"
        )))
    }
}
