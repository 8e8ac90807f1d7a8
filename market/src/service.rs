//! DashboardService
//!
//! One render cycle of the coin dashboard:
//!   • Resolve the requested coin through the catalog cache
//!   • Check the currency against the supported set
//!   • Fetch metrics and the market chart concurrently
//!   • Normalize the chart, optionally joining volumes
//!   • Trim single-day windows to the trailing 24 hours
//!
//! Only catalog and input failures abort the cycle. A metrics or chart
//! failure degrades the view and is recorded in [`CoinView::notices`].

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::catalog::{Catalog, CatalogCache};
use crate::coingecko::MarketDataApi;
use crate::error::MarketDataError;
use crate::normalize::{ChartPayload, join_with_volume, normalize, truncate_rows, truncate_trailing};
use crate::types::{
    ChartRow, CoinRef, CurrencyCode, CurrencySet, Metrics, Series, SeriesSummary, WindowSpec,
};

/// What the caller wants to look at.
#[derive(Debug, Clone)]
pub struct ViewRequest {
    /// Catalog label, coin id, or unique name/symbol.
    pub coin: String,
    pub currency: CurrencyCode,
    pub window: WindowSpec,
    pub with_volume: bool,
}

/// Everything one render needs.
#[derive(Debug, Clone, Serialize)]
pub struct CoinView {
    pub coin: CoinRef,
    pub currency: CurrencyCode,
    pub window: WindowSpec,
    /// `None` when metrics could not be fetched; the chart is still shown.
    pub metrics: Option<Metrics>,
    pub summary: Option<SeriesSummary>,
    /// Empty when the chart could not be fetched or holds no samples.
    pub rows: Vec<ChartRow>,
    pub notices: Vec<String>,
}

impl CoinView {
    pub fn has_chart(&self) -> bool {
        !self.rows.is_empty()
    }

    pub fn is_degraded(&self) -> bool {
        !self.notices.is_empty()
    }
}

pub struct DashboardService<A: ?Sized> {
    api: Arc<A>,
    cache: CatalogCache,
}

impl<A: MarketDataApi + ?Sized> DashboardService<A> {
    pub fn new(api: Arc<A>, cache: CatalogCache) -> Self {
        Self { api, cache }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }

    pub async fn catalog(&self) -> Result<Arc<Catalog>, MarketDataError> {
        self.cache.catalog(self.api.as_ref()).await
    }

    pub async fn currencies(&self) -> Arc<CurrencySet> {
        self.cache.currencies(self.api.as_ref()).await
    }

    #[instrument(
        skip_all,
        fields(coin = %req.coin, currency = %req.currency, window = %req.window)
    )]
    pub async fn view(&self, req: &ViewRequest) -> Result<CoinView, MarketDataError> {
        let coin = self.cache.resolve(self.api.as_ref(), &req.coin).await?;

        let currencies = self.currencies().await;
        if !currencies.contains(&req.currency) {
            return Err(MarketDataError::UnsupportedCurrency(req.currency.to_string()));
        }

        let (metrics, chart) = tokio::join!(
            self.api.fetch_metrics(&coin.id, &req.currency),
            self.api.fetch_series(&coin.id, &req.currency, req.window),
        );

        let mut notices = Vec::new();

        let metrics = match metrics {
            Ok(m) => Some(m),
            Err(e) => {
                warn!(coin_id = %coin.id, error = %e, "metrics unavailable; showing chart only");
                notices.push(format!("metrics unavailable: {e}"));
                None
            }
        };

        let chart = chart.and_then(|payload| build_chart(&payload, req, &mut notices));

        let (series, rows) = match chart {
            Ok((series, rows)) if rows.is_empty() => {
                warn!(coin_id = %coin.id, "no price data for this window");
                notices.push(format!("no price data for {}", req.window.describe()));
                (series, rows)
            }
            Ok(chart) => chart,
            Err(e) => {
                warn!(coin_id = %coin.id, error = %e, "price history unavailable");
                notices.push(format!("price history unavailable: {e}"));
                (Series::empty(), Vec::new())
            }
        };

        info!(
            coin_id = %coin.id,
            rows = rows.len(),
            degraded = !notices.is_empty(),
            "view ready"
        );

        Ok(CoinView {
            coin,
            currency: req.currency.clone(),
            window: req.window,
            metrics,
            summary: series.summary(),
            rows,
            notices,
        })
    }
}

/// Normalized series plus the rows to render. Volume is optional: a
/// malformed volume array falls back to price-only rows and adds a
/// notice instead of failing the chart.
fn build_chart(
    payload: &Value,
    req: &ViewRequest,
    notices: &mut Vec<String>,
) -> Result<(Series, Vec<ChartRow>), MarketDataError> {
    let payload = ChartPayload::from_value(payload)?;
    let series = normalize(&payload.prices)?;

    let joined = if req.with_volume {
        match join_with_volume(&series, &payload.total_volumes) {
            Ok(rows) => Some(rows),
            Err(e) => {
                warn!(error = %e, "volume unavailable; showing prices only");
                notices.push(format!("volume unavailable: {e}"));
                None
            }
        }
    } else {
        None
    };
    let rows = joined.unwrap_or_else(|| price_rows(&series));

    match req.window.trailing_trim() {
        Some(trim) => Ok((
            truncate_trailing(&series, trim),
            truncate_rows(&rows, &series, trim),
        )),
        None => Ok((series, rows)),
    }
}

fn price_rows(series: &Series) -> Vec<ChartRow> {
    series
        .iter()
        .map(|p| ChartRow {
            instant: p.instant,
            price: Some(p.price),
            volume: None,
        })
        .collect()
}
