use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::coingecko::MarketDataApi;
use crate::error::MarketDataError;
use crate::types::{CoinRef, CurrencySet};

/// Coin catalog keyed by selection label (`"Bitcoin (BTC)"`), in label
/// order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    by_label: BTreeMap<String, CoinRef>,
}

impl Catalog {
    /// Builds the mapping; when two coins share a label the one listed
    /// last is kept.
    pub fn from_coins(coins: impl IntoIterator<Item = CoinRef>) -> Self {
        let mut by_label = BTreeMap::new();
        let mut collisions = 0usize;

        for coin in coins {
            if by_label.insert(coin.label(), coin).is_some() {
                collisions += 1;
            }
        }

        if collisions > 0 {
            debug!(collisions, "catalog labels collided; kept last-listed coins");
        }

        Self { by_label }
    }

    pub fn get(&self, label: &str) -> Option<&CoinRef> {
        self.by_label.get(label)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&CoinRef> {
        self.by_label.values().find(|c| c.id == id)
    }

    /// Case-insensitive substring match on id, name and symbol.
    pub fn search(&self, query: &str) -> Vec<&CoinRef> {
        let q = query.trim().to_lowercase();
        self.by_label
            .values()
            .filter(|c| {
                c.id.to_lowercase().contains(&q)
                    || c.display_name.to_lowercase().contains(&q)
                    || c.symbol.to_lowercase().contains(&q)
            })
            .collect()
    }

    /// Resolves user input to a single coin.
    ///
    /// Tries, in order: exact label, exact id, then a case-insensitive
    /// exact match on name or symbol. Several name/symbol matches are
    /// reported as ambiguous rather than guessed.
    pub fn resolve(&self, query: &str) -> Result<&CoinRef, MarketDataError> {
        let query = query.trim();

        if let Some(coin) = self.get(query).or_else(|| self.find_by_id(query)) {
            return Ok(coin);
        }

        let matches: Vec<&CoinRef> = self
            .by_label
            .values()
            .filter(|c| {
                c.display_name.eq_ignore_ascii_case(query) || c.symbol.eq_ignore_ascii_case(query)
            })
            .collect();

        match matches.as_slice() {
            [] => Err(MarketDataError::UnknownCoin(query.to_string())),
            [only] => Ok(*only),
            many => {
                let shown: Vec<String> = many.iter().take(5).map(|c| c.id.clone()).collect();
                Err(MarketDataError::InvalidInput(format!(
                    "`{query}` matches {} coins (e.g. {}); pass an id instead",
                    many.len(),
                    shown.join(", ")
                )))
            }
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.by_label.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CoinRef)> {
        self.by_label.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.by_label.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
    }
}

/// Caller-owned memo of the catalog and the supported-currency set.
///
/// Entries live for as long as the cache does; there is no TTL. Failed
/// fetches are not remembered, and neither is the currency fallback, so
/// a later call retries upstream.
#[derive(Clone, Default)]
pub struct CatalogCache {
    catalog: Arc<RwLock<Option<Arc<Catalog>>>>,
    currencies: Arc<RwLock<Option<Arc<CurrencySet>>>>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates the catalog, e.g. with a fixture in tests.
    pub fn seed_catalog(&self, catalog: Catalog) {
        *self.catalog.write() = Some(Arc::new(catalog));
    }

    pub fn seed_currencies(&self, currencies: CurrencySet) {
        *self.currencies.write() = Some(Arc::new(currencies));
    }

    pub fn cached_catalog(&self) -> Option<Arc<Catalog>> {
        self.catalog.read().clone()
    }

    pub fn cached_currencies(&self) -> Option<Arc<CurrencySet>> {
        self.currencies.read().clone()
    }

    /// Returns the memoized catalog, fetching it on first use.
    #[instrument(skip_all, level = "debug")]
    pub async fn catalog<A>(&self, api: &A) -> Result<Arc<Catalog>, MarketDataError>
    where
        A: MarketDataApi + ?Sized,
    {
        if let Some(hit) = self.cached_catalog() {
            return Ok(hit);
        }

        let fetched = Arc::new(api.fetch_catalog().await?);
        info!(coins = fetched.len(), "coin catalog cached");

        // Two concurrent misses both fetch; the first stored value wins so
        // every caller sees the same catalog.
        let mut slot = self.catalog.write();
        Ok(slot.get_or_insert(fetched).clone())
    }

    /// Returns the supported currencies, falling back to the fixed set
    /// when upstream is unavailable. Never fails.
    #[instrument(skip_all, level = "debug")]
    pub async fn currencies<A>(&self, api: &A) -> Arc<CurrencySet>
    where
        A: MarketDataApi + ?Sized,
    {
        if let Some(hit) = self.cached_currencies() {
            return hit;
        }

        let set = api.fetch_supported_currencies().await;
        if set.is_fallback() {
            return Arc::new(set);
        }

        info!(currencies = set.len(), "currency list cached");
        let mut slot = self.currencies.write();
        slot.get_or_insert(Arc::new(set)).clone()
    }

    /// Resolves `query` against the (possibly freshly fetched) catalog.
    pub async fn resolve<A>(&self, api: &A, query: &str) -> Result<CoinRef, MarketDataError>
    where
        A: MarketDataApi + ?Sized,
    {
        let catalog = self.catalog(api).await?;
        catalog.resolve(query).cloned()
    }

    pub fn clear(&self) {
        *self.catalog.write() = None;
        *self.currencies.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(id: &str, name: &str, symbol: &str) -> CoinRef {
        CoinRef {
            id: id.into(),
            display_name: name.into(),
            symbol: symbol.into(),
        }
    }

    fn fixture() -> Catalog {
        Catalog::from_coins(vec![
            coin("bitcoin", "Bitcoin", "btc"),
            coin("ethereum", "Ethereum", "eth"),
            coin("wrapped-bitcoin", "Wrapped Bitcoin", "wbtc"),
            coin("usd-coin", "USDC", "usdc"),
            coin("bridged-usdc", "USDC", "usdc"),
        ])
    }

    #[test]
    fn keyed_by_label_and_last_collision_wins() {
        let catalog = fixture();

        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.get("Bitcoin (BTC)").unwrap().id, "bitcoin");
        assert_eq!(catalog.get("USDC (USDC)").unwrap().id, "bridged-usdc");

        let labels: Vec<&str> = catalog.labels().collect();
        assert_eq!(
            labels,
            vec!["Bitcoin (BTC)", "Ethereum (ETH)", "USDC (USDC)", "Wrapped Bitcoin (WBTC)"]
        );
    }

    #[test]
    fn resolve_tries_label_id_then_name_or_symbol() {
        let catalog = fixture();

        assert_eq!(catalog.resolve("Ethereum (ETH)").unwrap().id, "ethereum");
        assert_eq!(catalog.resolve("wrapped-bitcoin").unwrap().id, "wrapped-bitcoin");
        assert_eq!(catalog.resolve("ETH").unwrap().id, "ethereum");
        assert_eq!(catalog.resolve(" bitcoin ").unwrap().id, "bitcoin");

        assert!(matches!(
            catalog.resolve("dogecoin"),
            Err(MarketDataError::UnknownCoin(q)) if q == "dogecoin"
        ));
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let catalog = fixture();

        let hits: Vec<&str> = catalog.search("BITCOIN").iter().map(|c| c.id.as_str()).collect();

        assert_eq!(hits, vec!["bitcoin", "wrapped-bitcoin"]);
    }

    #[test]
    fn seeded_cache_is_served_without_fetch() {
        let cache = CatalogCache::new();
        assert!(cache.cached_catalog().is_none());

        cache.seed_catalog(fixture());
        cache.seed_currencies(CurrencySet::fallback());

        assert_eq!(cache.cached_catalog().unwrap().len(), 4);
        assert_eq!(cache.cached_currencies().unwrap().len(), 3);

        cache.clear();
        assert!(cache.cached_catalog().is_none());
        assert!(cache.cached_currencies().is_none());
    }
}
