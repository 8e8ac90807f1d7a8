//! Market data for the coinwatch dashboard: an upstream pricing client,
//! a series normalizer and the render cycle that ties them together.

pub mod catalog;
pub mod coingecko;
pub mod error;
pub mod normalize;
pub mod service;
pub mod types;

pub use catalog::{Catalog, CatalogCache};
pub use coingecko::{CoinGeckoClient, MarketDataApi};
pub use error::{MarketDataError, NetworkError};
pub use service::{CoinView, DashboardService, ViewRequest};
