use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::MarketDataError;

/// A coin as listed by the upstream catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinRef {
    /// Stable upstream identifier (e.g. `"bitcoin"`).
    pub id: String,
    pub display_name: String,
    pub symbol: String,
}

impl CoinRef {
    /// Selection label, e.g. `"Bitcoin (BTC)"`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.display_name, self.symbol.to_uppercase())
    }
}

/// Lowercase currency ticker understood by the upstream API.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(raw: &str) -> Result<Self, MarketDataError> {
        let code = raw.trim().to_lowercase();
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(MarketDataError::InvalidInput(format!(
                "`{raw}` is not a currency code"
            )));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display symbol for common fiat codes, the uppercase code otherwise.
    pub fn symbol(&self) -> String {
        let known = match self.0.as_str() {
            "usd" => "$",
            "inr" => "₹",
            "eur" => "€",
            "jpy" | "cny" => "¥",
            "gbp" => "£",
            "aud" => "A$",
            "cad" => "C$",
            "krw" => "₩",
            "rub" => "₽",
            "brl" => "R$",
            _ => return self.0.to_uppercase(),
        };
        known.to_string()
    }
}

impl FromStr for CurrencyCode {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Currencies accepted for pricing, ordered alphabetically.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct CurrencySet {
    codes: BTreeSet<CurrencyCode>,
    #[serde(skip)]
    fallback: bool,
}

impl CurrencySet {
    pub const FALLBACK: [&'static str; 3] = ["usd", "inr", "eur"];

    /// The fixed set used when the upstream list cannot be fetched.
    pub fn fallback() -> Self {
        Self {
            codes: Self::FALLBACK
                .iter()
                .map(|c| CurrencyCode(c.to_string()))
                .collect(),
            fallback: true,
        }
    }

    /// True for the set built by [`CurrencySet::fallback`], false for a
    /// list that came from upstream.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    pub fn contains(&self, code: &CurrencyCode) -> bool {
        self.codes.contains(code)
    }

    /// `usd` when available, otherwise the first code in order.
    pub fn default_choice(&self) -> Option<&CurrencyCode> {
        self.codes
            .iter()
            .find(|c| c.as_str() == "usd")
            .or_else(|| self.codes.iter().next())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CurrencyCode> {
        self.codes.iter()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl FromIterator<CurrencyCode> for CurrencySet {
    fn from_iter<I: IntoIterator<Item = CurrencyCode>>(iter: I) -> Self {
        Self {
            codes: iter.into_iter().collect(),
            fallback: false,
        }
    }
}

/// Point-in-time metrics for one coin, all in the same currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    pub price: f64,
    pub change_24h_pct: f64,
    pub market_cap: f64,
}

/// One row of the top-coins-by-market-cap listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSummary {
    pub coin: CoinRef,
    pub price: f64,
    pub change_24h_pct: Option<f64>,
    pub market_cap: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricePoint {
    /// Milliseconds since the Unix epoch, as supplied upstream.
    pub instant: i64,
    pub price: f64,
}

impl PricePoint {
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.instant)
    }
}

/// Time-ascending samples with unique instants.
///
/// Only the normalizer builds a `Series`, so the ordering invariant holds
/// for every value of this type.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Series(Vec<PricePoint>);

impl Series {
    pub(crate) fn from_sorted(points: Vec<PricePoint>) -> Self {
        debug_assert!(points.windows(2).all(|w| w[0].instant < w[1].instant));
        Self(points)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PricePoint> {
        self.0.iter()
    }

    pub fn max_instant(&self) -> Option<i64> {
        self.0.last().map(|p| p.instant)
    }

    /// Back to upstream `[instant, price]` pair form.
    pub fn to_raw(&self) -> Vec<Value> {
        self.0.iter().map(|p| json!([p.instant, p.price])).collect()
    }

    pub fn summary(&self) -> Option<SeriesSummary> {
        let first = self.0.first()?;
        let last = self.0.last()?;

        let (min, max) = self
            .0
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.price), hi.max(p.price))
            });

        let change_pct = (first.price != 0.0)
            .then(|| (last.price - first.price) / first.price * 100.0);

        Some(SeriesSummary {
            first: *first,
            last: *last,
            min,
            max,
            change_pct,
        })
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a PricePoint;
    type IntoIter = std::slice::Iter<'a, PricePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub first: PricePoint,
    pub last: PricePoint,
    pub min: f64,
    pub max: f64,
    /// `None` when the first price is zero.
    pub change_pct: Option<f64>,
}

/// A series sample joined with the volume traded at the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartRow {
    pub instant: i64,
    pub price: Option<f64>,
    pub volume: Option<f64>,
}

/// Requested chart window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowSpec {
    Days(u32),
    Max,
}

impl WindowSpec {
    /// Hourly granularity is only served above one day, so single-day
    /// windows ask for two days and are trimmed afterwards.
    pub const MIN_HOURLY_DAYS: u32 = 2;

    /// Value of the upstream `days` query parameter.
    pub fn upstream_days(&self) -> String {
        match self {
            Self::Days(n) if *n < Self::MIN_HOURLY_DAYS => Self::MIN_HOURLY_DAYS.to_string(),
            Self::Days(n) => n.to_string(),
            Self::Max => "max".to_string(),
        }
    }

    /// Trailing span the fetched series must be cut to, if any.
    pub fn trailing_trim(&self) -> Option<TimeDelta> {
        match self {
            Self::Days(n) if *n < Self::MIN_HOURLY_DAYS => Some(TimeDelta::days(1)),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Days(1) => "24 hours".to_string(),
            Self::Days(n) => format!("{n} days"),
            Self::Max => "all time".to_string(),
        }
    }
}

impl FromStr for WindowSpec {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("max") {
            return Ok(Self::Max);
        }
        match s.parse::<u32>() {
            Ok(0) | Err(_) => Err(MarketDataError::InvalidInput(format!(
                "window `{s}` must be a positive number of days or `max`"
            ))),
            Ok(n) => Ok(Self::Days(n)),
        }
    }
}

impl fmt::Display for WindowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Days(n) => write!(f, "{n}"),
            Self::Max => f.write_str("max"),
        }
    }
}

/// Optional sampling interval of the market-chart endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Hourly,
    Daily,
}

impl Interval {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
        }
    }
}
