//! Series normalization.
//!
//! Upstream chart payloads carry `[instant_ms, value]` pairs. They are
//! usually sorted, but nothing here relies on it:
//!
//! ```text
//! raw pairs ──parse──▶ stable sort by instant ──dedup (last wins)──▶ Series
//! ```
//!
//! Everything in this module is pure; fetching lives in
//! [`crate::coingecko`].

use chrono::TimeDelta;
use serde_json::Value;

use crate::error::MarketDataError;
use crate::types::{ChartRow, PricePoint, Series};

const CHART_ENDPOINT: &str = "/coins/{id}/market_chart";

/// Floats that convert to `i64` without saturating. `i64::MAX as f64`
/// rounds up to 2^63, hence the open upper bound.
const I64_RANGE: std::ops::Range<f64> = (i64::MIN as f64)..(i64::MAX as f64);

/// The arrays of a market-chart payload, still in raw pair form.
#[derive(Debug, Clone, Default)]
pub struct ChartPayload {
    pub prices: Vec<Value>,
    pub total_volumes: Vec<Value>,
    pub market_caps: Vec<Value>,
}

impl ChartPayload {
    /// `prices` is required; the volume and market-cap arrays default to
    /// empty when absent.
    pub fn from_value(payload: &Value) -> Result<Self, MarketDataError> {
        let prices = payload
            .get("prices")
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| MarketDataError::missing(CHART_ENDPOINT, "prices"))?;

        let optional = |key: &str| {
            payload
                .get(key)
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default()
        };

        Ok(Self {
            prices,
            total_volumes: optional("total_volumes"),
            market_caps: optional("market_caps"),
        })
    }
}

/// Parses, sorts and de-duplicates raw `[instant, value]` pairs.
///
/// Entries sharing an instant resolve to the one listed last.
pub fn normalize(raw: &[Value]) -> Result<Series, MarketDataError> {
    let mut points = raw
        .iter()
        .enumerate()
        .map(|(index, entry)| parse_pair(index, entry))
        .collect::<Result<Vec<_>, _>>()?;

    // Stable: equal instants keep their input order, so the last one
    // listed is also the last one in its run.
    points.sort_by_key(|p| p.instant);

    let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
    for point in points {
        match deduped.last_mut() {
            Some(last) if last.instant == point.instant => *last = point,
            _ => deduped.push(point),
        }
    }

    Ok(Series::from_sorted(deduped))
}

/// Full outer join of a series with a raw volume array, keyed by instant.
///
/// Volumes go through [`normalize`] first. A side with no sample at an
/// instant is `None`, never zero.
pub fn join_with_volume(
    price_series: &Series,
    raw_volumes: &[Value],
) -> Result<Vec<ChartRow>, MarketDataError> {
    let volumes = normalize(raw_volumes)?;

    let mut prices = price_series.iter().peekable();
    let mut vols = volumes.iter().peekable();
    let mut rows = Vec::with_capacity(price_series.len().max(volumes.len()));

    loop {
        let next_price = prices.peek().copied().copied();
        let next_volume = vols.peek().copied().copied();

        let row = match (next_price, next_volume) {
            (None, None) => break,
            (Some(p), None) => {
                prices.next();
                chart_row(p.instant, Some(p.price), None)
            }
            (None, Some(v)) => {
                vols.next();
                chart_row(v.instant, None, Some(v.price))
            }
            (Some(p), Some(v)) if p.instant < v.instant => {
                prices.next();
                chart_row(p.instant, Some(p.price), None)
            }
            (Some(p), Some(v)) if v.instant < p.instant => {
                vols.next();
                chart_row(v.instant, None, Some(v.price))
            }
            (Some(p), Some(v)) => {
                prices.next();
                vols.next();
                chart_row(p.instant, Some(p.price), Some(v.price))
            }
        };
        rows.push(row);
    }

    Ok(rows)
}

/// Keeps the samples within `duration` of the newest one.
///
/// An empty series is returned unchanged.
pub fn truncate_trailing(series: &Series, duration: TimeDelta) -> Series {
    let Some(max_instant) = series.max_instant() else {
        return Series::empty();
    };
    let cutoff = max_instant.saturating_sub(duration.num_milliseconds());

    Series::from_sorted(
        series
            .iter()
            .filter(|p| p.instant >= cutoff)
            .copied()
            .collect(),
    )
}

/// Same cut as [`truncate_trailing`], applied to joined rows.
///
/// The cut is anchored on the newest price in `series`, so rows and
/// series cover the same window and a late volume-only sample cannot
/// shift it. Without prices the newest row is the anchor.
pub fn truncate_rows(rows: &[ChartRow], series: &Series, duration: TimeDelta) -> Vec<ChartRow> {
    let newest = series
        .max_instant()
        .or_else(|| rows.iter().map(|r| r.instant).max());
    let Some(newest) = newest else {
        return Vec::new();
    };
    let cutoff = newest.saturating_sub(duration.num_milliseconds());

    rows.iter().filter(|r| r.instant >= cutoff).copied().collect()
}

fn chart_row(instant: i64, price: Option<f64>, volume: Option<f64>) -> ChartRow {
    ChartRow {
        instant,
        price,
        volume,
    }
}

fn parse_pair(index: usize, entry: &Value) -> Result<PricePoint, MarketDataError> {
    let pair = entry
        .as_array()
        .ok_or_else(|| MarketDataError::malformed(index, "expected a [instant, value] array"))?;

    let [instant, value] = pair.as_slice() else {
        return Err(MarketDataError::malformed(
            index,
            format!("expected 2 elements, got {}", pair.len()),
        ));
    };

    let instant = instant
        .as_i64()
        .or_else(|| {
            instant
                .as_f64()
                .filter(|f| f.fract() == 0.0 && I64_RANGE.contains(f))
                .map(|f| f as i64)
        })
        .ok_or_else(|| MarketDataError::malformed(index, "instant is not an integer"))?;

    let price = value
        .as_f64()
        .ok_or_else(|| MarketDataError::malformed(index, "value is not a number"))?;

    Ok(PricePoint { instant, price })
}
