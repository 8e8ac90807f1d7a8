//! Table rendering for the terminal.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color, Table};

use common::time::format_ms;
use market::CoinView;
use market::types::{ChartRow, CoinRef, CurrencyCode, CurrencySet, MarketSummary};

fn new_table(header: Vec<Cell>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(header);
    table
}

pub fn coins_table<'a>(coins: impl IntoIterator<Item = &'a CoinRef>) -> Table {
    let mut table = new_table(vec![Cell::new("Coin"), Cell::new("Id")]);

    for coin in coins {
        table.add_row(vec![coin.label(), coin.id.clone()]);
    }

    table
}

pub fn currencies_table(currencies: &CurrencySet) -> Table {
    let default = currencies.default_choice();
    let mut table = new_table(vec![Cell::new("Code"), Cell::new("Symbol"), Cell::new("")]);

    for code in currencies.iter() {
        let marker = if Some(code) == default { "default" } else { "" };
        table.add_row(vec![code.to_string(), code.symbol(), marker.to_string()]);
    }

    table
}

pub fn top_table(rows: &[MarketSummary], currency: &CurrencyCode) -> Table {
    let mut table = new_table(vec![
        Cell::new("#"),
        Cell::new("Coin"),
        Cell::new("Price").fg(Color::Green),
        Cell::new("24h"),
        Cell::new("Market cap"),
    ]);

    for (rank, row) in rows.iter().enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(row.coin.label()),
            Cell::new(money(row.price, currency)).set_alignment(CellAlignment::Right),
            change_cell(row.change_24h_pct),
            Cell::new(compact(row.market_cap, currency)).set_alignment(CellAlignment::Right),
        ]);
    }

    table
}

/// Headline numbers; `None` when neither metrics nor a chart summary
/// are available.
pub fn metrics_table(view: &CoinView) -> Option<Table> {
    if view.metrics.is_none() && view.summary.is_none() {
        return None;
    }

    let cur = &view.currency;
    let mut table = new_table(vec![Cell::new(view.coin.label()), Cell::new("")]);

    if let Some(m) = &view.metrics {
        table.add_row(vec![Cell::new("Price"), Cell::new(money(m.price, cur))]);
        table.add_row(vec![Cell::new("24h change"), change_cell(Some(m.change_24h_pct))]);
        table.add_row(vec![Cell::new("Market cap"), Cell::new(compact(m.market_cap, cur))]);
    }

    if let Some(s) = &view.summary {
        let window = view.window.describe();
        table.add_row(vec![Cell::new(format!("Low ({window})")), Cell::new(money(s.min, cur))]);
        table.add_row(vec![Cell::new(format!("High ({window})")), Cell::new(money(s.max, cur))]);
        table.add_row(vec![Cell::new(format!("Change ({window})")), change_cell(s.change_pct)]);
    }

    Some(table)
}

/// Price history, evenly sampled down to at most `max_rows` rows.
pub fn series_table(rows: &[ChartRow], currency: &CurrencyCode, max_rows: usize) -> Table {
    let with_volume = rows.iter().any(|r| r.volume.is_some());

    let mut header = vec![Cell::new("Time (UTC)"), Cell::new("Price").fg(Color::Green)];
    if with_volume {
        header.push(Cell::new("Volume"));
    }
    let mut table = new_table(header);

    for row in sample_evenly(rows, max_rows) {
        let mut cells = vec![
            Cell::new(format_ms(row.instant)),
            Cell::new(row.price.map_or_else(|| "-".to_string(), |p| money(p, currency)))
                .set_alignment(CellAlignment::Right),
        ];
        if with_volume {
            cells.push(
                Cell::new(row.volume.map_or_else(|| "-".to_string(), |v| compact(v, currency)))
                    .set_alignment(CellAlignment::Right),
            );
        }
        table.add_row(cells);
    }

    table
}

/// Picks `n` items spread evenly over `items`. The last item is always
/// kept, and the first too when `n >= 2`.
pub fn sample_evenly<T: Copy>(items: &[T], n: usize) -> Vec<T> {
    match (items.len(), n) {
        (_, 0) | (0, _) => Vec::new(),
        (len, n) if n >= len => items.to_vec(),
        (len, 1) => vec![items[len - 1]],
        (len, n) => (0..n).map(|i| items[i * (len - 1) / (n - 1)]).collect(),
    }
}

pub fn money(value: f64, currency: &CurrencyCode) -> String {
    let decimals = if value.abs() >= 1.0 { 2 } else { 6 };
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{}{}.{frac}", currency.symbol(), group_thousands(int))
}

/// Large amounts as `1.23T`, `456.70B`, `12.00M`.
pub fn compact(value: f64, currency: &CurrencyCode) -> String {
    const UNITS: [(f64, &str); 3] = [(1e12, "T"), (1e9, "B"), (1e6, "M")];

    UNITS
        .iter()
        .find(|(scale, _)| value.abs() >= *scale)
        .map(|(scale, unit)| format!("{}{:.2}{unit}", currency.symbol(), value / scale))
        .unwrap_or_else(|| money(value, currency))
}

fn change_cell(pct: Option<f64>) -> Cell {
    let cell = match pct {
        Some(p) if p > 0.0 => Cell::new(format!("+{p:.2}%")).fg(Color::Green),
        Some(p) if p < 0.0 => Cell::new(format!("{p:.2}%")).fg(Color::Red),
        Some(p) => Cell::new(format!("{p:.2}%")),
        None => Cell::new("-"),
    };
    cell.set_alignment(CellAlignment::Right)
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
