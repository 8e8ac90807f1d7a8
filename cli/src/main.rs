pub mod cli;
mod render;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{Instrument, Span, info};

use cli::*;
use common::config::AppConfig;
use common::logger::{TraceId, child_span, init_logger, root_span, warn_if_slow};
use common::time::{format_ms, now_ms};
use market::{CatalogCache, CoinGeckoClient, DashboardService, ViewRequest};

/// A cycle slower than this is logged even when it succeeds.
const SLOW_CYCLE: Duration = Duration::from_secs(3);

type Service = DashboardService<CoinGeckoClient>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_env();

    init_logger("coinwatch", config.json_logs);

    let client = Arc::new(CoinGeckoClient::new(cli.base_url(&config), cli.timeout(&config))?);
    let service = DashboardService::new(Arc::clone(&client), CatalogCache::new());

    let trace_id = TraceId::default();
    let span = root_span("coinwatch", &trace_id);

    info!(parent: &span, base_url = %client.base_url(), "starting");

    warn_if_slow("render cycle", SLOW_CYCLE, run(cli.command, &config, &service))
        .instrument(span)
        .await
}

async fn run(command: Command, config: &AppConfig, service: &Service) -> anyhow::Result<()> {
    match command {
        Command::Coins { search, limit } => {
            let catalog = service.catalog().await?;

            let coins: Vec<_> = match search.as_deref() {
                Some(q) => catalog.search(q),
                None => catalog.iter().map(|(_, coin)| coin).collect(),
            };

            println!("{}", render::coins_table(coins.iter().take(limit).copied()));
            println!("{} of {} coins", coins.len().min(limit), coins.len());
        }

        Command::Currencies => {
            let currencies = service.currencies().await;
            println!("{}", render::currencies_table(&currencies));
        }

        Command::Top { currency, limit } => {
            let currency = pick_currency(currency.as_deref(), config)?;
            let rows = service.api().fetch_top_coins(&currency, limit).await?;

            println!("{}", render::top_table(&rows, &currency));
        }

        Command::Show {
            coin,
            currency,
            days,
            volume,
            rows,
            json,
        } => {
            let req = ViewRequest {
                coin,
                currency: pick_currency(currency.as_deref(), config)?,
                window: pick_window(days.as_deref(), config)?,
                with_volume: volume,
            };

            let view = service.view(&req).await?;
            Span::current().record("coin_id", view.coin.id.as_str());

            let _render = child_span("render").entered();

            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
                return Ok(());
            }

            if let Some(table) = render::metrics_table(&view) {
                println!("{table}");
            }
            if view.has_chart() {
                println!("{}", render::series_table(&view.rows, &view.currency, rows));
            }
            for notice in &view.notices {
                eprintln!("note: {notice}");
            }
            println!("as of {} UTC", format_ms(now_ms()));
        }
    }

    Ok(())
}
