mod stub_server;

use std::time::Duration;

use serde_json::json;
use tracing_test::traced_test;

use market::{
    CoinGeckoClient, MarketDataApi, MarketDataError, NetworkError,
    types::{CurrencyCode, CurrencySet, Interval, WindowSpec},
};
use stub_server::{Reply, StubServer};

fn client(server: &StubServer) -> CoinGeckoClient {
    CoinGeckoClient::new(&server.base_url, Duration::from_millis(500)).unwrap()
}

fn usd() -> CurrencyCode {
    CurrencyCode::new("usd").unwrap()
}

#[tokio::test]
async fn catalog_is_keyed_by_label() {
    let server = StubServer::start(vec![(
        "/coins/list",
        Reply::ok(json!([
            {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin"},
            {"id": "ethereum", "symbol": "eth", "name": "Ethereum"}
        ])),
    )])
    .await;

    let catalog = client(&server).fetch_catalog().await.unwrap();

    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.get("Bitcoin (BTC)").unwrap().id, "bitcoin");
    assert_eq!(catalog.find_by_id("ethereum").unwrap().symbol, "eth");
}

#[tokio::test]
async fn non_success_status_is_network_error() {
    let server = StubServer::start(vec![(
        "/coins/list",
        Reply::Json(429, r#"{"status":{"error_code":429}}"#.into()),
    )])
    .await;

    let err = client(&server).fetch_catalog().await.unwrap_err();

    assert!(matches!(
        err,
        MarketDataError::Network(NetworkError::Status { status: 429, .. })
    ));
}

#[tokio::test]
async fn undecodable_body_is_network_error() {
    let server = StubServer::start(vec![(
        "/coins/list",
        Reply::Json(200, "<html>maintenance</html>".into()),
    )])
    .await;

    let err = client(&server).fetch_catalog().await.unwrap_err();

    assert!(err.is_network());
}

#[tokio::test]
async fn catalog_entry_without_name_is_missing_field() {
    let server = StubServer::start(vec![(
        "/coins/list",
        Reply::ok(json!([{"id": "bitcoin", "symbol": "btc"}])),
    )])
    .await;

    let err = client(&server).fetch_catalog().await.unwrap_err();

    assert!(err.is_missing_field());
}

#[tokio::test]
async fn currency_list_skips_invalid_codes() {
    let server = StubServer::start(vec![(
        "/simple/supported_vs_currencies",
        Reply::ok(json!(["usd", "EUR", "", "btc"])),
    )])
    .await;

    let set = client(&server).fetch_currency_list().await.unwrap();

    assert_eq!(set.len(), 3);
    assert!(!set.is_fallback());
    assert!(set.contains(&CurrencyCode::new("eur").unwrap()));
}

#[tokio::test]
#[traced_test]
async fn currency_timeout_falls_back() {
    let server = StubServer::start(vec![("/simple/supported_vs_currencies", Reply::Hang)]).await;
    let client = CoinGeckoClient::new(&server.base_url, Duration::from_millis(200)).unwrap();

    let err = client.fetch_currency_list().await.unwrap_err();
    assert!(matches!(
        err,
        MarketDataError::Network(NetworkError::Timeout { .. })
    ));

    let set = client.fetch_supported_currencies().await;

    let codes: Vec<&str> = set.iter().map(CurrencyCode::as_str).collect();
    assert_eq!(codes, vec!["eur", "inr", "usd"]);
    assert_eq!(set.len(), CurrencySet::fallback().len());
    assert!(set.is_fallback());
    assert!(logs_contain("falling back"));
}

#[tokio::test]
async fn metrics_read_from_coin_endpoint() {
    let server = StubServer::start(vec![(
        "/coins/bitcoin",
        Reply::ok(json!({
            "id": "bitcoin",
            "market_data": {
                "current_price": {"usd": 64000.0},
                "price_change_percentage_24h": 1.5,
                "market_cap": {"usd": 1.2e12}
            }
        })),
    )])
    .await;

    let metrics = client(&server).fetch_metrics("bitcoin", &usd()).await.unwrap();

    assert_eq!(metrics.price, 64000.0);
    assert_eq!(metrics.change_24h_pct, 1.5);

    let target = &server.requests()[0];
    assert!(target.starts_with("/coins/bitcoin?"));
    assert!(target.contains("localization=false"));
    assert!(target.contains("tickers=false"));
    assert!(target.contains("market_data=true"));
}

#[tokio::test]
async fn metrics_for_unknown_coin_is_missing_field() {
    let server = StubServer::start(vec![(
        "/coins/doesnotexist",
        Reply::ok(json!({"id": "doesnotexist", "market_data": {"current_price": {}}})),
    )])
    .await;

    let err = client(&server)
        .fetch_metrics("doesnotexist", &usd())
        .await
        .unwrap_err();

    match err {
        MarketDataError::MissingField { field, .. } => {
            assert_eq!(field, "market_data.current_price.usd")
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn invalid_coin_id_never_reaches_upstream() {
    let server = StubServer::start(vec![]).await;

    let err = client(&server)
        .fetch_metrics("../coins/list", &usd())
        .await
        .unwrap_err();

    assert!(matches!(err, MarketDataError::InvalidInput(_)));
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn one_day_window_requests_two_days() {
    let server = StubServer::start(vec![(
        "/coins/bitcoin/market_chart",
        Reply::ok(json!({"prices": [[1000, 1.0]], "total_volumes": [], "market_caps": []})),
    )])
    .await;
    let client = client(&server);

    let payload = client
        .fetch_series("bitcoin", &usd(), WindowSpec::Days(1))
        .await
        .unwrap();
    assert_eq!(payload["prices"][0][1], 1.0);

    client
        .fetch_series_with_interval("bitcoin", &usd(), WindowSpec::Max, Some(Interval::Daily))
        .await
        .unwrap();

    let requests = server.requests();
    assert!(requests[0].contains("vs_currency=usd"));
    assert!(requests[0].contains("days=2"));
    assert!(!requests[0].contains("interval"));
    assert!(requests[1].contains("days=max"));
    assert!(requests[1].contains("interval=daily"));
}

#[tokio::test]
async fn simple_price_metrics() {
    let server = StubServer::start(vec![(
        "/simple/price",
        Reply::ok(json!({
            "ethereum": {"usd": 3100.0, "usd_24h_change": -0.4, "usd_market_cap": 3.7e11}
        })),
    )])
    .await;

    let metrics = client(&server)
        .fetch_simple_metrics("ethereum", &usd())
        .await
        .unwrap();

    assert_eq!(metrics.price, 3100.0);
    assert_eq!(metrics.change_24h_pct, -0.4);

    let target = &server.requests()[0];
    assert!(target.contains("ids=ethereum"));
    assert!(target.contains("include_market_cap=true"));
}

#[tokio::test]
async fn top_coins_clamps_page_size_and_skips_unpriced() {
    let server = StubServer::start(vec![(
        "/coins/markets",
        Reply::ok(json!([
            {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin",
             "current_price": 64000.0, "market_cap": 1.2e12, "price_change_percentage_24h": 0.8},
            {"id": "fresh", "symbol": "frs", "name": "Fresh",
             "current_price": null, "market_cap": null, "price_change_percentage_24h": null}
        ])),
    )])
    .await;

    let rows = client(&server).fetch_top_coins(&usd(), 1000).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].coin.label(), "Bitcoin (BTC)");

    let target = &server.requests()[0];
    assert!(target.contains("per_page=250"));
    assert!(target.contains("order=market_cap_desc"));
}
