// tests/providers_fixtures.rs
//
// Source adapters driven by recorded upstream payloads (no network).

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Value};

use risk_radar::engine::{
    score_connectivity, score_energy, score_flight, score_news, score_polymarket, score_tanker,
    score_weather,
};
use risk_radar::ingest::providers::{
    connectivity::ConnectivityProvider,
    energy::parse_brent,
    news_rss::NewsRssProvider,
    opensky::{default_tanker_prefixes, FlightProvider, TankerProvider},
    polymarket::parse_search,
    weather::WeatherProvider,
};
use risk_radar::ingest::types::{
    ConnectivityRaw, ConnectivityStatus, EnergyRaw, EnergyStatus, FlightRaw, FlyingCondition,
    NewsRaw, SourceProvider, TankerRaw, WeatherRaw,
};
use risk_radar::ingest::FailureKind;
use risk_radar::Signal;

const NEWS_RSS: &str = include_str!("fixtures/news_rss.xml");
const NEWS_ATOM: &str = include_str!("fixtures/news_atom.xml");
const OPENSKY: &str = include_str!("fixtures/opensky_states.json");
const WEATHER: &str = include_str!("fixtures/weather.json");
const CLOUDFLARE: &str = include_str!("fixtures/cloudflare_timeseries.json");
const BRENT: &str = include_str!("fixtures/alphavantage_brent.json");
const POLYMARKET: &str = include_str!("fixtures/polymarket_search.json");

fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

fn decode<T: serde::de::DeserializeOwned>(v: Value) -> T {
    serde_json::from_value(v).expect("raw record decodes")
}

#[tokio::test]
async fn news_rss_counts_deduped_topic_articles() {
    let p = NewsRssProvider::from_fixture_strs(&[NEWS_RSS]);
    assert_eq!(p.signal(), Signal::News);

    let raw: NewsRaw = decode(p.fetch_latest().await.unwrap());
    assert_eq!(raw.total_count, 5);
    assert_eq!(raw.alert_count, 2);
    assert!(raw.articles.iter().all(|a| a.title.chars().count() <= 100));
    assert!(!raw.articles.iter().any(|a| a.title.contains("Madrid")));
    // entity and markup cleanup
    assert_eq!(raw.articles[0].title, "Iran and Oman hold talks on shipping lanes");

    let scored = score_news(&raw);
    assert_eq!(scored.risk, 14);
    assert_eq!(scored.detail, "5 articles, 2 critical");
}

#[tokio::test]
async fn news_mixes_rss_and_atom_and_skips_broken_feeds() {
    let p = NewsRssProvider::from_fixture_strs(&[NEWS_RSS, "<<<", NEWS_ATOM]);
    let raw: NewsRaw = decode(p.fetch_latest().await.unwrap());
    assert_eq!(raw.total_count, 7);
    assert_eq!(raw.alert_count, 3);
    assert!(raw.articles.iter().any(|a| a.title == "Israel weighs strike options on Iran"));
}

#[tokio::test]
async fn news_fails_only_when_every_feed_fails() {
    let p = NewsRssProvider::from_fixture_strs(&["<<<", "<rss><channel>"]);
    let err = p.fetch_latest().await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Parse);
}

#[tokio::test]
async fn flights_skip_grounded_and_military() {
    let p = FlightProvider::from_fixture_str(OPENSKY);
    let raw: FlightRaw = decode(p.fetch_latest().await.unwrap());
    assert_eq!(raw.aircraft_count, 4);
    assert_eq!(raw.airlines, vec!["THY".to_string(), "SVA".to_string()]);

    let scored = score_flight(&raw);
    assert_eq!(scored.risk, 92);
    assert_eq!(scored.detail, "4 aircraft over Iran");
}

#[tokio::test]
async fn tankers_need_military_address_and_tanker_callsign() {
    let p = TankerProvider::from_fixture_str(OPENSKY, default_tanker_prefixes());
    assert_eq!(p.signal(), Signal::Tanker);
    let raw: TankerRaw = decode(p.fetch_latest().await.unwrap());
    assert_eq!(raw.tanker_count, 2);
    assert_eq!(raw.callsigns, vec!["PEARL21".to_string(), "KC135X".to_string()]);

    let scored = score_tanker(&raw);
    assert_eq!(scored.risk, 20);
    assert_eq!(scored.detail, "1 detected in region");
}

#[tokio::test]
async fn weather_reads_current_conditions() {
    let p = WeatherProvider::from_fixture_str(WEATHER);
    let raw: WeatherRaw = decode(p.fetch_latest().await.unwrap());
    assert_eq!(raw.temp, 22);
    assert_eq!(raw.visibility, 10_000);
    assert_eq!(raw.clouds, 8);
    assert_eq!(raw.condition, FlyingCondition::Favorable);

    let scored = score_weather(&raw);
    assert_eq!(scored.risk, 80);
    assert_eq!(scored.detail, "few clouds");
}

#[tokio::test]
async fn weather_without_main_block_is_a_failure() {
    let p = WeatherProvider::from_fixture_str(r#"{"cod": 401, "message": "Invalid API key"}"#);
    let err = p.fetch_latest().await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::DataQuality);
}

#[tokio::test]
async fn connectivity_drop_is_critical() {
    let p = ConnectivityProvider::from_fixture_str(CLOUDFLARE);
    let raw: ConnectivityRaw = decode(p.fetch_latest().await.unwrap());
    assert_eq!(raw.status, ConnectivityStatus::Critical);
    assert_eq!(raw.risk, 20.0);
    assert_eq!(raw.trend, -60.0);
    assert_eq!(raw.values.len(), 12);

    let scored = score_connectivity(&raw);
    assert_eq!(scored.risk, 76);
    assert_eq!(scored.detail, "CRITICAL (-60.0%)");
}

#[tokio::test]
async fn connectivity_short_series_is_stale_not_stable() {
    let body = json!({"result": {"serie_0": {"values": ["100", "100", "90"]}}}).to_string();
    let p = ConnectivityProvider::from_fixture_str(&body);
    let raw: ConnectivityRaw = decode(p.fetch_latest().await.unwrap());
    assert_eq!(raw.status, ConnectivityStatus::Stale);
    assert_eq!(score_connectivity(&raw).detail, "Data unavailable");
}

#[test]
fn brent_upside_move_is_volatile() {
    // 2026-03-04 is a Wednesday.
    let raw: EnergyRaw = parse_brent(BRENT, at(2026, 3, 4, 10)).unwrap();
    assert_eq!(raw.status, EnergyStatus::Volatile);
    assert_eq!(raw.prices_history.len(), 7);
    assert_eq!(raw.price, 84.0);
    assert_eq!(raw.avg_price, 80.57);
    assert_eq!(raw.change_pct, 4.26);
    assert_eq!(raw.risk, 85);

    let scored = score_energy(&raw);
    assert_eq!(scored.risk, 85);
    assert_eq!(scored.detail, "$84.00 (+4.3%)");
}

#[test]
fn brent_on_weekend_scores_zero() {
    // 2026-03-08 is a Sunday.
    let raw = parse_brent(BRENT, at(2026, 3, 8, 10)).unwrap();
    assert_eq!(raw.status, EnergyStatus::MarketClosed);
    let scored = score_energy(&raw);
    assert_eq!(scored.risk, 0);
    assert_eq!(scored.detail, "$84.00 (Market Closed)");
}

#[test]
fn polymarket_prefers_near_term_exact_match() {
    let raw = parse_search(POLYMARKET, at(2026, 3, 2, 10)).unwrap();
    assert_eq!(raw.odds, 23);
    assert_eq!(raw.market, "US strikes Iran by March 7?");

    let scored = score_polymarket(&raw);
    assert_eq!(scored.risk, 23);
    assert_eq!(scored.detail, "23% odds");
}

#[test]
fn polymarket_without_near_term_market_awaits_data() {
    // Two weeks later nothing in the fixture is within seven days.
    let raw = parse_search(POLYMARKET, at(2026, 3, 16, 10)).unwrap();
    assert_eq!(raw.odds, 0);
    let scored = score_polymarket(&raw);
    assert_eq!(scored.risk, 10);
    assert_eq!(scored.detail, "Awaiting data...");
}

#[test]
fn polymarket_loose_pass_takes_best_iran_market() {
    let body = json!([
        {"title": "Iran ceasefire by March 6?", "markets": [
            {"question": "Iran ceasefire by March 6?", "outcomePrices": ["0.12", "0.88"]},
            {"question": "Iran talks resume by March 6?", "bestAsk": "0.41"}
        ]},
        {"title": "Iran will not retaliate by March 6?", "markets": [
            {"question": "Iran will not retaliate by March 6?", "outcomePrices": ["0.95", "0.05"]}
        ]}
    ])
    .to_string();
    let raw = parse_search(&body, at(2026, 3, 2, 10)).unwrap();
    assert_eq!(raw.odds, 41);
    assert_eq!(raw.market, "Iran talks resume by March 6?");
}

#[test]
fn polymarket_unexpected_shape_is_parse_failure() {
    let err = parse_search(r#"{"events": []}"#, at(2026, 3, 2, 10)).unwrap_err();
    assert_eq!(err.kind(), FailureKind::Parse);
}
