// src/ingest/providers/energy.rs
//! Brent crude upside volatility against a short moving average.
//!
//! Only price jumps count; a price below its average yields zero. Upstream
//! notices (rate limits, bad key) and short series produce a `STALE` record
//! instead of a failure.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDateTime, Weekday};
use serde_json::Value;

use crate::ingest::providers::{iso, local_now};
use crate::ingest::types::{to_raw_value, EnergyRaw, EnergyStatus, SourceProvider};
use crate::ingest::{take_chars, FetchError};
use crate::signal::Signal;

pub const BASE_URL: &str = "https://www.alphavantage.co/query";

/// Relative jump treated as a full-scale move.
pub const CRITICAL_CHANGE: f64 = 0.05;
pub const VOLATILE_CHANGE: f64 = 0.02;
const WINDOW: usize = 7;
const MIN_PRICES: usize = 2;

enum Source {
    Fixture(String),
    Http {
        url: String,
        client: reqwest::Client,
    },
}

pub struct EnergyProvider {
    source: Source,
}

impl EnergyProvider {
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            source: Source::Fixture(s.to_string()),
        }
    }

    pub fn new(api_key: &str, client: reqwest::Client) -> Self {
        Self {
            source: Source::Http {
                url: format!("{BASE_URL}?function=BRENT&interval=daily&apikey={api_key}"),
                client,
            },
        }
    }
}

#[async_trait]
impl SourceProvider for EnergyProvider {
    async fn fetch_latest(&self) -> Result<Value, FetchError> {
        let now = local_now();
        let body = match &self.source {
            Source::Fixture(s) => s.clone(),
            Source::Http { url, client } => {
                let resp = client.get(url.as_str()).send().await?;
                let status = resp.status();
                if !status.is_success() {
                    tracing::warn!(provider = "Energy", status = status.as_u16(), "commodity API error");
                    return to_raw_value(&stale(format!("API returned {}", status.as_u16()), now));
                }
                resp.text().await?
            }
        };
        to_raw_value(&parse_brent(&body, now)?)
    }

    fn signal(&self) -> Signal {
        Signal::Energy
    }

    fn name(&self) -> &'static str {
        "Energy"
    }
}

fn is_weekend(now: NaiveDateTime) -> bool {
    matches!(now.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn stale(error: String, now: NaiveDateTime) -> EnergyRaw {
    EnergyRaw {
        status: EnergyStatus::Stale,
        market_closed: is_weekend(now),
        timestamp: iso(now),
        error: Some(error),
        ..EnergyRaw::default()
    }
}

fn round_to(v: f64, places: i32) -> f64 {
    let f = 10f64.powi(places);
    (v * f).round() / f
}

/// Parse a daily commodity response (newest first).
pub fn parse_brent(body: &str, now: NaiveDateTime) -> Result<EnergyRaw, FetchError> {
    let data: Value = serde_json::from_str(body)?;

    for key in ["Error Message", "Note", "Information"] {
        if let Some(msg) = data.get(key) {
            let msg = msg.as_str().unwrap_or("API limit reached");
            tracing::warn!(provider = "Energy", message = %take_chars(msg, 100), "commodity API notice");
            return Ok(stale(take_chars(msg, 100), now));
        }
    }

    let prices: Vec<f64> = data
        .get("data")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .take(WINDOW)
                .filter_map(|r| r.get("value").and_then(Value::as_str))
                .filter(|v| !v.is_empty() && *v != ".")
                .filter_map(|v| v.trim().parse::<f64>().ok())
                .collect()
        })
        .unwrap_or_default();

    if prices.is_empty() {
        return Ok(stale("No price data".into(), now));
    }
    if prices.len() < MIN_PRICES {
        return Ok(stale("Insufficient data points".into(), now));
    }
    Ok(energy_metrics(&prices, is_weekend(now), now))
}

/// Volatility metrics for `prices` (current price first).
pub fn energy_metrics(prices: &[f64], market_closed: bool, now: NaiveDateTime) -> EnergyRaw {
    let current = prices[0];
    let avg = prices.iter().sum::<f64>() / prices.len() as f64;
    let mut change = if avg > 0.0 { (current - avg) / avg } else { 0.0 };
    let index = if change < 0.0 {
        change = 0.0;
        0.0
    } else {
        (change / CRITICAL_CHANGE).min(1.0)
    };

    let status = if market_closed {
        EnergyStatus::MarketClosed
    } else if change >= CRITICAL_CHANGE {
        EnergyStatus::Critical
    } else if change >= VOLATILE_CHANGE {
        EnergyStatus::Volatile
    } else {
        EnergyStatus::Stable
    };

    EnergyRaw {
        status,
        risk: (index * 100.0).round() as u32,
        price: round_to(current, 2),
        avg_price: round_to(avg, 2),
        change_pct: round_to(change * 100.0, 2),
        volatility_index: round_to(index, 3),
        market_closed,
        prices_history: prices.iter().take(WINDOW).map(|p| round_to(*p, 2)).collect(),
        timestamp: iso(now),
        error: None,
    }
}
