// src/ingest/providers/connectivity.rs
//! Regional HTTP traffic trend from a timeseries endpoint.
//!
//! The series is split into a baseline (first 75%) and a recent tail (last
//! 25%); the relative change of the averages picks one of four tiers. Short
//! or empty series produce an explicit `STALE` record.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::Value;

use crate::ingest::providers::{iso, local_now};
use crate::ingest::types::{to_raw_value, ConnectivityRaw, ConnectivityStatus, SourceProvider};
use crate::ingest::FetchError;
use crate::signal::Signal;

pub const TIMESERIES_URL: &str =
    "https://api.cloudflare.com/client/v4/radar/http/timeseries?location=IR&dateRange=1d";

pub const MIN_POINTS: usize = 8;
const BASELINE_SHARE: f64 = 0.75;

enum Source {
    Fixture(String),
    Http {
        url: String,
        token: Option<String>,
        client: reqwest::Client,
    },
}

pub struct ConnectivityProvider {
    source: Source,
}

impl ConnectivityProvider {
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            source: Source::Fixture(s.to_string()),
        }
    }

    pub fn new(token: Option<String>, client: reqwest::Client) -> Self {
        Self {
            source: Source::Http {
                url: TIMESERIES_URL.to_string(),
                token,
                client,
            },
        }
    }
}

#[async_trait]
impl SourceProvider for ConnectivityProvider {
    async fn fetch_latest(&self) -> Result<Value, FetchError> {
        let now = local_now();
        let body = match &self.source {
            Source::Fixture(s) => s.clone(),
            Source::Http { url, token, client } => {
                let token = token
                    .as_deref()
                    .ok_or(FetchError::MissingCredential("CLOUDFLARE_RADAR_TOKEN"))?;
                let resp = client.get(url.as_str()).bearer_auth(token).send().await?;
                let status = resp.status();
                if !status.is_success() {
                    tracing::warn!(provider = "Connectivity", status = status.as_u16(), "timeseries API error");
                    return to_raw_value(&stale(
                        Vec::new(),
                        format!("API returned {}", status.as_u16()),
                        now,
                    ));
                }
                resp.text().await?
            }
        };
        to_raw_value(&parse_timeseries(&body, now)?)
    }

    fn signal(&self) -> Signal {
        Signal::Connectivity
    }

    fn name(&self) -> &'static str {
        "Connectivity"
    }
}

fn stale(values: Vec<f64>, error: String, now: NaiveDateTime) -> ConnectivityRaw {
    ConnectivityRaw {
        status: ConnectivityStatus::Stale,
        risk: 0.0,
        trend: 0.0,
        values,
        timestamp: iso(now),
        error: Some(error),
    }
}

/// Values may arrive as numbers or numeric strings; anything else is skipped.
fn series_values(data: &Value) -> Vec<f64> {
    data.pointer("/result/serie_0/values")
        .and_then(Value::as_array)
        .map(|vals| {
            vals.iter()
                .filter_map(|v| match v {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse().ok(),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Tier for a relative traffic change (`-0.5` = halved).
pub fn classify(trend: f64) -> (ConnectivityStatus, f64) {
    if trend <= -0.90 {
        (ConnectivityStatus::Blackout, 25.0)
    } else if trend <= -0.50 {
        (ConnectivityStatus::Critical, 20.0)
    } else if trend <= -0.15 {
        (ConnectivityStatus::Anomalous, 10.0)
    } else {
        (ConnectivityStatus::Stable, 0.0)
    }
}

pub fn parse_timeseries(body: &str, now: NaiveDateTime) -> Result<ConnectivityRaw, FetchError> {
    let data: Value = serde_json::from_str(body)?;
    let values = series_values(&data);

    if values.is_empty() {
        return Ok(stale(values, "No data points returned".into(), now));
    }
    if values.len() < MIN_POINTS {
        return Ok(stale(values, "Not enough data points".into(), now));
    }

    let split = (values.len() as f64 * BASELINE_SHARE) as usize;
    let (baseline, recent) = values.split_at(split);
    let avg = |xs: &[f64]| xs.iter().sum::<f64>() / xs.len() as f64;
    let base_avg = avg(baseline);
    let recent_avg = avg(recent);
    let trend = if base_avg > 0.0 {
        (recent_avg - base_avg) / base_avg
    } else {
        0.0
    };
    let (status, risk) = classify(trend);
    tracing::debug!(base_avg, recent_avg, trend, status = status.as_str(), "connectivity trend");

    Ok(ConnectivityRaw {
        status,
        risk,
        trend: (trend * 1000.0).round() / 10.0,
        values,
        timestamp: iso(now),
        error: None,
    })
}
