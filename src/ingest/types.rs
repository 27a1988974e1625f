// src/ingest/types.rs
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::document::empty_record;
use crate::ingest::FetchError;
use crate::signal::Signal;

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    /// Fetch and normalize one raw record for this provider's signal.
    async fn fetch_latest(&self) -> Result<Value, FetchError>;
    fn signal(&self) -> Signal;
    fn name(&self) -> &'static str;
}

/// Serialize a typed record into the JSON form stored as `raw_data`.
pub fn to_raw_value<T: Serialize>(record: &T) -> Result<Value, FetchError> {
    serde_json::to_value(record).map_err(|e| FetchError::Parse(format!("encoding raw record: {e}")))
}

/// Complete raw-record set handed from the orchestrator to the scorer.
/// A signal is *active* iff it has an entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecords {
    records: BTreeMap<Signal, Value>,
}

impl RawRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, signal: Signal, raw: Value) {
        self.records.insert(signal, raw);
    }

    pub fn with(mut self, signal: Signal, raw: Value) -> Self {
        self.insert(signal, raw);
        self
    }

    pub fn get(&self, signal: Signal) -> Option<&Value> {
        self.records.get(&signal)
    }

    pub fn contains(&self, signal: Signal) -> bool {
        self.records.contains_key(&signal)
    }

    /// Raw value for `signal`, or an empty record if missing.
    pub fn raw_or_empty(&self, signal: Signal) -> Value {
        self.get(signal).cloned().unwrap_or_else(empty_record)
    }

    /// Typed view of a raw record. Missing or mistyped fields fall back to
    /// defaults so stale or cold-start records still score.
    pub fn decode<T: DeserializeOwned + Default>(&self, signal: Signal) -> T {
        match self.get(signal) {
            Some(v) => serde_json::from_value(v.clone()).unwrap_or_else(|e| {
                tracing::warn!(target: "radar", signal = %signal, error = %e, "raw record has unexpected shape");
                T::default()
            }),
            None => T::default(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Signal, &Value)> {
        self.records.iter().map(|(s, v)| (*s, v))
    }
}

// ---- Typed raw records ----

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Article {
    pub title: String,
    pub is_alert: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsRaw {
    pub articles: Vec<Article>,
    pub total_count: u32,
    pub alert_count: u32,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectivityStatus {
    #[default]
    Stable,
    Anomalous,
    Critical,
    Blackout,
    Stale,
}

impl ConnectivityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectivityStatus::Stable => "STABLE",
            ConnectivityStatus::Anomalous => "ANOMALOUS",
            ConnectivityStatus::Critical => "CRITICAL",
            ConnectivityStatus::Blackout => "BLACKOUT",
            ConnectivityStatus::Stale => "STALE",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityRaw {
    pub status: ConnectivityStatus,
    /// Internal tier on a 0–25 scale.
    pub risk: f64,
    /// Recent vs baseline change in percent, one decimal.
    pub trend: f64,
    pub values: Vec<f64>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightRaw {
    pub aircraft_count: u32,
    pub airline_count: u32,
    pub airlines: Vec<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TankerRaw {
    pub tanker_count: u32,
    pub callsigns: Vec<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlyingCondition {
    Favorable,
    Marginal,
    #[default]
    Poor,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherRaw {
    pub temp: i64,
    pub visibility: i64,
    pub clouds: i64,
    pub description: String,
    pub condition: FlyingCondition,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolymarketRaw {
    pub odds: u32,
    pub market: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceReading {
    pub name: String,
    pub status: String,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PentagonRaw {
    /// Activity score, 0–100.
    pub score: u32,
    pub risk_contribution: u32,
    pub status: String,
    pub places: Vec<PlaceReading>,
    pub timestamp: String,
    pub is_late_night: bool,
    pub is_weekend: bool,
}

/// A record with nothing in it reads as the lowest tier.
impl Default for PentagonRaw {
    fn default() -> Self {
        Self {
            score: 0,
            risk_contribution: 1,
            status: "Normal".to_string(),
            places: Vec::new(),
            timestamp: String::new(),
            is_late_night: false,
            is_weekend: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnergyStatus {
    #[default]
    Stable,
    Volatile,
    Critical,
    #[serde(rename = "MARKET CLOSED")]
    MarketClosed,
    Stale,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyRaw {
    pub status: EnergyStatus,
    pub risk: u32,
    pub price: f64,
    pub avg_price: f64,
    pub change_pct: f64,
    pub volatility_index: f64,
    pub market_closed: bool,
    pub prices_history: Vec<f64>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_tolerates_empty_and_partial_records() {
        let raw = RawRecords::new()
            .with(Signal::Flight, json!({}))
            .with(Signal::Tanker, json!({"tanker_count": 4}));
        let f: FlightRaw = raw.decode(Signal::Flight);
        assert_eq!(f.aircraft_count, 0);
        let t: TankerRaw = raw.decode(Signal::Tanker);
        assert_eq!(t.tanker_count, 4);
        let w: WeatherRaw = raw.decode(Signal::Weather);
        assert_eq!(w, WeatherRaw::default());
    }

    #[test]
    fn decode_mistyped_record_yields_default() {
        let raw = RawRecords::new().with(Signal::News, json!({"total_count": "many"}));
        let n: NewsRaw = raw.decode(Signal::News);
        assert_eq!(n, NewsRaw::default());
    }

    #[test]
    fn status_enums_use_wire_names() {
        assert_eq!(
            serde_json::to_value(ConnectivityStatus::Stale).unwrap(),
            json!("STALE")
        );
        assert_eq!(
            serde_json::to_value(EnergyStatus::MarketClosed).unwrap(),
            json!("MARKET CLOSED")
        );
        assert_eq!(
            serde_json::to_value(FlyingCondition::Marginal).unwrap(),
            json!("Marginal")
        );
    }
}
