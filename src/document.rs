//! document.rs: the published JSON artifact.
//!
//! One entry per signal (`risk`, `detail`, `history`, `raw_data`), plus the
//! aggregated `total_risk` block and `last_updated`. The document read at the
//! start of a cycle seeds history continuity and the fallback raw records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rolling::RollingHistory;
use crate::signal::Signal;

/// Per-signal block of the published document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEntry {
    #[serde(default, deserialize_with = "lenient::risk")]
    pub risk: u8,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub history: RollingHistory,
    /// Raw record the risk was derived from, kept verbatim as audit trail.
    #[serde(default = "empty_record")]
    pub raw_data: Value,
}

impl Default for SignalEntry {
    fn default() -> Self {
        Self {
            risk: 0,
            detail: String::new(),
            history: RollingHistory::new(),
            raw_data: empty_record(),
        }
    }
}

/// The raw record used on cold start: an empty JSON object.
pub fn empty_record() -> Value {
    Value::Object(serde_json::Map::new())
}

/// One point of the total-risk timeline. `timestamp` is unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalRiskPoint {
    #[serde(deserialize_with = "lenient::timestamp")]
    pub timestamp: i64,
    #[serde(default, deserialize_with = "lenient::risk")]
    pub risk: u8,
    #[serde(default, skip_serializing_if = "is_false")]
    pub pinned: bool,
}

impl TotalRiskPoint {
    pub fn live(timestamp: i64, risk: u8) -> Self {
        Self {
            timestamp,
            risk,
            pinned: false,
        }
    }

    pub fn pinned(timestamp: i64, risk: u8) -> Self {
        Self {
            timestamp,
            risk,
            pinned: true,
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TotalRisk {
    #[serde(default, deserialize_with = "lenient::risk")]
    pub risk: u8,
    #[serde(default, deserialize_with = "lenient::timeline")]
    pub history: Vec<TotalRiskPoint>,
    /// Recomputed every cycle from the current scores only.
    #[serde(default, deserialize_with = "lenient::count")]
    pub elevated_count: usize,
}

/// Aggregate root: everything a cycle publishes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishedDocument {
    #[serde(default)]
    pub news: SignalEntry,
    #[serde(default)]
    pub connectivity: SignalEntry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<SignalEntry>,
    #[serde(default)]
    pub flight: SignalEntry,
    #[serde(default)]
    pub tanker: SignalEntry,
    #[serde(default)]
    pub weather: SignalEntry,
    #[serde(default)]
    pub polymarket: SignalEntry,
    #[serde(default)]
    pub pentagon: SignalEntry,
    #[serde(default)]
    pub total_risk: TotalRisk,
    #[serde(default)]
    pub last_updated: String,
    /// Older documents kept the timeline at top level.
    #[serde(default, rename = "history", skip_serializing, deserialize_with = "lenient::timeline")]
    legacy_history: Vec<TotalRiskPoint>,
}

impl PublishedDocument {
    /// Parse a stored document. A section that does not decode is reset on
    /// its own so the rest of the history survives; a body that is not a JSON
    /// object at all yields an empty document (cold start).
    pub fn from_json_lenient(body: &str) -> Self {
        let value = match serde_json::from_str::<Value>(body) {
            Ok(v @ Value::Object(_)) => v,
            Ok(_) => {
                tracing::warn!(target: "radar", "previous document is not an object, starting fresh");
                return Self::default();
            }
            Err(e) => {
                tracing::warn!(target: "radar", error = %e, "previous document unreadable, starting fresh");
                return Self::default();
            }
        };
        match serde_json::from_value::<PublishedDocument>(value.clone()) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(target: "radar", error = %e, "previous document partly unreadable, salvaging sections");
                Self::salvage(&value)
            }
        }
    }

    fn salvage(value: &Value) -> Self {
        fn section<T: serde::de::DeserializeOwned + Default>(value: &Value, key: &str) -> T {
            match value.get(key) {
                None => T::default(),
                Some(v) => serde_json::from_value(v.clone()).unwrap_or_else(|e| {
                    tracing::warn!(target: "radar", section = key, error = %e, "dropping unreadable section");
                    T::default()
                }),
            }
        }

        let mut doc = Self::default();
        for signal in Signal::ALL {
            let key = signal.as_str();
            if signal == Signal::Energy && value.get(key).is_none() {
                continue;
            }
            doc.set_entry(signal, section(value, key));
        }
        doc.total_risk = section(value, "total_risk");
        doc.last_updated = section(value, "last_updated");
        doc.legacy_history = value
            .get("history")
            .map(lenient::timeline_from_value)
            .unwrap_or_default();
        doc
    }

    pub fn entry(&self, signal: Signal) -> Option<&SignalEntry> {
        match signal {
            Signal::News => Some(&self.news),
            Signal::Connectivity => Some(&self.connectivity),
            Signal::Energy => self.energy.as_ref(),
            Signal::Flight => Some(&self.flight),
            Signal::Tanker => Some(&self.tanker),
            Signal::Weather => Some(&self.weather),
            Signal::Polymarket => Some(&self.polymarket),
            Signal::Pentagon => Some(&self.pentagon),
        }
    }

    /// Replace the entry for `signal`.
    pub fn set_entry(&mut self, signal: Signal, entry: SignalEntry) {
        match signal {
            Signal::News => self.news = entry,
            Signal::Connectivity => self.connectivity = entry,
            Signal::Energy => self.energy = Some(entry),
            Signal::Flight => self.flight = entry,
            Signal::Tanker => self.tanker = entry,
            Signal::Weather => self.weather = entry,
            Signal::Polymarket => self.polymarket = entry,
            Signal::Pentagon => self.pentagon = entry,
        }
    }

    /// Stored raw record for `signal`, or an empty record on cold start.
    pub fn raw_data(&self, signal: Signal) -> Value {
        self.entry(signal)
            .map(|e| e.raw_data.clone())
            .unwrap_or_else(empty_record)
    }

    /// Stored rolling history for `signal` (empty if absent).
    pub fn signal_history(&self, signal: Signal) -> RollingHistory {
        self.entry(signal)
            .map(|e| e.history.clone())
            .unwrap_or_default()
    }

    /// Total-risk timeline, accepting the legacy top-level location.
    pub fn timeline(&self) -> &[TotalRiskPoint] {
        if self.total_risk.history.is_empty() {
            &self.legacy_history
        } else {
            &self.total_risk.history
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Number handling for stored documents written by older or foreign
/// producers: any JSON number is accepted, then rounded and clamped.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::TotalRiskPoint;
    use crate::signal::clamp_risk;

    fn number(v: &Value) -> Option<f64> {
        match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn risk_from_value(v: &Value) -> Option<u8> {
        number(v).map(clamp_risk)
    }

    pub fn risk<'de, D: Deserializer<'de>>(d: D) -> Result<u8, D::Error> {
        Ok(risk_from_value(&Value::deserialize(d)?).unwrap_or(0))
    }

    pub fn timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        let v = Value::deserialize(d)?;
        match v.as_i64().or_else(|| number(&v).map(|f| f.round() as i64)) {
            Some(ts) => Ok(ts),
            None => Err(serde::de::Error::custom("timestamp is not a number")),
        }
    }

    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<usize, D::Error> {
        let v = Value::deserialize(d)?;
        Ok(number(&v).map(|f| f.max(0.0).round() as usize).unwrap_or(0))
    }

    /// Points that still do not decode (no timestamp) are skipped.
    pub fn timeline_from_value(v: &Value) -> Vec<TotalRiskPoint> {
        v.as_array()
            .map(|points| {
                points
                    .iter()
                    .filter_map(|p| serde_json::from_value(p.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn timeline<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<TotalRiskPoint>, D::Error> {
        Ok(timeline_from_value(&Value::deserialize(d)?))
    }
}
