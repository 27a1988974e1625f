//! # Risk Scorer
//! Pure mapping from the cycle's raw records to per-signal `{risk, detail}`
//! and a single weighted total. No I/O and no clock: identical records give
//! identical scores.
//!
//! Total = Σ(risk × weight) over the active signals. When three or more
//! signals sit above their own "elevated" cutoff the total is multiplied by
//! 1.15 before the final clamp.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::ingest::types::{
    ConnectivityRaw, ConnectivityStatus, EnergyRaw, EnergyStatus, FlightRaw, NewsRaw, PentagonRaw,
    PolymarketRaw, RawRecords, TankerRaw, WeatherRaw,
};
use crate::signal::{clamp_risk, Signal};

pub const ESCALATION_MIN_ELEVATED: usize = 3;
pub const ESCALATION_FACTOR: f64 = 1.15;

/// Display value and human summary of one signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredSignal {
    pub risk: u8,
    pub detail: String,
}

impl ScoredSignal {
    fn new(risk: u8, detail: impl Into<String>) -> Self {
        Self {
            risk,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskScores {
    pub scores: BTreeMap<Signal, ScoredSignal>,
    pub total_risk: u8,
    pub elevated_count: usize,
    pub energy_active: bool,
}

impl RiskScores {
    pub fn get(&self, signal: Signal) -> Option<&ScoredSignal> {
        self.scores.get(&signal)
    }

    pub fn risk(&self, signal: Signal) -> u8 {
        self.get(signal).map(|s| s.risk).unwrap_or(0)
    }
}

// ---- per-signal rules ----

pub fn score_news(n: &NewsRaw) -> ScoredSignal {
    let ratio = if n.total_count > 0 {
        n.alert_count as f64 / n.total_count as f64
    } else {
        0.0
    };
    let risk = clamp_risk((ratio.powi(2) * 85.0).round().max(3.0));
    ScoredSignal::new(
        risk,
        format!("{} articles, {} critical", n.total_count, n.alert_count),
    )
}

pub fn score_connectivity(c: &ConnectivityRaw) -> ScoredSignal {
    let risk = clamp_risk((c.risk * 3.8).round().min(95.0));
    let detail = match c.status {
        ConnectivityStatus::Stale => "Data unavailable".to_string(),
        s => format!("{} ({:+.1}%)", s.as_str(), c.trend),
    };
    ScoredSignal::new(risk, detail)
}

/// Fewer aircraft means airspace avoidance, so risk falls as traffic rises.
pub fn score_flight(f: &FlightRaw) -> ScoredSignal {
    let risk = clamp_risk((95.0 - (f.aircraft_count as f64 * 0.8).round()).max(3.0));
    ScoredSignal::new(risk, format!("{} aircraft over Iran", f.aircraft_count))
}

pub fn score_tanker(t: &TankerRaw) -> ScoredSignal {
    let risk = clamp_risk((t.tanker_count as f64 / 10.0 * 100.0).round());
    let shown = (t.tanker_count as f64 / 4.0).round() as u32;
    ScoredSignal::new(risk, format!("{shown} detected in region"))
}

pub fn score_weather(w: &WeatherRaw) -> ScoredSignal {
    let penalty = (w.clouds - 6).max(0) as f64 * 10.0;
    let risk = clamp_risk(100.0 - penalty);
    let detail = if w.description.is_empty() {
        "clear".to_string()
    } else {
        w.description.clone()
    };
    ScoredSignal::new(risk, detail)
}

/// Zero odds means no usable market; shown as a neutral placeholder.
pub fn score_polymarket(p: &PolymarketRaw) -> ScoredSignal {
    let odds = p.odds.min(100);
    if odds > 0 {
        ScoredSignal::new(odds as u8, format!("{odds}% odds"))
    } else {
        ScoredSignal::new(10, "Awaiting data...")
    }
}

pub fn score_pentagon(p: &PentagonRaw) -> ScoredSignal {
    let risk = clamp_risk((p.risk_contribution as f64 / 10.0 * 100.0).round());
    let mut detail = p.status.clone();
    if p.is_late_night {
        detail.push_str(" (late night)");
    }
    if p.is_weekend {
        detail.push_str(" (weekend)");
    }
    ScoredSignal::new(risk, detail)
}

/// Stale data and closed markets score zero whatever the trend says.
pub fn score_energy(e: &EnergyRaw) -> ScoredSignal {
    if e.status == EnergyStatus::Stale {
        ScoredSignal::new(0, "Data unavailable")
    } else if e.market_closed || e.status == EnergyStatus::MarketClosed {
        ScoredSignal::new(0, format!("${:.2} (Market Closed)", e.price))
    } else {
        ScoredSignal::new(
            clamp_risk(e.risk as f64),
            format!("${:.2} ({:+.1}%)", e.price, e.change_pct),
        )
    }
}

/// Energy record as stored. An empty object (cold start with a failed
/// fetch) or a record of the wrong shape means there is nothing to show yet.
pub fn score_energy_record(raw: Option<&Value>) -> ScoredSignal {
    let decoded = raw
        .filter(|v| v.as_object().is_some_and(|m| !m.is_empty()))
        .and_then(|v| serde_json::from_value::<EnergyRaw>(v.clone()).ok());
    match decoded {
        Some(e) => score_energy(&e),
        None => ScoredSignal::new(0, "Awaiting data..."),
    }
}

/// Per-signal "elevated" cutoffs. Connectivity is judged on the source
/// tier (ANOMALOUS or worse), not on its display value.
fn is_elevated(signal: Signal, risk: u8, raw: &RawRecords) -> bool {
    match signal {
        Signal::News => risk > 30,
        Signal::Connectivity => raw.decode::<ConnectivityRaw>(Signal::Connectivity).risk >= 10.0,
        Signal::Energy => risk > 40,
        Signal::Flight => risk > 50,
        Signal::Tanker => risk > 30,
        Signal::Polymarket => risk > 30,
        Signal::Pentagon => risk > 50,
        Signal::Weather => risk > 70,
    }
}

/// Multiply by the escalation factor when enough signals are elevated,
/// capped at 100.
pub fn escalate(total: f64, elevated_count: usize) -> f64 {
    if elevated_count >= ESCALATION_MIN_ELEVATED {
        (total * ESCALATION_FACTOR).min(100.0)
    } else {
        total
    }
}

fn score_one(signal: Signal, raw: &RawRecords) -> ScoredSignal {
    match signal {
        Signal::News => score_news(&raw.decode(signal)),
        Signal::Connectivity => score_connectivity(&raw.decode(signal)),
        Signal::Energy => score_energy_record(raw.get(signal)),
        Signal::Flight => score_flight(&raw.decode(signal)),
        Signal::Tanker => score_tanker(&raw.decode(signal)),
        Signal::Weather => score_weather(&raw.decode(signal)),
        Signal::Polymarket => score_polymarket(&raw.decode(signal)),
        Signal::Pentagon => score_pentagon(&raw.decode(signal)),
    }
}

/// Score every active signal. Energy is active iff it has a raw record;
/// the other seven are always scored (a missing record scores as empty).
pub fn score_signals(raw: &RawRecords) -> RiskScores {
    let energy_active = raw.contains(Signal::Energy);

    let mut scores = BTreeMap::new();
    let mut weighted = 0.0;
    let mut elevated_count = 0;
    for signal in Signal::active(energy_active) {
        let scored = score_one(signal, raw);
        weighted += scored.risk as f64 * signal.weight(energy_active);
        if is_elevated(signal, scored.risk, raw) {
            elevated_count += 1;
        }
        scores.insert(signal, scored);
    }

    let total_risk = clamp_risk(escalate(weighted, elevated_count));
    tracing::debug!(
        target: "radar",
        weighted,
        total_risk,
        elevated_count,
        energy_active,
        "scored signals"
    );

    RiskScores {
        scores,
        total_risk,
        elevated_count,
        energy_active,
    }
}
