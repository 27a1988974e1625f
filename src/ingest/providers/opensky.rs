// src/ingest/providers/opensky.rs
//! Aircraft-state feed: civil traffic over Iran and military tankers in the
//! wider region. Both adapters read the same `states/all` response shape.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;
use std::ops::RangeInclusive;

use crate::ingest::providers::{iso, local_now, Mode};
use crate::ingest::types::{to_raw_value, FlightRaw, SourceProvider, TankerRaw};
use crate::ingest::FetchError;
use crate::signal::Signal;

pub const FLIGHT_URL: &str =
    "https://opensky-network.org/api/states/all?lamin=25&lomin=44&lamax=40&lomax=64";
pub const TANKER_URL: &str =
    "https://opensky-network.org/api/states/all?lamin=20&lomin=40&lamax=40&lomax=65";

/// Transponder addresses reserved for US military aircraft.
pub const MILITARY_ICAO: RangeInclusive<u32> = 0xAE0000..=0xAE7FFF;

pub const DEFAULT_TANKER_PREFIXES: &[&str] = &[
    "IRON", "SHELL", "TEXAN", "ETHYL", "PEARL", "ARCO", "ESSO", "MOBIL", "GULF", "TOPAZ", "PACK",
    "DOOM", "TREK", "REACH", "EXXON", "TEXACO", "OILER", "OPEC", "PETRO", "TOGA", "DUCE", "FORCE",
    "GUCCI", "XTNDR", "SPUR", "TEAM", "QUID", "BOLT", "BROKE", "BROOM", "BOBBY", "BOBBIE", "BODE",
    "CONIC", "MAINE", "BRIG", "ARTLY", "BANKER", "BRUSH", "ARRIS", "GOLD", "BLUE", "CLEAN", "VINYL",
];

const MAX_AIRLINES: usize = 10;
const MAX_TANKER_CALLSIGNS: usize = 5;
const CALLSIGN_IDX: usize = 1;
const ON_GROUND_IDX: usize = 8;

#[derive(Debug, Deserialize)]
struct StatesResponse {
    #[serde(default)]
    states: Option<Vec<Value>>,
}

/// The fields this crate reads from one state vector.
#[derive(Debug, Clone, PartialEq)]
pub struct AircraftState {
    pub icao24: Option<String>,
    /// Trimmed callsign; empty when absent.
    pub callsign: String,
    /// `None` when the row is too short to carry the flag.
    pub on_ground: Option<bool>,
}

impl AircraftState {
    /// Rows are positional arrays. Address and callsign are enough for the
    /// tanker check; rows without even those are skipped.
    fn from_row(row: &Value) -> Option<Self> {
        let cols = row.as_array()?;
        if cols.len() <= CALLSIGN_IDX {
            return None;
        }
        Some(Self {
            icao24: cols[0].as_str().map(str::to_string),
            callsign: cols[CALLSIGN_IDX].as_str().unwrap_or_default().trim().to_string(),
            on_ground: cols
                .get(ON_GROUND_IDX)
                .map(|v| v.as_bool().unwrap_or(false)),
        })
    }

    /// Malformed or missing addresses count as non-military.
    pub fn is_military(&self) -> bool {
        self.icao24
            .as_deref()
            .and_then(|h| u32::from_str_radix(h.trim(), 16).ok())
            .is_some_and(|n| MILITARY_ICAO.contains(&n))
    }
}

/// Parse a `states/all` body into state vectors. A `null` state list means
/// no traffic.
pub fn parse_states(body: &str) -> Result<Vec<AircraftState>, FetchError> {
    let resp: StatesResponse = serde_json::from_str(body)?;
    Ok(resp
        .states
        .unwrap_or_default()
        .iter()
        .filter_map(AircraftState::from_row)
        .collect())
}

/// Airborne civil aircraft and the airline prefixes seen among them. Rows
/// without an `on_ground` column are not counted.
pub fn summarize_flights(states: &[AircraftState], now: NaiveDateTime) -> FlightRaw {
    let mut count = 0u32;
    let mut airlines: Vec<String> = Vec::new();
    for s in states
        .iter()
        .filter(|s| s.on_ground == Some(false) && !s.is_military())
    {
        count += 1;
        if s.callsign.chars().count() >= 3 {
            let code: String = s.callsign.chars().take(3).collect();
            if !airlines.contains(&code) {
                airlines.push(code);
            }
        }
    }
    FlightRaw {
        aircraft_count: count,
        airline_count: airlines.len() as u32,
        airlines: airlines.into_iter().take(MAX_AIRLINES).collect(),
        timestamp: iso(now),
    }
}

/// Military aircraft flying under a known tanker callsign.
pub fn summarize_tankers(states: &[AircraftState], prefixes: &[String], now: NaiveDateTime) -> TankerRaw {
    let mut count = 0u32;
    let mut callsigns = Vec::new();
    for s in states.iter().filter(|s| s.is_military()) {
        let cs = s.callsign.to_uppercase();
        let tanker_name = prefixes.iter().any(|p| cs.starts_with(p.as_str()))
            || cs.contains("KC")
            || cs.contains("TANKER");
        if tanker_name {
            count += 1;
            if !cs.is_empty() {
                callsigns.push(cs);
            }
        }
    }
    callsigns.truncate(MAX_TANKER_CALLSIGNS);
    TankerRaw {
        tanker_count: count,
        callsigns,
        timestamp: iso(now),
    }
}

pub struct FlightProvider {
    mode: Mode,
}

impl FlightProvider {
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn new(client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http {
                url: FLIGHT_URL.to_string(),
                client,
            },
        }
    }
}

#[async_trait]
impl SourceProvider for FlightProvider {
    async fn fetch_latest(&self) -> Result<Value, FetchError> {
        let body = self.mode.body().await?;
        let states = parse_states(&body)?;
        to_raw_value(&summarize_flights(&states, local_now()))
    }

    fn signal(&self) -> Signal {
        Signal::Flight
    }

    fn name(&self) -> &'static str {
        "OpenSky flights"
    }
}

/// Same feed as [`FlightProvider`]; the endpoint is rate-limited, so the
/// orchestrator queries this one after a settling delay.
pub struct TankerProvider {
    mode: Mode,
    prefixes: Vec<String>,
}

impl TankerProvider {
    pub fn from_fixture_str(s: &str, prefixes: Vec<String>) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
            prefixes,
        }
    }

    pub fn new(client: reqwest::Client, prefixes: Vec<String>) -> Self {
        Self {
            mode: Mode::Http {
                url: TANKER_URL.to_string(),
                client,
            },
            prefixes,
        }
    }
}

#[async_trait]
impl SourceProvider for TankerProvider {
    async fn fetch_latest(&self) -> Result<Value, FetchError> {
        let body = self.mode.body().await?;
        let states = parse_states(&body)?;
        to_raw_value(&summarize_tankers(&states, &self.prefixes, local_now()))
    }

    fn signal(&self) -> Signal {
        Signal::Tanker
    }

    fn name(&self) -> &'static str {
        "OpenSky tankers"
    }
}

pub fn default_tanker_prefixes() -> Vec<String> {
    DEFAULT_TANKER_PREFIXES.iter().map(|s| s.to_string()).collect()
}
