// src/ingest/providers/weather.rs
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;

use crate::ingest::providers::{iso, local_now, Mode};
use crate::ingest::types::{to_raw_value, FlyingCondition, SourceProvider, WeatherRaw};
use crate::ingest::FetchError;
use crate::signal::Signal;

pub const BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
const LAT: f64 = 35.6892;
const LON: f64 = 51.389;

const DEFAULT_VISIBILITY_M: i64 = 10_000;

#[derive(Debug, Deserialize)]
struct Conditions {
    main: Option<MainBlock>,
    visibility: Option<f64>,
    clouds: Option<Clouds>,
    #[serde(default)]
    weather: Vec<Summary>,
}
#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
}
#[derive(Debug, Deserialize)]
struct Clouds {
    all: Option<f64>,
}
#[derive(Debug, Deserialize)]
struct Summary {
    description: Option<String>,
}

/// Two-tier classification from visibility (m) and cloud cover (%).
pub fn flying_condition(visibility: i64, clouds: i64) -> FlyingCondition {
    if visibility >= 10_000 && clouds < 30 {
        FlyingCondition::Favorable
    } else if visibility >= 7_000 && clouds < 60 {
        FlyingCondition::Marginal
    } else {
        FlyingCondition::Poor
    }
}

/// Parse a current-conditions body. A response without `main` is a
/// failure, not a zero reading.
pub fn parse_conditions(body: &str, now: NaiveDateTime) -> Result<WeatherRaw, FetchError> {
    let c: Conditions = serde_json::from_str(body)?;
    let main = c
        .main
        .ok_or_else(|| FetchError::DataQuality("response has no `main` block".into()))?;

    let visibility = c.visibility.map(|v| v.round() as i64).unwrap_or(DEFAULT_VISIBILITY_M);
    let clouds = c
        .clouds
        .and_then(|cl| cl.all)
        .map(|v| v.round() as i64)
        .unwrap_or(0);
    let description = c
        .weather
        .into_iter()
        .next()
        .and_then(|w| w.description)
        .unwrap_or_else(|| "clear".to_string());

    Ok(WeatherRaw {
        temp: main.temp.round() as i64,
        visibility,
        clouds,
        description,
        condition: flying_condition(visibility, clouds),
        timestamp: iso(now),
    })
}

pub struct WeatherProvider {
    mode: Mode,
    has_key: bool,
}

impl WeatherProvider {
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
            has_key: true,
        }
    }

    /// Without a key every fetch fails, so the signal keeps its last value.
    pub fn new(api_key: Option<&str>, client: reqwest::Client) -> Self {
        let url = format!(
            "{BASE_URL}?lat={LAT}&lon={LON}&appid={}&units=metric",
            api_key.unwrap_or_default()
        );
        Self {
            mode: Mode::Http { url, client },
            has_key: api_key.is_some(),
        }
    }
}

#[async_trait]
impl SourceProvider for WeatherProvider {
    async fn fetch_latest(&self) -> Result<Value, FetchError> {
        if !self.has_key {
            return Err(FetchError::MissingCredential("OPENWEATHER_API_KEY"));
        }
        let body = self.mode.body().await?;
        to_raw_value(&parse_conditions(&body, local_now())?)
    }

    fn signal(&self) -> Signal {
        Signal::Weather
    }

    fn name(&self) -> &'static str {
        "OpenWeather"
    }
}
