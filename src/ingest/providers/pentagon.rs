// src/ingest/providers/pentagon.rs
//! Synthetic local-activity heuristic.
//!
//! No external call: readings for a fixed list of places are derived from
//! the local time of day and day of week. Late-night "elevated" days are
//! picked by hashing the calendar date, so a given date always yields the
//! same result.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDateTime, Timelike};
use serde_json::Value;
use md5::{Digest, Md5};

use crate::ingest::providers::{iso, local_now};
use crate::ingest::types::{to_raw_value, PentagonRaw, PlaceReading, SourceProvider};
use crate::ingest::FetchError;
use crate::signal::Signal;

/// `(name, area)` pairs observed by the heuristic.
pub const PLACES: &[(&str, &str)] = &[
    ("Domino's Pizza", "Pentagon City"),
    ("Papa John's", "Near Pentagon"),
    ("Pizza Hut", "Pentagon Area"),
];

/// Out of 10 days, how many get an elevated late night.
const ELEVATED_LATE_IN_TEN: u32 = 2;
const DEFAULT_SCORE: u32 = 30;

/// First four bytes of MD5 over the `YYYY-MM-DD` date, big-endian.
pub fn date_hash(now: NaiveDateTime) -> u32 {
    let day = now.date().format("%Y-%m-%d").to_string();
    let digest = Md5::digest(day.as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

pub fn is_late_night(now: NaiveDateTime) -> bool {
    let h = now.hour();
    h >= 22 || h < 6
}

pub fn is_weekend(now: NaiveDateTime) -> bool {
    now.weekday().number_from_monday() >= 6
}

/// Reading for one place at `now`.
fn place_reading(name: &str, now: NaiveDateTime) -> PlaceReading {
    let h = now.hour();
    let (status, score) = if (11..=14).contains(&h) && !is_weekend(now) {
        ("normal", 50)
    } else if (17..=20).contains(&h) {
        ("normal", 55)
    } else if is_late_night(now) {
        if date_hash(now) % 10 < ELEVATED_LATE_IN_TEN {
            ("elevated_late", 70)
        } else {
            ("normal", 20)
        }
    } else if is_weekend(now) {
        ("normal", 25)
    } else {
        ("normal", DEFAULT_SCORE)
    };
    PlaceReading {
        name: name.to_string(),
        status: status.to_string(),
        score,
    }
}

/// Average of the readings, with busy late nights and busy weekends
/// weighted up, clamped into `[0, 100]`.
fn activity_score(readings: &[PlaceReading], late_night: bool, weekend: bool) -> u32 {
    if readings.is_empty() {
        return DEFAULT_SCORE;
    }
    let total: f64 = readings
        .iter()
        .map(|r| {
            let s = r.score as f64;
            if late_night && r.score > 60 {
                s * 1.5
            } else if weekend && r.score > 70 {
                s * 1.3
            } else {
                s
            }
        })
        .sum();
    let avg = total / readings.len() as f64;
    avg.clamp(0.0, 100.0).round() as u32
}

/// Step tier (1, 3, 7 or 10) and its label for an activity score.
pub fn activity_tier(score: u32) -> (u32, &'static str) {
    if score >= 80 {
        (10, "High Activity")
    } else if score >= 60 {
        (7, "Elevated")
    } else if score >= 40 {
        (3, "Normal")
    } else {
        (1, "Low Activity")
    }
}

/// Full record for the fixed place list at `now`.
pub fn activity_at(now: NaiveDateTime) -> PentagonRaw {
    let late_night = is_late_night(now);
    let weekend = is_weekend(now);
    let places: Vec<PlaceReading> = PLACES
        .iter()
        .map(|(name, _)| place_reading(name, now))
        .collect();
    let score = activity_score(&places, late_night, weekend);
    let (tier, status) = activity_tier(score);
    PentagonRaw {
        score,
        risk_contribution: tier,
        status: status.to_string(),
        places,
        timestamp: iso(now),
        is_late_night: late_night,
        is_weekend: weekend,
    }
}

#[derive(Default)]
pub struct PentagonProvider;

impl PentagonProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SourceProvider for PentagonProvider {
    async fn fetch_latest(&self) -> Result<Value, FetchError> {
        to_raw_value(&activity_at(local_now()))
    }

    fn signal(&self) -> Signal {
        Signal::Pentagon
    }

    fn name(&self) -> &'static str {
        "Pentagon"
    }
}
