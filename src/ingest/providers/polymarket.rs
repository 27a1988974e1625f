// src/ingest/providers/polymarket.rs
//! Prediction-market odds for a near-term strike market.
//!
//! Each market's probability comes from an ordered chain of candidate
//! extractors; the first candidate that lands strictly inside (0, 100) wins.

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde_json::Value;

use crate::ingest::providers::{iso, local_now, Mode};
use crate::ingest::types::{to_raw_value, PolymarketRaw, SourceProvider};
use crate::ingest::{contains_any, FetchError};
use crate::signal::Signal;

pub const SEARCH_URL: &str = "https://gamma-api.polymarket.com/public-search?q=iran";

const EXACT_EVENT_TITLES: &[&str] = &["will us or israel strike iran", "us strikes iran by"];
const STRIKE_KEYWORDS: &[&str] = &["strike", "attack", "bomb", "military action"];
const NEGATIONS: &[&str] = &[" not ", "won't", "will not", "doesn't", "does not"];
const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];
const NEAR_TERM_DAYS: i64 = 7;

pub struct PolymarketProvider {
    mode: Mode,
}

impl PolymarketProvider {
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_url(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        }
    }

    pub fn new(client: reqwest::Client) -> Self {
        Self::from_url(SEARCH_URL, client)
    }
}

#[async_trait]
impl SourceProvider for PolymarketProvider {
    async fn fetch_latest(&self) -> Result<Value, FetchError> {
        let body = self.mode.body().await?;
        let rec = parse_search(&body, local_now())?;
        to_raw_value(&rec)
    }

    fn signal(&self) -> Signal {
        Signal::Polymarket
    }

    fn name(&self) -> &'static str {
        "Polymarket"
    }
}

/// Parse a search response into the best near-term strike odds.
pub fn parse_search(body: &str, now: NaiveDateTime) -> Result<PolymarketRaw, FetchError> {
    let data: Value = serde_json::from_str(body)?;
    let events = extract_events(&data)?;

    let (mut best, mut title) = exact_pass(&events, now);
    if best == 0 {
        (best, title) = loose_pass(&events, now);
    }
    tracing::debug!(odds = best, market = %title, events = events.len(), "polymarket parsed");
    Ok(PolymarketRaw {
        odds: best,
        market: title,
        timestamp: iso(now),
    })
}

/// Search results come as a bare array, or wrapped in `events` or `data`.
fn extract_events(data: &Value) -> Result<Vec<&Value>, FetchError> {
    let list = match data {
        Value::Array(a) => a,
        Value::Object(o) => match (o.get("events"), o.get("data")) {
            (Some(Value::Array(a)), _) if !a.is_empty() => a,
            (_, Some(Value::Array(a))) if !a.is_empty() => a,
            _ => {
                return Err(FetchError::Parse(
                    "search response has no events or data list".into(),
                ))
            }
        },
        _ => return Err(FetchError::Parse("unexpected search response shape".into())),
    };
    Ok(list.iter().filter(|e| e.is_object()).collect())
}

fn text_field<'a>(v: &'a Value, key: &str) -> &'a str {
    v.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn markets(event: &Value) -> impl Iterator<Item = &Value> {
    event
        .get("markets")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|m| m.is_object())
}

fn is_negated(lower: &str) -> bool {
    contains_any(lower, NEGATIONS)
}

fn exact_pass(events: &[&Value], now: NaiveDateTime) -> (u32, String) {
    let mut best = 0u32;
    let mut title = String::new();

    for event in events {
        let event_title = text_field(event, "title");
        let event_lower = event_title.to_lowercase();

        if contains_any(&event_lower, EXACT_EVENT_TITLES) && is_near_term(event_title, now) {
            for market in markets(event) {
                let odds = market_odds(market);
                if odds > best {
                    best = odds;
                    title = market_name(market, event_title);
                }
            }
        }

        // Event titles are sometimes generic; look at the questions too.
        for market in markets(event) {
            let question = text_field(market, "question");
            let q_lower = question.to_lowercase();
            if is_negated(&q_lower)
                || !q_lower.contains("iran")
                || !contains_any(&q_lower, STRIKE_KEYWORDS)
                || !is_near_term(question, now)
            {
                continue;
            }
            let odds = market_odds(market);
            if odds > best {
                best = odds;
                title = question.to_string();
            }
        }
    }
    (best, title)
}

fn loose_pass(events: &[&Value], now: NaiveDateTime) -> (u32, String) {
    let mut best = 0u32;
    let mut title = String::new();

    for event in events {
        let event_title = text_field(event, "title");
        let event_lower = event_title.to_lowercase();
        if is_negated(&event_lower) || !event_lower.contains("iran") {
            continue;
        }
        if !is_near_term(event_title, now) {
            continue;
        }
        for market in markets(event) {
            let q_lower = text_field(market, "question").to_lowercase();
            if is_negated(&q_lower) {
                continue;
            }
            let name = market_name(market, event_title);
            if !is_near_term(&name, now) {
                continue;
            }
            let odds = market_odds(market);
            if odds > best {
                best = odds;
                title = name;
            }
        }
    }
    (best, title)
}

fn market_name(market: &Value, event_title: &str) -> String {
    match text_field(market, "question") {
        "" => event_title.to_string(),
        q => q.to_string(),
    }
}

// ---- candidate chain ----

type Candidate = fn(&Value) -> Option<f64>;

const CANDIDATES: [Candidate; 3] = [outcome_price_odds, best_ask_odds, last_trade_odds];

/// Derived odds for one market, or 0 if every candidate is missing or
/// out of range.
pub fn market_odds(market: &Value) -> u32 {
    CANDIDATES
        .iter()
        .filter_map(|c| c(market))
        .map(f64::round)
        .find(|p| *p > 0.0 && *p < 100.0)
        .map(|p| p as u32)
        .unwrap_or(0)
}

/// Scale a price to a percentage: fractions are multiplied by 100, values
/// above 1 are already percentages.
pub fn normalize_pct(v: f64) -> Option<f64> {
    if !v.is_finite() || v <= 0.0 {
        None
    } else if v > 1.0 {
        Some(v)
    } else {
        Some(v * 100.0)
    }
}

fn as_price(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// `outcomePrices` may be an array or a string holding a JSON array.
fn outcome_prices(market: &Value) -> Vec<f64> {
    let arr = match market.get("outcomePrices") {
        Some(Value::Array(a)) => a.clone(),
        Some(Value::String(s)) => serde_json::from_str::<Vec<Value>>(s).unwrap_or_default(),
        _ => Vec::new(),
    };
    arr.iter().map(|v| as_price(v).unwrap_or(0.0)).collect()
}

/// YES price, or the complement of the NO price when YES reads as certain.
fn outcome_price_odds(market: &Value) -> Option<f64> {
    let prices = outcome_prices(market);
    let yes = normalize_pct(*prices.first()?)?;
    if yes.round() < 100.0 {
        return Some(yes);
    }
    match prices.get(1).copied() {
        Some(no) if no > 0.0 && no < 1.0 => Some(((1.0 - no) * 100.0).round()),
        Some(no) if no > 1.0 => Some(100.0 - no.round()),
        _ => Some(yes),
    }
}

fn best_ask_odds(market: &Value) -> Option<f64> {
    market.get("bestAsk").and_then(as_price).and_then(normalize_pct)
}

fn last_trade_odds(market: &Value) -> Option<f64> {
    market
        .get("lastTradePrice")
        .and_then(as_price)
        .and_then(normalize_pct)
}

// ---- near-term detection ----

fn month_day_regex(idx: usize) -> &'static Regex {
    static RES: OnceCell<Vec<Regex>> = OnceCell::new();
    let all = RES.get_or_init(|| {
        MONTHS
            .iter()
            .map(|m| Regex::new(&format!(r"{m}\s+(\d{{1,2}})")).unwrap())
            .collect()
    });
    &all[idx]
}

/// True if the title names a month and day that falls within the next
/// seven days (current year, rolling to next year once the date has passed).
pub fn is_near_term(title: &str, now: NaiveDateTime) -> bool {
    let lower = title.to_lowercase();
    let horizon = now + Duration::days(NEAR_TERM_DAYS);
    let year = now.year();

    for (idx, month) in MONTHS.iter().enumerate() {
        if !lower.contains(month) {
            continue;
        }
        let Some(day) = month_day_regex(idx)
            .captures(&lower)
            .and_then(|c| c[1].parse::<u32>().ok())
        else {
            continue;
        };
        let month_no = idx as u32 + 1;
        let midnight = |y: i32| {
            NaiveDate::from_ymd_opt(y, month_no, day).and_then(|d| d.and_hms_opt(0, 0, 0))
        };
        let Some(mut date) = midnight(year) else {
            continue;
        };
        if date < now {
            match midnight(year + 1) {
                Some(d) => date = d,
                None => continue,
            }
        }
        if now <= date && date <= horizon {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn yes_price_fraction_becomes_percentage() {
        assert_eq!(market_odds(&json!({"outcomePrices": ["0.62", "0.38"]})), 62);
        assert_eq!(market_odds(&json!({"outcomePrices": "[\"0.07\", \"0.93\"]"})), 7);
        assert_eq!(market_odds(&json!({"outcomePrices": [45, 55]})), 45);
    }

    #[test]
    fn certain_prices_fall_through_the_chain() {
        let m = json!({"outcomePrices": ["1.0", "0.0"]});
        assert_eq!(market_odds(&m), 0);
        let m = json!({"outcomePrices": ["1.0", "0.0"], "bestAsk": 0.31});
        assert_eq!(market_odds(&m), 31);
        let m = json!({"outcomePrices": ["1.0", "0.0"], "bestAsk": "1", "lastTradePrice": "0.2"});
        assert_eq!(market_odds(&m), 20);
    }

    #[test]
    fn no_price_complement_is_used() {
        assert_eq!(market_odds(&json!({"outcomePrices": ["1", "0.85"]})), 15);
        assert_eq!(market_odds(&json!({"outcomePrices": ["100", "70"]})), 30);
    }

    #[test]
    fn normalize_pct_rules() {
        assert_eq!(normalize_pct(0.5), Some(50.0));
        assert_eq!(normalize_pct(1.0), Some(100.0));
        assert_eq!(normalize_pct(37.0), Some(37.0));
        assert_eq!(normalize_pct(0.0), None);
        assert_eq!(normalize_pct(-3.0), None);
    }

    #[test]
    fn near_term_window() {
        let now = at(2026, 3, 1, 9);
        assert!(is_near_term("US strikes Iran by March 5?", now));
        assert!(is_near_term("US strikes Iran by March 8, 2026?", now));
        assert!(!is_near_term("US strikes Iran by March 9?", now));
        assert!(!is_near_term("US strikes Iran by June 30?", now));
        assert!(!is_near_term("US strikes Iran in 2026?", now));
        // Same-day midnight is already past, so it rolls to next year.
        assert!(!is_near_term("US strikes Iran by March 1?", now));
    }

    #[test]
    fn near_term_rolls_over_new_year() {
        let now = at(2026, 12, 29, 8);
        assert!(is_near_term("Strike on Iran by January 2?", now));
    }

    #[test]
    fn exact_match_beats_loose_and_negations_are_skipped() {
        let now = at(2026, 3, 1, 9);
        let body = json!({"events": [
            {"title": "US strikes Iran by March 4?", "markets": [
                {"question": "US strikes Iran by March 4?", "outcomePrices": ["0.18", "0.82"]}
            ]},
            {"title": "Iran news by March 3?", "markets": [
                {"question": "Iran news by March 3?", "outcomePrices": ["0.55", "0.45"]}
            ]},
            {"title": "Misc", "markets": [
                {"question": "Will the US not strike Iran by March 3?", "outcomePrices": ["0.9", "0.1"]}
            ]}
        ]})
        .to_string();
        let rec = parse_search(&body, now).unwrap();
        assert_eq!(rec.odds, 18);
        assert_eq!(rec.market, "US strikes Iran by March 4?");
    }

    #[test]
    fn loose_pass_takes_max_when_no_strike_market() {
        let now = at(2026, 3, 1, 9);
        let body = json!([
            {"title": "Iran ceasefire by March 6?", "markets": [
                {"question": "Iran ceasefire by March 6?", "outcomePrices": ["0.21", "0.79"]},
                {"question": "Iran talks by March 5?", "bestAsk": 0.4}
            ]},
            {"title": "Iran does not sign by March 5?", "markets": [
                {"question": "Iran sign by March 5?", "outcomePrices": ["0.9", "0.1"]}
            ]}
        ])
        .to_string();
        let rec = parse_search(&body, now).unwrap();
        assert_eq!(rec.odds, 40);
        assert_eq!(rec.market, "Iran talks by March 5?");
    }

    #[test]
    fn no_matching_market_yields_zero() {
        let now = at(2026, 3, 1, 9);
        let rec = parse_search(r#"{"events":[{"title":"Elections","markets":[]}]}"#, now).unwrap();
        assert_eq!(rec.odds, 0);
        assert!(rec.market.is_empty());
    }

    #[test]
    fn unknown_shape_is_parse_failure() {
        let now = at(2026, 3, 1, 9);
        let err = parse_search(r#"{"foo": 1}"#, now).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
        let err = parse_search("<html>", now).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }
}
