// src/ingest/providers/mod.rs
pub mod connectivity;
pub mod energy;
pub mod news_rss;
pub mod opensky;
pub mod pentagon;
pub mod polymarket;
pub mod weather;

use chrono::NaiveDateTime;

use crate::ingest::{send_for_text, FetchError};

/// Where a provider reads its payload from.
pub(crate) enum Mode {
    /// Canned payload, used by tests and offline runs.
    Fixture(String),
    Http {
        url: String,
        client: reqwest::Client,
    },
}

impl Mode {
    /// Plain GET (no auth) or the fixture body.
    pub(crate) async fn body(&self) -> Result<String, FetchError> {
        match self {
            Mode::Fixture(s) => Ok(s.clone()),
            Mode::Http { url, client } => send_for_text(client.get(url.as_str())).await,
        }
    }
}

/// Local wall-clock time used for `timestamp` fields and calendar rules.
pub(crate) fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// ISO-8601 local timestamp stored in raw records.
pub(crate) fn iso(now: NaiveDateTime) -> String {
    now.format("%Y-%m-%dT%H:%M:%S").to_string()
}
