// src/ingest/mod.rs
pub mod providers;
pub mod types;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use std::time::Duration;
use thiserror::Error;

/// Header sent to every upstream.
pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; StrikeRadar/1.0)";

/// Why an adapter produced no new data this cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network error, timeout or non-2xx status.
    #[error("transport failure: {0}")]
    Transport(String),
    /// Payload does not have the expected shape.
    #[error("parse failure: {0}")]
    Parse(String),
    /// Parsed, but semantically invalid.
    #[error("data quality failure: {0}")]
    DataQuality(String),
    /// Required API key/token is not configured.
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
}

/// Three-way failure taxonomy used for log fields and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    Parse,
    DataQuality,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Transport => "transport",
            FailureKind::Parse => "parse",
            FailureKind::DataQuality => "data_quality",
        }
    }
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Transport(_) | FetchError::MissingCredential(_) => FailureKind::Transport,
            FetchError::Parse(_) => FailureKind::Parse,
            FetchError::DataQuality(_) => FailureKind::DataQuality,
        }
    }

    pub fn timeout(after: Duration) -> Self {
        FetchError::Transport(format!("timed out after {}ms", after.as_millis()))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Parse(e.to_string())
    }
}

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("radar_fetch_total", "Adapter fetch attempts, per signal.");
        describe_counter!(
            "radar_fetch_failures_total",
            "Adapter failures, per signal and failure kind."
        );
        describe_counter!(
            "radar_fallback_total",
            "Signals that reused the previous cycle's raw_data."
        );
        describe_counter!(
            "radar_news_feed_errors_total",
            "Individual news feeds skipped within a cycle."
        );
        describe_histogram!("radar_fetch_ms", "Adapter wall time in milliseconds.");
        describe_counter!("radar_cycles_total", "Completed pipeline cycles.");
        describe_gauge!("radar_total_risk", "Last published total risk.");
        describe_gauge!(
            "radar_elevated_signals",
            "Signals above their elevated threshold in the last cycle."
        );
        describe_gauge!(
            "radar_cycle_last_run_ts",
            "Unix ts when the pipeline last completed."
        );
    });
}

/// Shared HTTP client with a bounded per-request wait.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .timeout(timeout)
        .build()
        .map_err(FetchError::from)
}

/// Send a request and return its body, treating non-2xx as a transport failure.
pub(crate) async fn send_for_text(req: reqwest::RequestBuilder) -> Result<String, FetchError> {
    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Transport(format!("HTTP {}", status.as_u16())));
    }
    Ok(resp.text().await?)
}

/// Normalize text: decode entities, strip tags, collapse whitespace, trim.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize typographic quotes to ASCII
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

/// Replace HTML-only entities that are not valid in XML.
pub(crate) fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

pub(crate) fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// First `n` characters (not bytes) of `s`.
pub(crate) fn take_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}
