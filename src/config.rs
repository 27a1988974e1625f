// src/config.rs
//! Runtime configuration: secrets and tunables from the environment, plus a
//! static source list (news feeds, tanker callsign prefixes) from a file.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::providers::news_rss::DEFAULT_FEEDS;
use crate::ingest::providers::opensky::default_tanker_prefixes;

pub const ENV_SOURCES_PATH: &str = "RADAR_SOURCES_PATH";
pub const ENV_DATA_DIR: &str = "RADAR_DATA_DIR";
pub const ENV_STORAGE_KEY: &str = "RADAR_STORAGE_KEY";
pub const ENV_INTERVAL_SECS: &str = "RADAR_INTERVAL_SECS";
pub const ENV_SETTLE_DELAY_MS: &str = "RADAR_SETTLE_DELAY_MS";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "RADAR_FETCH_TIMEOUT_SECS";

pub const ENV_OPENWEATHER_KEY: &str = "OPENWEATHER_API_KEY";
pub const ENV_CLOUDFLARE_TOKEN: &str = "CLOUDFLARE_RADAR_TOKEN";
pub const ENV_ALPHA_VANTAGE_KEY: &str = "ALPHA_VANTAGE_API_KEY";

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_STORAGE_KEY: &str = "data.json";
const DEFAULT_INTERVAL_SECS: u64 = 30 * 60;
const DEFAULT_SETTLE_DELAY_MS: u64 = 2_000;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Feeds and callsign prefixes the adapters work from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcesConfig {
    pub rss_feeds: Vec<String>,
    pub tanker_prefixes: Vec<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            rss_feeds: DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect(),
            tanker_prefixes: default_tanker_prefixes(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SourcesFile {
    #[serde(default)]
    rss_feeds: Vec<String>,
    #[serde(default)]
    tanker_prefixes: Vec<String>,
}

impl SourcesFile {
    /// Missing or empty lists fall back to the built-in ones.
    fn into_config(self) -> SourcesConfig {
        let defaults = SourcesConfig::default();
        let rss_feeds = clean_list(self.rss_feeds);
        let tanker_prefixes = clean_list(
            self.tanker_prefixes
                .into_iter()
                .map(|p| p.to_ascii_uppercase())
                .collect(),
        );
        SourcesConfig {
            rss_feeds: if rss_feeds.is_empty() {
                defaults.rss_feeds
            } else {
                rss_feeds
            },
            tanker_prefixes: if tanker_prefixes.is_empty() {
                defaults.tanker_prefixes
            } else {
                tanker_prefixes
            },
        }
    }
}

/// Load sources from an explicit path. Supports TOML or JSON formats.
pub fn load_sources_from(path: &Path) -> Result<SourcesConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
        .with_context(|| format!("parsing sources from {}", path.display()))
}

/// Load sources using env var + fallbacks:
/// 1) $RADAR_SOURCES_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
/// 4) built-in defaults
pub fn load_sources_default() -> Result<SourcesConfig> {
    if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        }
        return Err(anyhow!("{ENV_SOURCES_PATH} points to non-existent path"));
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_sources_from(&toml_p);
    }
    let json_p = PathBuf::from("config/sources.json");
    if json_p.exists() {
        return load_sources_from(&json_p);
    }
    Ok(SourcesConfig::default())
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<SourcesConfig> {
    if hint_ext == "json" {
        let v: SourcesFile = serde_json::from_str(s)?;
        return Ok(v.into_config());
    }
    if let Ok(v) = toml::from_str::<SourcesFile>(s) {
        return Ok(v.into_config());
    }
    if let Ok(v) = serde_json::from_str::<SourcesFile>(s) {
        return Ok(v.into_config());
    }
    Err(anyhow!("unsupported sources format"))
}

/// Trim, drop empties and duplicates; first occurrence keeps its place.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|o| o == t) {
            out.push(t.to_string());
        }
    }
    out
}

/// Everything the service needs to run a cycle.
#[derive(Debug, Clone)]
pub struct RadarConfig {
    pub data_dir: PathBuf,
    pub storage_key: String,
    pub interval: Duration,
    pub settle_delay: Duration,
    pub fetch_timeout: Duration,
    pub openweather_api_key: Option<String>,
    pub cloudflare_radar_token: Option<String>,
    pub alpha_vantage_api_key: Option<String>,
    pub sources: SourcesConfig,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            openweather_api_key: None,
            cloudflare_radar_token: None,
            alpha_vantage_api_key: None,
            sources: SourcesConfig::default(),
        }
    }
}

impl RadarConfig {
    /// Read the environment (call `dotenvy::dotenv()` first if wanted) and
    /// the sources file.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let cfg = Self {
            data_dir: env_string(ENV_DATA_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            storage_key: env_string(ENV_STORAGE_KEY).unwrap_or(defaults.storage_key),
            interval: Duration::from_secs(env_u64(ENV_INTERVAL_SECS, DEFAULT_INTERVAL_SECS)?.max(1)),
            settle_delay: Duration::from_millis(env_u64(ENV_SETTLE_DELAY_MS, DEFAULT_SETTLE_DELAY_MS)?),
            fetch_timeout: Duration::from_secs(
                env_u64(ENV_FETCH_TIMEOUT_SECS, DEFAULT_FETCH_TIMEOUT_SECS)?.max(1),
            ),
            openweather_api_key: env_string(ENV_OPENWEATHER_KEY),
            cloudflare_radar_token: env_string(ENV_CLOUDFLARE_TOKEN),
            alpha_vantage_api_key: env_string(ENV_ALPHA_VANTAGE_KEY),
            sources: load_sources_default()?,
        };
        tracing::info!(
            target: "radar",
            data_dir = %cfg.data_dir.display(),
            storage_key = %cfg.storage_key,
            interval_secs = cfg.interval.as_secs(),
            feeds = cfg.sources.rss_feeds.len(),
            weather_key = cfg.openweather_api_key.is_some(),
            connectivity_token = cfg.cloudflare_radar_token.is_some(),
            energy_key = cfg.alpha_vantage_api_key.is_some(),
            "configuration loaded"
        );
        Ok(cfg)
    }

    pub fn energy_enabled(&self) -> bool {
        self.alpha_vantage_api_key.is_some()
    }
}

/// Non-empty, trimmed env value.
fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_u64(key: &str, default: u64) -> Result<u64> {
    match env_string(key) {
        Some(v) => v
            .parse::<u64>()
            .with_context(|| format!("{key} must be a non-negative integer, got {v:?}")),
        None => Ok(default),
    }
}
