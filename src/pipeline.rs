// src/pipeline.rs
//! One refresh cycle: read the previous document, fetch every signal,
//! fall back to the previous `raw_data` for any signal whose fetch failed,
//! score, roll the history forward and write the new document back.

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};
use metrics::{counter, gauge, histogram};
use serde_json::Value;
use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::config::RadarConfig;
use crate::document::PublishedDocument;
use crate::engine::score_signals;
use crate::history::update_history;
use crate::ingest::providers::{
    connectivity::ConnectivityProvider,
    energy::EnergyProvider,
    news_rss::NewsRssProvider,
    opensky::{FlightProvider, TankerProvider},
    pentagon::PentagonProvider,
    polymarket::PolymarketProvider,
    weather::WeatherProvider,
};
use crate::ingest::types::{RawRecords, SourceProvider};
use crate::ingest::{ensure_metrics_described, http_client, FetchError};
use crate::signal::Signal;
use crate::store::DocumentStore;

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// The cycle driver. Holds the store and the registered adapters; a cycle
/// never runs concurrently with another one on the same pipeline.
pub struct Pipeline {
    store: Arc<dyn DocumentStore>,
    providers: Vec<Arc<dyn SourceProvider>>,
    /// Fetched only after the others finished plus `settle_delay`.
    delayed: Vec<Arc<dyn SourceProvider>>,
    settle_delay: Duration,
    fetch_timeout: Duration,
    cycle_lock: tokio::sync::Mutex<()>,
}

impl Pipeline {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            providers: Vec::new(),
            delayed: Vec::new(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            cycle_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_provider(mut self, p: Arc<dyn SourceProvider>) -> Self {
        self.providers.push(p);
        self
    }

    pub fn with_delayed_provider(mut self, p: Arc<dyn SourceProvider>) -> Self {
        self.delayed.push(p);
        self
    }

    pub fn with_settle_delay(mut self, d: Duration) -> Self {
        self.settle_delay = d;
        self
    }

    pub fn with_fetch_timeout(mut self, d: Duration) -> Self {
        self.fetch_timeout = d;
        self
    }

    /// Production wiring: every adapter over one shared HTTP client. The
    /// tanker feed shares a rate limit with the flight feed, so it goes last.
    pub fn from_config(cfg: &RadarConfig, store: Arc<dyn DocumentStore>) -> Result<Self> {
        let client = http_client(cfg.fetch_timeout).context("building HTTP client")?;

        let mut pipeline = Self::new(store)
            .with_settle_delay(cfg.settle_delay)
            .with_fetch_timeout(cfg.fetch_timeout)
            .with_provider(Arc::new(PolymarketProvider::new(client.clone())))
            .with_provider(Arc::new(NewsRssProvider::from_urls(
                cfg.sources.rss_feeds.iter(),
                client.clone(),
            )))
            .with_provider(Arc::new(FlightProvider::new(client.clone())))
            .with_provider(Arc::new(WeatherProvider::new(
                cfg.openweather_api_key.as_deref(),
                client.clone(),
            )))
            .with_provider(Arc::new(ConnectivityProvider::new(
                cfg.cloudflare_radar_token.clone(),
                client.clone(),
            )))
            .with_provider(Arc::new(PentagonProvider::new()))
            .with_delayed_provider(Arc::new(TankerProvider::new(
                client.clone(),
                cfg.sources.tanker_prefixes.clone(),
            )));

        if let Some(key) = cfg.alpha_vantage_api_key.as_deref() {
            pipeline = pipeline.with_provider(Arc::new(EnergyProvider::new(key, client)));
        }
        Ok(pipeline)
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Registered signals, immediate ones first.
    pub fn signals(&self) -> Vec<Signal> {
        self.providers
            .iter()
            .chain(self.delayed.iter())
            .map(|p| p.signal())
            .collect()
    }

    /// Run one cycle stamped with the local clock.
    pub async fn run_cycle(&self) -> Result<PublishedDocument> {
        self.run_cycle_at(chrono::Local::now()).await
    }

    /// Run one cycle with `now` as the history clock.
    ///
    /// Only a failing store read or write aborts the cycle; adapter failures
    /// are logged and replaced by the previous raw record.
    pub async fn run_cycle_at<Tz>(&self, now: DateTime<Tz>) -> Result<PublishedDocument>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let _guard = self.cycle_lock.lock().await;
        ensure_metrics_described();
        let started = Instant::now();

        let previous = match self
            .store
            .load()
            .await
            .with_context(|| format!("loading {}", self.store.key()))?
        {
            Some(body) => PublishedDocument::from_json_lenient(&body),
            None => {
                tracing::info!(target: "radar", "no previous document, cold start");
                PublishedDocument::default()
            }
        };

        let raw = self.collect_raw(&previous).await;
        let scores = score_signals(&raw);
        let doc = update_history(&previous, &scores, &raw, now);

        let body = doc.to_json_pretty().context("serializing document")?;
        self.store
            .save(&body)
            .await
            .with_context(|| format!("saving {}", self.store.key()))?;

        counter!("radar_cycles_total").increment(1);
        gauge!("radar_total_risk").set(scores.total_risk as f64);
        gauge!("radar_elevated_signals").set(scores.elevated_count as f64);
        gauge!("radar_cycle_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

        tracing::info!(
            target: "radar",
            total_risk = scores.total_risk,
            elevated = scores.elevated_count,
            energy_active = scores.energy_active,
            took_ms = started.elapsed().as_millis() as u64,
            "cycle complete"
        );
        Ok(doc)
    }

    /// Fetch every registered signal and assemble the full raw set. Signals
    /// without a fresh result carry the previous document's `raw_data`.
    pub async fn collect_raw(&self, previous: &PublishedDocument) -> RawRecords {
        let immediate: Vec<_> = self
            .providers
            .iter()
            .map(|p| spawn_fetch(Arc::clone(p), self.fetch_timeout))
            .collect();
        let mut outcomes = Vec::with_capacity(immediate.len() + self.delayed.len());
        for pending in immediate {
            outcomes.push(pending.finish().await);
        }

        if !self.delayed.is_empty() {
            tokio::time::sleep(self.settle_delay).await;
            let later: Vec<_> = self
                .delayed
                .iter()
                .map(|p| spawn_fetch(Arc::clone(p), self.fetch_timeout))
                .collect();
            for pending in later {
                outcomes.push(pending.finish().await);
            }
        }

        let mut raw = RawRecords::new();
        for (signal, name, outcome) in outcomes {
            match outcome {
                Ok(value) => raw.insert(signal, value),
                Err(e) => {
                    tracing::warn!(
                        target: "radar",
                        error = %e,
                        signal = %signal,
                        provider = name,
                        kind = e.kind().as_str(),
                        "fetch failed, using previous raw_data"
                    );
                    counter!(
                        "radar_fetch_failures_total",
                        "signal" => signal.as_str(),
                        "kind" => e.kind().as_str()
                    )
                    .increment(1);
                    counter!("radar_fallback_total", "signal" => signal.as_str()).increment(1);
                    raw.insert(signal, previous.raw_data(signal));
                }
            }
        }

        // The seven core signals are always present.
        for signal in Signal::ALL.into_iter().filter(|s| *s != Signal::Energy) {
            if !raw.contains(signal) {
                tracing::debug!(target: "radar", signal = %signal, "no adapter registered, carrying previous raw_data");
                raw.insert(signal, previous.raw_data(signal));
            }
        }
        raw
    }
}

/// An adapter fetch running on its own task.
struct PendingFetch {
    signal: Signal,
    name: &'static str,
    started: Instant,
    handle: JoinHandle<Result<Value, FetchError>>,
}

fn spawn_fetch(provider: Arc<dyn SourceProvider>, limit: Duration) -> PendingFetch {
    let signal = provider.signal();
    let name = provider.name();
    counter!("radar_fetch_total", "signal" => signal.as_str()).increment(1);
    let handle = tokio::spawn(async move {
        match tokio::time::timeout(limit, provider.fetch_latest()).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::timeout(limit)),
        }
    });
    PendingFetch {
        signal,
        name,
        started: Instant::now(),
        handle,
    }
}

impl PendingFetch {
    async fn finish(self) -> (Signal, &'static str, Result<Value, FetchError>) {
        let outcome = match self.handle.await {
            Ok(result) => result,
            // A panicking adapter is just another failed fetch.
            Err(e) => Err(FetchError::Transport(format!("adapter task failed: {e}"))),
        };
        histogram!("radar_fetch_ms", "signal" => self.signal.as_str())
            .record(self.started.elapsed().as_secs_f64() * 1000.0);
        (self.signal, self.name, outcome)
    }
}
