//! history.rs: rolls per-signal histories and the total-risk timeline forward.
//!
//! Pure `(previous document, current scores) -> next document`. Per-signal
//! windows get the new risk appended (cap 20). The total-risk timeline keeps
//! one live point, overwritten every cycle, plus up to [`MAX_PINNED`] frozen
//! snapshots taken at the 00:00 / 12:00 local boundaries.

use chrono::{DateTime, NaiveTime, TimeZone, Timelike};
use std::fmt::Display;

use crate::document::{PublishedDocument, SignalEntry, TotalRisk, TotalRiskPoint};
use crate::engine::RiskScores;
use crate::ingest::types::RawRecords;

/// Pinned snapshots kept on the timeline.
pub const MAX_PINNED: usize = 6;

/// Most recent 00:00 or 12:00 at or before `now`, in `now`'s zone.
pub fn half_day_boundary<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let hour = if now.hour() >= 12 { 12 } else { 0 };
    NaiveTime::from_hms_opt(hour, 0, 0)
        .map(|t| now.date_naive().and_time(t))
        .and_then(|naive| now.timezone().from_local_datetime(&naive).earliest())
        // Boundary skipped by a DST jump: treat now as the boundary.
        .unwrap_or_else(|| now.clone())
}

/// Split a stored timeline into pinned points and the live point. Only the
/// last point can be live; anything before it is treated as pinned, sorted,
/// with one point per timestamp.
fn split_timeline(prev: &[TotalRiskPoint]) -> (Vec<TotalRiskPoint>, Option<TotalRiskPoint>) {
    let mut points = prev.to_vec();
    points.sort_by_key(|p| p.timestamp);

    let live = match points.last() {
        Some(p) if !p.pinned => points.pop(),
        _ => None,
    };
    let mut pinned: Vec<TotalRiskPoint> = Vec::with_capacity(points.len());
    for p in points {
        let p = TotalRiskPoint::pinned(p.timestamp, p.risk);
        match pinned.last_mut() {
            Some(last) if last.timestamp == p.timestamp => *last = p,
            _ => pinned.push(p),
        }
    }
    (pinned, live)
}

/// Next timeline given the current boundary, the current time (both unix
/// ms) and the current total risk.
///
/// If the live point predates `boundary_ms` it is frozen at the boundary
/// with its own risk and a new live point is appended; the oldest pinned
/// points are dropped beyond [`MAX_PINNED`]. Otherwise the live point is
/// overwritten in place.
pub fn advance_timeline(
    prev: &[TotalRiskPoint],
    boundary_ms: i64,
    now_ms: i64,
    risk: u8,
) -> Vec<TotalRiskPoint> {
    let (mut pinned, live) = split_timeline(prev);

    if let Some(live) = live {
        if live.timestamp < boundary_ms {
            tracing::debug!(target: "radar", boundary_ms, pinned_risk = live.risk, "half-day boundary crossed");
            pinned.retain(|p| p.timestamp < boundary_ms);
            pinned.push(TotalRiskPoint::pinned(boundary_ms, live.risk));
        }
    }
    if pinned.len() > MAX_PINNED {
        let excess = pinned.len() - MAX_PINNED;
        pinned.drain(0..excess);
    }

    pinned.push(TotalRiskPoint::live(now_ms, risk));
    pinned
}

/// Build the document to publish for this cycle.
pub fn update_history<Tz>(
    prev: &PublishedDocument,
    scores: &RiskScores,
    raw: &RawRecords,
    now: DateTime<Tz>,
) -> PublishedDocument
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut doc = PublishedDocument::default();

    for (signal, scored) in &scores.scores {
        doc.set_entry(
            *signal,
            SignalEntry {
                risk: scored.risk,
                detail: scored.detail.clone(),
                history: prev.signal_history(*signal).appended(scored.risk),
                raw_data: raw.raw_or_empty(*signal),
            },
        );
    }

    let boundary = half_day_boundary(&now);
    let timeline = advance_timeline(
        prev.timeline(),
        boundary.timestamp_millis(),
        now.timestamp_millis(),
        scores.total_risk,
    );
    tracing::debug!(target: "radar", points = timeline.len(), "timeline updated");

    doc.total_risk = TotalRisk {
        risk: scores.total_risk,
        history: timeline,
        elevated_count: scores.elevated_count,
    };
    doc.last_updated = now.to_rfc3339();
    doc
}
