//! # Rolling History
//! Capped, insertion-ordered window over the last per-signal risk values.
//!
//! Oldest values are discarded once the cap is exceeded. The window is
//! serialized as a plain JSON array so it round-trips through the published
//! document unchanged.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::VecDeque;

use crate::signal::clamp_risk;

/// Number of risk values kept per signal.
pub const SIGNAL_HISTORY_CAP: usize = 20;

/// Append-only window of risk values, capped at [`SIGNAL_HISTORY_CAP`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RollingHistory {
    buf: VecDeque<u8>,
}

impl RollingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new observation and drop the oldest ones beyond the cap.
    pub fn push(&mut self, risk: u8) {
        self.buf.push_back(risk.min(100));
        while self.buf.len() > SIGNAL_HISTORY_CAP {
            self.buf.pop_front();
        }
    }

    /// Copy of `self` with `risk` appended.
    pub fn appended(&self, risk: u8) -> Self {
        let mut next = self.clone();
        next.push(risk);
        next
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn latest(&self) -> Option<u8> {
        self.buf.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.buf.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.buf.iter().copied().collect()
    }
}

impl FromIterator<u8> for RollingHistory {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut h = Self::new();
        for v in iter {
            h.push(v);
        }
        h
    }
}

/// Accepts any JSON numbers (floats, out-of-range values), rounding and
/// clamping each into `[0, 100]`. Non-numeric elements are skipped and a
/// non-array reads as an empty window.
impl<'de> Deserialize<'de> for RollingHistory {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let v = Value::deserialize(d)?;
        let Some(items) = v.as_array() else {
            return Ok(Self::new());
        };
        Ok(items
            .iter()
            .filter_map(|x| match x {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .map(clamp_risk)
            .collect())
    }
}
