//! # Signals
//! The fixed set of independently scored inputs to the aggregate risk,
//! together with their aggregation weights.
//!
//! Two weight tables exist: one for the seven always-present signals and one
//! used when the energy signal is active. Each table sums to 1.0.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One independently scored input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    News,
    Connectivity,
    Energy,
    Flight,
    Tanker,
    Weather,
    Polymarket,
    Pentagon,
}

impl Signal {
    /// Every signal in document order.
    pub const ALL: [Signal; 8] = [
        Signal::News,
        Signal::Connectivity,
        Signal::Energy,
        Signal::Flight,
        Signal::Tanker,
        Signal::Weather,
        Signal::Polymarket,
        Signal::Pentagon,
    ];

    /// Key used in the published document and in log/metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Signal::News => "news",
            Signal::Connectivity => "connectivity",
            Signal::Energy => "energy",
            Signal::Flight => "flight",
            Signal::Tanker => "tanker",
            Signal::Weather => "weather",
            Signal::Polymarket => "polymarket",
            Signal::Pentagon => "pentagon",
        }
    }

    /// Signals that take part in aggregation for this cycle.
    pub fn active(energy_active: bool) -> impl Iterator<Item = Signal> {
        Self::ALL
            .into_iter()
            .filter(move |s| energy_active || *s != Signal::Energy)
    }

    /// Aggregation weight. Energy has weight 0 when inactive.
    pub fn weight(self, energy_active: bool) -> f64 {
        if energy_active {
            match self {
                Signal::News => 0.17,
                Signal::Connectivity => 0.17,
                Signal::Energy => 0.15,
                Signal::Flight => 0.13,
                Signal::Tanker => 0.13,
                Signal::Polymarket => 0.13,
                Signal::Pentagon => 0.08,
                Signal::Weather => 0.04,
            }
        } else {
            match self {
                Signal::News => 0.20,
                Signal::Connectivity => 0.20,
                Signal::Energy => 0.0,
                Signal::Flight => 0.15,
                Signal::Tanker => 0.15,
                Signal::Polymarket => 0.15,
                Signal::Pentagon => 0.10,
                Signal::Weather => 0.05,
            }
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clamp a computed value into an integer risk in `[0, 100]`.
pub fn clamp_risk(x: f64) -> u8 {
    if x.is_nan() {
        return 0;
    }
    x.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weight_sum(energy_active: bool) -> f64 {
        Signal::active(energy_active)
            .map(|s| s.weight(energy_active))
            .sum()
    }

    #[test]
    fn weights_sum_to_one() {
        assert!((weight_sum(false) - 1.0).abs() < 1e-9);
        assert!((weight_sum(true) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn energy_excluded_when_inactive() {
        assert_eq!(Signal::active(false).count(), 7);
        assert!(Signal::active(false).all(|s| s != Signal::Energy));
        assert_eq!(Signal::active(true).count(), 8);
    }

    #[test]
    fn serializes_lowercase() {
        let v = serde_json::to_value(Signal::Polymarket).unwrap();
        assert_eq!(v, serde_json::json!("polymarket"));
        assert_eq!(Signal::Flight.to_string(), "flight");
    }

    #[test]
    fn clamp_risk_bounds() {
        assert_eq!(clamp_risk(-4.0), 0);
        assert_eq!(clamp_risk(13.6), 14);
        assert_eq!(clamp_risk(140.0), 100);
        assert_eq!(clamp_risk(f64::NAN), 0);
    }
}
