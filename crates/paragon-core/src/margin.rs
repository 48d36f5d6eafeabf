//! Symmetric tolerance bands around reference bibliometric counts

use serde::{Deserialize, Serialize};

/// Tolerance around a reference value, decided at construction time.
///
/// `Absolute(n)` spans `[reference - n, reference + n]`.
/// `Relative(f)` spans `reference * (1 ± f)`, rounded outward, with a floor
/// of ±1 so that a relative margin never collapses to a point even when the
/// reference is 0 or 1.
///
/// Bounds are inclusive on both ends and the low bound saturates at 0, since
/// every quantity a margin is applied to (years, counts) is non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Margin {
    Absolute(u32),
    Relative(f64),
}

impl Margin {
    /// Inclusive `(low, high)` bounds around `reference`.
    pub fn range(&self, reference: u32) -> (u32, u32) {
        let spread = match *self {
            Self::Absolute(n) => n,
            Self::Relative(f) => {
                let raw = (f * f64::from(reference)).ceil();
                // cast is safe: counts stay far below u32::MAX
                (raw as u32).max(1)
            }
        };
        (reference.saturating_sub(spread), reference + spread)
    }

    /// Whether `value` falls inside the band around `reference`.
    pub fn contains(&self, reference: u32, value: u32) -> bool {
        let (low, high) = self.range(reference);
        (low..=high).contains(&value)
    }
}

impl std::fmt::Display for Margin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absolute(n) => write!(f, "±{n}"),
            Self::Relative(frac) => write!(f, "±{:.0}%", frac * 100.0),
        }
    }
}
