use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower bound (inclusive) of the medium band.
const MEDIUM_FLOOR: u8 = 33;
/// Upper bound (inclusive) of the medium band.
const MEDIUM_CEILING: u8 = 66;

/// Coarse three-level priority derived from the numeric 0-100 scale.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Numeric priority below 33.
    Low,
    /// Numeric priority between 33 and 66 inclusive.
    #[default]
    Medium,
    /// Numeric priority above 66.
    High,
}

impl Tier {
    /// Every tier, lowest first.
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// Map a numeric priority onto its tier.
    #[must_use]
    pub const fn from_number(n: u8) -> Self {
        if n < MEDIUM_FLOOR {
            Self::Low
        } else if n <= MEDIUM_CEILING {
            Self::Medium
        } else {
            Self::High
        }
    }

    /// Canonical midpoint of the tier's band.
    ///
    /// This is a lossy inverse of [`Tier::from_number`]: only the tier survives.
    #[must_use]
    pub const fn to_number(self) -> u8 {
        match self {
            Self::Low => 16,
            Self::Medium => 50,
            Self::High => 83,
        }
    }

    /// Stable string key used on the wire and in the cache.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parse a tier key, falling back to [`Tier::Medium`] for anything unrecognised.
    #[must_use]
    pub fn from_key_lossy(key: &str) -> Self {
        match key.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }

    /// Icon key shown next to the task.
    #[must_use]
    pub const fn icon_key(self) -> &'static str {
        match self {
            Self::Low => "horizontal-rule",
            Self::Medium => "drag-handle",
            Self::High => "density-medium",
        }
    }

    /// Number of dots rendered in task lists.
    #[must_use]
    pub const fn dot_count(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric priority for an optional tier key; unknown or missing keys map to the medium midpoint.
#[must_use]
pub fn number_for_key(key: Option<&str>) -> u8 {
    key.map_or(Tier::Medium, Tier::from_key_lossy).to_number()
}
