//! Operational hazard classification.

use std::fmt;

/// Categorical hazard status derived from aggregate rainfall.
///
/// Ordered by severity, so `Normal < Elevated < Critical`. The string form
/// is produced only at presentation boundaries via [`HazardStatus::as_str`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(i32)]
pub enum HazardStatus {
    /// Rainfall below the elevated threshold.
    #[default]
    Normal = 0,
    /// Rainfall at or above the elevated threshold, below critical.
    Elevated = 1,
    /// Rainfall at or above the critical threshold. This is an emergency.
    Critical = 2,
}

impl HazardStatus {
    /// Lowercase label for display surfaces.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Elevated => "elevated",
            Self::Critical => "critical",
        }
    }

    /// Whether this status constitutes an emergency.
    pub fn is_emergency(self) -> bool {
        self == Self::Critical
    }

    /// Convert a raw discriminant back into a status.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Normal),
            1 => Some(Self::Elevated),
            2 => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for HazardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
