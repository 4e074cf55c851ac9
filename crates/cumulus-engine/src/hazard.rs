//! Hazard monitor: rainfall aggregation and status classification.
//!
//! Everything here is a pure function of a published snapshot and the
//! ledger balance; nothing is stored between publications.

use cumulus_core::HazardStatus;
use cumulus_space::Grid3;

use crate::config::HazardThresholds;

/// Aggregate rainfall: the largest column total.
///
/// For each ground column, accumulated rainfall is summed over every
/// layer; the maximum over columns is returned. `rainfall` is a field
/// buffer in canonical rank order.
pub fn aggregate_rainfall(grid: &Grid3, rainfall: &[f32]) -> f32 {
    let columns = grid.column_count();
    let mut max = 0.0f32;
    for col in 0..columns {
        let total: f32 = rainfall.iter().skip(col).step_by(columns).sum();
        max = max.max(total);
    }
    max
}

/// Point-in-time hazard classification for dashboards.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HazardReport {
    /// Operational status.
    pub status: HazardStatus,
    /// Aggregate rainfall the status was derived from, mm.
    pub rainfall_mm: f32,
    /// Resources remaining.
    pub resources: u32,
    /// Resources are at or below the low-reserve threshold.
    pub low_reserves: bool,
}

impl HazardReport {
    /// `true` exactly when the status is critical.
    pub fn is_emergency(&self) -> bool {
        self.status.is_emergency()
    }
}

/// Classifies aggregate rainfall against fixed thresholds.
#[derive(Clone, Debug, PartialEq)]
pub struct HazardMonitor {
    thresholds: HazardThresholds,
}

impl HazardMonitor {
    /// Create a monitor.
    pub fn new(thresholds: HazardThresholds) -> Self {
        Self { thresholds }
    }

    /// Configured thresholds.
    pub fn thresholds(&self) -> &HazardThresholds {
        &self.thresholds
    }

    /// Status for an aggregate rainfall.
    ///
    /// `Normal` below `elevated_mm`, `Elevated` below `critical_mm`,
    /// `Critical` otherwise.
    pub fn classify(&self, rainfall_mm: f32) -> HazardStatus {
        if rainfall_mm >= self.thresholds.critical_mm {
            HazardStatus::Critical
        } else if rainfall_mm >= self.thresholds.elevated_mm {
            HazardStatus::Elevated
        } else {
            HazardStatus::Normal
        }
    }

    /// Full report for an aggregate rainfall and ledger balance.
    pub fn report(&self, rainfall_mm: f32, resources: u32) -> HazardReport {
        HazardReport {
            status: self.classify(rainfall_mm),
            rainfall_mm,
            resources,
            low_reserves: resources <= self.thresholds.low_reserve_units,
        }
    }
}
