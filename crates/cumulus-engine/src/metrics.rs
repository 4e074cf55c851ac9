//! Per-update performance and bookkeeping metrics.
//!
//! [`StepMetrics`] captures timing, time accounting and repair counts for
//! the most recent `update()`, plus cumulative injection counters.

/// Metrics collected during a single `update()`.
///
/// All durations are in microseconds. Injection counters are cumulative
/// since init or the last reset; everything else describes one update.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepMetrics {
    /// Wall-clock time for the whole update, in microseconds.
    pub total_us: u64,
    /// Substeps run by this update.
    pub substeps: u32,
    /// Simulated nanoseconds advanced by this update.
    pub advanced_ns: u64,
    /// Simulated nanoseconds discarded by the substep cap in this update.
    pub discarded_ns: u64,
    /// Simulated nanoseconds carried to the next update.
    pub pending_ns: u64,
    /// Cells repaired by sanitizing in this update.
    pub sanitized_cells: u64,
    /// Per-propagator execution time summed over substeps: `(name, µs)`.
    pub propagator_us: Vec<(String, u64)>,
    /// Time spent publishing the snapshot, in microseconds.
    pub snapshot_publish_us: u64,
    /// Heap bytes held by the field grid.
    pub memory_bytes: usize,
    /// Pulses still pending after the update.
    pub pending_pulses: usize,
    /// Cumulative accepted injections.
    pub injections_accepted: u64,
    /// Cumulative injections rejected for insufficient resources.
    pub injections_rejected: u64,
    /// Cumulative pulses folded early because the queue was full.
    pub pulses_folded: u64,
}
