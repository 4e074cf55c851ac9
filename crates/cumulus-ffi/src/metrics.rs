//! C-compatible step metrics.

use cumulus_engine::StepMetrics;

use crate::status::CumulusStatus;
use crate::world::get_engine;

/// Metrics of the most recent update, as seen from C.
#[repr(C)]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CumulusStepMetrics {
    /// Wall-clock time for the whole update, in microseconds.
    pub total_us: u64,
    /// Simulated nanoseconds advanced by the update.
    pub advanced_ns: u64,
    /// Simulated nanoseconds dropped because the substep cap was hit.
    pub discarded_ns: u64,
    /// Simulated nanoseconds carried to the next update.
    pub pending_ns: u64,
    /// Cells whose non-finite or negative values were repaired.
    pub sanitized_cells: u64,
    /// Time spent publishing the snapshot, in microseconds.
    pub snapshot_publish_us: u64,
    /// Field memory, in bytes. Fixed-width `u64` for ABI portability.
    pub memory_bytes: u64,
    /// Injections accepted since the previous publication.
    pub injections_accepted: u64,
    /// Injections rejected since the previous publication.
    pub injections_rejected: u64,
    /// Pulses folded into the field early because the queue was full.
    pub pulses_folded: u64,
    /// Substeps run.
    pub substeps: u32,
    /// Pulses still releasing moisture.
    pub pending_pulses: u32,
    /// Number of propagators executed.
    pub n_propagators: u32,
}

// 10×u64 + 3×u32 + 4 bytes padding = 96 bytes, align 8.
const _: () = assert!(std::mem::size_of::<CumulusStepMetrics>() == 96);
const _: () = assert!(std::mem::align_of::<CumulusStepMetrics>() == 8);

impl CumulusStepMetrics {
    pub(crate) fn from_rust(m: &StepMetrics) -> Self {
        Self {
            total_us: m.total_us,
            advanced_ns: m.advanced_ns,
            discarded_ns: m.discarded_ns,
            pending_ns: m.pending_ns,
            sanitized_cells: m.sanitized_cells,
            snapshot_publish_us: m.snapshot_publish_us,
            memory_bytes: m.memory_bytes as u64,
            injections_accepted: m.injections_accepted,
            injections_rejected: m.injections_rejected,
            pulses_folded: m.pulses_folded,
            substeps: m.substeps,
            pending_pulses: u32::try_from(m.pending_pulses).unwrap_or(u32::MAX),
            n_propagators: m.propagator_us.len() as u32,
        }
    }
}

/// Write the metrics of the latest publication to `out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cumulus_last_metrics(handle: u64, out: *mut CumulusStepMetrics) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return CumulusStatus::InvalidArgument as i32;
        }
        let engine = match get_engine(handle) {
            Some(e) => e,
            None => return CumulusStatus::InvalidHandle as i32,
        };
        let m = CumulusStepMetrics::from_rust(engine.snapshot().metrics());
        // SAFETY: out is non-null and valid per caller contract.
        unsafe { *out = m };
        CumulusStatus::Ok as i32
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_copies_counters() {
        let m = StepMetrics {
            total_us: 120,
            substeps: 3,
            advanced_ns: 150_000_000,
            pending_ns: 10_000_000,
            memory_bytes: 4096,
            pending_pulses: 2,
            injections_accepted: 1,
            propagator_us: vec![("diffusion".into(), 10), ("decay".into(), 4)],
            ..StepMetrics::default()
        };
        let c = CumulusStepMetrics::from_rust(&m);
        assert_eq!(c.total_us, 120);
        assert_eq!(c.substeps, 3);
        assert_eq!(c.advanced_ns, 150_000_000);
        assert_eq!(c.pending_ns, 10_000_000);
        assert_eq!(c.memory_bytes, 4096);
        assert_eq!(c.pending_pulses, 2);
        assert_eq!(c.injections_accepted, 1);
        assert_eq!(c.n_propagators, 2);
    }
}
