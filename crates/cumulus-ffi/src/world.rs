//! Engine lifecycle and query FFI.
//!
//! The global `ENGINES` table lock is held only for handle lookup. The
//! engine itself is shared behind an `Arc`, so an update on one thread
//! does not block queries on another.

use std::sync::{Arc, Mutex};

use cumulus_core::{FieldId, Position, SnapshotAccess};
use cumulus_engine::SeedingEngine;
use tracing::{error, info};

use crate::config::CumulusConfig;
use crate::handle::HandleTable;
use crate::status::{CumulusHazardStatus, CumulusStatus};

static ENGINES: Mutex<HandleTable<Arc<SeedingEngine>>> = Mutex::new(HandleTable::new());

/// Clone the Arc for an engine handle, briefly locking the global table.
///
/// Returns `None` if the handle is invalid or the mutex is poisoned.
pub(crate) fn get_engine(handle: u64) -> Option<Arc<SeedingEngine>> {
    let engine = ENGINES.lock().ok()?.get(handle).cloned();
    if engine.is_none() {
        error!(handle, "call on an uninitialised or destroyed engine handle");
    }
    engine
}

macro_rules! engine_or_return {
    ($handle:expr) => {
        match get_engine($handle) {
            Some(e) => e,
            None => return CumulusStatus::InvalidHandle as i32,
        }
    };
}

// ── Lifecycle ────────────────────────────────────────────────────

/// Create an engine.
///
/// `config` may be null to use the defaults. On success the handle is
/// written to `handle_out`. A zero handle is never issued.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cumulus_init(config: *const CumulusConfig, handle_out: *mut u64) -> i32 {
    ffi_guard!({
        if handle_out.is_null() {
            return CumulusStatus::InvalidArgument as i32;
        }
        let config = if config.is_null() {
            CumulusConfig::default()
        } else {
            // SAFETY: config is non-null and valid per caller contract.
            unsafe { *config }
        };
        let config = match config.to_rust() {
            Ok(c) => c,
            Err(status) => return status as i32,
        };
        let engine = match SeedingEngine::init(config) {
            Ok(e) => e,
            Err(e) => {
                error!(error = %e, "engine configuration rejected");
                return CumulusStatus::from(&e) as i32;
            }
        };
        let mut table = ffi_lock!(ENGINES);
        let handle = table.insert(Arc::new(engine));
        info!(handle, live = table.len(), "engine handle issued");
        // SAFETY: handle_out is non-null and valid per caller contract.
        unsafe { *handle_out = handle };
        CumulusStatus::Ok as i32
    })
}

/// Restore the engine to its post-init state.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cumulus_reset(handle: u64) -> i32 {
    ffi_guard!({
        engine_or_return!(handle).reset();
        CumulusStatus::Ok as i32
    })
}

/// Destroy an engine. The handle is invalid afterwards; queries already
/// running on other threads finish against their own reference.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cumulus_destroy(handle: u64) -> i32 {
    ffi_guard!({
        match ffi_lock!(ENGINES).remove(handle) {
            Some(_) => CumulusStatus::Ok as i32,
            None => {
                error!(handle, "destroy of an unknown engine handle");
                CumulusStatus::InvalidHandle as i32
            }
        }
    })
}

// ── Writer operations ────────────────────────────────────────────

/// Release seeding agent at normalized `(x, y, z)`.
///
/// Out-of-range inputs are clamped. `accepted_out` (may be null) receives
/// 1 if the injection was applied and 0 if resources were insufficient.
/// A rejection is not an error: the call still returns `Ok`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cumulus_add_moisture_injection(
    handle: u64,
    x: f32,
    y: f32,
    z: f32,
    intensity: f32,
    lift_km: f32,
    accepted_out: *mut u8,
) -> i32 {
    ffi_guard!({
        let engine = engine_or_return!(handle);
        let receipt = engine.add_injection(Position::new(x, y, z), intensity, lift_km);
        if !accepted_out.is_null() {
            // SAFETY: accepted_out is non-null and valid per caller contract.
            unsafe { *accepted_out = u8::from(receipt.accepted) };
        }
        CumulusStatus::Ok as i32
    })
}

/// Advance simulated time by `delta_time` seconds.
///
/// Non-finite or non-positive `delta_time` is a no-op returning `Ok`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cumulus_update(handle: u64, delta_time: f64) -> i32 {
    ffi_guard!({
        match engine_or_return!(handle).update(delta_time) {
            Ok(_) => CumulusStatus::Ok as i32,
            Err(e) => CumulusStatus::from(&e) as i32,
        }
    })
}

// ── Queries ──────────────────────────────────────────────────────

/// Aggregate rainfall in mm.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cumulus_get_rainfall(handle: u64, out: *mut f32) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return CumulusStatus::InvalidArgument as i32;
        }
        let rain = engine_or_return!(handle).rainfall();
        // SAFETY: out is non-null and valid per caller contract.
        unsafe { *out = rain };
        CumulusStatus::Ok as i32
    })
}

/// Resources remaining.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cumulus_get_resources(handle: u64, out: *mut u32) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return CumulusStatus::InvalidArgument as i32;
        }
        let resources = engine_or_return!(handle).resources();
        // SAFETY: out is non-null and valid per caller contract.
        unsafe { *out = resources };
        CumulusStatus::Ok as i32
    })
}

/// Hazard status as a [`CumulusHazardStatus`] code. Use
/// [`cumulus_status_name`](crate::cumulus_status_name) for the label.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cumulus_get_status(handle: u64, out: *mut i32) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return CumulusStatus::InvalidArgument as i32;
        }
        let status = CumulusHazardStatus::from(engine_or_return!(handle).status());
        // SAFETY: out is non-null and valid per caller contract.
        unsafe { *out = status as i32 };
        CumulusStatus::Ok as i32
    })
}

/// 1 when the hazard status is critical, else 0.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cumulus_is_emergency(handle: u64, out: *mut u8) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return CumulusStatus::InvalidArgument as i32;
        }
        let emergency = engine_or_return!(handle).is_emergency();
        // SAFETY: out is non-null and valid per caller contract.
        unsafe { *out = u8::from(emergency) };
        CumulusStatus::Ok as i32
    })
}

/// Simulated seconds since init or the last reset.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cumulus_get_sim_time(handle: u64, out: *mut f64) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return CumulusStatus::InvalidArgument as i32;
        }
        let t = engine_or_return!(handle).sim_time();
        // SAFETY: out is non-null and valid per caller contract.
        unsafe { *out = t };
        CumulusStatus::Ok as i32
    })
}

/// Copy a field of the latest snapshot into `buf`.
///
/// Field 0 is moisture, field 1 accumulated rainfall. `buf_len` must be
/// at least the cell count.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cumulus_read_field(
    handle: u64,
    field_id: u32,
    buf: *mut f32,
    buf_len: usize,
) -> i32 {
    ffi_guard!({
        if buf.is_null() {
            return CumulusStatus::InvalidArgument as i32;
        }
        let snap = engine_or_return!(handle).snapshot();
        let data = match snap.read_field(FieldId(field_id)) {
            Some(d) => d,
            None => return CumulusStatus::InvalidArgument as i32,
        };
        if buf_len < data.len() {
            return CumulusStatus::BufferTooSmall as i32;
        }
        // SAFETY: buf is non-null with at least buf_len elements per caller contract.
        let out = unsafe { std::slice::from_raw_parts_mut(buf, data.len()) };
        out.copy_from_slice(data);
        CumulusStatus::Ok as i32
    })
}

/// Moisture blended between the two most recent publications.
///
/// `alpha` 0 is the previous snapshot, 1 the latest. `buf_len` must be at
/// least the cell count. `written_out` (may be null) receives the number
/// of cells written.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cumulus_interpolated_moisture(
    handle: u64,
    alpha: f32,
    buf: *mut f32,
    buf_len: usize,
    written_out: *mut usize,
) -> i32 {
    ffi_guard!({
        if buf.is_null() {
            return CumulusStatus::InvalidArgument as i32;
        }
        let engine = engine_or_return!(handle);
        if buf_len < engine.grid().cell_count() {
            return CumulusStatus::BufferTooSmall as i32;
        }
        // SAFETY: buf is non-null with at least buf_len elements per caller contract.
        let out = unsafe { std::slice::from_raw_parts_mut(buf, buf_len) };
        let written = engine.interpolated_moisture(alpha, out);
        if !written_out.is_null() {
            // SAFETY: written_out is non-null and valid per caller contract.
            unsafe { *written_out = written };
        }
        CumulusStatus::Ok as i32
    })
}
