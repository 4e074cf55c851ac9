//! C FFI bindings for the Cumulus cloud-seeding simulation.
//!
//! Engines live behind opaque `u64` handles in a slot+generation table, so
//! a destroyed or never-created handle is detected and reported as
//! [`CumulusStatus::InvalidHandle`] rather than dereferenced. Every
//! function returns an `i32` status code and writes results through
//! caller-provided out-pointers. Panics never cross the boundary: they are
//! caught and reported as [`CumulusStatus::Panicked`].
//!
//! A C header is generated into `include/cumulus.h` at build time.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

/// Run an FFI body, converting a panic into [`CumulusStatus::Panicked`].
macro_rules! ffi_guard {
    ($body:block) => {
        ffi_guard_or!($crate::status::CumulusStatus::Panicked as i32, $body)
    };
}

/// Run an FFI body, returning `$fallback` if it panics.
macro_rules! ffi_guard_or {
    ($fallback:expr, $body:block) => {
        match ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| $body)) {
            Ok(v) => v,
            Err(_) => {
                ::tracing::error!("panic caught at the FFI boundary");
                $fallback
            }
        }
    };
}

/// Lock a mutex, returning [`CumulusStatus::InternalError`] from the
/// enclosing closure if it is poisoned.
macro_rules! ffi_lock {
    ($mutex:expr) => {
        match $mutex.lock() {
            Ok(guard) => guard,
            Err(_) => return $crate::status::CumulusStatus::InternalError as i32,
        }
    };
}

pub mod config;
mod handle;
pub mod metrics;
pub mod status;
pub mod world;

pub use config::{cumulus_default_config, CumulusConfig, CumulusEdgeBehavior};
pub use metrics::{cumulus_last_metrics, CumulusStepMetrics};
pub use status::{cumulus_status_name, CumulusHazardStatus, CumulusStatus};
pub use world::{
    cumulus_add_moisture_injection, cumulus_destroy, cumulus_get_rainfall, cumulus_get_resources,
    cumulus_get_sim_time, cumulus_get_status, cumulus_init, cumulus_interpolated_moisture,
    cumulus_is_emergency, cumulus_read_field, cumulus_reset, cumulus_update,
};
