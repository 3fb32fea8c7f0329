//! Logging and version queries.

use std::ffi::c_int;

use crate::boundary::{self, call};
use crate::logging;
use crate::marshal::log_severity;
use crate::types::CosimVersion;

/// Log to stderr.  Returns 0 on success, -1 if another logger is installed.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_log_setup_simple_console_logging() -> c_int {
    boundary::status(logging::setup_simple_console_logging)
}

/// Set the output level (a `cosim_log_severity_level`).  An unknown level is
/// recorded in the error channel and otherwise ignored.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_log_set_output_level(level: c_int) {
    call((), || logging::set_output_level(log_severity(level)?));
}

/// Version of the engine library.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_libcosim_version() -> CosimVersion {
    cosim_engine::version().into()
}

/// Version of this C library.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_libcosimc_version() -> CosimVersion {
    let part = |s: &str| s.parse::<u32>().unwrap_or(0);
    CosimVersion::from((
        part(env!("CARGO_PKG_VERSION_MAJOR")),
        part(env!("CARGO_PKG_VERSION_MINOR")),
        part(env!("CARGO_PKG_VERSION_PATCH")),
    ))
}
