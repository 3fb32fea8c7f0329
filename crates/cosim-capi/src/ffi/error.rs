use std::ffi::{c_char, c_int};

use crate::error_channel;

/// Code of the last error on this thread (a `cosim_errc`).
#[unsafe(no_mangle)]
pub extern "C" fn cosim_last_error_code() -> c_int {
    error_channel::last_error_code().as_raw()
}

/// Message of the last error on this thread.  The pointer stays valid until
/// the next failing call on this thread.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_last_error_message() -> *const c_char {
    error_channel::last_error_message()
}

/// OS error number behind the last `COSIM_ERRC_ERRNO`, 0 otherwise.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_last_error_os_code() -> c_int {
    error_channel::last_error_os_code()
}
