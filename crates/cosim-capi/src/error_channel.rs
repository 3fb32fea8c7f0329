//! Per-thread record of the most recent failure.
//!
//! Every C function that returns a failure sentinel first stores the error
//! here.  The record is overwritten by the next failure on the same thread
//! and never cleared by successful calls.

use std::cell::RefCell;
use std::ffi::{CString, c_char};

use tracing::debug;

use cosim_core::{CosimError, Errc};

struct LastError {
    code:    Errc,
    message: CString,
    os_code: i32,
}

thread_local! {
    static LAST_ERROR: RefCell<LastError> = RefCell::new(LastError {
        code:    Errc::Success,
        message: CString::default(),
        os_code: 0,
    });
}

/// Turn arbitrary text into a C string, dropping interior NULs.
pub(crate) fn to_c_string(text: String) -> CString {
    CString::new(text).unwrap_or_else(|e| {
        let mut bytes = e.into_vec();
        bytes.retain(|&b| b != 0);
        CString::new(bytes).unwrap_or_default()
    })
}

pub fn set_last_error(err: &CosimError) {
    debug!(code = %err.code(), error = %err, "call failed");
    LAST_ERROR.with_borrow_mut(|last| {
        last.code = err.code();
        last.message = to_c_string(err.to_string());
        last.os_code = err.os_code().unwrap_or(0);
    });
}

pub fn last_error_code() -> Errc {
    LAST_ERROR.with_borrow(|last| last.code)
}

/// Pointer to the message of the last error on this thread.  Valid until the
/// next failing call on this thread.
pub fn last_error_message() -> *const c_char {
    LAST_ERROR.with_borrow(|last| last.message.as_ptr())
}

/// Owned copy of the last message, for Rust callers.
pub fn last_error_message_string() -> String {
    LAST_ERROR.with_borrow(|last| last.message.to_string_lossy().into_owned())
}

/// OS error number of the last `Errc::Errno` failure, 0 otherwise.
pub fn last_error_os_code() -> i32 {
    LAST_ERROR.with_borrow(|last| last.os_code)
}
