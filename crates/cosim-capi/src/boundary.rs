//! What every `extern "C"` body runs inside.
//!
//! [`call`] catches panics, turns them into `Errc::Unspecified`, and records
//! any error in the error channel before the sentinel is returned.  The
//! pointer helpers turn C arguments into references and slices, rejecting
//! null pointers with `InvalidArgument`.

use std::any::Any;
use std::ffi::{CStr, c_char, c_int};
use std::panic::{AssertUnwindSafe, catch_unwind};

use cosim_core::{CosimError, CosimResult};

use crate::error_channel::set_last_error;

/// Success and failure returns of status-returning functions.
pub const OK: c_int = 0;
pub const FAILURE: c_int = -1;

/// Message of a panic payload that is neither `&str` nor `String`.
pub const UNKNOWN_PANIC: &str = "An exception of unknown type was thrown";

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => (*message).to_owned(),
            Err(_) => UNKNOWN_PANIC.to_owned(),
        },
    }
}

/// Run `body`, returning its value, or `on_error` after recording the error.
pub fn call<T>(on_error: T, body: impl FnOnce() -> CosimResult<T>) -> T {
    let outcome = catch_unwind(AssertUnwindSafe(body))
        .unwrap_or_else(|payload| Err(CosimError::Unspecified(panic_message(payload))));
    match outcome {
        Ok(value) => value,
        Err(e) => {
            set_last_error(&e);
            on_error
        }
    }
}

/// [`call`] for functions returning `0` / `-1`.
pub fn status(body: impl FnOnce() -> CosimResult<()>) -> c_int {
    call(FAILURE, || body().map(|()| OK))
}

// ── Pointer arguments ────────────────────────────────────────────────────────

fn null(what: &str) -> CosimError {
    CosimError::InvalidArgument(format!("'{what}' is a null pointer"))
}

/// # Safety
/// `ptr` must be null or point to a valid NUL-terminated string that lives
/// for `'a`.
pub unsafe fn c_str<'a>(ptr: *const c_char, what: &str) -> CosimResult<&'a str> {
    if ptr.is_null() {
        return Err(null(what));
    }
    // SAFETY: non-null and NUL-terminated per the caller contract.
    let text = unsafe { CStr::from_ptr(ptr) };
    text.to_str()
        .map_err(|_| CosimError::InvalidArgument(format!("'{what}' is not valid UTF-8")))
}

/// # Safety
/// Unless `len` is 0, `ptr` must be null or point to `len` readable `T`s
/// that live for `'a`.
pub unsafe fn slice<'a, T>(ptr: *const T, len: usize, what: &str) -> CosimResult<&'a [T]> {
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(null(what));
    }
    // SAFETY: non-null with `len` elements per the caller contract.
    Ok(unsafe { std::slice::from_raw_parts(ptr, len) })
}

/// # Safety
/// Unless `len` is 0, `ptr` must be null or point to `len` writable `T`s
/// not aliased elsewhere for `'a`.
pub unsafe fn slice_mut<'a, T>(ptr: *mut T, len: usize, what: &str) -> CosimResult<&'a mut [T]> {
    if len == 0 {
        return Ok(&mut []);
    }
    if ptr.is_null() {
        return Err(null(what));
    }
    // SAFETY: non-null, writable and unaliased per the caller contract.
    Ok(unsafe { std::slice::from_raw_parts_mut(ptr, len) })
}

/// # Safety
/// `ptr` must be null or point to a writable `T` not aliased elsewhere for
/// `'a`.
pub unsafe fn out<'a, T>(ptr: *mut T, what: &str) -> CosimResult<&'a mut T> {
    // SAFETY: forwarded caller contract.
    unsafe { ptr.as_mut() }.ok_or_else(|| null(what))
}

