//! The `extern "C"` surface.
//!
//! Every function here follows the same rules:
//!
//! 1. The body runs inside [`boundary::call`](crate::boundary::call) or
//!    [`boundary::status`](crate::boundary::status), so panics never cross
//!    into C.
//! 2. Failures return a sentinel (`-1`, a null handle, or 0 for the
//!    `size_t` counts) after storing the error in the thread's
//!    [`error_channel`](crate::error_channel).
//! 3. Pointer arguments are checked for null before use; arrays are
//!    caller-allocated with explicit lengths.
//!
//! C types: `cosim_time_point`, `cosim_duration` and `cosim_step_number`
//! are `int64_t` (nanoseconds for times), `cosim_slave_index` is `int`,
//! `cosim_value_reference` is `uint32_t`, handles are `uint64_t`.

pub mod algorithm;
pub mod error;
pub mod execution;
pub mod library;
pub mod manipulator;
pub mod observer;
pub mod slave;
