//! `cosim-capi`: the C-callable control surface of the cosim engine
//! (built as the `cosimc` shared library).
//!
//! Every object a C caller holds is an opaque 64-bit handle into a
//! [`HandleRegistry`]; every function reports failure through a sentinel
//! (`-1` or a null handle) plus the thread-local [`error_channel`].
//! C callers include `include/cosim.h`.
//!
//! # Modules
//!
//! | Module            | Contents                                                      |
//! |-------------------|---------------------------------------------------------------|
//! | [`error_channel`] | Per-thread last error code, message, and OS error number      |
//! | [`registry`]      | Generational handle registry and the typed handle newtypes    |
//! | [`boundary`]      | Panic containment and raw-pointer argument checks             |
//! | [`types`]         | `#[repr(C)]` structs and enums shared with C                  |
//! | [`marshal`]       | Enum/struct conversion, name buffers, string scratch buffer   |
//! | [`slave`]         | Slave handles                                                 |
//! | [`observer`]      | Observer handles and their capability queries                 |
//! | [`manipulator`]   | Manipulator handles and their capability queries              |
//! | [`algorithm`]     | Algorithm handles                                             |
//! | [`execution`]     | The execution lifecycle state machine and background worker   |
//! | [`series`]        | Time-series sample queries into caller arrays                 |
//! | [`logging`]       | Console logging setup and level control                       |
//! | [`ffi`]           | The `extern "C"` functions                                    |
//!
//! # Lifecycle
//!
//! ```text
//!            step(n) / simulate_until(t)
//!   STOPPED ───────────────────────────▶ RUNNING ──ok──▶ STOPPED
//!      │ start()                           │ engine error or panic
//!      ▼                                   ▼
//!   RUNNING (background) ──stop()──▶ STOPPED   ERROR (terminal)
//! ```

pub mod algorithm;
pub mod boundary;
pub mod error_channel;
pub mod execution;
pub mod ffi;
pub mod logging;
pub mod manipulator;
pub mod marshal;
pub mod observer;
pub mod registry;
pub mod series;
pub mod slave;
pub mod types;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use execution::{ExecutionControl, ExecutionState};
pub use registry::{
    AlgorithmHandle, ExecutionHandle, Handle, HandleRegistry, ManipulatorHandle, ObserverHandle, SlaveHandle,
};
pub use types::{
    CosimExecutionStatus, CosimSlaveInfo, CosimVariableDescription, CosimVariableId, CosimVersion,
    SLAVE_NAME_MAX_SIZE,
};
