//! Value types shared with C.  Layouts match the `cosim.h` declarations.

use std::ffi::{c_char, c_int};

/// Capacity of the name buffers, including the terminating NUL.
pub const SLAVE_NAME_MAX_SIZE: usize = 1024;

// ── Enumerations ─────────────────────────────────────────────────────────────
//
// C passes these as plain `int`s; conversions from raw values are checked in
// `marshal`.

#[repr(C)]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CosimExecutionState {
    Stopped = 0,
    Running = 1,
    Error   = 2,
}

#[repr(C)]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CosimVariableType {
    Real    = 0,
    Integer = 1,
    String  = 2,
    Boolean = 3,
}

#[repr(C)]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CosimCausality {
    Input               = 0,
    Parameter           = 1,
    Output              = 2,
    CalculatedParameter = 3,
    Local               = 4,
    Independent         = 5,
}

#[repr(C)]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CosimVariability {
    Constant   = 0,
    Fixed      = 1,
    Tunable    = 2,
    Discrete   = 3,
    Continuous = 4,
}

#[repr(C)]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CosimLogSeverity {
    Trace   = 0,
    Debug   = 1,
    Info    = 2,
    Warning = 3,
    Error   = 4,
    Fatal   = 5,
}

// ── Structs ──────────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct CosimExecutionStatus {
    /// Nanoseconds.
    pub current_time:                     i64,
    /// A `CosimExecutionState`.
    pub state:                            c_int,
    /// The last recorded `Errc`.
    pub error_code:                       c_int,
    pub total_average_real_time_factor:   f64,
    pub rolling_average_real_time_factor: f64,
    pub real_time_factor_target:          f64,
    pub is_real_time_simulation:          c_int,
    pub steps_to_monitor:                 c_int,
}

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct CosimVariableDescription {
    pub name:        [c_char; SLAVE_NAME_MAX_SIZE],
    pub reference:   u32,
    pub type_:       c_int,
    pub causality:   c_int,
    pub variability: c_int,
}

impl CosimVariableDescription {
    pub const EMPTY: Self = Self {
        name:        [0; SLAVE_NAME_MAX_SIZE],
        reference:   0,
        type_:       0,
        causality:   0,
        variability: 0,
    };
}

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct CosimSlaveInfo {
    pub name:  [c_char; SLAVE_NAME_MAX_SIZE],
    pub index: c_int,
}

impl CosimSlaveInfo {
    pub const EMPTY: Self = Self { name: [0; SLAVE_NAME_MAX_SIZE], index: -1 };
}

#[repr(C)]
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct CosimVariableId {
    pub slave_index:     c_int,
    pub type_:           c_int,
    pub value_reference: u32,
}

#[repr(C)]
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct CosimVersion {
    pub major: c_int,
    pub minor: c_int,
    pub patch: c_int,
}

impl From<(u32, u32, u32)> for CosimVersion {
    fn from((major, minor, patch): (u32, u32, u32)) -> Self {
        let part = |v: u32| c_int::try_from(v).unwrap_or(c_int::MAX);
        Self { major: part(major), minor: part(minor), patch: part(patch) }
    }
}
