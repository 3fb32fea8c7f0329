//! Conversion between engine values and their C representations.

use std::cell::RefCell;
use std::ffi::{CString, c_char, c_int};

use cosim_core::{
    Causality, CosimError, CosimResult, Variability, VariableDescription, VariableId, VariableType,
};

use crate::error_channel::to_c_string;
use crate::types::{
    CosimCausality, CosimExecutionState, CosimLogSeverity, CosimVariability, CosimVariableDescription,
    CosimVariableId, CosimVariableType,
};

// ── Enumerations ─────────────────────────────────────────────────────────────

pub fn variable_type(raw: c_int) -> CosimResult<VariableType> {
    Ok(match raw {
        r if r == CosimVariableType::Real as c_int    => VariableType::Real,
        r if r == CosimVariableType::Integer as c_int => VariableType::Integer,
        r if r == CosimVariableType::String as c_int  => VariableType::String,
        r if r == CosimVariableType::Boolean as c_int => VariableType::Boolean,
        _ => return Err(CosimError::InvalidArgument("Variable type not supported".into())),
    })
}

pub fn variable_type_to_c(kind: VariableType) -> CosimVariableType {
    match kind {
        VariableType::Real    => CosimVariableType::Real,
        VariableType::Integer => CosimVariableType::Integer,
        VariableType::String  => CosimVariableType::String,
        VariableType::Boolean => CosimVariableType::Boolean,
    }
}

pub fn causality_to_c(causality: Causality) -> CosimCausality {
    match causality {
        Causality::Input               => CosimCausality::Input,
        Causality::Parameter           => CosimCausality::Parameter,
        Causality::Output              => CosimCausality::Output,
        Causality::CalculatedParameter => CosimCausality::CalculatedParameter,
        Causality::Local               => CosimCausality::Local,
        Causality::Independent         => CosimCausality::Independent,
    }
}

pub fn variability_to_c(variability: Variability) -> CosimVariability {
    match variability {
        Variability::Constant   => CosimVariability::Constant,
        Variability::Fixed      => CosimVariability::Fixed,
        Variability::Tunable    => CosimVariability::Tunable,
        Variability::Discrete   => CosimVariability::Discrete,
        Variability::Continuous => CosimVariability::Continuous,
    }
}

pub fn execution_state(raw: u8) -> CosimExecutionState {
    match raw {
        0 => CosimExecutionState::Stopped,
        1 => CosimExecutionState::Running,
        _ => CosimExecutionState::Error,
    }
}

pub fn log_severity(raw: c_int) -> CosimResult<CosimLogSeverity> {
    [
        CosimLogSeverity::Trace,
        CosimLogSeverity::Debug,
        CosimLogSeverity::Info,
        CosimLogSeverity::Warning,
        CosimLogSeverity::Error,
        CosimLogSeverity::Fatal,
    ]
    .into_iter()
    .find(|level| *level as c_int == raw)
    .ok_or_else(|| CosimError::InvalidArgument(format!("unknown log severity level {raw}")))
}

// ── Structs ──────────────────────────────────────────────────────────────────

/// Copy `name` into a fixed-size C buffer, truncating on a character
/// boundary and always NUL-terminating.
pub fn write_name(dest: &mut [c_char], name: &str) {
    let Some(capacity) = dest.len().checked_sub(1) else {
        return;
    };
    let mut end = name.len().min(capacity);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    for (d, b) in dest.iter_mut().zip(&name.as_bytes()[..end]) {
        *d = *b as c_char;
    }
    dest[end] = 0;
}

/// Text of a NUL-terminated C buffer.
pub fn read_name(src: &[c_char]) -> String {
    let bytes: Vec<u8> = src.iter().take_while(|&&c| c != 0).map(|&c| c as u8).collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub fn describe(variable: &VariableDescription) -> CosimVariableDescription {
    let mut out = CosimVariableDescription::EMPTY;
    write_name(&mut out.name, &variable.name);
    out.reference = variable.reference.0;
    out.type_ = variable_type_to_c(variable.kind) as c_int;
    out.causality = causality_to_c(variable.causality) as c_int;
    out.variability = variability_to_c(variable.variability) as c_int;
    out
}

pub fn variable_id_to_c(id: VariableId) -> CosimVariableId {
    CosimVariableId {
        slave_index:     id.slave.0,
        type_:           variable_type_to_c(id.kind) as c_int,
        value_reference: id.reference.0,
    }
}

/// Clamp a count into the `int` a C caller receives.
pub fn count(n: usize) -> c_int {
    c_int::try_from(n).unwrap_or(c_int::MAX)
}

// ── String scratch buffer ────────────────────────────────────────────────────

thread_local! {
    static STRING_BUFFER: RefCell<Vec<CString>> = const { RefCell::new(Vec::new()) };
}

/// Replace this thread's string buffer with `values` and write a pointer to
/// each into `out`.  The pointers stay valid until the next call on this
/// thread.
pub fn stash_strings(values: Vec<String>, out: &mut [*const c_char]) {
    STRING_BUFFER.with_borrow_mut(|buffer| {
        *buffer = values.into_iter().map(to_c_string).collect();
        for (slot, value) in out.iter_mut().zip(buffer.iter()) {
            *slot = value.as_ptr();
        }
    });
}
