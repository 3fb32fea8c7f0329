//! Execution creation, composition, control and introspection.

use std::ffi::{c_char, c_int};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use cosim_core::{
    CosimResult, Duration, ScalarValue, SlaveIndex, TimePoint, ValueReference, VariableId, VariableType,
};
use cosim_engine::{ExecutionOverrides, FixedStepAlgorithm};

use crate::algorithm::ALGORITHMS;
use crate::boundary::{self, FAILURE, c_str, call, out, slice_mut};
use crate::execution::{EXECUTIONS, ExecutionControl};
use crate::manipulator::MANIPULATORS;
use crate::marshal::{count, describe, variable_id_to_c, write_name};
use crate::observer::OBSERVERS;
use crate::registry::{AlgorithmHandle, ExecutionHandle, ManipulatorHandle, ObserverHandle, SlaveHandle};
use crate::slave::SLAVES;
use crate::types::{CosimExecutionStatus, CosimSlaveInfo, CosimVariableDescription, CosimVariableId};

// ── Creation ─────────────────────────────────────────────────────────────────

/// A fixed-step execution starting at `start_time` (ns) with steps of
/// `step_size` (ns).
#[unsafe(no_mangle)]
pub extern "C" fn cosim_execution_create(start_time: i64, step_size: i64) -> ExecutionHandle {
    call(ExecutionHandle::NULL, || {
        let algorithm = Arc::new(Mutex::new(FixedStepAlgorithm::new(Duration(step_size))?));
        Ok(EXECUTIONS.insert(ExecutionControl::with_algorithm(TimePoint(start_time), algorithm)))
    })
}

/// An execution driven by a previously created algorithm.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_execution_create_v2(start_time: i64, algorithm: AlgorithmHandle) -> ExecutionHandle {
    call(ExecutionHandle::NULL, || {
        let algorithm = ALGORITHMS.get(algorithm)?.shared();
        Ok(EXECUTIONS.insert(ExecutionControl::with_algorithm(TimePoint(start_time), algorithm)))
    })
}

/// # Safety
/// `config_path` must be null or a NUL-terminated string.
unsafe fn from_config(config_path: *const c_char, overrides: ExecutionOverrides) -> CosimResult<ExecutionHandle> {
    // SAFETY: forwarded caller contract.
    let path = unsafe { c_str(config_path, "configPath")? };
    Ok(EXECUTIONS.insert(ExecutionControl::from_config(Path::new(path), overrides)?))
}

/// An execution built from a system-structure file, or a directory holding
/// `SystemStructure.toml`.  `start_time` is used only if
/// `start_time_defined`.
///
/// # Safety
/// `config_path` must be null or a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cosim_config_execution_create(
    config_path:        *const c_char,
    start_time_defined: bool,
    start_time:         i64,
) -> ExecutionHandle {
    call(ExecutionHandle::NULL, || {
        let overrides = ExecutionOverrides {
            start_time: start_time_defined.then_some(TimePoint(start_time)),
            step_size:  None,
        };
        // SAFETY: forwarded caller contract.
        unsafe { from_config(config_path, overrides) }
    })
}

/// As [`cosim_config_execution_create`], with a fixed step of `step_size`
/// (ns) replacing the file's algorithm.
///
/// # Safety
/// `config_path` must be null or a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cosim_config_fixed_step_execution_create(
    config_path:        *const c_char,
    start_time_defined: bool,
    start_time:         i64,
    step_size:          i64,
) -> ExecutionHandle {
    call(ExecutionHandle::NULL, || {
        let overrides = ExecutionOverrides {
            start_time: start_time_defined.then_some(TimePoint(start_time)),
            step_size:  Some(Duration(step_size)),
        };
        // SAFETY: forwarded caller contract.
        unsafe { from_config(config_path, overrides) }
    })
}

/// Stop (joining any background run) and release an execution.  A failure
/// of the background run is discarded.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_execution_destroy(execution: ExecutionHandle) -> c_int {
    boundary::status(|| {
        if let Some(control) = EXECUTIONS.remove(execution)? {
            if let Err(e) = control.stop() {
                debug!(error = %e, "execution destroyed after a failed run");
            }
        }
        Ok(())
    })
}

// ── Composition ──────────────────────────────────────────────────────────────

/// Move the slave's instance into the execution.  Returns its slave index,
/// or -1.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_execution_add_slave(execution: ExecutionHandle, slave: SlaveHandle) -> c_int {
    call(FAILURE, || {
        let (control, slave) = (EXECUTIONS.get(execution)?, SLAVES.get(slave)?);
        Ok(control.add_slave(&slave)?.0)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn cosim_execution_add_observer(execution: ExecutionHandle, observer: ObserverHandle) -> c_int {
    boundary::status(|| {
        let (control, observer) = (EXECUTIONS.get(execution)?, OBSERVERS.get(observer)?);
        control.add_observer(observer.attach()?);
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn cosim_execution_add_manipulator(execution: ExecutionHandle, manipulator: ManipulatorHandle) -> c_int {
    boundary::status(|| {
        let (control, manipulator) = (EXECUTIONS.get(execution)?, MANIPULATORS.get(manipulator)?);
        control.add_manipulator(manipulator.attach()?);
        Ok(())
    })
}

fn connect(
    execution:    ExecutionHandle,
    kind:         VariableType,
    output_slave: c_int,
    output_vr:    u32,
    input_slave:  c_int,
    input_vr:     u32,
) -> c_int {
    boundary::status(|| {
        EXECUTIONS.get(execution)?.connect(
            VariableId::new(SlaveIndex(output_slave), kind, ValueReference(output_vr)),
            VariableId::new(SlaveIndex(input_slave), kind, ValueReference(input_vr)),
        )
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn cosim_execution_connect_real_variables(
    execution:    ExecutionHandle,
    output_slave: c_int,
    output_vr:    u32,
    input_slave:  c_int,
    input_vr:     u32,
) -> c_int {
    connect(execution, VariableType::Real, output_slave, output_vr, input_slave, input_vr)
}

#[unsafe(no_mangle)]
pub extern "C" fn cosim_execution_connect_integer_variables(
    execution:    ExecutionHandle,
    output_slave: c_int,
    output_vr:    u32,
    input_slave:  c_int,
    input_vr:     u32,
) -> c_int {
    connect(execution, VariableType::Integer, output_slave, output_vr, input_slave, input_vr)
}

#[unsafe(no_mangle)]
pub extern "C" fn cosim_execution_connect_boolean_variables(
    execution:    ExecutionHandle,
    output_slave: c_int,
    output_vr:    u32,
    input_slave:  c_int,
    input_vr:     u32,
) -> c_int {
    connect(execution, VariableType::Boolean, output_slave, output_vr, input_slave, input_vr)
}

#[unsafe(no_mangle)]
pub extern "C" fn cosim_execution_connect_string_variables(
    execution:    ExecutionHandle,
    output_slave: c_int,
    output_vr:    u32,
    input_slave:  c_int,
    input_vr:     u32,
) -> c_int {
    connect(execution, VariableType::String, output_slave, output_vr, input_slave, input_vr)
}

fn set_initial(execution: ExecutionHandle, slave: c_int, vr: u32, value: impl FnOnce() -> CosimResult<ScalarValue>) -> c_int {
    boundary::status(|| EXECUTIONS.get(execution)?.set_initial_value(SlaveIndex(slave), ValueReference(vr), value()?))
}

/// Initial values may only be set before the first step.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_execution_set_real_initial_value(execution: ExecutionHandle, slave: c_int, vr: u32, value: f64) -> c_int {
    set_initial(execution, slave, vr, || Ok(ScalarValue::Real(value)))
}

#[unsafe(no_mangle)]
pub extern "C" fn cosim_execution_set_integer_initial_value(
    execution: ExecutionHandle,
    slave:     c_int,
    vr:        u32,
    value:     c_int,
) -> c_int {
    set_initial(execution, slave, vr, || Ok(ScalarValue::Integer(value)))
}

#[unsafe(no_mangle)]
pub extern "C" fn cosim_execution_set_boolean_initial_value(
    execution: ExecutionHandle,
    slave:     c_int,
    vr:        u32,
    value:     bool,
) -> c_int {
    set_initial(execution, slave, vr, || Ok(ScalarValue::Boolean(value)))
}

/// # Safety
/// `value` must be null or a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cosim_execution_set_string_initial_value(
    execution: ExecutionHandle,
    slave:     c_int,
    vr:        u32,
    value:     *const c_char,
) -> c_int {
    set_initial(execution, slave, vr, || {
        // SAFETY: forwarded caller contract.
        let value = unsafe { c_str(value, "value")? };
        Ok(ScalarValue::String(value.to_owned()))
    })
}

// ── Control ──────────────────────────────────────────────────────────────────

/// Advance exactly `num_steps` steps on the calling thread.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_execution_step(execution: ExecutionHandle, num_steps: usize) -> c_int {
    boundary::status(|| EXECUTIONS.get(execution)?.step(num_steps))
}

/// Run on the calling thread until `target_time` (ns).  Returns 1 if it was
/// reached, 0 if the run was stopped first, -1 on error.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_execution_simulate_until(execution: ExecutionHandle, target_time: i64) -> c_int {
    call(FAILURE, || Ok(c_int::from(EXECUTIONS.get(execution)?.simulate_until(TimePoint(target_time))?)))
}

/// Run in a background thread until `cosim_execution_stop`.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_execution_start(execution: ExecutionHandle) -> c_int {
    boundary::status(|| EXECUTIONS.get(execution)?.start())
}

/// Stop a background run and wait for it; fails with the run's error if
/// it had one.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_execution_stop(execution: ExecutionHandle) -> c_int {
    boundary::status(|| EXECUTIONS.get(execution)?.stop())
}

/// Fill `status`.  Fails if a background run has failed; `status` is still
/// filled in that case.
///
/// # Safety
/// `status` must be null or point to a writable `cosim_execution_status`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cosim_execution_get_status(
    execution: ExecutionHandle,
    status:    *mut CosimExecutionStatus,
) -> c_int {
    boundary::status(|| {
        let control = EXECUTIONS.get(execution)?;
        // SAFETY: forwarded caller contract.
        control.status(unsafe { out(status, "status")? })
    })
}

// ── Real-time pacing ─────────────────────────────────────────────────────────

#[unsafe(no_mangle)]
pub extern "C" fn cosim_execution_enable_real_time_simulation(execution: ExecutionHandle) -> c_int {
    boundary::status(|| {
        EXECUTIONS.get(execution)?.enable_real_time();
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn cosim_execution_disable_real_time_simulation(execution: ExecutionHandle) -> c_int {
    boundary::status(|| {
        EXECUTIONS.get(execution)?.disable_real_time();
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn cosim_execution_set_real_time_factor_target(execution: ExecutionHandle, real_time_factor: f64) -> c_int {
    boundary::status(|| EXECUTIONS.get(execution)?.set_real_time_factor_target(real_time_factor))
}

#[unsafe(no_mangle)]
pub extern "C" fn cosim_execution_set_steps_to_monitor(execution: ExecutionHandle, steps_to_monitor: c_int) -> c_int {
    boundary::status(|| EXECUTIONS.get(execution)?.set_steps_to_monitor(steps_to_monitor))
}

// ── Introspection ────────────────────────────────────────────────────────────

/// Number of slaves, or 0 on error.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_execution_get_num_slaves(execution: ExecutionHandle) -> usize {
    call(0, || Ok(EXECUTIONS.get(execution)?.slave_count()))
}

/// Write up to `num_slaves` slave infos, sorted by name.
///
/// # Safety
/// `infos` must point to `num_slaves` writable `cosim_slave_info`s.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cosim_execution_get_slave_infos(
    execution:  ExecutionHandle,
    infos:      *mut CosimSlaveInfo,
    num_slaves: usize,
) -> c_int {
    boundary::status(|| {
        let control = EXECUTIONS.get(execution)?;
        // SAFETY: forwarded caller contract.
        let infos = unsafe { slice_mut(infos, num_slaves, "infos")? };
        for (info, (name, index)) in infos.iter_mut().zip(control.slave_infos()) {
            write_name(&mut info.name, &name);
            info.index = index.0;
        }
        Ok(())
    })
}

/// Number of variables of a slave, or -1.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_slave_get_num_variables(execution: ExecutionHandle, slave: c_int) -> c_int {
    call(FAILURE, || {
        let model = EXECUTIONS.get(execution)?.model_description(SlaveIndex(slave))?;
        Ok(count(model.variables.len()))
    })
}

/// Write up to `num_variables` variable descriptions.  Returns the number
/// written, or -1.
///
/// # Safety
/// `variables` must point to `num_variables` writable
/// `cosim_variable_description`s.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cosim_slave_get_variables(
    execution:     ExecutionHandle,
    slave:         c_int,
    variables:     *mut CosimVariableDescription,
    num_variables: usize,
) -> c_int {
    call(FAILURE, || {
        let model = EXECUTIONS.get(execution)?.model_description(SlaveIndex(slave))?;
        // SAFETY: forwarded caller contract.
        let out = unsafe { slice_mut(variables, num_variables, "variables")? };
        let mut written = 0;
        for (slot, variable) in out.iter_mut().zip(&model.variables) {
            *slot = describe(variable);
            written += 1;
        }
        Ok(count(written))
    })
}

/// Number of variables with an active override, or -1.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_get_num_modified_variables(execution: ExecutionHandle) -> c_int {
    call(FAILURE, || Ok(count(EXECUTIONS.get(execution)?.modified_variables().len())))
}

/// Write up to `num_variables` ids of overridden variables.  Returns the
/// number written, or -1.
///
/// # Safety
/// `ids` must point to `num_variables` writable `cosim_variable_id`s.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cosim_get_modified_variables(
    execution:     ExecutionHandle,
    ids:           *mut CosimVariableId,
    num_variables: usize,
) -> c_int {
    call(FAILURE, || {
        let modified = EXECUTIONS.get(execution)?.modified_variables();
        // SAFETY: forwarded caller contract.
        let out = unsafe { slice_mut(ids, num_variables, "ids")? };
        let n = modified.len().min(out.len());
        for (slot, id) in out.iter_mut().zip(modified) {
            *slot = variable_id_to_c(id);
        }
        Ok(count(n))
    })
}
