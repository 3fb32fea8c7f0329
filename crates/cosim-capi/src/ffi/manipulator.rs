//! Manipulator creation, overrides, and scenarios.

use std::ffi::{c_char, c_int};
use std::path::Path;
use std::sync::Arc;

use cosim_core::{CosimResult, ScalarValue, SlaveIndex, ValueReference};
use cosim_engine::{OverrideManipulator, ScenarioManager};

use crate::boundary::{self, FAILURE, c_str, call, slice};
use crate::execution::EXECUTIONS;
use crate::manipulator::{MANIPULATORS, ManipulatorObject};
use crate::marshal::variable_type;
use crate::registry::{ExecutionHandle, ManipulatorHandle};

#[unsafe(no_mangle)]
pub extern "C" fn cosim_override_manipulator_create() -> ManipulatorHandle {
    call(ManipulatorHandle::NULL, || {
        Ok(MANIPULATORS.insert(ManipulatorObject::new(Arc::new(OverrideManipulator::new()))))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn cosim_scenario_manager_create() -> ManipulatorHandle {
    call(ManipulatorHandle::NULL, || {
        Ok(MANIPULATORS.insert(ManipulatorObject::new(Arc::new(ScenarioManager::new()))))
    })
}

/// Release a manipulator handle.  An execution it was added to keeps using
/// it.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_manipulator_destroy(manipulator: ManipulatorHandle) -> c_int {
    boundary::status(|| MANIPULATORS.remove(manipulator).map(drop))
}

// ── Overrides ────────────────────────────────────────────────────────────────

/// Override `nv` variables of one slave from the next step on.  Nothing is
/// queued unless every variable is valid.
///
/// # Safety
/// `variables` and `values` must each point to `nv` elements.
unsafe fn set_values<T: Copy>(
    manipulator: ManipulatorHandle,
    slave:       c_int,
    variables:   *const u32,
    nv:          usize,
    values:      *const T,
    convert:     impl Fn(T) -> CosimResult<ScalarValue>,
) -> c_int {
    boundary::status(|| {
        let manipulator = MANIPULATORS.get(manipulator)?;
        let overrides = manipulator.overrides()?;
        // SAFETY: forwarded caller contract.
        let (refs, values) = unsafe { (slice(variables, nv, "variables")?, slice(values, nv, "values")?) };
        let values = refs
            .iter()
            .zip(values)
            .map(|(vr, v)| Ok((ValueReference(*vr), convert(*v)?)))
            .collect::<CosimResult<Vec<_>>>()?;
        overrides.override_values(SlaveIndex(slave), values)
    })
}

/// # Safety
/// `variables` and `values` must each point to `nv` elements.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cosim_manipulator_slave_set_real(
    manipulator: ManipulatorHandle,
    slave:       c_int,
    variables:   *const u32,
    nv:          usize,
    values:      *const f64,
) -> c_int {
    // SAFETY: forwarded caller contract.
    unsafe { set_values(manipulator, slave, variables, nv, values, |v| Ok(ScalarValue::Real(v))) }
}

/// # Safety
/// `variables` and `values` must each point to `nv` elements.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cosim_manipulator_slave_set_integer(
    manipulator: ManipulatorHandle,
    slave:       c_int,
    variables:   *const u32,
    nv:          usize,
    values:      *const c_int,
) -> c_int {
    // SAFETY: forwarded caller contract.
    unsafe { set_values(manipulator, slave, variables, nv, values, |v| Ok(ScalarValue::Integer(v))) }
}

/// # Safety
/// `variables` and `values` must each point to `nv` elements.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cosim_manipulator_slave_set_boolean(
    manipulator: ManipulatorHandle,
    slave:       c_int,
    variables:   *const u32,
    nv:          usize,
    values:      *const bool,
) -> c_int {
    // SAFETY: forwarded caller contract.
    unsafe { set_values(manipulator, slave, variables, nv, values, |v| Ok(ScalarValue::Boolean(v))) }
}

/// # Safety
/// `variables` must point to `nv` references and `values` to `nv`
/// NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cosim_manipulator_slave_set_string(
    manipulator: ManipulatorHandle,
    slave:       c_int,
    variables:   *const u32,
    nv:          usize,
    values:      *const *const c_char,
) -> c_int {
    // SAFETY: forwarded caller contract.
    unsafe {
        set_values(manipulator, slave, variables, nv, values, |v| {
            Ok(ScalarValue::String(c_str(v, "values[i]")?.to_owned()))
        })
    }
}

/// Clear overrides of `nv` variables of kind `kind` from the next step on.
///
/// # Safety
/// `variables` must point to `nv` readable references.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cosim_manipulator_slave_reset(
    manipulator: ManipulatorHandle,
    slave:       c_int,
    kind:        c_int,
    variables:   *const u32,
    nv:          usize,
) -> c_int {
    boundary::status(|| {
        let kind = variable_type(kind)?;
        let manipulator = MANIPULATORS.get(manipulator)?;
        let overrides = manipulator.overrides()?;
        // SAFETY: forwarded caller contract.
        let refs = unsafe { slice(variables, nv, "variables")? };
        let refs: Vec<_> = refs.iter().copied().map(ValueReference).collect();
        overrides.reset_values(SlaveIndex(slave), kind, &refs)
    })
}

// ── Scenarios ────────────────────────────────────────────────────────────────

/// Load and start a JSON scenario; event times count from the execution's
/// current time.
///
/// # Safety
/// `scenario_file` must be null or a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cosim_execution_load_scenario(
    execution:     ExecutionHandle,
    manipulator:   ManipulatorHandle,
    scenario_file: *const c_char,
) -> c_int {
    boundary::status(|| {
        let (control, manipulator) = (EXECUTIONS.get(execution)?, MANIPULATORS.get(manipulator)?);
        // SAFETY: forwarded caller contract.
        let path = unsafe { c_str(scenario_file, "scenarioFile")? };
        manipulator.scenario_manager()?.load_scenario(Path::new(path), control.current_time())
    })
}

/// 1 if a scenario is running, 0 if not, -1 on error.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_scenario_is_running(manipulator: ManipulatorHandle) -> c_int {
    call(FAILURE, || {
        let manipulator = MANIPULATORS.get(manipulator)?;
        Ok(c_int::from(manipulator.scenario_manager()?.is_running()))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn cosim_scenario_abort(manipulator: ManipulatorHandle) -> c_int {
    boundary::status(|| {
        MANIPULATORS.get(manipulator)?.scenario_manager()?.abort();
        Ok(())
    })
}
