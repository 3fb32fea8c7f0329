//! Tests for cosim-capi, driven through the `extern "C"` functions the way a
//! C host would call them.

#[cfg(test)]
mod helpers {
    use std::ffi::{CStr, c_int};

    use crate::boundary::OK;
    use crate::error_channel::last_error_message_string;
    use crate::ffi::execution::{cosim_execution_add_slave, cosim_execution_create, cosim_execution_get_status};
    use crate::ffi::slave::{cosim_local_slave_create, cosim_local_slave_destroy};
    use crate::registry::{ExecutionHandle, Handle};
    use crate::types::CosimExecutionStatus;

    /// 0.1 s in nanoseconds.
    pub const TENTH: i64 = 100_000_000;

    pub fn execution() -> ExecutionHandle {
        let execution = cosim_execution_create(0, TENTH);
        assert!(!execution.is_null(), "{}", last_error_message_string());
        execution
    }

    /// Create a slave from `source`, add it, and release the slave handle.
    pub fn add(execution: ExecutionHandle, source: &CStr, name: &CStr) -> c_int {
        let slave = unsafe { cosim_local_slave_create(source.as_ptr(), name.as_ptr()) };
        assert!(!slave.is_null(), "{}", last_error_message_string());
        let index = cosim_execution_add_slave(execution, slave);
        assert_eq!(cosim_local_slave_destroy(slave), OK);
        index
    }

    pub fn status(execution: ExecutionHandle) -> (c_int, CosimExecutionStatus) {
        let mut out = CosimExecutionStatus::default();
        let rc = unsafe { cosim_execution_get_status(execution, &mut out) };
        (rc, out)
    }
}

#[cfg(test)]
mod registry {
    use cosim_core::Errc;

    use crate::registry::{Handle, HandleRegistry, SlaveHandle};

    #[test]
    fn insert_get_remove() {
        let registry: HandleRegistry<SlaveHandle, String> = HandleRegistry::new();
        let a = registry.insert("a".to_owned());
        let b = registry.insert("b".to_owned());
        assert_ne!(a, b);
        assert!(!a.is_null());
        assert_eq!(*registry.get(a).unwrap(), "a");
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.remove(a).unwrap().as_deref().map(String::as_str), Some("a"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.remove(a).unwrap_err().code(), Errc::InvalidArgument);
    }

    #[test]
    fn reused_slot_rejects_stale_handle() {
        let registry: HandleRegistry<SlaveHandle, u32> = HandleRegistry::new();
        let old = registry.insert(1);
        registry.remove(old).unwrap();
        let new = registry.insert(2);
        assert_ne!(old, new);
        assert_eq!(old.raw() as u32, new.raw() as u32, "slot index is reused");
        assert_eq!(registry.get(old).unwrap_err().code(), Errc::InvalidArgument);
        assert_eq!(*registry.get(new).unwrap(), 2);
    }

    #[test]
    fn null_handle() {
        let registry: HandleRegistry<SlaveHandle, u32> = HandleRegistry::new();
        assert!(registry.remove(SlaveHandle::NULL).unwrap().is_none());
        let err = registry.get(SlaveHandle::NULL).unwrap_err();
        assert_eq!(err.code(), Errc::InvalidArgument);
        assert!(err.to_string().contains("null slave handle"), "{err}");
        assert!(registry.is_empty());
    }

    #[test]
    fn handle_outlives_destroy_of_shared_value() {
        let registry: HandleRegistry<SlaveHandle, String> = HandleRegistry::new();
        let handle = registry.insert("kept".to_owned());
        let held = registry.get(handle).unwrap();
        registry.remove(handle).unwrap();
        assert_eq!(*held, "kept");
    }
}

#[cfg(test)]
mod error_channel {
    use std::ffi::{CStr, c_int};
    use std::ptr;

    use cosim_core::{CosimError, CosimResult, Errc};

    use crate::boundary::{FAILURE, UNKNOWN_PANIC, call};
    use crate::error_channel::{last_error_code, last_error_message_string, last_error_os_code};
    use crate::ffi::error::{cosim_last_error_code, cosim_last_error_message, cosim_last_error_os_code};
    use crate::ffi::execution::cosim_config_execution_create;
    use crate::ffi::slave::cosim_local_slave_create;
    use crate::registry::Handle;

    #[test]
    fn null_pointer_is_invalid_argument() {
        let slave = unsafe { cosim_local_slave_create(ptr::null(), c"a".as_ptr()) };
        assert!(slave.is_null());
        assert_eq!(cosim_last_error_code(), Errc::InvalidArgument.as_raw());
        let message = unsafe { CStr::from_ptr(cosim_last_error_message()) };
        assert_eq!(message.to_str().unwrap(), "'source' is a null pointer");
    }

    #[test]
    fn io_failure_carries_os_code() {
        let execution =
            unsafe { cosim_config_execution_create(c"/no/such/dir/SystemStructure.toml".as_ptr(), false, 0) };
        assert!(execution.is_null());
        assert_eq!(last_error_code(), Errc::Errno);
        assert_eq!(cosim_last_error_os_code(), 2); // ENOENT
    }

    #[test]
    fn record_is_per_thread_and_survives_success() {
        let _ = call(FAILURE, || -> CosimResult<c_int> { Err(CosimError::OutOfRange("here".into())) });
        let _ = call(FAILURE, || Ok(0));
        assert_eq!(last_error_code(), Errc::OutOfRange);

        let other = std::thread::spawn(|| (last_error_code(), last_error_message_string(), last_error_os_code()))
            .join()
            .unwrap();
        assert_eq!(other, (Errc::Success, String::new(), 0));
    }

    #[test]
    fn panics_become_unspecified() {
        let rc = call(FAILURE, || -> CosimResult<c_int> { panic!("boom") });
        assert_eq!(rc, FAILURE);
        assert_eq!(last_error_code(), Errc::Unspecified);
        assert!(last_error_message_string().ends_with("boom"));

        let rc = call(FAILURE, || -> CosimResult<c_int> { panic!("boom {}", 2) });
        assert_eq!(rc, FAILURE);
        assert!(last_error_message_string().ends_with("boom 2"));

        let rc = call(FAILURE, || -> CosimResult<c_int> { std::panic::panic_any(42_u8) });
        assert_eq!(rc, FAILURE);
        assert_eq!(last_error_code(), Errc::Unspecified);
        assert!(last_error_message_string().ends_with(UNKNOWN_PANIC));
    }

    #[test]
    fn interior_nul_in_message_is_dropped() {
        let _ = call(FAILURE, || -> CosimResult<c_int> { Err(CosimError::BadFile("a\0b".into())) });
        assert!(last_error_message_string().ends_with("ab"));
    }
}

#[cfg(test)]
mod marshal {
    use std::ffi::c_char;

    use cosim_core::{Errc, VariableType};

    use crate::marshal::{log_severity, read_name, stash_strings, variable_type, write_name};
    use crate::types::{CosimLogSeverity, CosimVariableType};

    #[test]
    fn names_truncate_on_char_boundary() {
        let mut buf = [1 as c_char; 6];
        write_name(&mut buf, "abc");
        assert_eq!(read_name(&buf), "abc");
        assert_eq!(buf[3], 0);

        write_name(&mut buf, "abcdefgh");
        assert_eq!(read_name(&buf), "abcde");
        assert_eq!(buf[5], 0);

        // 'é' is two bytes and would straddle the last free byte.
        write_name(&mut buf, "abcdé");
        assert_eq!(read_name(&buf), "abcd");
    }

    #[test]
    fn enums_from_c() {
        assert_eq!(variable_type(CosimVariableType::Boolean as i32).unwrap(), VariableType::Boolean);
        let err = variable_type(9).unwrap_err();
        assert_eq!(err.code(), Errc::InvalidArgument);
        assert!(err.to_string().contains("Variable type not supported"));

        assert_eq!(log_severity(5).unwrap(), CosimLogSeverity::Fatal);
        assert_eq!(log_severity(-1).unwrap_err().code(), Errc::InvalidArgument);
    }

    #[test]
    fn stashed_strings_stay_valid_until_next_call() {
        let mut out = [std::ptr::null::<c_char>(); 2];
        stash_strings(vec!["x".into(), "yz".into()], &mut out);
        let read = |p: *const c_char| unsafe { std::ffi::CStr::from_ptr(p) }.to_str().unwrap().to_owned();
        assert_eq!(read(out[0]), "x");
        assert_eq!(read(out[1]), "yz");
    }
}

#[cfg(test)]
mod composition {
    use std::ffi::{CStr, c_char};

    use cosim_core::Errc;

    use super::helpers::{add, execution};
    use crate::boundary::{FAILURE, OK};
    use crate::error_channel::last_error_code;
    use crate::ffi::execution::*;
    use crate::ffi::observer::*;
    use crate::marshal::read_name;
    use crate::types::{
        CosimCausality, CosimSlaveInfo, CosimVariableDescription, CosimVariableType, CosimVariability,
    };

    #[test]
    fn slaves_get_dense_indices_and_unique_names() {
        let exec = execution();
        assert_eq!(add(exec, c"builtin:identity", c"b"), 0);
        assert_eq!(add(exec, c"builtin:mass", c"a"), 1);
        assert_eq!(add(exec, c"builtin:identity", c"a"), FAILURE);
        assert_eq!(last_error_code(), Errc::InvalidArgument);
        assert_eq!(cosim_execution_get_num_slaves(exec), 2);

        let mut infos = [CosimSlaveInfo::EMPTY; 2];
        assert_eq!(unsafe { cosim_execution_get_slave_infos(exec, infos.as_mut_ptr(), infos.len()) }, OK);
        assert_eq!((read_name(&infos[0].name).as_str(), infos[0].index), ("a", 1));
        assert_eq!((read_name(&infos[1].name).as_str(), infos[1].index), ("b", 0));
        assert_eq!(cosim_execution_destroy(exec), OK);
    }

    #[test]
    fn slave_handle_is_consumed_once() {
        let exec = execution();
        let slave = unsafe { crate::ffi::slave::cosim_local_slave_create(c"builtin:identity".as_ptr(), c"x".as_ptr()) };
        assert_eq!(cosim_execution_add_slave(exec, slave), 0);
        let other = execution();
        assert_eq!(cosim_execution_add_slave(other, slave), FAILURE);
        assert_eq!(last_error_code(), Errc::InvalidArgument);
        assert_eq!(crate::ffi::slave::cosim_local_slave_destroy(slave), OK);
        cosim_execution_destroy(exec);
        cosim_execution_destroy(other);
    }

    #[test]
    fn slave_handle_describes_its_instance_until_added() {
        let handle = unsafe { crate::ffi::slave::cosim_local_slave_create(c"builtin:damper".as_ptr(), c"d".as_ptr()) };
        let slave = crate::slave::SLAVES.get(handle).unwrap();
        assert_eq!((slave.name(), slave.source()), ("d", "builtin:damper"));
        assert_eq!(slave.model_description().unwrap().variables.len(), 3);

        let exec = execution();
        assert_eq!(cosim_execution_add_slave(exec, handle), 0);
        assert!(slave.model_description().is_none());
        assert_eq!(crate::ffi::slave::cosim_local_slave_destroy(handle), OK);
        assert_eq!(cosim_execution_get_num_slaves(exec), 1);
        cosim_execution_destroy(exec);
    }

    #[test]
    fn unknown_model_source() {
        let slave = unsafe { crate::ffi::slave::cosim_local_slave_create(c"builtin:nope".as_ptr(), c"x".as_ptr()) };
        assert!(crate::registry::Handle::is_null(slave));
        assert_ne!(last_error_code(), Errc::Success);
    }

    #[test]
    fn variable_descriptions() {
        let exec = execution();
        add(exec, c"builtin:identity", c"a");
        assert_eq!(cosim_slave_get_num_variables(exec, 0), 8);
        assert_eq!(cosim_slave_get_num_variables(exec, 3), FAILURE);

        let mut vars = [CosimVariableDescription::EMPTY; 3];
        let written = unsafe { cosim_slave_get_variables(exec, 0, vars.as_mut_ptr(), vars.len()) };
        assert_eq!(written, 3);
        assert_eq!(read_name(&vars[0].name), "realIn");
        assert_eq!(vars[0].reference, 0);
        assert_eq!(vars[0].type_, CosimVariableType::Real as i32);
        assert_eq!(vars[0].causality, CosimCausality::Input as i32);
        assert_eq!(vars[0].variability, CosimVariability::Discrete as i32);
        assert_eq!(vars[2].type_, CosimVariableType::Boolean as i32);
        cosim_execution_destroy(exec);
    }

    #[test]
    fn connected_values_reach_last_value_observer() {
        let exec = execution();
        let (a, b) = (add(exec, c"builtin:identity", c"a"), add(exec, c"builtin:identity", c"b"));
        assert_eq!(cosim_execution_connect_real_variables(exec, a, 0, b, 0), OK);
        assert_eq!(cosim_execution_connect_integer_variables(exec, a, 0, b, 0), OK);
        assert_eq!(cosim_execution_connect_boolean_variables(exec, a, 0, b, 0), OK);
        assert_eq!(cosim_execution_connect_string_variables(exec, a, 0, b, 0), OK);
        assert_eq!(cosim_execution_set_real_initial_value(exec, a, 0, 1.5), OK);
        assert_eq!(cosim_execution_set_integer_initial_value(exec, a, 0, 7), OK);
        assert_eq!(cosim_execution_set_boolean_initial_value(exec, a, 0, true), OK);
        assert_eq!(unsafe { cosim_execution_set_string_initial_value(exec, a, 0, c"hello".as_ptr()) }, OK);

        let observer = cosim_last_value_observer_create();
        assert_eq!(cosim_execution_add_observer(exec, observer), OK);
        assert_eq!(cosim_execution_step(exec, 1), OK);

        let refs = [0_u32];
        let (mut real, mut int, mut boolean) = ([0.0], [0], [false]);
        let mut string = [std::ptr::null::<c_char>()];
        unsafe {
            assert_eq!(cosim_observer_slave_get_real(observer, b, refs.as_ptr(), 1, real.as_mut_ptr()), OK);
            assert_eq!(cosim_observer_slave_get_integer(observer, b, refs.as_ptr(), 1, int.as_mut_ptr()), OK);
            assert_eq!(cosim_observer_slave_get_boolean(observer, b, refs.as_ptr(), 1, boolean.as_mut_ptr()), OK);
            assert_eq!(cosim_observer_slave_get_string(observer, b, refs.as_ptr(), 1, string.as_mut_ptr()), OK);
        }
        assert_eq!((real[0], int[0], boolean[0]), (1.5, 7, true));
        assert_eq!(unsafe { CStr::from_ptr(string[0]) }.to_str().unwrap(), "hello");

        assert_eq!(cosim_execution_destroy(exec), OK);
        assert_eq!(cosim_observer_destroy(observer), OK);
    }

    #[test]
    fn bad_connections_are_rejected() {
        let exec = execution();
        let (a, b) = (add(exec, c"builtin:identity", c"a"), add(exec, c"builtin:identity", c"b"));
        assert_eq!(cosim_execution_connect_real_variables(exec, a, 0, b, 0), OK);
        assert_eq!(cosim_execution_connect_real_variables(exec, a, 0, b, 0), FAILURE);
        assert_eq!(last_error_code(), Errc::InvalidArgument);
        assert_eq!(cosim_execution_connect_real_variables(exec, a, 0, 9, 0), FAILURE);
        assert_eq!(last_error_code(), Errc::OutOfRange);
        cosim_execution_destroy(exec);
    }

    #[test]
    fn observer_joins_only_one_execution() {
        let (first, second) = (execution(), execution());
        let observer = cosim_last_value_observer_create();
        assert_eq!(cosim_execution_add_observer(first, observer), OK);
        assert_eq!(cosim_execution_add_observer(second, observer), FAILURE);
        assert_eq!(last_error_code(), Errc::InvalidArgument);
        cosim_execution_destroy(first);
        cosim_execution_destroy(second);
        cosim_observer_destroy(observer);
    }

    #[test]
    fn destroyed_handles_are_rejected() {
        let exec = execution();
        assert_eq!(cosim_execution_destroy(exec), OK);
        assert_eq!(cosim_execution_destroy(exec), FAILURE);
        assert_eq!(last_error_code(), Errc::InvalidArgument);
        assert_eq!(cosim_execution_step(exec, 1), FAILURE);
        assert_eq!(cosim_execution_get_num_slaves(exec), 0);
        assert_eq!(cosim_execution_destroy(crate::ExecutionHandle::NULL), OK);
    }
}

#[cfg(test)]
mod lifecycle {
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use parking_lot::Mutex;

    use cosim_core::{CosimResult, Duration as EngineDuration, Errc, TimePoint};
    use cosim_engine::models::{BuiltinSlave, ValueStore, identity};
    use cosim_engine::{Execution, FixedStepAlgorithm, Slave, StepOutcome};

    use super::helpers::{TENTH, add, execution, status};
    use crate::boundary::{FAILURE, OK};
    use crate::error_channel::{last_error_code, last_error_message_string};
    use crate::execution::{ExecutionControl, ExecutionState};
    use crate::ffi::execution::*;
    use crate::ffi::manipulator::{cosim_manipulator_destroy, cosim_manipulator_slave_set_boolean, cosim_override_manipulator_create};
    use crate::types::{CosimExecutionState, CosimExecutionStatus};

    const STOPPED: i32 = CosimExecutionState::Stopped as i32;
    const RUNNING: i32 = CosimExecutionState::Running as i32;
    const ERROR: i32 = CosimExecutionState::Error as i32;

    #[test]
    fn synchronous_steps_advance_time() {
        let exec = execution();
        add(exec, c"builtin:identity", c"a");
        assert_eq!(cosim_execution_step(exec, 3), OK);
        let (rc, st) = status(exec);
        assert_eq!(rc, OK);
        assert_eq!((st.current_time, st.state, st.error_code), (3 * TENTH, STOPPED, 0));

        assert_eq!(cosim_execution_simulate_until(exec, 10 * TENTH), 1);
        assert_eq!(status(exec).1.current_time, 10 * TENTH);
        assert_eq!(cosim_execution_destroy(exec), OK);
    }

    #[test]
    fn failed_step_is_terminal() {
        let exec = execution();
        let slave = add(exec, c"builtin:fail", c"f");
        assert_eq!(cosim_execution_set_boolean_initial_value(exec, slave, 0, true), OK);
        assert_eq!(cosim_execution_step(exec, 1), FAILURE);
        assert_eq!(last_error_code(), Errc::SimulationError);

        let (_, st) = status(exec);
        assert_eq!((st.state, st.error_code), (ERROR, Errc::SimulationError.as_raw()));

        assert_eq!(cosim_execution_step(exec, 1), FAILURE);
        assert_eq!(last_error_code(), Errc::IllegalState);
        assert!(last_error_message_string().contains("after the simulation has failed"));
        assert_eq!(cosim_execution_start(exec), FAILURE);
        assert_eq!(cosim_execution_stop(exec), OK);
        assert_eq!(status(exec).1.state, ERROR);
        assert_eq!(cosim_execution_destroy(exec), OK);
    }

    #[test]
    fn start_runs_until_stop() {
        let exec = execution();
        add(exec, c"builtin:identity", c"a");
        assert_eq!(cosim_execution_start(exec), OK);
        assert_eq!(cosim_execution_start(exec), OK);
        assert_eq!(status(exec).1.state, RUNNING);

        assert_eq!(cosim_execution_step(exec, 1), FAILURE);
        assert_eq!(last_error_code(), Errc::IllegalState);
        assert!(last_error_message_string().contains("may not be called while simulation is running"));
        assert_eq!(cosim_execution_simulate_until(exec, TENTH), FAILURE);

        let deadline = Instant::now() + Duration::from_secs(5);
        while status(exec).1.current_time == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(cosim_execution_stop(exec), OK);
        let (rc, st) = status(exec);
        assert_eq!((rc, st.state), (OK, STOPPED));
        assert!(st.current_time > 0);

        // Stopped runs may be resumed.
        assert_eq!(cosim_execution_step(exec, 1), OK);
        assert_eq!(cosim_execution_destroy(exec), OK);
    }

    #[test]
    fn background_failure_is_reported_until_destroy() {
        let exec = execution();
        let slave = add(exec, c"builtin:fail", c"f");
        assert_eq!(cosim_execution_set_boolean_initial_value(exec, slave, 0, true), OK);
        assert_eq!(cosim_execution_start(exec), OK);

        let deadline = Instant::now() + Duration::from_secs(5);
        while status(exec).0 == OK && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        let (rc, st) = status(exec);
        assert_eq!(rc, FAILURE);
        assert_eq!(last_error_code(), Errc::SimulationError);
        assert_eq!((st.state, st.error_code), (ERROR, Errc::SimulationError.as_raw()));

        assert_eq!(cosim_execution_stop(exec), FAILURE);
        assert_eq!(last_error_code(), Errc::SimulationError);
        assert_eq!(cosim_execution_stop(exec), FAILURE);
        assert_eq!(cosim_execution_destroy(exec), OK);
    }

    #[test]
    fn override_during_background_run_fails_it() {
        let exec = execution();
        let slave = add(exec, c"builtin:fail", c"f");
        let manipulator = cosim_override_manipulator_create();
        assert_eq!(cosim_execution_add_manipulator(exec, manipulator), OK);
        assert_eq!(cosim_execution_start(exec), OK);

        let deadline = Instant::now() + Duration::from_secs(5);
        while status(exec).1.current_time == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(status(exec).0, OK);
        let rc = unsafe { cosim_manipulator_slave_set_boolean(manipulator, slave, [0_u32].as_ptr(), 1, [true].as_ptr()) };
        assert_eq!(rc, OK);

        while status(exec).0 == OK && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        let (rc, st) = status(exec);
        assert_eq!(rc, FAILURE);
        assert_eq!(last_error_code(), Errc::SimulationError);
        assert_eq!((st.state, st.error_code), (ERROR, Errc::SimulationError.as_raw()));
        assert_eq!(cosim_execution_stop(exec), FAILURE);
        assert_eq!(cosim_execution_destroy(exec), OK);
        cosim_manipulator_destroy(manipulator);
    }

    #[test]
    fn time_axis_overflow_reaches_error_state() {
        let exec = cosim_execution_create(i64::MAX - TENTH / 2, TENTH);
        add(exec, c"builtin:identity", c"a");
        assert_eq!(cosim_execution_step(exec, 1), FAILURE);
        assert_eq!(last_error_code(), Errc::OutOfRange);

        let (rc, st) = status(exec);
        assert_eq!(rc, OK);
        assert_eq!((st.state, st.error_code), (ERROR, Errc::OutOfRange.as_raw()));
        assert_eq!(st.current_time, i64::MAX - TENTH / 2);

        assert_eq!(cosim_execution_step(exec, 1), FAILURE);
        assert_eq!(last_error_code(), Errc::IllegalState);
        assert!(last_error_message_string().contains("after the simulation has failed"));
        assert_eq!(cosim_execution_destroy(exec), OK);
    }

    /// An execution of one identity-shaped slave stepping with `on_step`.
    fn control_with(on_step: fn(&mut ValueStore, TimePoint, EngineDuration) -> CosimResult<StepOutcome>) -> ExecutionControl {
        let algorithm = Arc::new(Mutex::new(FixedStepAlgorithm::new(EngineDuration::from_nanos(TENTH)).unwrap()));
        let mut execution = Execution::new(TimePoint::ZERO, algorithm);
        let description = identity().model_description().clone();
        let slave = BuiltinSlave::new(description, |_| Ok(()), on_step);
        let index = execution.add_slave(Box::new(slave), "s").unwrap();
        ExecutionControl::new(execution, BTreeMap::from([("s".to_owned(), index)]))
    }

    #[test]
    fn panicking_step_reaches_error_state() {
        let control = control_with(|_, _, _| panic!("model blew up"));
        let err = control.step(1).unwrap_err();
        assert_eq!(err.code(), Errc::Unspecified);
        assert!(err.to_string().contains("model blew up"), "{err}");
        assert_eq!(control.state(), ExecutionState::Error);
        assert_eq!(control.error_code(), Errc::Unspecified);

        let err = control.simulate_until(TimePoint::from_nanos(TENTH)).unwrap_err();
        assert_eq!(err.code(), Errc::IllegalState);
    }

    #[test]
    fn status_does_not_wait_for_a_slow_step() {
        let control = control_with(|_, _, _| {
            std::thread::sleep(Duration::from_millis(800));
            Ok(StepOutcome::Complete)
        });
        control.start().unwrap();
        std::thread::sleep(Duration::from_millis(50));

        let began = Instant::now();
        let mut out = CosimExecutionStatus::default();
        control.status(&mut out).unwrap();
        assert!(began.elapsed() < Duration::from_millis(400), "{:?}", began.elapsed());
        assert_eq!((out.state, out.current_time), (RUNNING, 0));
        control.stop().unwrap();
    }

    #[test]
    fn destroy_stops_a_running_execution() {
        let exec = execution();
        add(exec, c"builtin:identity", c"a");
        assert_eq!(cosim_execution_start(exec), OK);
        assert_eq!(cosim_execution_destroy(exec), OK);
        assert_eq!(cosim_execution_stop(exec), FAILURE);
    }

    #[test]
    fn real_time_settings_show_in_status() {
        let exec = execution();
        let (_, st) = status(exec);
        assert_eq!((st.is_real_time_simulation, st.real_time_factor_target, st.steps_to_monitor), (0, 1.0, 5));

        assert_eq!(cosim_execution_enable_real_time_simulation(exec), OK);
        assert_eq!(cosim_execution_set_real_time_factor_target(exec, 4.0), OK);
        assert_eq!(cosim_execution_set_steps_to_monitor(exec, 10), OK);
        let (_, st) = status(exec);
        assert_eq!((st.is_real_time_simulation, st.real_time_factor_target, st.steps_to_monitor), (1, 4.0, 10));

        assert_eq!(cosim_execution_set_real_time_factor_target(exec, 0.0), FAILURE);
        assert_eq!(cosim_execution_set_steps_to_monitor(exec, 0), FAILURE);
        assert_eq!(cosim_execution_set_steps_to_monitor(exec, -3), FAILURE);
        assert_eq!(last_error_code(), Errc::InvalidArgument);

        assert_eq!(cosim_execution_disable_real_time_simulation(exec), OK);
        assert_eq!(status(exec).1.is_real_time_simulation, 0);
        cosim_execution_destroy(exec);
    }

    #[test]
    fn status_needs_an_output_pointer() {
        let exec = execution();
        assert_eq!(unsafe { cosim_execution_get_status(exec, std::ptr::null_mut()) }, FAILURE);
        assert_eq!(last_error_code(), Errc::InvalidArgument);
        cosim_execution_destroy(exec);
    }
}

#[cfg(test)]
mod manipulators {
    use std::io::Write;

    use cosim_core::Errc;

    use super::helpers::{add, execution};
    use crate::boundary::{FAILURE, OK};
    use crate::error_channel::last_error_code;
    use crate::ffi::execution::*;
    use crate::ffi::manipulator::*;
    use crate::ffi::observer::{cosim_last_value_observer_create, cosim_observer_slave_get_real};
    use crate::types::{CosimVariableId, CosimVariableType};

    fn real(observer: crate::ObserverHandle, slave: i32) -> f64 {
        let mut out = [f64::NAN];
        let rc = unsafe { cosim_observer_slave_get_real(observer, slave, [0_u32].as_ptr(), 1, out.as_mut_ptr()) };
        assert_eq!(rc, OK);
        out[0]
    }

    #[test]
    fn overrides_apply_and_reset() {
        let exec = execution();
        let slave = add(exec, c"builtin:identity", c"a");
        let (manipulator, observer) = (cosim_override_manipulator_create(), cosim_last_value_observer_create());
        assert_eq!(cosim_execution_add_manipulator(exec, manipulator), OK);
        assert_eq!(cosim_execution_add_observer(exec, observer), OK);

        let refs = [0_u32];
        let rc = unsafe { cosim_manipulator_slave_set_real(manipulator, slave, refs.as_ptr(), 1, [3.0].as_ptr()) };
        assert_eq!(rc, OK);
        assert_eq!(cosim_execution_step(exec, 1), OK);
        assert_eq!(real(observer, slave), 3.0);

        assert_eq!(cosim_get_num_modified_variables(exec), 1);
        let mut ids = [CosimVariableId::default(); 4];
        assert_eq!(unsafe { cosim_get_modified_variables(exec, ids.as_mut_ptr(), ids.len()) }, 1);
        assert_eq!(ids[0], CosimVariableId {
            slave_index:     slave,
            type_:           CosimVariableType::Real as i32,
            value_reference: 0,
        });

        let rc = unsafe {
            cosim_manipulator_slave_reset(manipulator, slave, CosimVariableType::Real as i32, refs.as_ptr(), 1)
        };
        assert_eq!(rc, OK);
        assert_eq!(cosim_execution_step(exec, 1), OK);
        assert_eq!(cosim_get_num_modified_variables(exec), 0);

        let rc = unsafe { cosim_manipulator_slave_reset(manipulator, slave, 42, refs.as_ptr(), 1) };
        assert_eq!(rc, FAILURE);
        assert_eq!(last_error_code(), Errc::InvalidArgument);

        cosim_execution_destroy(exec);
        cosim_manipulator_destroy(manipulator);
    }

    #[test]
    fn failed_batch_queues_nothing() {
        let exec = execution();
        let slave = add(exec, c"builtin:identity", c"a");
        let manipulator = cosim_override_manipulator_create();
        assert_eq!(cosim_execution_add_manipulator(exec, manipulator), OK);

        let refs = [0_u32, 99];
        let rc = unsafe { cosim_manipulator_slave_set_real(manipulator, slave, refs.as_ptr(), 2, [5.0, 1.0].as_ptr()) };
        assert_eq!(rc, FAILURE);
        assert_eq!(last_error_code(), Errc::InvalidArgument);
        let rc = unsafe {
            cosim_manipulator_slave_reset(manipulator, slave, CosimVariableType::Real as i32, refs.as_ptr(), 2)
        };
        assert_eq!(rc, FAILURE);

        assert_eq!(cosim_execution_step(exec, 1), OK);
        assert_eq!(cosim_get_num_modified_variables(exec), 0);

        let rc = unsafe { cosim_manipulator_slave_set_real(manipulator, slave, refs.as_ptr(), 1, [5.0].as_ptr()) };
        assert_eq!(rc, OK);
        assert_eq!(cosim_execution_step(exec, 1), OK);
        assert_eq!(cosim_get_num_modified_variables(exec), 1);
        cosim_execution_destroy(exec);
        cosim_manipulator_destroy(manipulator);
    }

    #[test]
    fn overridden_output_is_observed_unchanged() {
        let exec = execution();
        let slave = add(exec, c"builtin:mass", c"m");
        let (manipulator, observer) = (cosim_override_manipulator_create(), cosim_last_value_observer_create());
        assert_eq!(cosim_execution_add_manipulator(exec, manipulator), OK);
        assert_eq!(cosim_execution_add_observer(exec, observer), OK);

        // force (vr 0) and velocity (vr 2).
        let rc = unsafe { cosim_manipulator_slave_set_real(manipulator, slave, [0_u32, 2].as_ptr(), 2, [3.0, 7.0].as_ptr()) };
        assert_eq!(rc, OK);
        assert_eq!(cosim_execution_step(exec, 3), OK);

        let mut out = [f64::NAN];
        let rc = unsafe { cosim_observer_slave_get_real(observer, slave, [2_u32].as_ptr(), 1, out.as_mut_ptr()) };
        assert_eq!(rc, OK);
        assert_eq!(out, [7.0]);
        cosim_execution_destroy(exec);
        cosim_manipulator_destroy(manipulator);
    }

    #[test]
    fn scenario_runs_and_aborts() {
        let exec = execution();
        add(exec, c"builtin:identity", c"a");
        let manager = cosim_scenario_manager_create();
        let observer = cosim_last_value_observer_create();
        assert_eq!(cosim_execution_add_manipulator(exec, manager), OK);
        assert_eq!(cosim_execution_add_observer(exec, observer), OK);
        assert_eq!(cosim_scenario_is_running(manager), 0);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{ "events": [ { "time": 0.1, "model": "a", "variable": "realIn", "action": "override", "value": 2 } ],
                  "end": 5.0 }"#,
        )
        .unwrap();
        let path = std::ffi::CString::new(file.path().to_str().unwrap()).unwrap();
        assert_eq!(unsafe { cosim_execution_load_scenario(exec, manager, path.as_ptr()) }, OK);
        assert_eq!(cosim_scenario_is_running(manager), 1);

        assert_eq!(cosim_execution_step(exec, 2), OK);
        assert_eq!(real(observer, 0), 2.0);

        assert_eq!(cosim_scenario_abort(manager), OK);
        assert_eq!(cosim_scenario_is_running(manager), 0);
        cosim_execution_destroy(exec);
    }

    #[test]
    fn wrong_manipulator_kind() {
        let exec = execution();
        let overrides = cosim_override_manipulator_create();
        let scenarios = cosim_scenario_manager_create();

        assert_eq!(cosim_scenario_is_running(overrides), FAILURE);
        assert_eq!(last_error_code(), Errc::InvalidArgument);
        assert_eq!(unsafe { cosim_execution_load_scenario(exec, overrides, c"s.json".as_ptr()) }, FAILURE);

        let rc = unsafe { cosim_manipulator_slave_set_real(scenarios, 0, [0_u32].as_ptr(), 1, [1.0].as_ptr()) };
        assert_eq!(rc, FAILURE);
        assert_eq!(last_error_code(), Errc::InvalidArgument);

        assert_eq!(cosim_manipulator_destroy(overrides), OK);
        assert_eq!(cosim_manipulator_destroy(scenarios), OK);
        cosim_execution_destroy(exec);
    }
}

#[cfg(test)]
mod time_series {
    use cosim_core::Errc;

    use super::helpers::{TENTH, add, execution};
    use crate::boundary::{FAILURE, OK};
    use crate::error_channel::{last_error_code, last_error_message_string};
    use crate::ffi::execution::*;
    use crate::ffi::manipulator::{cosim_manipulator_slave_set_real, cosim_override_manipulator_create};
    use crate::ffi::observer::*;
    use crate::registry::Handle;
    use crate::types::CosimVariableType;

    const REAL: i32 = CosimVariableType::Real as i32;

    #[test]
    fn samples_and_step_lookups() {
        let exec = execution();
        let slave = add(exec, c"builtin:identity", c"a");
        let manipulator = cosim_override_manipulator_create();
        let observer = cosim_time_series_observer_create();
        assert_eq!(cosim_execution_add_manipulator(exec, manipulator), OK);
        assert_eq!(cosim_execution_add_observer(exec, observer), OK);
        assert_eq!(cosim_observer_start_observing(observer, slave, REAL, 0), OK);

        for i in 0..10 {
            let value = [f64::from(i)];
            let rc = unsafe { cosim_manipulator_slave_set_real(manipulator, slave, [0_u32].as_ptr(), 1, value.as_ptr()) };
            assert_eq!(rc, OK);
            assert_eq!(cosim_execution_step(exec, 1), OK);
        }

        let (mut values, mut steps, mut times) = ([0.0; 4], [0_i64; 4], [0_i64; 4]);
        let n = unsafe {
            cosim_observer_slave_get_real_samples(
                observer,
                slave,
                0,
                3,
                4,
                values.as_mut_ptr(),
                steps.as_mut_ptr(),
                times.as_mut_ptr(),
            )
        };
        assert_eq!(n, 4);
        assert_eq!(steps, [3, 4, 5, 6]);
        assert_eq!(values[0], 2.0);
        assert_eq!(times[0], 3 * TENTH);

        let mut span = [0_i64; 2];
        assert_eq!(unsafe { cosim_observer_get_step_numbers_for_duration(observer, slave, 5 * TENTH, span.as_mut_ptr()) }, OK);
        assert_eq!(span, [5, 10]);
        assert_eq!(unsafe { cosim_observer_get_step_numbers(observer, slave, 3 * TENTH, 6 * TENTH, span.as_mut_ptr()) }, OK);
        assert_eq!(span, [3, 6]);

        // Never observed: nothing to read, not an error.
        let (mut ints, mut steps, mut times) = ([0; 4], [0_i64; 4], [0_i64; 4]);
        let n = unsafe {
            cosim_observer_slave_get_integer_samples(
                observer,
                slave,
                0,
                0,
                4,
                ints.as_mut_ptr(),
                steps.as_mut_ptr(),
                times.as_mut_ptr(),
            )
        };
        assert_eq!(n, 0);

        assert_eq!(cosim_observer_stop_observing(observer, slave, REAL, 0), OK);
        cosim_execution_destroy(exec);
    }

    #[test]
    fn synchronized_series() {
        let exec = execution();
        let (a, b) = (add(exec, c"builtin:identity", c"a"), add(exec, c"builtin:identity", c"b"));
        assert_eq!(cosim_execution_connect_real_variables(exec, a, 0, b, 0), OK);
        assert_eq!(cosim_execution_set_real_initial_value(exec, a, 0, 1.25), OK);
        let observer = cosim_buffered_time_series_observer_create(100);
        assert_eq!(cosim_execution_add_observer(exec, observer), OK);
        assert_eq!(cosim_observer_start_observing(observer, a, REAL, 0), OK);
        assert_eq!(cosim_observer_start_observing(observer, b, REAL, 0), OK);
        assert_eq!(cosim_execution_step(exec, 4), OK);

        let (mut first, mut second) = ([0.0; 8], [0.0; 8]);
        let n = unsafe {
            cosim_observer_slave_get_real_synchronized_series(
                observer,
                a,
                0,
                b,
                0,
                2,
                8,
                first.as_mut_ptr(),
                second.as_mut_ptr(),
            )
        };
        assert_eq!(n, 3);
        assert_eq!(first[..3], [1.25; 3]);
        assert_eq!(second[..3], [1.25; 3]);
        cosim_execution_destroy(exec);
    }

    #[test]
    fn observer_kind_and_arguments_are_checked() {
        assert!(cosim_buffered_time_series_observer_create(0).is_null());
        assert_eq!(last_error_code(), Errc::InvalidArgument);

        let last_value = cosim_last_value_observer_create();
        assert_eq!(cosim_observer_start_observing(last_value, 0, REAL, 0), FAILURE);
        assert!(last_error_message_string().contains("must be a time_series_observer"));

        let series = cosim_time_series_observer_create();
        assert_eq!(cosim_observer_start_observing(series, 0, 17, 0), FAILURE);
        assert!(last_error_message_string().contains("Variable type not supported"));
        let string = CosimVariableType::String as i32;
        assert_eq!(cosim_observer_start_observing(series, 0, string, 0), FAILURE);
        assert_eq!(last_error_code(), Errc::UnsupportedFeature);

        let rc = unsafe { cosim_observer_slave_get_real(series, 0, [0_u32].as_ptr(), 1, [0.0].as_mut_ptr()) };
        assert_eq!(rc, FAILURE);
        assert!(last_error_message_string().contains("must be a last_value_observer"));

        let rc = unsafe { cosim_observer_get_step_numbers(series, 0, 0, TENTH, std::ptr::null_mut()) };
        assert_eq!(rc, FAILURE);
        assert_eq!(last_error_code(), Errc::InvalidArgument);

        cosim_observer_destroy(last_value);
        cosim_observer_destroy(series);
    }
}

#[cfg(test)]
mod algorithms {
    use cosim_core::Errc;
    use cosim_engine::EccoParams;

    use super::helpers::{TENTH, add, status};
    use crate::boundary::{FAILURE, OK};
    use crate::error_channel::last_error_code;
    use crate::ffi::algorithm::*;
    use crate::ffi::execution::*;
    use crate::registry::Handle;

    fn ecco() -> crate::AlgorithmHandle {
        let p = EccoParams::default();
        cosim_ecco_algorithm_create(
            p.safety_factor,
            p.step_size,
            p.min_step_size,
            p.max_step_size,
            p.min_change_rate,
            p.max_change_rate,
            p.abs_tolerance,
            p.rel_tolerance,
            p.p_gain,
            p.i_gain,
        )
    }

    #[test]
    fn fixed_step_through_v2() {
        assert!(cosim_fixed_step_algorithm_create(0).is_null());
        assert_eq!(last_error_code(), Errc::InvalidArgument);

        let algorithm = cosim_fixed_step_algorithm_create(2 * TENTH);
        let exec = cosim_execution_create_v2(0, algorithm);
        assert!(!exec.is_null());
        add(exec, c"builtin:identity", c"a");
        assert_eq!(cosim_execution_step(exec, 2), OK);
        assert_eq!(status(exec).1.current_time, 4 * TENTH);

        assert_eq!(cosim_ecco_add_power_bond(algorithm, 0, 0, 0, 0, 0, 0), FAILURE);
        assert!(crate::error_channel::last_error_message_string().contains("must be an ecco_algorithm"));
        assert_eq!(cosim_algorithm_destroy(algorithm), OK);
        cosim_execution_destroy(exec);
    }

    #[test]
    fn ecco_on_mass_damper() {
        let algorithm = ecco();
        assert!(!algorithm.is_null());
        let exec = cosim_execution_create_v2(0, algorithm);
        let mass = add(exec, c"builtin:mass", c"mass");
        let damper = add(exec, c"builtin:damper", c"damper");
        // mass: force 0, velocity 2, initialVelocity 4; damper: velocity 0, damping 1, force 2
        assert_eq!(cosim_execution_connect_real_variables(exec, mass, 2, damper, 0), OK);
        assert_eq!(cosim_execution_connect_real_variables(exec, damper, 2, mass, 0), OK);
        assert_eq!(cosim_execution_set_real_initial_value(exec, mass, 4, 1.0), OK);
        assert_eq!(cosim_execution_set_real_initial_value(exec, damper, 1, 0.5), OK);
        assert_eq!(cosim_ecco_add_power_bond(algorithm, mass, 2, 0, damper, 2, 0), OK);

        assert_eq!(cosim_execution_simulate_until(exec, 10 * TENTH), 1);
        assert!(status(exec).1.current_time >= 10 * TENTH);
        cosim_execution_destroy(exec);
        cosim_algorithm_destroy(algorithm);
    }

    #[test]
    fn inconsistent_ecco_bounds() {
        let p = EccoParams { min_step_size: 0.1, max_step_size: 0.01, ..Default::default() };
        let algorithm = cosim_ecco_algorithm_create(
            p.safety_factor,
            p.step_size,
            p.min_step_size,
            p.max_step_size,
            p.min_change_rate,
            p.max_change_rate,
            p.abs_tolerance,
            p.rel_tolerance,
            p.p_gain,
            p.i_gain,
        );
        assert!(algorithm.is_null());
        assert_ne!(last_error_code(), Errc::Success);
    }
}

#[cfg(test)]
mod config {
    use std::ffi::CString;
    use std::path::Path;

    use tempfile::TempDir;

    use cosim_core::Errc;

    use super::helpers::{TENTH, status};
    use crate::boundary::OK;
    use crate::error_channel::last_error_code;
    use crate::ffi::execution::*;
    use crate::ffi::observer::{cosim_last_value_observer_create, cosim_observer_slave_get_real};
    use crate::registry::Handle;

    const STRUCTURE: &str = r#"
start_time = 1.0

[algorithm]
type      = "fixed_step"
step_size = 0.1

[[simulators]]
name   = "a"
source = "builtin:identity"
initial_values = { realIn = 1.5 }

[[simulators]]
name   = "b"
source = "builtin:identity"

[[connections]]
source = "a.realOut"
target = "b.realIn"
"#;

    fn write_dir(text: &str) -> TempDir {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::write(dir.path().join("SystemStructure.toml"), text).unwrap();
        dir
    }

    fn c_path(path: &Path) -> CString {
        CString::new(path.to_str().unwrap()).unwrap()
    }

    #[test]
    fn builds_from_directory() {
        let dir = write_dir(STRUCTURE);
        let path = c_path(dir.path());
        let exec = unsafe { cosim_config_execution_create(path.as_ptr(), false, 0) };
        assert!(!exec.is_null());
        assert_eq!(cosim_execution_get_num_slaves(exec), 2);
        assert_eq!(status(exec).1.current_time, 10 * TENTH);

        let observer = cosim_last_value_observer_create();
        assert_eq!(cosim_execution_add_observer(exec, observer), OK);
        assert_eq!(cosim_execution_step(exec, 1), OK);
        let mut out = [0.0];
        assert_eq!(unsafe { cosim_observer_slave_get_real(observer, 1, [0_u32].as_ptr(), 1, out.as_mut_ptr()) }, OK);
        assert_eq!(out[0], 1.5);
        cosim_execution_destroy(exec);
    }

    #[test]
    fn start_and_step_overrides() {
        let dir = write_dir(STRUCTURE);
        let path = c_path(&dir.path().join("SystemStructure.toml"));
        let exec = unsafe { cosim_config_fixed_step_execution_create(path.as_ptr(), true, 0, 5 * TENTH) };
        assert!(!exec.is_null());
        assert_eq!(cosim_execution_step(exec, 1), OK);
        assert_eq!(status(exec).1.current_time, 5 * TENTH);
        cosim_execution_destroy(exec);
    }

    #[test]
    fn malformed_structure_is_bad_file() {
        let dir = write_dir("[[simulators]\nname = ");
        let path = c_path(dir.path());
        assert!(unsafe { cosim_config_execution_create(path.as_ptr(), false, 0) }.is_null());
        assert_eq!(last_error_code(), Errc::BadFile);
    }
}

#[cfg(test)]
mod file_observer {
    use std::ffi::CString;

    use super::helpers::{add, execution};
    use crate::boundary::OK;
    use crate::ffi::execution::{cosim_execution_add_observer, cosim_execution_destroy, cosim_execution_step};
    use crate::ffi::observer::{cosim_file_observer_create, cosim_file_observer_create_from_cfg, cosim_observer_destroy};
    use crate::registry::Handle;

    #[test]
    fn writes_one_csv_per_slave() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let log_dir = dir.path().join("logs");
        let log_dir_c = CString::new(log_dir.to_str().unwrap()).unwrap();

        let exec = execution();
        add(exec, c"builtin:identity", c"a");
        let observer = unsafe { cosim_file_observer_create(log_dir_c.as_ptr()) };
        assert!(!observer.is_null());
        assert_eq!(cosim_execution_add_observer(exec, observer), OK);
        assert_eq!(cosim_execution_step(exec, 3), OK);
        assert_eq!(cosim_execution_destroy(exec), OK);
        assert_eq!(cosim_observer_destroy(observer), OK);

        let text = std::fs::read_to_string(log_dir.join("a.csv")).unwrap();
        assert_eq!(text.lines().count(), 5); // header, initial row, three steps
    }

    #[test]
    fn missing_config_fails_creation() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let log_dir = CString::new(dir.path().to_str().unwrap()).unwrap();
        let observer = unsafe { cosim_file_observer_create_from_cfg(log_dir.as_ptr(), c"/no/such/LogConfig.toml".as_ptr()) };
        assert!(observer.is_null());
    }
}

#[cfg(test)]
mod library {
    use tracing::level_filters::LevelFilter;

    use cosim_core::Errc;

    use crate::boundary::OK;
    use crate::error_channel::last_error_code;
    use crate::ffi::library::*;
    use crate::logging::output_level;
    use crate::types::CosimLogSeverity;

    #[test]
    fn console_logging_is_idempotent_and_levels_apply() {
        cosim_log_set_output_level(CosimLogSeverity::Info as i32);
        assert_eq!(output_level(), LevelFilter::INFO);
        assert_eq!(cosim_log_setup_simple_console_logging(), OK);
        assert_eq!(cosim_log_setup_simple_console_logging(), OK);

        cosim_log_set_output_level(CosimLogSeverity::Fatal as i32);
        assert_eq!(output_level(), LevelFilter::ERROR);

        cosim_log_set_output_level(99);
        assert_eq!(last_error_code(), Errc::InvalidArgument);
        assert_eq!(output_level(), LevelFilter::ERROR);
    }

    #[test]
    fn versions() {
        let own = cosim_libcosimc_version();
        assert_eq!((own.major, own.minor, own.patch), (0, 1, 0));
        let (major, minor, patch) = cosim_engine::version();
        let engine = cosim_libcosim_version();
        assert_eq!((engine.major, engine.minor, engine.patch), (major as i32, minor as i32, patch as i32));
    }

    #[test]
    fn header_declares_every_export() {
        const HEADER: &str = include_str!("../include/cosim.h");
        const SOURCES: [&str; 7] = [
            include_str!("ffi/algorithm.rs"),
            include_str!("ffi/error.rs"),
            include_str!("ffi/execution.rs"),
            include_str!("ffi/library.rs"),
            include_str!("ffi/manipulator.rs"),
            include_str!("ffi/observer.rs"),
            include_str!("ffi/slave.rs"),
        ];
        let exported: Vec<&str> = SOURCES
            .iter()
            .flat_map(|src| src.split("extern \"C\" fn ").skip(1))
            .filter_map(|rest| rest.split('(').next())
            .collect();
        assert!(exported.len() > 60, "{}", exported.len());
        for name in exported {
            assert!(HEADER.contains(&format!(" {name}(")), "cosim.h does not declare {name}");
        }
        assert!(HEADER.contains(&format!("#define SLAVE_NAME_MAX_SIZE {}", crate::SLAVE_NAME_MAX_SIZE)));
    }

    #[test]
    fn struct_layouts_match_header() {
        use std::mem::{offset_of, size_of};

        use crate::types::{CosimExecutionStatus, CosimSlaveInfo, CosimVariableDescription, CosimVariableId};

        assert_eq!(size_of::<CosimExecutionStatus>(), 48);
        assert_eq!(offset_of!(CosimExecutionStatus, total_average_real_time_factor), 16);
        assert_eq!(size_of::<CosimVariableId>(), 12);
        assert_eq!(offset_of!(CosimVariableDescription, reference), crate::SLAVE_NAME_MAX_SIZE);
        assert_eq!(offset_of!(CosimSlaveInfo, index), crate::SLAVE_NAME_MAX_SIZE);
    }
}
