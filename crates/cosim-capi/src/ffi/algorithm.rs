use std::ffi::c_int;
use std::sync::Arc;

use parking_lot::Mutex;

use cosim_core::{Duration, SlaveIndex, ValueReference};
use cosim_engine::{EccoAlgorithm, EccoParams, FixedStepAlgorithm, PowerBond};

use crate::algorithm::{ALGORITHMS, AlgorithmObject};
use crate::boundary::{self, call};
use crate::registry::AlgorithmHandle;

/// Fixed-step algorithm with a step of `step_size` nanoseconds.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_fixed_step_algorithm_create(step_size: i64) -> AlgorithmHandle {
    call(AlgorithmHandle::NULL, || {
        let algorithm = FixedStepAlgorithm::new(Duration(step_size))?;
        Ok(ALGORITHMS.insert(AlgorithmObject::FixedStep(Arc::new(Mutex::new(algorithm)))))
    })
}

/// Adaptive ECCO algorithm.  Step sizes are in seconds.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub extern "C" fn cosim_ecco_algorithm_create(
    safety_factor:   f64,
    step_size:       f64,
    min_step_size:   f64,
    max_step_size:   f64,
    min_change_rate: f64,
    max_change_rate: f64,
    abs_tolerance:   f64,
    rel_tolerance:   f64,
    p_gain:          f64,
    i_gain:          f64,
) -> AlgorithmHandle {
    call(AlgorithmHandle::NULL, || {
        let algorithm = EccoAlgorithm::new(EccoParams {
            safety_factor,
            step_size,
            min_step_size,
            max_step_size,
            min_change_rate,
            max_change_rate,
            abs_tolerance,
            rel_tolerance,
            p_gain,
            i_gain,
        })?;
        Ok(ALGORITHMS.insert(AlgorithmObject::Ecco(Arc::new(Mutex::new(algorithm)))))
    })
}

/// Couple output `v1`/input `u1` of slave `m1` with output `v2`/input `u2`
/// of slave `m2`.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_ecco_add_power_bond(
    algorithm: AlgorithmHandle,
    m1:        c_int,
    v1:        u32,
    u1:        u32,
    m2:        c_int,
    v2:        u32,
    u2:        u32,
) -> c_int {
    boundary::status(|| {
        let algorithm = ALGORITHMS.get(algorithm)?;
        algorithm.ecco()?.lock().add_power_bond(PowerBond {
            slave_a:  SlaveIndex(m1),
            output_a: ValueReference(v1),
            input_a:  ValueReference(u1),
            slave_b:  SlaveIndex(m2),
            output_b: ValueReference(v2),
            input_b:  ValueReference(u2),
        });
        Ok(())
    })
}

/// Release an algorithm handle.  Executions created from it keep using it.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_algorithm_destroy(algorithm: AlgorithmHandle) -> c_int {
    boundary::status(|| ALGORITHMS.remove(algorithm).map(drop))
}
