//! Observer creation, last-value reads, and time-series queries.

use std::ffi::{c_char, c_int};
use std::path::Path;
use std::sync::Arc;

use cosim_core::{
    CosimError, CosimResult, Duration, SlaveIndex, StepNumber, TimePoint, ValueReference, VariableId,
};
use cosim_engine::{LastValueObserver, Observer, TimeSeriesObserver};
use cosim_output::FileObserver;

use crate::boundary::{self, c_str, call, slice, slice_mut};
use crate::marshal::{stash_strings, variable_type};
use crate::observer::{OBSERVERS, ObserverObject};
use crate::registry::ObserverHandle;
use crate::series::{self, SampleArrays};

fn register(observer: Arc<dyn Observer>) -> ObserverHandle {
    OBSERVERS.insert(ObserverObject::new(observer))
}

// ── Creation ─────────────────────────────────────────────────────────────────

/// Observer keeping the latest value of every variable.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_last_value_observer_create() -> ObserverHandle {
    call(ObserverHandle::NULL, || Ok(register(Arc::new(LastValueObserver::new()))))
}

/// Time-series observer with the default buffer size.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_time_series_observer_create() -> ObserverHandle {
    call(ObserverHandle::NULL, || Ok(register(Arc::new(TimeSeriesObserver::new()))))
}

/// Time-series observer keeping at most `buffer_size` samples per variable.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_buffered_time_series_observer_create(buffer_size: usize) -> ObserverHandle {
    call(ObserverHandle::NULL, || Ok(register(Arc::new(TimeSeriesObserver::with_buffer_size(buffer_size)?))))
}

/// Observer logging every variable of every slave to CSV files in
/// `log_dir`.
///
/// # Safety
/// `log_dir` must be null or a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cosim_file_observer_create(log_dir: *const c_char) -> ObserverHandle {
    call(ObserverHandle::NULL, || {
        // SAFETY: forwarded caller contract.
        let log_dir = unsafe { c_str(log_dir, "logDir")? };
        Ok(register(Arc::new(FileObserver::new(log_dir))))
    })
}

/// As [`cosim_file_observer_create`], logging what the TOML log
/// configuration at `cfg_path` selects.
///
/// # Safety
/// Both arguments must be null or NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cosim_file_observer_create_from_cfg(
    log_dir:  *const c_char,
    cfg_path: *const c_char,
) -> ObserverHandle {
    call(ObserverHandle::NULL, || {
        // SAFETY: forwarded caller contract.
        let (log_dir, cfg_path) = unsafe { (c_str(log_dir, "logDir")?, c_str(cfg_path, "cfgPath")?) };
        let observer = FileObserver::with_config(log_dir, Path::new(cfg_path)).map_err(CosimError::from)?;
        Ok(register(Arc::new(observer)))
    })
}

/// Release an observer handle.  An execution it was added to keeps using it.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_observer_destroy(observer: ObserverHandle) -> c_int {
    boundary::status(|| OBSERVERS.remove(observer).map(drop))
}

// ── Last values ──────────────────────────────────────────────────────────────

/// Read through a last-value observer into `nv` values.
///
/// # Safety
/// `variables` must point to `nv` readable references and `values` to `nv`
/// writable `T`s.
unsafe fn last_values<T>(
    observer:  ObserverHandle,
    slave:     c_int,
    variables: *const u32,
    nv:        usize,
    values:    *mut T,
    read:      impl FnOnce(&LastValueObserver, SlaveIndex, &[ValueReference], &mut [T]) -> CosimResult<()>,
) -> c_int {
    boundary::status(|| {
        let observer = OBSERVERS.get(observer)?;
        // SAFETY: forwarded caller contract.
        let (refs, out) = unsafe { (slice(variables, nv, "variables")?, slice_mut(values, nv, "values")?) };
        let refs: Vec<ValueReference> = refs.iter().copied().map(ValueReference).collect();
        read(observer.last_value()?, SlaveIndex(slave), &refs, out)
    })
}

/// # Safety
/// `variables` and `values` must each point to `nv` elements.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cosim_observer_slave_get_real(
    observer:  ObserverHandle,
    slave:     c_int,
    variables: *const u32,
    nv:        usize,
    values:    *mut f64,
) -> c_int {
    // SAFETY: forwarded caller contract.
    unsafe { last_values(observer, slave, variables, nv, values, LastValueObserver::get_real) }
}

/// # Safety
/// `variables` and `values` must each point to `nv` elements.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cosim_observer_slave_get_integer(
    observer:  ObserverHandle,
    slave:     c_int,
    variables: *const u32,
    nv:        usize,
    values:    *mut c_int,
) -> c_int {
    // SAFETY: forwarded caller contract.
    unsafe { last_values(observer, slave, variables, nv, values, LastValueObserver::get_integer) }
}

/// # Safety
/// `variables` and `values` must each point to `nv` elements.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cosim_observer_slave_get_boolean(
    observer:  ObserverHandle,
    slave:     c_int,
    variables: *const u32,
    nv:        usize,
    values:    *mut bool,
) -> c_int {
    // SAFETY: forwarded caller contract.
    unsafe { last_values(observer, slave, variables, nv, values, LastValueObserver::get_boolean) }
}

/// The returned strings live in a per-thread buffer and stay valid until
/// the next string read on this thread.
///
/// # Safety
/// `variables` and `values` must each point to `nv` elements.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cosim_observer_slave_get_string(
    observer:  ObserverHandle,
    slave:     c_int,
    variables: *const u32,
    nv:        usize,
    values:    *mut *const c_char,
) -> c_int {
    // SAFETY: forwarded caller contract.
    unsafe {
        last_values(observer, slave, variables, nv, values, |observer, slave, refs, out| {
            let mut strings = vec![String::new(); refs.len()];
            observer.get_string(slave, refs, &mut strings)?;
            stash_strings(strings, out);
            Ok(())
        })
    }
}

// ── Time series ──────────────────────────────────────────────────────────────

fn observed_variable(slave: c_int, kind: c_int, reference: u32) -> CosimResult<VariableId> {
    Ok(VariableId::new(SlaveIndex(slave), variable_type(kind)?, ValueReference(reference)))
}

/// Start buffering samples of a variable (real or integer).
#[unsafe(no_mangle)]
pub extern "C" fn cosim_observer_start_observing(
    observer:  ObserverHandle,
    slave:     c_int,
    kind:      c_int,
    reference: u32,
) -> c_int {
    boundary::status(|| {
        let variable = observed_variable(slave, kind, reference)?;
        OBSERVERS.get(observer)?.time_series()?.start_observing(variable)
    })
}

/// Stop buffering samples of a variable and drop those buffered.
#[unsafe(no_mangle)]
pub extern "C" fn cosim_observer_stop_observing(
    observer:  ObserverHandle,
    slave:     c_int,
    kind:      c_int,
    reference: u32,
) -> c_int {
    boundary::status(|| {
        let variable = observed_variable(slave, kind, reference)?;
        OBSERVERS.get(observer)?.time_series()?.stop_observing(variable)
    })
}

/// Read up to `n_samples` samples from the first buffered step at or after
/// `from_step`.  Returns the number read, or -1.
///
/// # Safety
/// `values`, `steps` and `times` must each point to `n_samples` writable
/// elements.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn cosim_observer_slave_get_real_samples(
    observer:  ObserverHandle,
    slave:     c_int,
    reference: u32,
    from_step: i64,
    n_samples: usize,
    values:    *mut f64,
    steps:     *mut i64,
    times:     *mut i64,
) -> i64 {
    call(-1, || {
        let observer = OBSERVERS.get(observer)?;
        // SAFETY: forwarded caller contract.
        let out = unsafe {
            SampleArrays {
                values: slice_mut(values, n_samples, "values")?,
                steps:  slice_mut(steps, n_samples, "steps")?,
                times:  slice_mut(times, n_samples, "times")?,
            }
        };
        let n = series::real_samples(&observer, SlaveIndex(slave), ValueReference(reference), StepNumber(from_step), out)?;
        Ok(n as i64)
    })
}

/// # Safety
/// `values`, `steps` and `times` must each point to `n_samples` writable
/// elements.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn cosim_observer_slave_get_integer_samples(
    observer:  ObserverHandle,
    slave:     c_int,
    reference: u32,
    from_step: i64,
    n_samples: usize,
    values:    *mut c_int,
    steps:     *mut i64,
    times:     *mut i64,
) -> i64 {
    call(-1, || {
        let observer = OBSERVERS.get(observer)?;
        // SAFETY: forwarded caller contract.
        let out = unsafe {
            SampleArrays {
                values: slice_mut(values, n_samples, "values")?,
                steps:  slice_mut(steps, n_samples, "steps")?,
                times:  slice_mut(times, n_samples, "times")?,
            }
        };
        let n =
            series::integer_samples(&observer, SlaveIndex(slave), ValueReference(reference), StepNumber(from_step), out)?;
        Ok(n as i64)
    })
}

/// Read two real series aligned by step number.  Returns the number of
/// pairs read, or -1.
///
/// # Safety
/// `values1` and `values2` must each point to `n_samples` writable doubles.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn cosim_observer_slave_get_real_synchronized_series(
    observer:   ObserverHandle,
    slave1:     c_int,
    reference1: u32,
    slave2:     c_int,
    reference2: u32,
    from_step:  i64,
    n_samples:  usize,
    values1:    *mut f64,
    values2:    *mut f64,
) -> i64 {
    call(-1, || {
        let observer = OBSERVERS.get(observer)?;
        // SAFETY: forwarded caller contract.
        let (first, second) =
            unsafe { (slice_mut(values1, n_samples, "values1")?, slice_mut(values2, n_samples, "values2")?) };
        let n = series::synchronized_real_series(
            &observer,
            (SlaveIndex(slave1), ValueReference(reference1)),
            (SlaveIndex(slave2), ValueReference(reference2)),
            StepNumber(from_step),
            first,
            second,
        )?;
        Ok(n as i64)
    })
}

/// # Safety
/// `steps` must point to two writable step numbers.
unsafe fn step_pair<'a>(steps: *mut i64) -> CosimResult<&'a mut [i64; 2]> {
    // SAFETY: forwarded caller contract.
    let steps = unsafe { slice_mut(steps, 2, "steps")? };
    <&mut [i64; 2]>::try_from(steps).map_err(|_| CosimError::InvalidArgument("'steps' must hold two elements".into()))
}

/// Write the first and last step of the trailing `duration` (ns) of the
/// buffered history into `steps[0]` and `steps[1]`.
///
/// # Safety
/// `steps` must point to two writable step numbers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cosim_observer_get_step_numbers_for_duration(
    observer: ObserverHandle,
    slave:    c_int,
    duration: i64,
    steps:    *mut i64,
) -> c_int {
    boundary::status(|| {
        let observer = OBSERVERS.get(observer)?;
        // SAFETY: forwarded caller contract.
        let steps = unsafe { step_pair(steps)? };
        series::step_numbers_for_duration(&observer, SlaveIndex(slave), Duration(duration), steps)
    })
}

/// Write the first and last buffered step within `[begin, end]` (ns).
///
/// # Safety
/// `steps` must point to two writable step numbers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cosim_observer_get_step_numbers(
    observer: ObserverHandle,
    slave:    c_int,
    begin:    i64,
    end:      i64,
    steps:    *mut i64,
) -> c_int {
    boundary::status(|| {
        let observer = OBSERVERS.get(observer)?;
        // SAFETY: forwarded caller contract.
        let steps = unsafe { step_pair(steps)? };
        series::step_numbers(&observer, SlaveIndex(slave), TimePoint(begin), TimePoint(end), steps)
    })
}
