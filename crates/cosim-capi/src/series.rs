//! Time-series queries against a time-series observer, written into
//! caller-provided arrays.
//!
//! Sample reads return how many samples were actually written, which may be
//! fewer than requested (including zero); a short history is never an
//! error.

use cosim_core::{CosimResult, Duration, SlaveIndex, StepNumber, TimePoint, ValueReference};
use cosim_engine::Sample;

use crate::observer::ObserverObject;

/// Caller arrays for one sampled series.
pub struct SampleArrays<'a, T> {
    pub values: &'a mut [T],
    pub steps:  &'a mut [i64],
    pub times:  &'a mut [i64],
}

impl<T: Copy> SampleArrays<'_, T> {
    fn capacity(&self) -> usize {
        self.values.len().min(self.steps.len()).min(self.times.len())
    }

    fn fill(&mut self, samples: &[Sample<T>]) -> usize {
        let n = samples.len().min(self.capacity());
        for (i, sample) in samples.iter().take(n).enumerate() {
            self.values[i] = sample.value;
            self.steps[i] = sample.step.0;
            self.times[i] = sample.time.as_nanos();
        }
        n
    }
}

pub fn real_samples(
    observer:  &ObserverObject,
    slave:     SlaveIndex,
    reference: ValueReference,
    from:      StepNumber,
    mut out:   SampleArrays<'_, f64>,
) -> CosimResult<usize> {
    let samples = observer.time_series()?.real_samples(slave, reference, from, out.capacity())?;
    Ok(out.fill(&samples))
}

pub fn integer_samples(
    observer:  &ObserverObject,
    slave:     SlaveIndex,
    reference: ValueReference,
    from:      StepNumber,
    mut out:   SampleArrays<'_, i32>,
) -> CosimResult<usize> {
    let samples = observer.time_series()?.integer_samples(slave, reference, from, out.capacity())?;
    Ok(out.fill(&samples))
}

/// Two real series paired by step number, written into `first` and
/// `second`.
pub fn synchronized_real_series(
    observer: &ObserverObject,
    a:        (SlaveIndex, ValueReference),
    b:        (SlaveIndex, ValueReference),
    from:     StepNumber,
    first:    &mut [f64],
    second:   &mut [f64],
) -> CosimResult<usize> {
    let max = first.len().min(second.len());
    let pairs = observer.time_series()?.synchronized_real_series(a, b, from, max)?;
    for (i, (x, y)) in pairs.iter().enumerate() {
        first[i] = *x;
        second[i] = *y;
    }
    Ok(pairs.len())
}

/// `[first, last]` steps covering the trailing `duration` of the history.
pub fn step_numbers_for_duration(
    observer: &ObserverObject,
    slave:    SlaveIndex,
    duration: Duration,
    steps:    &mut [i64; 2],
) -> CosimResult<()> {
    let [first, last] = observer.time_series()?.step_numbers_for_duration(slave, duration)?;
    *steps = [first.0, last.0];
    Ok(())
}

/// `[first, last]` steps recorded within `[begin, end]`.
pub fn step_numbers(
    observer: &ObserverObject,
    slave:    SlaveIndex,
    begin:    TimePoint,
    end:      TimePoint,
    steps:    &mut [i64; 2],
) -> CosimResult<()> {
    let [first, last] = observer.time_series()?.step_numbers(slave, begin, end)?;
    *steps = [first.0, last.0];
    Ok(())
}
