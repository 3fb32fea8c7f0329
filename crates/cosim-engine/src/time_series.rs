//! `TimeSeriesObserver`: bounded per-variable sample history.
//!
//! Samples are recorded after every completed step for the variables a
//! caller asked to observe.  Each buffer keeps at most `capacity` samples;
//! older ones are dropped first.  The step→time mapping of every slave is
//! kept with the same bound, so any buffered sample can be dated.

use std::collections::{BTreeMap, VecDeque};

use parking_lot::Mutex;
use tracing::warn;

use cosim_core::{
    CosimError, CosimResult, Duration, ModelDescription, SlaveIndex, StepNumber, TimePoint,
    ValueReference, VariableId, VariableType,
};

use crate::observer::Observer;
use crate::slave::Slave;

/// Buffer length of [`TimeSeriesObserver::new`].
pub const DEFAULT_BUFFER_SIZE: usize = 10_000;

/// One recorded value.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Sample<T> {
    pub step:  StepNumber,
    pub time:  TimePoint,
    pub value: T,
}

struct SlaveSeries {
    model:    ModelDescription,
    times:    VecDeque<(StepNumber, TimePoint)>,
    reals:    BTreeMap<ValueReference, VecDeque<(StepNumber, f64)>>,
    integers: BTreeMap<ValueReference, VecDeque<(StepNumber, i32)>>,
}

impl SlaveSeries {
    fn time_of(&self, step: StepNumber) -> TimePoint {
        let i = self.times.partition_point(|(s, _)| *s < step);
        match self.times.get(i) {
            Some((s, t)) if *s == step => *t,
            _ => TimePoint::ZERO,
        }
    }

    fn collect<T: Copy>(
        &self,
        buffer: Option<&VecDeque<(StepNumber, T)>>,
        from:   StepNumber,
        max:    usize,
    ) -> Vec<Sample<T>> {
        let Some(buffer) = buffer else {
            return Vec::new();
        };
        let start = buffer.partition_point(|(s, _)| *s < from);
        buffer
            .range(start..)
            .take(max)
            .map(|&(step, value)| Sample { step, time: self.time_of(step), value })
            .collect()
    }
}

fn push_bounded<T>(buffer: &mut VecDeque<T>, item: T, capacity: usize) {
    if buffer.len() == capacity {
        buffer.pop_front();
    }
    buffer.push_back(item);
}

/// Observer answering history queries over real and integer variables.
pub struct TimeSeriesObserver {
    capacity: usize,
    slaves:   Mutex<BTreeMap<SlaveIndex, SlaveSeries>>,
}

impl Default for TimeSeriesObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSeriesObserver {
    /// An observer buffering up to [`DEFAULT_BUFFER_SIZE`] samples per variable.
    pub fn new() -> Self {
        Self { capacity: DEFAULT_BUFFER_SIZE, slaves: Mutex::new(BTreeMap::new()) }
    }

    /// An observer buffering up to `capacity` samples per variable.
    pub fn with_buffer_size(capacity: usize) -> CosimResult<Self> {
        if capacity == 0 {
            return Err(CosimError::InvalidArgument("time series buffer size must be positive".into()));
        }
        Ok(Self { capacity, slaves: Mutex::new(BTreeMap::new()) })
    }

    pub fn buffer_size(&self) -> usize {
        self.capacity
    }

    /// Begin recording `variable`.  Recording an already observed variable
    /// is a no-op.
    pub fn start_observing(&self, variable: VariableId) -> CosimResult<()> {
        let mut slaves = self.slaves.lock();
        let series = slaves
            .get_mut(&variable.slave)
            .ok_or_else(|| CosimError::OutOfRange(format!("{} is not observed", variable.slave)))?;
        if series.model.find_by_reference(variable.kind, variable.reference).is_none() {
            return Err(CosimError::InvalidArgument(format!("{variable} does not exist")));
        }
        match variable.kind {
            VariableType::Real => {
                series.reals.entry(variable.reference).or_default();
            }
            VariableType::Integer => {
                series.integers.entry(variable.reference).or_default();
            }
            other => {
                return Err(CosimError::UnsupportedFeature(format!(
                    "time series of {other} variables are not supported"
                )));
            }
        }
        Ok(())
    }

    /// Stop recording `variable` and drop its buffered samples.
    pub fn stop_observing(&self, variable: VariableId) -> CosimResult<()> {
        let mut slaves = self.slaves.lock();
        let series = slaves
            .get_mut(&variable.slave)
            .ok_or_else(|| CosimError::OutOfRange(format!("{} is not observed", variable.slave)))?;
        match variable.kind {
            VariableType::Real => {
                series.reals.remove(&variable.reference);
            }
            VariableType::Integer => {
                series.integers.remove(&variable.reference);
            }
            other => {
                return Err(CosimError::UnsupportedFeature(format!(
                    "time series of {other} variables are not supported"
                )));
            }
        }
        Ok(())
    }

    fn with_series<R>(&self, slave: SlaveIndex, f: impl FnOnce(&SlaveSeries) -> CosimResult<R>) -> CosimResult<R> {
        let slaves = self.slaves.lock();
        let series = slaves
            .get(&slave)
            .ok_or_else(|| CosimError::OutOfRange(format!("{slave} is not observed")))?;
        f(series)
    }

    /// Up to `max` samples starting at the first buffered step `>= from`.
    /// An unobserved variable yields no samples.
    pub fn real_samples(
        &self,
        slave:     SlaveIndex,
        reference: ValueReference,
        from:      StepNumber,
        max:       usize,
    ) -> CosimResult<Vec<Sample<f64>>> {
        self.with_series(slave, |s| Ok(s.collect(s.reals.get(&reference), from, max)))
    }

    pub fn integer_samples(
        &self,
        slave:     SlaveIndex,
        reference: ValueReference,
        from:      StepNumber,
        max:       usize,
    ) -> CosimResult<Vec<Sample<i32>>> {
        self.with_series(slave, |s| Ok(s.collect(s.integers.get(&reference), from, max)))
    }

    /// `[first, last]` step numbers spanning the trailing `duration` of the
    /// buffered history.  `first` is the newest step at least `duration`
    /// before the last one, or the oldest buffered step if none is.
    pub fn step_numbers_for_duration(&self, slave: SlaveIndex, duration: Duration) -> CosimResult<[StepNumber; 2]> {
        self.with_series(slave, |s| {
            let &(last_step, last_time) = s
                .times
                .back()
                .ok_or_else(|| CosimError::OutOfRange(format!("no samples recorded for {slave}")))?;
            let horizon = last_time.saturating_sub(duration);
            let first = s
                .times
                .iter()
                .rev()
                .find(|(_, t)| *t <= horizon)
                .or_else(|| s.times.front())
                .map_or(last_step, |(step, _)| *step);
            Ok([first, last_step])
        })
    }

    /// `[first, last]` step numbers of the buffered steps inside `[begin, end]`.
    pub fn step_numbers(&self, slave: SlaveIndex, begin: TimePoint, end: TimePoint) -> CosimResult<[StepNumber; 2]> {
        self.with_series(slave, |s| {
            let out_of_range = || CosimError::OutOfRange(format!("no samples of {slave} between {begin} and {end}"));
            let first = s.times.iter().find(|(_, t)| *t >= begin).ok_or_else(out_of_range)?;
            let last = s.times.iter().rev().find(|(_, t)| *t <= end).ok_or_else(out_of_range)?;
            if first.0 > last.0 {
                return Err(out_of_range());
            }
            Ok([first.0, last.0])
        })
    }

    /// Pairs of values of two real variables recorded at the same steps,
    /// starting at the first buffered step `>= from` of the first variable.
    pub fn synchronized_real_series(
        &self,
        first:  (SlaveIndex, ValueReference),
        second: (SlaveIndex, ValueReference),
        from:   StepNumber,
        max:    usize,
    ) -> CosimResult<Vec<(f64, f64)>> {
        let slaves = self.slaves.lock();
        let series = |index: SlaveIndex| {
            slaves
                .get(&index)
                .ok_or_else(|| CosimError::OutOfRange(format!("{index} is not observed")))
        };
        let (Some(a), Some(b)) = (series(first.0)?.reals.get(&first.1), series(second.0)?.reals.get(&second.1))
        else {
            return Ok(Vec::new());
        };

        let start = a.partition_point(|(s, _)| *s < from);
        let mut pairs = Vec::new();
        for &(step, value) in a.range(start..) {
            if pairs.len() == max {
                break;
            }
            let j = b.partition_point(|(s, _)| *s < step);
            if let Some(&(other_step, other)) = b.get(j) {
                if other_step == step {
                    pairs.push((value, other));
                }
            }
        }
        Ok(pairs)
    }

    fn record(&self, index: SlaveIndex, step: StepNumber, time: TimePoint, slave: &dyn Slave) -> CosimResult<()> {
        let mut slaves = self.slaves.lock();
        let Some(series) = slaves.get_mut(&index) else {
            return Ok(());
        };
        let capacity = self.capacity;
        push_bounded(&mut series.times, (step, time), capacity);

        let refs: Vec<ValueReference> = series.reals.keys().copied().collect();
        let mut values = vec![0.0; refs.len()];
        slave.get_real(&refs, &mut values)?;
        for (vr, value) in refs.iter().zip(values) {
            if let Some(buffer) = series.reals.get_mut(vr) {
                push_bounded(buffer, (step, value), capacity);
            }
        }

        let refs: Vec<ValueReference> = series.integers.keys().copied().collect();
        let mut values = vec![0; refs.len()];
        slave.get_integer(&refs, &mut values)?;
        for (vr, value) in refs.iter().zip(values) {
            if let Some(buffer) = series.integers.get_mut(vr) {
                push_bounded(buffer, (step, value), capacity);
            }
        }
        Ok(())
    }
}

impl Observer for TimeSeriesObserver {
    fn simulator_added(&self, index: SlaveIndex, _name: &str, slave: &dyn Slave, _time: TimePoint) {
        self.slaves.lock().insert(
            index,
            SlaveSeries {
                model:    slave.model_description().clone(),
                times:    VecDeque::new(),
                reals:    BTreeMap::new(),
                integers: BTreeMap::new(),
            },
        );
    }

    fn simulator_step_complete(
        &self,
        index: SlaveIndex,
        step:  StepNumber,
        _size: Duration,
        time:  TimePoint,
        slave: &dyn Slave,
    ) {
        if let Err(e) = self.record(index, step, time, slave) {
            warn!(%index, %step, error = %e, "time series observer could not read slave");
        }
    }

    fn as_time_series(&self) -> Option<&TimeSeriesObserver> {
        Some(self)
    }
}
