//! Observer trait: read-only callbacks from the execution's step loop.

use cosim_core::{Duration, SlaveIndex, StepNumber, TimePoint};

use crate::last_value::LastValueObserver;
use crate::slave::Slave;
use crate::time_series::TimeSeriesObserver;

/// Callbacks invoked by the execution at key points of its lifecycle.
///
/// All methods have default no-op implementations so implementors only
/// override what they care about.  Methods take `&self`: an observer is
/// shared between the execution (possibly stepping on a background thread)
/// and callers querying it, so implementors guard their state internally.
///
/// The `as_*` accessors are the capability query: an observer advertises
/// which query families it supports by returning `Some`.
pub trait Observer: Send + Sync {
    /// A slave joined the execution (or the observer joined an execution
    /// that already had this slave).
    fn simulator_added(&self, _index: SlaveIndex, _name: &str, _slave: &dyn Slave, _time: TimePoint) {}

    /// The slave finished initialization, before step 1.
    fn simulator_initialized(&self, _index: SlaveIndex, _time: TimePoint, _slave: &dyn Slave) {}

    /// The whole execution completed step `step`.
    fn step_complete(&self, _step: StepNumber, _size: Duration, _time: TimePoint) {}

    /// One slave completed step `step`; `time` is the time after the step.
    fn simulator_step_complete(
        &self,
        _index: SlaveIndex,
        _step:  StepNumber,
        _size:  Duration,
        _time:  TimePoint,
        _slave: &dyn Slave,
    ) {}

    fn as_last_value(&self) -> Option<&LastValueObserver> {
        None
    }

    fn as_time_series(&self) -> Option<&TimeSeriesObserver> {
        None
    }
}
