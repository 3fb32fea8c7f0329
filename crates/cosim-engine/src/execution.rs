//! The engine-level execution and its step loop.
//!
//! # Step order
//!
//! ```text
//! step():
//!   ⓪ Initialize   first call only: setup, initial values, start, observers
//!   ① Manipulate   every manipulator installs/clears modifiers
//!   ② Transfer     connection sources are read, then all sinks written
//!   ③ Modify       active modifiers overwrite their variables
//!   ④ Step         every slave advances by the algorithm's step size;
//!                  modifiers on computed variables are written again
//!   ⑤ Adapt        the algorithm sees the post-step outputs
//!   ⑥ Observe      observers are notified with the new step number
//! ```
//!
//! [`SharedExecution`] wraps an execution for use from two threads: the
//! controller and a background run loop.  The mutex is taken once per step,
//! and a stop flag is checked between steps.  After every step it publishes
//! an [`ExecutionSnapshot`] that status queries read instead of the mutex.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, warn};

use cosim_core::{
    Causality, CosimError, CosimResult, Duration, ModelDescription, ScalarValue, SlaveIndex,
    StepNumber, TimePoint, ValueReference, VariableDescription, VariableId,
};

use crate::algorithm::{SharedAlgorithm, SlaveReader};
use crate::manipulator::{ManipulationTarget, Manipulator};
use crate::observer::Observer;
use crate::slave::{Slave, StepOutcome};
use crate::timer::{RealTimeMetrics, RealTimeTimer};

struct Simulator {
    name:  String,
    slave: Box<dyn Slave>,
    model: ModelDescription,
}

#[derive(Copy, Clone)]
struct Connection {
    source: VariableId,
    target: VariableId,
}

fn find_variable<'a>(
    simulators: &'a [Simulator],
    variable:   VariableId,
) -> CosimResult<&'a VariableDescription> {
    let sim = simulators
        .get(variable.slave.to_usize().unwrap_or(usize::MAX))
        .ok_or_else(|| CosimError::OutOfRange(format!("{} does not exist", variable.slave)))?;
    sim.model
        .find_by_reference(variable.kind, variable.reference)
        .ok_or_else(|| CosimError::InvalidArgument(format!("{variable} does not exist in '{}'", sim.name)))
}

/// Modifier table seen by manipulators during ①.
struct Modifiers<'a> {
    simulators: &'a [Simulator],
    active:     &'a mut BTreeMap<VariableId, ScalarValue>,
}

impl ManipulationTarget for Modifiers<'_> {
    fn set_modifier(&mut self, variable: VariableId, value: ScalarValue) -> CosimResult<()> {
        find_variable(self.simulators, variable)?;
        if value.kind() != variable.kind {
            return Err(CosimError::InvalidArgument(format!(
                "cannot set {variable} to a {} value",
                value.kind()
            )));
        }
        self.active.insert(variable, value);
        Ok(())
    }

    fn clear_modifier(&mut self, variable: VariableId) -> CosimResult<()> {
        find_variable(self.simulators, variable)?;
        self.active.remove(&variable);
        Ok(())
    }
}

struct Outputs<'a>(&'a [Simulator]);

impl SlaveReader for Outputs<'_> {
    fn read_real(&self, slave: SlaveIndex, reference: ValueReference) -> CosimResult<f64> {
        let sim = self
            .0
            .get(slave.to_usize().unwrap_or(usize::MAX))
            .ok_or_else(|| CosimError::OutOfRange(format!("{slave} does not exist")))?;
        let mut out = [0.0];
        sim.slave.get_real(&[reference], &mut out)?;
        Ok(out[0])
    }
}

// ── Execution ────────────────────────────────────────────────────────────────

/// A set of connected slaves advanced together in time.
pub struct Execution {
    start_time:     TimePoint,
    current_time:   TimePoint,
    step_number:    StepNumber,
    algorithm:      SharedAlgorithm,
    simulators:     Vec<Simulator>,
    connections:    Vec<Connection>,
    initial_values: Vec<(VariableId, ScalarValue)>,
    modifiers:      BTreeMap<VariableId, ScalarValue>,
    observers:      Vec<Arc<dyn Observer>>,
    manipulators:   Vec<Arc<dyn Manipulator>>,
    initialized:    bool,
    timer:          RealTimeTimer,
    pause:          Option<std::time::Duration>,
}

impl Execution {
    pub fn new(start_time: TimePoint, algorithm: SharedAlgorithm) -> Self {
        Self {
            start_time,
            current_time: start_time,
            step_number: StepNumber(0),
            algorithm,
            simulators: Vec::new(),
            connections: Vec::new(),
            initial_values: Vec::new(),
            modifiers: BTreeMap::new(),
            observers: Vec::new(),
            manipulators: Vec::new(),
            initialized: false,
            timer: RealTimeTimer::default(),
            pause: None,
        }
    }

    // ── Composition ──────────────────────────────────────────────────────────

    /// Add a slave under a unique `name`.  Indices are assigned densely in
    /// insertion order.
    pub fn add_slave(&mut self, mut slave: Box<dyn Slave>, name: &str) -> CosimResult<SlaveIndex> {
        if self.simulators.iter().any(|s| s.name == name) {
            return Err(CosimError::InvalidArgument(format!("a slave named '{name}' already exists")));
        }
        let index = SlaveIndex::from(i32::try_from(self.simulators.len()).map_err(|_| {
            CosimError::OutOfRange("too many slaves".into())
        })?);
        if self.initialized {
            slave.setup(self.current_time, None)?;
            slave.start_simulation()?;
        }
        let model = slave.model_description().clone();
        for observer in &self.observers {
            observer.simulator_added(index, name, slave.as_ref(), self.current_time);
        }
        for manipulator in &self.manipulators {
            manipulator.simulator_added(index, name, &model, self.current_time);
        }
        debug!(%index, name, model = %model.name, "slave added");
        self.simulators.push(Simulator { name: name.to_owned(), slave, model });
        Ok(index)
    }

    /// Attach an observer; it is told about every slave already present.
    pub fn add_observer(&mut self, observer: Arc<dyn Observer>) {
        for (i, sim) in self.simulators.iter().enumerate() {
            observer.simulator_added(SlaveIndex(i as i32), &sim.name, sim.slave.as_ref(), self.current_time);
        }
        self.observers.push(observer);
    }

    /// Attach a manipulator; it is told about every slave already present.
    pub fn add_manipulator(&mut self, manipulator: Arc<dyn Manipulator>) {
        for (i, sim) in self.simulators.iter().enumerate() {
            manipulator.simulator_added(SlaveIndex(i as i32), &sim.name, &sim.model, self.current_time);
        }
        self.manipulators.push(manipulator);
    }

    /// Connect an output to an input of the same kind.  An input accepts at
    /// most one connection.
    pub fn connect_variables(&mut self, source: VariableId, target: VariableId) -> CosimResult<()> {
        if source.kind != target.kind {
            return Err(CosimError::InvalidArgument(format!(
                "cannot connect {source} to {target}: kinds differ"
            )));
        }
        let model = &self.model_description(source.slave)?;
        if !model.has_reference_where(source.kind, source.reference, |v| {
            matches!(v.causality, Causality::Output | Causality::CalculatedParameter)
        }) {
            find_variable(&self.simulators, source)?;
            return Err(CosimError::InvalidArgument(format!("{source} is not an output")));
        }
        let model = &self.model_description(target.slave)?;
        if !model.has_reference_where(target.kind, target.reference, |v| v.causality.is_settable()) {
            find_variable(&self.simulators, target)?;
            return Err(CosimError::InvalidArgument(format!("{target} is not an input")));
        }
        if self.connections.iter().any(|c| c.target == target) {
            return Err(CosimError::InvalidArgument(format!("{target} is already connected")));
        }
        self.connections.push(Connection { source, target });
        Ok(())
    }

    /// Queue a value applied before the simulation starts.
    pub fn set_initial_value(&mut self, slave: SlaveIndex, reference: ValueReference, value: ScalarValue) -> CosimResult<()> {
        if self.initialized {
            return Err(CosimError::IllegalState(
                "initial values cannot be set after the simulation has started".into(),
            ));
        }
        let variable = VariableId::new(slave, value.kind(), reference);
        find_variable(&self.simulators, variable)?;
        self.initial_values.push((variable, value));
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    pub fn start_time(&self) -> TimePoint {
        self.start_time
    }

    pub fn current_time(&self) -> TimePoint {
        self.current_time
    }

    pub fn step_number(&self) -> StepNumber {
        self.step_number
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn slave_count(&self) -> usize {
        self.simulators.len()
    }

    /// `(index, name)` of every slave in index order.
    pub fn slaves(&self) -> impl Iterator<Item = (SlaveIndex, &str)> {
        self.simulators
            .iter()
            .enumerate()
            .map(|(i, s)| (SlaveIndex(i as i32), s.name.as_str()))
    }

    pub fn model_description(&self, slave: SlaveIndex) -> CosimResult<&ModelDescription> {
        self.simulators
            .get(slave.to_usize().unwrap_or(usize::MAX))
            .map(|s| &s.model)
            .ok_or_else(|| CosimError::OutOfRange(format!("{slave} does not exist")))
    }

    /// Resolve `slave_name.variable_name`.
    pub fn find_variable(&self, slave_name: &str, variable_name: &str) -> CosimResult<VariableId> {
        let (i, sim) = self
            .simulators
            .iter()
            .enumerate()
            .find(|(_, s)| s.name == slave_name)
            .ok_or_else(|| CosimError::InvalidArgument(format!("no slave named '{slave_name}'")))?;
        let var = sim.model.find_by_name(variable_name).ok_or_else(|| {
            CosimError::InvalidArgument(format!("slave '{slave_name}' has no variable '{variable_name}'"))
        })?;
        Ok(VariableId::new(SlaveIndex(i as i32), var.kind, var.reference))
    }

    /// Variables with an active modifier, ordered by slave, kind, reference.
    pub fn modified_variables(&self) -> Vec<VariableId> {
        self.modifiers.keys().copied().collect()
    }

    pub fn timer(&self) -> &RealTimeTimer {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut RealTimeTimer {
        &mut self.timer
    }

    // ── Stepping ─────────────────────────────────────────────────────────────

    fn initialize(&mut self) -> CosimResult<()> {
        if self.initialized {
            return Ok(());
        }
        for sim in &mut self.simulators {
            sim.slave.setup(self.current_time, None)?;
        }
        for (variable, value) in &self.initial_values {
            self.simulators[variable.slave.to_usize().unwrap_or_default()]
                .slave
                .set_value(variable.reference, value)?;
        }
        self.transfer()?;
        for sim in &mut self.simulators {
            sim.slave.start_simulation()?;
        }
        self.algorithm.lock().initialize(self.current_time);
        self.timer.start(self.current_time);
        self.initialized = true;
        for observer in &self.observers {
            for (i, sim) in self.simulators.iter().enumerate() {
                observer.simulator_initialized(SlaveIndex(i as i32), self.current_time, sim.slave.as_ref());
            }
        }
        debug!(time = %self.current_time, slaves = self.simulators.len(), "execution initialized");
        Ok(())
    }

    fn transfer(&mut self) -> CosimResult<()> {
        let mut values = Vec::with_capacity(self.connections.len());
        for c in &self.connections {
            let value = match self.modifiers.get(&c.source) {
                Some(modified) => modified.clone(),
                None => self.simulators[c.source.slave.to_usize().unwrap_or_default()]
                    .slave
                    .get_value(c.source.kind, c.source.reference)?,
            };
            values.push(value);
        }
        for (c, value) in self.connections.iter().zip(&values) {
            self.simulators[c.target.slave.to_usize().unwrap_or_default()]
                .slave
                .set_value(c.target.reference, value)?;
        }
        Ok(())
    }

    /// Write active modifiers into their slaves.  After a step only
    /// variables the model computes itself are rewritten; inputs keep the
    /// value written before the step.
    fn apply_modifiers(&mut self, after_step: bool) -> CosimResult<()> {
        for (variable, value) in &self.modifiers {
            let sim = &mut self.simulators[variable.slave.to_usize().unwrap_or_default()];
            if after_step
                && sim
                    .model
                    .find_by_reference(variable.kind, variable.reference)
                    .is_some_and(|v| v.causality.is_settable())
            {
                continue;
            }
            sim.slave.set_value(variable.reference, value)?;
        }
        Ok(())
    }

    /// Advance every slave by one macro step.  Returns the step size.
    ///
    /// Real-time pacing is not applied here: the wait owed after this step
    /// is left for [`take_pause`][Self::take_pause] so the caller can sleep
    /// without holding any lock.
    pub fn step(&mut self) -> CosimResult<Duration> {
        self.initialize()?;
        let time = self.current_time;
        let size = self.algorithm.lock().step_size();
        let end = time.checked_add(size).ok_or_else(|| {
            CosimError::OutOfRange(format!("a step of {size} from {time} passes the end of the time axis"))
        })?;

        let mut target = Modifiers { simulators: &self.simulators, active: &mut self.modifiers };
        for manipulator in &self.manipulators {
            manipulator.step_commencing(time, &mut target)?;
        }
        self.transfer()?;
        self.apply_modifiers(false)?;

        for sim in &mut self.simulators {
            let outcome = sim
                .slave
                .do_step(time, size)
                .map_err(|e| e.into_simulation_error(&format!("slave '{}' failed at {time}", sim.name)))?;
            if outcome == StepOutcome::Discarded {
                return Err(CosimError::StepTooLong(format!(
                    "slave '{}' refused a step of {size} at {time}",
                    sim.name
                )));
            }
        }

        self.apply_modifiers(true)?;

        self.current_time = end;
        self.step_number = self.step_number.next();
        self.pause = self.timer.step_complete(self.current_time);
        self.algorithm.lock().step_complete(size, &Outputs(&self.simulators))?;

        for observer in &self.observers {
            observer.step_complete(self.step_number, size, self.current_time);
            for (i, sim) in self.simulators.iter().enumerate() {
                observer.simulator_step_complete(
                    SlaveIndex(i as i32),
                    self.step_number,
                    size,
                    self.current_time,
                    sim.slave.as_ref(),
                );
            }
        }
        Ok(size)
    }

    /// Wall-clock wait owed by real-time pacing after the last step.
    pub fn take_pause(&mut self) -> Option<std::time::Duration> {
        self.pause.take()
    }
}

impl Drop for Execution {
    fn drop(&mut self) {
        if !self.initialized {
            return;
        }
        for sim in &mut self.simulators {
            if let Err(e) = sim.slave.end_simulation() {
                warn!(slave = %sim.name, error = %e, "end of simulation failed");
            }
        }
    }
}

// ── SharedExecution ──────────────────────────────────────────────────────────

/// Time and real-time figures as of the last completed step, readable
/// without waiting for a step in progress.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ExecutionSnapshot {
    pub current_time: TimePoint,
    pub metrics:      RealTimeMetrics,
}

impl ExecutionSnapshot {
    fn of(execution: &Execution) -> Self {
        Self { current_time: execution.current_time, metrics: execution.timer.metrics() }
    }
}

/// An execution shared between a controller and a background run loop.
#[derive(Clone)]
pub struct SharedExecution {
    inner:    Arc<Mutex<Execution>>,
    stop:     Arc<AtomicBool>,
    snapshot: Arc<Mutex<ExecutionSnapshot>>,
}

impl SharedExecution {
    pub fn new(execution: Execution) -> Self {
        let snapshot = ExecutionSnapshot::of(&execution);
        Self {
            inner:    Arc::new(Mutex::new(execution)),
            stop:     Arc::new(AtomicBool::new(false)),
            snapshot: Arc::new(Mutex::new(snapshot)),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Execution> {
        self.inner.lock()
    }

    /// Run `f` on the execution and publish the resulting snapshot.  For
    /// changes to time or real-time settings made outside a step.
    pub fn update<R>(&self, f: impl FnOnce(&mut Execution) -> R) -> R {
        let mut execution = self.inner.lock();
        let result = f(&mut execution);
        self.publish(&execution);
        result
    }

    /// The snapshot taken after the last completed step.  Never waits for a
    /// step to finish.
    pub fn snapshot(&self) -> ExecutionSnapshot {
        *self.snapshot.lock()
    }

    fn publish(&self, execution: &Execution) {
        *self.snapshot.lock() = ExecutionSnapshot::of(execution);
    }

    /// Ask a running [`simulate_until`][Self::simulate_until] to return at
    /// the next step boundary.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Clear a previous stop request.  Call before starting a new run, never
    /// from inside one.
    pub fn clear_stop(&self) {
        self.stop.store(false, Ordering::Release);
    }

    /// Step until `target` is reached (`Ok(true)`) or a stop is requested
    /// (`Ok(false)`).  With `None` only a stop request ends the loop.
    pub fn simulate_until(&self, target: Option<TimePoint>) -> CosimResult<bool> {
        loop {
            let pause = {
                let mut execution = self.inner.lock();
                if target.is_some_and(|t| execution.current_time >= t) {
                    return Ok(true);
                }
                if self.stop.load(Ordering::Acquire) {
                    return Ok(false);
                }
                execution.step()?;
                self.publish(&execution);
                execution.take_pause()
            };
            if let Some(pause) = pause {
                std::thread::sleep(pause);
            }
        }
    }

    /// One paced step from the calling thread.
    pub fn step(&self) -> CosimResult<Duration> {
        let (size, pause) = {
            let mut execution = self.inner.lock();
            let size = execution.step()?;
            self.publish(&execution);
            (size, execution.take_pause())
        };
        if let Some(pause) = pause {
            std::thread::sleep(pause);
        }
        Ok(size)
    }
}
