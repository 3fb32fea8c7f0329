//! Execution lifecycle.
//!
//! States are `STOPPED` (initial), `RUNNING` and `ERROR`.  `ERROR` is
//! terminal: no operation leads out of it, only destroying the execution.
//!
//! | Operation        | From      | To on success | To on engine failure |
//! |------------------|-----------|---------------|----------------------|
//! | `step(n)`        | STOPPED   | STOPPED       | ERROR                |
//! | `simulate_until` | STOPPED   | STOPPED       | ERROR                |
//! | `start`          | STOPPED   | RUNNING       | ERROR (seen later)   |
//! | `stop`           | any       | STOPPED       | ERROR                |
//!
//! A background run's result travels over a one-shot channel.  `status`
//! polls it without blocking, `stop` waits for it; a failure found either
//! way is kept and re-raised by every later `status` and `stop`.  Panics in
//! engine calls are caught here and take the same path into `ERROR`.

use std::collections::BTreeMap;
use std::ffi::c_int;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::atomic::{AtomicI32, AtomicU8, Ordering};
use std::sync::{Arc, LazyLock};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, TryRecvError};
use parking_lot::Mutex;
use tracing::{debug, error, info};

use cosim_core::{
    CosimError, CosimResult, Errc, ModelDescription, ScalarValue, SlaveIndex, TimePoint, ValueReference,
    VariableId,
};
use cosim_engine::{ExecutionOverrides, Execution, Manipulator, Observer, SharedAlgorithm, SharedExecution};

use crate::boundary::panic_message;
use crate::registry::{ExecutionHandle, HandleRegistry};
use crate::slave::{LocalSlave, MODELS};
use crate::types::CosimExecutionStatus;

pub static EXECUTIONS: LazyLock<HandleRegistry<ExecutionHandle, ExecutionControl>> =
    LazyLock::new(HandleRegistry::new);

pub use crate::types::CosimExecutionState as ExecutionState;

/// Run an engine call, turning a panic into an `Unspecified` error so it
/// reaches the state machine like any other failure.
fn guarded<T>(f: impl FnOnce() -> CosimResult<T>) -> CosimResult<T> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| Err(CosimError::Unspecified(panic_message(payload))))
}

#[derive(Default)]
struct Worker {
    thread:   Option<JoinHandle<()>>,
    result:   Option<Receiver<CosimResult<bool>>>,
    /// Failure of a background run, once observed.
    captured: Option<CosimError>,
}

/// One execution as seen through the C surface.
pub struct ExecutionControl {
    shared:     SharedExecution,
    entities:   Mutex<BTreeMap<String, SlaveIndex>>,
    state:      AtomicU8,
    error_code: AtomicI32,
    worker:     Mutex<Worker>,
}

impl ExecutionControl {
    pub fn new(execution: Execution, entities: BTreeMap<String, SlaveIndex>) -> Self {
        info!(start = %execution.start_time(), slaves = entities.len(), "execution created");
        Self {
            shared:     SharedExecution::new(execution),
            entities:   Mutex::new(entities),
            state:      AtomicU8::new(ExecutionState::Stopped as u8),
            error_code: AtomicI32::new(Errc::Success.as_raw()),
            worker:     Mutex::new(Worker::default()),
        }
    }

    pub fn with_algorithm(start: TimePoint, algorithm: SharedAlgorithm) -> Self {
        Self::new(Execution::new(start, algorithm), BTreeMap::new())
    }

    /// Build from a system-structure file or directory.
    pub fn from_config(path: &Path, overrides: ExecutionOverrides) -> CosimResult<Self> {
        let structure = cosim_engine::load_system_structure(path)?;
        let built = cosim_engine::build_execution(&structure, &MODELS, overrides)?;
        Ok(Self::new(built.execution, built.entities))
    }

    // ── State ─────────────────────────────────────────────────────────────────

    pub fn state(&self) -> ExecutionState {
        crate::marshal::execution_state(self.state.load(Ordering::Acquire))
    }

    pub fn error_code(&self) -> Errc {
        Errc::from_raw(self.error_code.load(Ordering::Acquire)).unwrap_or(Errc::Unspecified)
    }

    fn set_state(&self, state: ExecutionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// `RUNNING` → `STOPPED`, leaving `ERROR` alone.
    fn finish_run(&self) {
        let _ = self.state.compare_exchange(
            ExecutionState::Running as u8,
            ExecutionState::Stopped as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    fn fail(&self, err: &CosimError) {
        self.set_state(ExecutionState::Error);
        self.error_code.store(err.code().as_raw(), Ordering::Release);
    }

    /// `STOPPED` → `RUNNING` for operation `op`, or the reason it may not run.
    fn begin(&self, op: &str) -> CosimResult<()> {
        match self.state.compare_exchange(
            ExecutionState::Stopped as u8,
            ExecutionState::Running as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                debug!(op, "execution running");
                Ok(())
            }
            Err(raw) if raw == ExecutionState::Running as u8 => Err(CosimError::IllegalState(format!(
                "Function '{op}' may not be called while simulation is running!"
            ))),
            Err(_) => Err(CosimError::IllegalState(format!(
                "Function '{op}' may not be called after the simulation has failed"
            ))),
        }
    }

    // ── Composition ───────────────────────────────────────────────────────────

    pub fn add_slave(&self, slave: &LocalSlave) -> CosimResult<SlaveIndex> {
        let mut entities = self.entities.lock();
        if entities.contains_key(slave.name()) {
            return Err(CosimError::InvalidArgument(format!(
                "a slave named '{}' is already part of the execution",
                slave.name()
            )));
        }
        let instance = slave.take_instance()?;
        let index = self.shared.lock().add_slave(instance, slave.name())?;
        entities.insert(slave.name().to_owned(), index);
        Ok(index)
    }

    pub fn add_observer(&self, observer: Arc<dyn Observer>) {
        self.shared.lock().add_observer(observer);
    }

    pub fn add_manipulator(&self, manipulator: Arc<dyn Manipulator>) {
        self.shared.lock().add_manipulator(manipulator);
    }

    pub fn connect(&self, source: VariableId, target: VariableId) -> CosimResult<()> {
        self.shared.lock().connect_variables(source, target)
    }

    pub fn set_initial_value(&self, slave: SlaveIndex, reference: ValueReference, value: ScalarValue) -> CosimResult<()> {
        self.shared.lock().set_initial_value(slave, reference, value)
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn current_time(&self) -> TimePoint {
        self.shared.snapshot().current_time
    }

    pub fn slave_count(&self) -> usize {
        self.entities.lock().len()
    }

    /// `(name, index)` of every slave, sorted by name.
    pub fn slave_infos(&self) -> Vec<(String, SlaveIndex)> {
        self.entities.lock().iter().map(|(name, index)| (name.clone(), *index)).collect()
    }

    pub fn model_description(&self, slave: SlaveIndex) -> CosimResult<ModelDescription> {
        self.shared.lock().model_description(slave).cloned()
    }

    pub fn modified_variables(&self) -> Vec<VariableId> {
        self.shared.lock().modified_variables()
    }

    // ── Real-time pacing ──────────────────────────────────────────────────────

    pub fn enable_real_time(&self) {
        self.shared.update(|e| e.timer_mut().enable());
    }

    pub fn disable_real_time(&self) {
        self.shared.update(|e| e.timer_mut().disable());
    }

    pub fn set_real_time_factor_target(&self, target: f64) -> CosimResult<()> {
        self.shared.update(|e| e.timer_mut().set_target(target))
    }

    pub fn set_steps_to_monitor(&self, steps: c_int) -> CosimResult<()> {
        let steps = usize::try_from(steps)
            .map_err(|_| CosimError::InvalidArgument(format!("steps to monitor must be positive, got {steps}")))?;
        self.shared.update(|e| e.timer_mut().set_steps_to_monitor(steps))
    }

    // ── Synchronous runs ──────────────────────────────────────────────────────

    /// Advance exactly `steps` steps on the calling thread.
    pub fn step(&self, steps: usize) -> CosimResult<()> {
        self.begin("cosim_execution_step")?;
        for _ in 0..steps {
            if let Err(e) = guarded(|| self.shared.step()) {
                error!(error = %e, "step failed");
                self.fail(&e);
                return Err(e);
            }
        }
        self.finish_run();
        Ok(())
    }

    /// Run on the calling thread until `target` (`Ok(true)`) or until
    /// stopped from another thread (`Ok(false)`).
    pub fn simulate_until(&self, target: TimePoint) -> CosimResult<bool> {
        self.begin("cosim_execution_simulate_until")?;
        self.shared.clear_stop();
        match guarded(|| self.shared.simulate_until(Some(target))) {
            Ok(reached) => {
                self.finish_run();
                Ok(reached)
            }
            Err(e) => {
                error!(error = %e, until = %target, "simulation failed");
                self.fail(&e);
                Err(e)
            }
        }
    }

    // ── Background runs ───────────────────────────────────────────────────────

    /// Run in a background thread until [`stop`][Self::stop].  A no-op while
    /// a background thread exists.
    pub fn start(&self) -> CosimResult<()> {
        let mut worker = self.worker.lock();
        if worker.thread.is_some() {
            return Ok(());
        }
        self.begin("cosim_execution_start")?;
        self.shared.clear_stop();

        let (tx, rx) = crossbeam_channel::bounded(1);
        let shared = self.shared.clone();
        let spawned = std::thread::Builder::new()
            .name("cosim-execution".into())
            .spawn(move || {
                let result = guarded(|| shared.simulate_until(None));
                if let Err(e) = &result {
                    error!(error = %e, "background simulation failed");
                }
                let _ = tx.send(result);
            });
        match spawned {
            Ok(thread) => {
                info!("background simulation started");
                worker.thread = Some(thread);
                worker.result = Some(rx);
                Ok(())
            }
            Err(e) => {
                let e = CosimError::from(e);
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Halt a background run, wait for it, and re-raise its failure if it
    /// had one.  Harmless when nothing runs.
    pub fn stop(&self) -> CosimResult<()> {
        self.shared.request_stop();
        let mut worker = self.worker.lock();
        if let Some(thread) = worker.thread.take() {
            if let Some(rx) = worker.result.take() {
                match rx.recv() {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => worker.captured = Some(e),
                    Err(_) => {
                        worker.captured = Some(CosimError::Unspecified(
                            "the background simulation ended without a result".into(),
                        ));
                    }
                }
            }
            if thread.join().is_err() && worker.captured.is_none() {
                worker.captured = Some(CosimError::Unspecified(
                    "the background simulation thread panicked".into(),
                ));
            }
            info!("background simulation stopped");
        }
        if let Some(e) = &worker.captured {
            self.fail(e);
            return Err(e.clone());
        }
        self.finish_run();
        Ok(())
    }

    /// Pick up a finished background result without blocking.
    fn health_check(&self, worker: &mut Worker) -> CosimResult<()> {
        let polled = worker.result.as_ref().map(Receiver::try_recv);
        match polled {
            None | Some(Err(TryRecvError::Empty)) => {}
            Some(Ok(result)) => {
                worker.result = None;
                if let Err(e) = result {
                    worker.captured = Some(e);
                }
            }
            Some(Err(TryRecvError::Disconnected)) => {
                worker.result = None;
                worker.captured = Some(CosimError::Unspecified(
                    "the background simulation ended without a result".into(),
                ));
            }
        }
        match &worker.captured {
            Some(e) => {
                self.fail(e);
                Err(e.clone())
            }
            None => Ok(()),
        }
    }

    /// Fill `out` with the current status, then report a background failure
    /// if one occurred.  `out` is filled either way.
    ///
    /// Reads the snapshot of the last completed step, so a step in progress
    /// never delays it.  While another thread is inside [`stop`][Self::stop]
    /// the background result is left for that thread to collect.
    pub fn status(&self, out: &mut CosimExecutionStatus) -> CosimResult<()> {
        let snapshot = self.shared.snapshot();
        let metrics = snapshot.metrics;
        out.current_time = snapshot.current_time.as_nanos();
        out.total_average_real_time_factor = metrics.total_average;
        out.rolling_average_real_time_factor = metrics.rolling_average;
        out.real_time_factor_target = metrics.target;
        out.is_real_time_simulation = c_int::from(metrics.enabled);
        out.steps_to_monitor = c_int::try_from(metrics.steps_to_monitor).unwrap_or(c_int::MAX);

        let health = match self.worker.try_lock() {
            Some(mut worker) => self.health_check(&mut worker),
            None => Ok(()),
        };
        out.state = self.state() as c_int;
        out.error_code = self.error_code().as_raw();
        health
    }
}

impl Drop for ExecutionControl {
    fn drop(&mut self) {
        if self.worker.get_mut().thread.is_some() {
            if let Err(e) = self.stop() {
                debug!(error = %e, "background simulation failed before the execution was released");
            }
        }
    }
}

