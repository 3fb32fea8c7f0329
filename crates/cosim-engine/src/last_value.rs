//! `LastValueObserver`: keeps the most recent value of every variable.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use tracing::warn;

use cosim_core::{
    CosimError, CosimResult, Duration, SlaveIndex, StepNumber, TimePoint, ValueReference,
    VariableType,
};

use crate::observer::Observer;
use crate::slave::Slave;

/// Snapshot of one slave's variables, keyed by reference per kind.
#[derive(Default)]
struct Snapshot {
    reals:    BTreeMap<ValueReference, f64>,
    integers: BTreeMap<ValueReference, i32>,
    booleans: BTreeMap<ValueReference, bool>,
    strings:  BTreeMap<ValueReference, String>,
}

impl Snapshot {
    fn capture(slave: &dyn Slave) -> CosimResult<Self> {
        let model = slave.model_description();
        let mut snap = Snapshot::default();

        let refs = model.references(VariableType::Real);
        let mut reals = vec![0.0; refs.len()];
        slave.get_real(&refs, &mut reals)?;
        snap.reals = refs.into_iter().zip(reals).collect();

        let refs = model.references(VariableType::Integer);
        let mut integers = vec![0; refs.len()];
        slave.get_integer(&refs, &mut integers)?;
        snap.integers = refs.into_iter().zip(integers).collect();

        let refs = model.references(VariableType::Boolean);
        let mut booleans = vec![false; refs.len()];
        slave.get_boolean(&refs, &mut booleans)?;
        snap.booleans = refs.into_iter().zip(booleans).collect();

        let refs = model.references(VariableType::String);
        let mut strings = vec![String::new(); refs.len()];
        slave.get_string(&refs, &mut strings)?;
        snap.strings = refs.into_iter().zip(strings).collect();

        Ok(snap)
    }
}

fn lookup<T: Clone>(
    map:  &BTreeMap<ValueReference, T>,
    kind: VariableType,
    refs: &[ValueReference],
    out:  &mut [T],
) -> CosimResult<()> {
    for (slot, vr) in out.iter_mut().zip(refs) {
        *slot = map.get(vr).cloned().ok_or_else(|| {
            CosimError::OutOfRange(format!("no {kind} variable with value reference {}", vr.0))
        })?;
    }
    Ok(())
}

/// Observer answering "what is the value of this variable right now".
///
/// Values are refreshed when a slave is added, after initialization, and
/// after every step, so a query before the first step returns the slave's
/// initial values.
#[derive(Default)]
pub struct LastValueObserver {
    slaves: Mutex<BTreeMap<SlaveIndex, Snapshot>>,
}

impl LastValueObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn refresh(&self, index: SlaveIndex, slave: &dyn Slave) {
        match Snapshot::capture(slave) {
            Ok(snap) => {
                self.slaves.lock().insert(index, snap);
            }
            Err(e) => warn!(%index, error = %e, "last-value observer could not read slave"),
        }
    }

    fn with_snapshot<R>(
        &self,
        slave: SlaveIndex,
        f:     impl FnOnce(&Snapshot) -> CosimResult<R>,
    ) -> CosimResult<R> {
        let slaves = self.slaves.lock();
        let snap = slaves
            .get(&slave)
            .ok_or_else(|| CosimError::OutOfRange(format!("{slave} is not observed")))?;
        f(snap)
    }

    pub fn get_real(&self, slave: SlaveIndex, refs: &[ValueReference], out: &mut [f64]) -> CosimResult<()> {
        self.with_snapshot(slave, |s| lookup(&s.reals, VariableType::Real, refs, out))
    }

    pub fn get_integer(&self, slave: SlaveIndex, refs: &[ValueReference], out: &mut [i32]) -> CosimResult<()> {
        self.with_snapshot(slave, |s| lookup(&s.integers, VariableType::Integer, refs, out))
    }

    pub fn get_boolean(&self, slave: SlaveIndex, refs: &[ValueReference], out: &mut [bool]) -> CosimResult<()> {
        self.with_snapshot(slave, |s| lookup(&s.booleans, VariableType::Boolean, refs, out))
    }

    pub fn get_string(&self, slave: SlaveIndex, refs: &[ValueReference], out: &mut [String]) -> CosimResult<()> {
        self.with_snapshot(slave, |s| lookup(&s.strings, VariableType::String, refs, out))
    }
}

impl Observer for LastValueObserver {
    fn simulator_added(&self, index: SlaveIndex, _name: &str, slave: &dyn Slave, _time: TimePoint) {
        self.refresh(index, slave);
    }

    fn simulator_initialized(&self, index: SlaveIndex, _time: TimePoint, slave: &dyn Slave) {
        self.refresh(index, slave);
    }

    fn simulator_step_complete(
        &self,
        index: SlaveIndex,
        _step: StepNumber,
        _size: Duration,
        _time: TimePoint,
        slave: &dyn Slave,
    ) {
        self.refresh(index, slave);
    }

    fn as_last_value(&self) -> Option<&LastValueObserver> {
        Some(self)
    }
}
