//! Manipulator trait and the override manipulator.
//!
//! A manipulator acts on the execution right before each step by installing
//! or clearing *modifiers*: persistent value overrides that take priority
//! over connections until cleared.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use cosim_core::{
    CosimError, CosimResult, ModelDescription, ScalarValue, SlaveIndex, TimePoint, ValueReference,
    VariableId, VariableType,
};

use crate::scenario::ScenarioManager;

/// What a manipulator may do to the execution.
pub trait ManipulationTarget {
    /// Install (or replace) a modifier.
    fn set_modifier(&mut self, variable: VariableId, value: ScalarValue) -> CosimResult<()>;

    /// Remove a modifier; the variable reverts to normal data flow.
    fn clear_modifier(&mut self, variable: VariableId) -> CosimResult<()>;
}

/// Callbacks through which a manipulator acts on an execution.
///
/// As with observers, methods take `&self` and the `as_*` accessors form the
/// capability query.
pub trait Manipulator: Send + Sync {
    fn simulator_added(&self, _index: SlaveIndex, _name: &str, _model: &ModelDescription, _time: TimePoint) {}

    /// Called before every step; `time` is the step's start time.
    fn step_commencing(&self, time: TimePoint, target: &mut dyn ManipulationTarget) -> CosimResult<()>;

    fn as_override(&self) -> Option<&OverrideManipulator> {
        None
    }

    fn as_scenario_manager(&self) -> Option<&ScenarioManager> {
        None
    }
}

// ── OverrideManipulator ──────────────────────────────────────────────────────

enum Action {
    Set(VariableId, ScalarValue),
    Reset(VariableId),
}

impl Action {
    fn variable(&self) -> VariableId {
        match self {
            Action::Set(variable, _) | Action::Reset(variable) => *variable,
        }
    }
}

#[derive(Default)]
struct OverrideState {
    models:  BTreeMap<SlaveIndex, ModelDescription>,
    pending: Vec<Action>,
}

/// Queues value overrides and resets from the caller and applies them at
/// the start of the next step.
#[derive(Default)]
pub struct OverrideManipulator {
    state: Mutex<OverrideState>,
}

impl OverrideManipulator {
    pub fn new() -> Self {
        Self::default()
    }

    fn validate(state: &OverrideState, variable: VariableId) -> CosimResult<()> {
        let model = state
            .models
            .get(&variable.slave)
            .ok_or_else(|| CosimError::OutOfRange(format!("{} is not known to this manipulator", variable.slave)))?;
        if model.find_by_reference(variable.kind, variable.reference).is_none() {
            return Err(CosimError::InvalidArgument(format!("{variable} does not exist")));
        }
        Ok(())
    }

    /// Override a variable with `value` from the next step on.
    pub fn override_value(&self, slave: SlaveIndex, reference: ValueReference, value: ScalarValue) -> CosimResult<()> {
        self.override_values(slave, vec![(reference, value)])
    }

    /// Override several variables of one slave.  Either every variable is
    /// queued or, if any of them is invalid, none is.
    pub fn override_values(&self, slave: SlaveIndex, values: Vec<(ValueReference, ScalarValue)>) -> CosimResult<()> {
        let actions = values
            .into_iter()
            .map(|(reference, value)| Action::Set(VariableId::new(slave, value.kind(), reference), value));
        self.queue(actions)
    }

    /// Clear an override from the next step on.
    pub fn reset(&self, slave: SlaveIndex, kind: VariableType, reference: ValueReference) -> CosimResult<()> {
        self.reset_values(slave, kind, &[reference])
    }

    /// Clear overrides of several variables of one slave, all or none.
    pub fn reset_values(&self, slave: SlaveIndex, kind: VariableType, references: &[ValueReference]) -> CosimResult<()> {
        self.queue(references.iter().map(|&reference| Action::Reset(VariableId::new(slave, kind, reference))))
    }

    fn queue(&self, actions: impl IntoIterator<Item = Action>) -> CosimResult<()> {
        let actions: Vec<Action> = actions.into_iter().collect();
        let mut state = self.state.lock();
        for action in &actions {
            Self::validate(&state, action.variable())?;
        }
        state.pending.extend(actions);
        Ok(())
    }
}

impl Manipulator for OverrideManipulator {
    fn simulator_added(&self, index: SlaveIndex, _name: &str, model: &ModelDescription, _time: TimePoint) {
        self.state.lock().models.insert(index, model.clone());
    }

    fn step_commencing(&self, _time: TimePoint, target: &mut dyn ManipulationTarget) -> CosimResult<()> {
        let actions = std::mem::take(&mut self.state.lock().pending);
        for action in actions {
            match action {
                Action::Set(variable, value) => target.set_modifier(variable, value)?,
                Action::Reset(variable) => target.clear_modifier(variable)?,
            }
        }
        Ok(())
    }

    fn as_override(&self) -> Option<&OverrideManipulator> {
        Some(self)
    }
}
