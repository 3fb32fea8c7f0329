//! Timed scenarios: scripted overrides and resets loaded from JSON.
//!
//! ```json
//! {
//!   "description": "step the input",
//!   "events": [
//!     { "time": 1.0, "model": "slave", "variable": "realIn", "action": "override", "value": 2.5 },
//!     { "time": 3.0, "model": "slave", "variable": "realIn", "action": "reset" }
//!   ],
//!   "end": 5.0
//! }
//! ```
//!
//! Event times are seconds relative to the simulation time at which the
//! scenario was loaded.  Reaching `end` resets every variable the scenario
//! touched and finishes it.  Without `end` the scenario finishes after its
//! last event and leaves its overrides in place.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, info};

use cosim_core::{
    CosimError, CosimResult, Duration, ModelDescription, ScalarValue, SlaveIndex, TimePoint,
    VariableId,
};

use crate::config::ConfigValue;
use crate::manipulator::{ManipulationTarget, Manipulator};

// ── File format ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum EventAction {
    Override,
    Reset,
}

#[derive(Deserialize)]
struct EventSpec {
    time:     f64,
    model:    String,
    variable: String,
    action:   EventAction,
    #[serde(default)]
    value:    Option<ConfigValue>,
}

#[derive(Deserialize)]
struct ScenarioFile {
    #[serde(default)]
    description: String,
    events:      Vec<EventSpec>,
    #[serde(default)]
    end:         Option<f64>,
}

// ── Runtime state ────────────────────────────────────────────────────────────

struct Event {
    offset:   Duration,
    variable: VariableId,
    value:    Option<ScalarValue>,
}

struct ActiveScenario {
    start:    TimePoint,
    end:      Option<Duration>,
    events:   Vec<Event>,
    next:     usize,
    modified: BTreeSet<VariableId>,
}

#[derive(Default)]
struct ScenarioState {
    simulators:     BTreeMap<String, (SlaveIndex, ModelDescription)>,
    active:         Option<ActiveScenario>,
    pending_resets: BTreeSet<VariableId>,
}

impl ScenarioState {
    fn resolve(&self, spec: EventSpec) -> CosimResult<Event> {
        let (index, model) = self
            .simulators
            .get(&spec.model)
            .ok_or_else(|| CosimError::InvalidArgument(format!("scenario refers to unknown model '{}'", spec.model)))?;
        let desc = model.find_by_name(&spec.variable).ok_or_else(|| {
            CosimError::InvalidArgument(format!(
                "scenario refers to unknown variable '{}' of model '{}'",
                spec.variable, spec.model
            ))
        })?;
        let value = match spec.action {
            EventAction::Override => {
                let raw = spec.value.ok_or_else(|| {
                    CosimError::BadFile(format!("override of '{}.{}' has no value", spec.model, spec.variable))
                })?;
                Some(raw.to_scalar(desc.kind)?)
            }
            EventAction::Reset => None,
        };
        if !(spec.time.is_finite() && spec.time >= 0.0) {
            return Err(CosimError::BadFile(format!("invalid event time {}", spec.time)));
        }
        Ok(Event {
            offset:   Duration::from_secs_f64(spec.time),
            variable: VariableId::new(*index, desc.kind, desc.reference),
            value,
        })
    }
}

/// Manipulator that runs at most one scenario at a time.
#[derive(Default)]
pub struct ScenarioManager {
    state: Mutex<ScenarioState>,
}

impl ScenarioManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and start the scenario in `path`, replacing any running one.
    /// Event times count from `now`, the execution's current time.
    pub fn load_scenario(&self, path: &Path, now: TimePoint) -> CosimResult<()> {
        let text = std::fs::read_to_string(path)?;
        let file: ScenarioFile = serde_json::from_str(&text)
            .map_err(|e| CosimError::BadFile(format!("{}: {e}", path.display())))?;

        let mut state = self.state.lock();
        let mut events = file
            .events
            .into_iter()
            .map(|spec| state.resolve(spec))
            .collect::<CosimResult<Vec<_>>>()?;
        events.sort_by_key(|e| e.offset);

        let end = match file.end {
            Some(secs) if !(secs.is_finite() && secs >= 0.0) => {
                return Err(CosimError::BadFile(format!("invalid scenario end {secs}")));
            }
            other => other.map(Duration::from_secs_f64),
        };

        if let Some(previous) = state.active.take() {
            state.pending_resets.extend(previous.modified);
        }
        info!(path = %path.display(), description = %file.description, events = events.len(), "scenario loaded");
        state.active = Some(ActiveScenario {
            start: now,
            end,
            events,
            next: 0,
            modified: BTreeSet::new(),
        });
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().active.is_some()
    }

    /// Stop the running scenario; its overrides are cleared at the next step.
    pub fn abort(&self) {
        let mut state = self.state.lock();
        if let Some(active) = state.active.take() {
            debug!("scenario aborted");
            state.pending_resets.extend(active.modified);
        }
    }
}

impl Manipulator for ScenarioManager {
    fn simulator_added(&self, index: SlaveIndex, name: &str, model: &ModelDescription, _time: TimePoint) {
        self.state.lock().simulators.insert(name.to_owned(), (index, model.clone()));
    }

    fn step_commencing(&self, time: TimePoint, target: &mut dyn ManipulationTarget) -> CosimResult<()> {
        let mut state = self.state.lock();
        for variable in std::mem::take(&mut state.pending_resets) {
            target.clear_modifier(variable)?;
        }

        let Some(active) = state.active.as_mut() else {
            return Ok(());
        };
        let elapsed = time - active.start;
        while let Some(event) = active.events.get(active.next).filter(|e| e.offset <= elapsed) {
            match &event.value {
                Some(value) => {
                    target.set_modifier(event.variable, value.clone())?;
                    active.modified.insert(event.variable);
                }
                None => {
                    target.clear_modifier(event.variable)?;
                    active.modified.remove(&event.variable);
                }
            }
            active.next += 1;
        }

        let finished = match active.end {
            Some(end) => elapsed >= end,
            None => active.next == active.events.len(),
        };
        if finished {
            if active.end.is_some() {
                for variable in std::mem::take(&mut active.modified) {
                    target.clear_modifier(variable)?;
                }
            }
            state.active = None;
            debug!(%time, "scenario finished");
        }
        Ok(())
    }

    fn as_scenario_manager(&self) -> Option<&ScenarioManager> {
        Some(self)
    }
}
