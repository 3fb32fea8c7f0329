//! Manipulator handles, with the same capability checks as observers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

use cosim_core::{CosimError, CosimResult};
use cosim_engine::{Manipulator, OverrideManipulator, ScenarioManager};

use crate::registry::{HandleRegistry, ManipulatorHandle};

pub static MANIPULATORS: LazyLock<HandleRegistry<ManipulatorHandle, ManipulatorObject>> =
    LazyLock::new(HandleRegistry::new);

pub struct ManipulatorObject {
    manipulator: Arc<dyn Manipulator>,
    attached:    AtomicBool,
}

impl ManipulatorObject {
    pub fn new(manipulator: Arc<dyn Manipulator>) -> Self {
        Self { manipulator, attached: AtomicBool::new(false) }
    }

    pub fn attach(&self) -> CosimResult<Arc<dyn Manipulator>> {
        if self.attached.swap(true, Ordering::AcqRel) {
            return Err(CosimError::InvalidArgument(
                "the manipulator has already been added to an execution".into(),
            ));
        }
        Ok(self.manipulator.clone())
    }

    pub fn overrides(&self) -> CosimResult<&OverrideManipulator> {
        self.manipulator
            .as_override()
            .ok_or_else(|| CosimError::InvalidArgument("Invalid manipulator!".into()))
    }

    pub fn scenario_manager(&self) -> CosimResult<&ScenarioManager> {
        self.manipulator.as_scenario_manager().ok_or_else(|| {
            CosimError::InvalidArgument(
                "Invalid manipulator! The provided manipulator must be a scenario_manager.".into(),
            )
        })
    }
}
