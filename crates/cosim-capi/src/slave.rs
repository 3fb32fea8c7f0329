//! Slave handles: a model instance waiting to be added to an execution.

use std::sync::LazyLock;

use parking_lot::Mutex;
use tracing::debug;

use cosim_core::{CosimError, CosimResult, ModelDescription};
use cosim_engine::{ModelResolver, Slave};

use crate::registry::{HandleRegistry, SlaveHandle};

pub static SLAVES: LazyLock<HandleRegistry<SlaveHandle, LocalSlave>> = LazyLock::new(HandleRegistry::new);

/// Resolves the model URIs given to `cosim_local_slave_create`.
pub static MODELS: LazyLock<ModelResolver> = LazyLock::new(ModelResolver::default);

/// A named model instance.  The instance itself moves into the execution it
/// is added to; the handle then only remembers the name.
pub struct LocalSlave {
    name:     String,
    source:   String,
    instance: Mutex<Option<Box<dyn Slave>>>,
}

impl LocalSlave {
    pub fn create(source: &str, name: &str) -> CosimResult<Self> {
        let instance = MODELS.resolve(source)?;
        debug!(name, source, "slave instantiated");
        Ok(Self {
            name:     name.to_owned(),
            source:   source.to_owned(),
            instance: Mutex::new(Some(instance)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Description of the instance, or `None` once it has been added.
    pub fn model_description(&self) -> Option<ModelDescription> {
        self.instance.lock().as_ref().map(|s| s.model_description().clone())
    }

    /// Move the instance out, for adding to an execution.
    pub fn take_instance(&self) -> CosimResult<Box<dyn Slave>> {
        self.instance.lock().take().ok_or_else(|| {
            CosimError::InvalidArgument(format!("slave '{}' has already been added to an execution", self.name))
        })
    }
}
