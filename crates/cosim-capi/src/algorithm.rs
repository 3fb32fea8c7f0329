//! Algorithm handles.  The algorithm stays shared with every execution
//! created from it, so power bonds may be added afterwards.

use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;

use cosim_core::{CosimError, CosimResult};
use cosim_engine::{EccoAlgorithm, FixedStepAlgorithm, SharedAlgorithm};

use crate::registry::{AlgorithmHandle, HandleRegistry};

pub static ALGORITHMS: LazyLock<HandleRegistry<AlgorithmHandle, AlgorithmObject>> =
    LazyLock::new(HandleRegistry::new);

pub enum AlgorithmObject {
    FixedStep(Arc<Mutex<FixedStepAlgorithm>>),
    Ecco(Arc<Mutex<EccoAlgorithm>>),
}

impl AlgorithmObject {
    pub fn shared(&self) -> SharedAlgorithm {
        match self {
            AlgorithmObject::FixedStep(algo) => algo.clone(),
            AlgorithmObject::Ecco(algo) => algo.clone(),
        }
    }

    pub fn ecco(&self) -> CosimResult<&Arc<Mutex<EccoAlgorithm>>> {
        match self {
            AlgorithmObject::Ecco(algo) => Ok(algo),
            AlgorithmObject::FixedStep(_) => Err(CosimError::InvalidArgument(
                "Invalid algorithm! The provided algorithm must be an ecco_algorithm.".into(),
            )),
        }
    }
}
