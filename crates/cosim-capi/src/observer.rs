//! Observer handles.
//!
//! One handle type covers every observer; operations that need a specific
//! capability ask the engine observer for it and fail with
//! `InvalidArgument` when it is absent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

use cosim_core::{CosimError, CosimResult};
use cosim_engine::{LastValueObserver, Observer, TimeSeriesObserver};

use crate::registry::{HandleRegistry, ObserverHandle};

pub static OBSERVERS: LazyLock<HandleRegistry<ObserverHandle, ObserverObject>> =
    LazyLock::new(HandleRegistry::new);

pub struct ObserverObject {
    observer: Arc<dyn Observer>,
    attached: AtomicBool,
}

impl ObserverObject {
    pub fn new(observer: Arc<dyn Observer>) -> Self {
        Self { observer, attached: AtomicBool::new(false) }
    }

    /// The engine observer, marked as attached.  An observer joins at most
    /// one execution.
    pub fn attach(&self) -> CosimResult<Arc<dyn Observer>> {
        if self.attached.swap(true, Ordering::AcqRel) {
            return Err(CosimError::InvalidArgument(
                "the observer has already been added to an execution".into(),
            ));
        }
        Ok(self.observer.clone())
    }

    pub fn last_value(&self) -> CosimResult<&LastValueObserver> {
        self.observer.as_last_value().ok_or_else(|| {
            CosimError::InvalidArgument(
                "Invalid observer! The provided observer must be a last_value_observer.".into(),
            )
        })
    }

    pub fn time_series(&self) -> CosimResult<&TimeSeriesObserver> {
        self.observer.as_time_series().ok_or_else(|| {
            CosimError::InvalidArgument(
                "Invalid observer! The provided observer must be a time_series_observer.".into(),
            )
        })
    }
}
