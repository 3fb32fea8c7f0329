//! `cosim-engine`: the co-simulation engine behind the cosim C API.
//!
//! An [`Execution`] owns a set of [`Slave`]s, the connections between them,
//! and an [`Algorithm`] deciding the macro step size.  [`Observer`]s read
//! values after each step; [`Manipulator`]s install value overrides before
//! each step.
//!
//! # Modules
//!
//! | Module          | Contents                                                        |
//! |-----------------|-----------------------------------------------------------------|
//! | [`slave`]       | `Slave` trait, `StepOutcome`                                    |
//! | [`models`]      | Built-in models, `ModelResolver`                                |
//! | [`algorithm`]   | `FixedStepAlgorithm`, `EccoAlgorithm`, `PowerBond`              |
//! | [`execution`]   | `Execution`, `SharedExecution`, `ExecutionSnapshot`             |
//! | [`observer`]    | `Observer` trait                                                |
//! | [`last_value`]  | `LastValueObserver`                                             |
//! | [`time_series`] | `TimeSeriesObserver`, `Sample`                                  |
//! | [`manipulator`] | `Manipulator` trait, `OverrideManipulator`                      |
//! | [`scenario`]    | `ScenarioManager` (JSON scenarios)                              |
//! | [`timer`]       | `RealTimeTimer`                                                 |
//! | [`config`]      | TOML system-structure loading                                   |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use cosim_engine::{Execution, FixedStepAlgorithm, ModelResolver, SharedExecution};
//!
//! let algorithm = Arc::new(Mutex::new(FixedStepAlgorithm::new(Duration::from_secs_f64(0.1))?));
//! let mut execution = Execution::new(TimePoint::ZERO, algorithm);
//! execution.add_slave(ModelResolver::default().resolve("builtin:identity")?, "a")?;
//! let shared = SharedExecution::new(execution);
//! shared.simulate_until(Some(TimePoint::from_secs_f64(1.0)))?;
//! ```

pub mod algorithm;
pub mod config;
pub mod execution;
pub mod last_value;
pub mod manipulator;
pub mod models;
pub mod observer;
pub mod scenario;
pub mod slave;
pub mod time_series;
pub mod timer;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use algorithm::{Algorithm, EccoAlgorithm, EccoParams, FixedStepAlgorithm, PowerBond, SharedAlgorithm};
pub use config::{BuiltSystem, ExecutionOverrides, build_execution, load_system_structure};
pub use execution::{Execution, ExecutionSnapshot, SharedExecution};
pub use last_value::LastValueObserver;
pub use manipulator::{ManipulationTarget, Manipulator, OverrideManipulator};
pub use models::{ModelResolver, SlaveFactory};
pub use observer::Observer;
pub use scenario::ScenarioManager;
pub use slave::{Slave, StepOutcome};
pub use time_series::{Sample, TimeSeriesObserver};
pub use timer::{RealTimeMetrics, RealTimeTimer};

/// Version of this engine crate as `(major, minor, patch)`.
pub fn version() -> (u32, u32, u32) {
    let part = |s: &str| s.parse().unwrap_or(0);
    (
        part(env!("CARGO_PKG_VERSION_MAJOR")),
        part(env!("CARGO_PKG_VERSION_MINOR")),
        part(env!("CARGO_PKG_VERSION_PATCH")),
    )
}
