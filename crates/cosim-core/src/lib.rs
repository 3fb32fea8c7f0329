//! `cosim-core`: foundational types for the cosim co-simulation library.
//!
//! Every other `cosim-*` crate depends on this one.  It has no `cosim-*`
//! dependencies and a single external one (`thiserror`, plus optional
//! `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                                   |
//! |-----------------|------------------------------------------------------------|
//! | [`ids`]         | `SlaveIndex`, `ValueReference`, `StepNumber`, `VariableId` |
//! | [`time`]        | `TimePoint`, `Duration` (integer nanoseconds)              |
//! | [`variable`]    | `VariableType`, `Causality`, `Variability`, descriptions   |
//! | [`error`]       | `Errc`, `CosimError`, `CosimResult`                        |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to the value types.         |

pub mod error;
pub mod ids;
pub mod time;
pub mod variable;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CosimError, CosimResult, Errc};
pub use ids::{SlaveIndex, StepNumber, ValueReference, VariableId};
pub use time::{Duration, TimePoint};
pub use variable::{
    Causality, ModelDescription, ScalarValue, Variability, VariableDescription, VariableType,
};
