//! `cosim-output`: file logging for cosim executions.
//!
//! [`FileObserver`] implements `cosim_engine::Observer` and writes one CSV
//! file per slave into a log directory:
//!
//! | Column      | Contents                                   |
//! |-------------|--------------------------------------------|
//! | `Time`      | Simulation time in seconds                 |
//! | `StepCount` | Step number (0 for the initial row)        |
//! | *variable*  | One column per logged variable, by name    |
//!
//! A [`LogConfig`] (TOML) restricts which slaves and variables are logged
//! and how often.
//!
//! # Usage
//!
//! ```rust,ignore
//! use cosim_output::FileObserver;
//!
//! let observer = Arc::new(FileObserver::new("./logs"));
//! execution.add_observer(observer.clone());
//! shared.simulate_until(Some(end))?;
//! observer.take_error().map(|e| eprintln!("logging error: {e}"));
//! ```

pub mod config;
pub mod csv;
pub mod error;
pub mod observer;


pub use config::{LogConfig, SimulatorLogConfig};
pub use csv::SlaveLog;
pub use error::{OutputError, OutputResult};
pub use observer::FileObserver;
