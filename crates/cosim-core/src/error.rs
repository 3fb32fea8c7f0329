//! Error taxonomy shared by every `cosim-*` crate.
//!
//! [`Errc`] is the closed, C-visible set of error categories.  [`CosimError`]
//! is the Rust error that flows through the engine and the control layer;
//! every variant belongs to exactly one category via [`CosimError::code`].

use std::fmt;

use thiserror::Error;

/// Error categories with their stable numeric codes.
#[repr(i32)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum Errc {
    #[default]
    Success            = 0,
    Unspecified        = 1,
    Errno              = 2,
    InvalidArgument    = 3,
    IllegalState       = 4,
    OutOfRange         = 5,
    StepTooLong        = 6,
    BadFile            = 7,
    UnsupportedFeature = 8,
    DlLoadError        = 9,
    ModelError         = 10,
    SimulationError    = 11,
    ZipError           = 12,
}

impl Errc {
    /// Every category, in code order.
    pub const ALL: [Errc; 13] = [
        Errc::Success,
        Errc::Unspecified,
        Errc::Errno,
        Errc::InvalidArgument,
        Errc::IllegalState,
        Errc::OutOfRange,
        Errc::StepTooLong,
        Errc::BadFile,
        Errc::UnsupportedFeature,
        Errc::DlLoadError,
        Errc::ModelError,
        Errc::SimulationError,
        Errc::ZipError,
    ];

    #[inline]
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    pub fn from_raw(raw: i32) -> Option<Errc> {
        Errc::ALL.get(usize::try_from(raw).ok()?).copied()
    }
}

impl fmt::Display for Errc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Errc::Success            => "success",
            Errc::Unspecified        => "unspecified error",
            Errc::Errno              => "system error",
            Errc::InvalidArgument    => "invalid argument",
            Errc::IllegalState       => "illegal state",
            Errc::OutOfRange         => "out of range",
            Errc::StepTooLong        => "step too long",
            Errc::BadFile            => "bad file",
            Errc::UnsupportedFeature => "unsupported feature",
            Errc::DlLoadError        => "dynamic library load error",
            Errc::ModelError         => "model error",
            Errc::SimulationError    => "simulation error",
            Errc::ZipError           => "archive error",
        })
    }
}

// ── CosimError ───────────────────────────────────────────────────────────────

/// The error type of the engine and the control layer.
///
/// `Clone` so a failure captured on a background thread can be re-raised on
/// every subsequent status query.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CosimError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    IllegalState(String),

    #[error("{0}")]
    OutOfRange(String),

    #[error("{0}")]
    StepTooLong(String),

    #[error("{0}")]
    BadFile(String),

    #[error("{0}")]
    UnsupportedFeature(String),

    #[error("{0}")]
    DlLoad(String),

    #[error("{0}")]
    Model(String),

    #[error("{0}")]
    Simulation(String),

    #[error("{0}")]
    Archive(String),

    /// Host runtime failure carrying the OS error number, if there was one.
    #[error("{message}")]
    Io { os_code: Option<i32>, message: String },

    #[error("{0}")]
    Unspecified(String),
}

impl CosimError {
    /// The category this error reports through the C surface.
    pub fn code(&self) -> Errc {
        match self {
            CosimError::InvalidArgument(_)    => Errc::InvalidArgument,
            CosimError::IllegalState(_)       => Errc::IllegalState,
            CosimError::OutOfRange(_)         => Errc::OutOfRange,
            CosimError::StepTooLong(_)        => Errc::StepTooLong,
            CosimError::BadFile(_)            => Errc::BadFile,
            CosimError::UnsupportedFeature(_) => Errc::UnsupportedFeature,
            CosimError::DlLoad(_)             => Errc::DlLoadError,
            CosimError::Model(_)              => Errc::ModelError,
            CosimError::Simulation(_)         => Errc::SimulationError,
            CosimError::Archive(_)            => Errc::ZipError,
            CosimError::Io { .. }             => Errc::Errno,
            CosimError::Unspecified(_)        => Errc::Unspecified,
        }
    }

    /// OS error number for host-runtime failures.
    pub fn os_code(&self) -> Option<i32> {
        match self {
            CosimError::Io { os_code, .. } => *os_code,
            _ => None,
        }
    }

    /// Re-wrap a slave failure raised while stepping as a simulation error,
    /// keeping failures that already carry a more specific category.
    pub fn into_simulation_error(self, context: &str) -> CosimError {
        match self {
            CosimError::Model(msg) | CosimError::Unspecified(msg) => {
                CosimError::Simulation(format!("{context}: {msg}"))
            }
            other => other,
        }
    }
}

impl From<std::io::Error> for CosimError {
    fn from(e: std::io::Error) -> Self {
        CosimError::Io {
            os_code: e.raw_os_error(),
            message: e.to_string(),
        }
    }
}

/// Shorthand result type for all `cosim-*` crates.
pub type CosimResult<T> = Result<T, CosimError>;
