//! Error types for cosim-output.

use thiserror::Error;

use cosim_core::CosimError;

/// Errors that can occur when writing log files.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("log configuration error: {0}")]
    Config(String),

    #[error("could not read slave values: {0}")]
    Slave(#[from] CosimError),
}

/// Alias for `Result<T, OutputError>`.
pub type OutputResult<T> = Result<T, OutputError>;

impl From<OutputError> for CosimError {
    fn from(e: OutputError) -> Self {
        match e {
            OutputError::Io(io) => io.into(),
            OutputError::Config(msg) => CosimError::BadFile(msg),
            OutputError::Slave(e) => e,
            OutputError::Csv(csv) => CosimError::Io { os_code: None, message: csv.to_string() },
        }
    }
}
