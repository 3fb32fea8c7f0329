//! Log configuration: which slaves and variables a [`FileObserver`] writes.
//!
//! ```toml
//! [[simulators]]
//! name              = "chassis"
//! decimation_factor = 10
//! variables         = ["velocity", "force"]
//! ```
//!
//! An empty `variables` list logs every variable of the slave.  Slaves not
//! listed are not logged at all.
//!
//! [`FileObserver`]: crate::FileObserver

use std::path::Path;

use serde::Deserialize;

use crate::{OutputError, OutputResult};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub simulators: Vec<SimulatorLogConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SimulatorLogConfig {
    pub name:              String,
    #[serde(default = "default_decimation")]
    pub decimation_factor: u32,
    #[serde(default)]
    pub variables:         Vec<String>,
}

fn default_decimation() -> u32 {
    1
}

impl LogConfig {
    pub fn from_file(path: &Path) -> OutputResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: LogConfig = toml::from_str(&text)
            .map_err(|e| OutputError::Config(format!("{}: {e}", path.display())))?;
        if let Some(bad) = config.simulators.iter().find(|s| s.decimation_factor == 0) {
            return Err(OutputError::Config(format!(
                "decimation factor of '{}' must be positive",
                bad.name
            )));
        }
        Ok(config)
    }

    pub fn simulator(&self, name: &str) -> Option<&SimulatorLogConfig> {
        self.simulators.iter().find(|s| s.name == name)
    }
}
