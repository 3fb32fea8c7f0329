//! `FileObserver`: bridges `Observer` to per-slave [`SlaveLog`]s.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use cosim_core::{Duration, SlaveIndex, StepNumber, TimePoint, VariableDescription};
use cosim_engine::{Observer, Slave};

use crate::config::LogConfig;
use crate::csv::SlaveLog;
use crate::{OutputError, OutputResult};

/// An [`Observer`] that logs slave variables to CSV files in a directory.
///
/// Errors are stored internally because observer callbacks have no return
/// value.  Check for them with [`take_error`][Self::take_error]; the first
/// one is also reported through `tracing`.
pub struct FileObserver {
    log_dir:    PathBuf,
    config:     Option<LogConfig>,
    logs:       Mutex<BTreeMap<SlaveIndex, SlaveLog>>,
    last_error: Mutex<Option<OutputError>>,
}

impl FileObserver {
    /// Log every variable of every slave into `log_dir`, created on demand.
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir:    log_dir.into(),
            config:     None,
            logs:       Mutex::new(BTreeMap::new()),
            last_error: Mutex::new(None),
        }
    }

    /// Log what the configuration file at `config_path` selects.
    pub fn with_config(log_dir: impl Into<PathBuf>, config_path: &Path) -> OutputResult<Self> {
        let mut observer = Self::new(log_dir);
        observer.config = Some(LogConfig::from_file(config_path)?);
        Ok(observer)
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Take the stored error (if any).
    ///
    /// Returns `None` if all writes succeeded.
    pub fn take_error(&self) -> Option<OutputError> {
        self.last_error.lock().take()
    }

    fn store_err(&self, result: OutputResult<()>) {
        if let Err(e) = result {
            // Keep only the first error.
            let mut last = self.last_error.lock();
            if last.is_none() {
                warn!(dir = %self.log_dir.display(), error = %e, "file observer failed");
                *last = Some(e);
            }
        }
    }

    /// Columns and decimation for a slave, or `None` if it is not logged.
    fn selection(&self, name: &str, slave: &dyn Slave) -> OutputResult<Option<(Vec<VariableDescription>, u32)>> {
        let variables = &slave.model_description().variables;
        let Some(config) = &self.config else {
            return Ok(Some((variables.clone(), 1)));
        };
        let Some(entry) = config.simulator(name) else {
            return Ok(None);
        };
        if entry.variables.is_empty() {
            return Ok(Some((variables.clone(), entry.decimation_factor)));
        }
        let columns = entry
            .variables
            .iter()
            .map(|wanted| {
                variables.iter().find(|v| &v.name == wanted).cloned().ok_or_else(|| {
                    OutputError::Config(format!("slave '{name}' has no variable '{wanted}'"))
                })
            })
            .collect::<OutputResult<Vec<_>>>()?;
        Ok(Some((columns, entry.decimation_factor)))
    }

    fn open(&self, index: SlaveIndex, name: &str, slave: &dyn Slave) -> OutputResult<()> {
        let Some((columns, decimation)) = self.selection(name, slave)? else {
            return Ok(());
        };
        std::fs::create_dir_all(&self.log_dir)?;
        let path = self.log_dir.join(format!("{name}.csv"));
        let log = SlaveLog::create(&path, columns, decimation)?;
        debug!(path = %path.display(), "slave log opened");
        self.logs.lock().insert(index, log);
        Ok(())
    }

    fn write(&self, index: SlaveIndex, step: StepNumber, time: TimePoint, slave: &dyn Slave) -> OutputResult<()> {
        match self.logs.lock().get_mut(&index) {
            Some(log) if log.wants(step) => log.write_row(step, time, slave),
            _ => Ok(()),
        }
    }
}

impl Observer for FileObserver {
    fn simulator_added(&self, index: SlaveIndex, name: &str, slave: &dyn Slave, _time: TimePoint) {
        let result = self.open(index, name, slave);
        self.store_err(result);
    }

    fn simulator_initialized(&self, index: SlaveIndex, time: TimePoint, slave: &dyn Slave) {
        let result = self.write(index, StepNumber(0), time, slave);
        self.store_err(result);
    }

    fn simulator_step_complete(
        &self,
        index: SlaveIndex,
        step:  StepNumber,
        _size: Duration,
        time:  TimePoint,
        slave: &dyn Slave,
    ) {
        let result = self.write(index, step, time, slave);
        self.store_err(result);
    }
}
