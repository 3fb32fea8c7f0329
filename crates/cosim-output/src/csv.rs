//! CSV log of one slave.

use std::fs::File;
use std::path::Path;

use csv::Writer;

use cosim_core::{StepNumber, TimePoint, VariableDescription};
use cosim_engine::Slave;

use crate::OutputResult;

/// Writes the selected variables of one slave, one row per logged step.
pub struct SlaveLog {
    writer:     Writer<File>,
    columns:    Vec<VariableDescription>,
    decimation: u32,
}

impl SlaveLog {
    /// Create (or truncate) `path` and write the header row.
    pub fn create(path: &Path, columns: Vec<VariableDescription>, decimation: u32) -> OutputResult<Self> {
        let mut writer = Writer::from_path(path)?;
        let mut header = vec!["Time".to_owned(), "StepCount".to_owned()];
        header.extend(columns.iter().map(|c| c.name.clone()));
        writer.write_record(&header)?;
        writer.flush()?;
        Ok(Self { writer, columns, decimation: decimation.max(1) })
    }

    /// Whether `step` falls on the decimation grid.
    pub fn wants(&self, step: StepNumber) -> bool {
        step.0 % i64::from(self.decimation) == 0
    }

    pub fn write_row(&mut self, step: StepNumber, time: TimePoint, slave: &dyn Slave) -> OutputResult<()> {
        let mut record = Vec::with_capacity(self.columns.len() + 2);
        record.push(time.as_secs_f64().to_string());
        record.push(step.0.to_string());
        for column in &self.columns {
            record.push(slave.get_value(column.kind, column.reference)?.to_string());
        }
        self.writer.write_record(&record)?;
        self.writer.flush()?;
        Ok(())
    }
}
