//! The `Slave` trait: one model instance taking part in a co-simulation.

use cosim_core::{
    CosimError, CosimResult, Duration, ModelDescription, ScalarValue, TimePoint, ValueReference,
    VariableType,
};

/// Result of asking a slave to advance one macro step.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum StepOutcome {
    /// The slave reached `current + step`.
    Complete,
    /// The slave refused the step because it was too long; its state is
    /// unchanged.
    Discarded,
}

/// A model instance driven by an execution.
///
/// Getters take `&self` so observers can read values through a shared
/// reference while the execution owns the instance.  Batch getters fill
/// `out` element-wise and must fail, without partial effects visible to the
/// caller's logic, when a reference is unknown.
pub trait Slave: Send {
    fn model_description(&self) -> &ModelDescription;

    /// Called once before the first step.
    fn setup(&mut self, _start: TimePoint, _stop: Option<TimePoint>) -> CosimResult<()> {
        Ok(())
    }

    /// Called after initial values are applied and before the first step.
    fn start_simulation(&mut self) -> CosimResult<()> {
        Ok(())
    }

    fn end_simulation(&mut self) -> CosimResult<()> {
        Ok(())
    }

    fn do_step(&mut self, current: TimePoint, step: Duration) -> CosimResult<StepOutcome>;

    fn get_real(&self, refs: &[ValueReference], out: &mut [f64]) -> CosimResult<()>;
    fn get_integer(&self, refs: &[ValueReference], out: &mut [i32]) -> CosimResult<()>;
    fn get_boolean(&self, refs: &[ValueReference], out: &mut [bool]) -> CosimResult<()>;
    fn get_string(&self, refs: &[ValueReference], out: &mut [String]) -> CosimResult<()>;

    fn set_real(&mut self, refs: &[ValueReference], values: &[f64]) -> CosimResult<()>;
    fn set_integer(&mut self, refs: &[ValueReference], values: &[i32]) -> CosimResult<()>;
    fn set_boolean(&mut self, refs: &[ValueReference], values: &[bool]) -> CosimResult<()>;
    fn set_string(&mut self, refs: &[ValueReference], values: &[String]) -> CosimResult<()>;

    /// Read one variable as a kind-tagged value.
    fn get_value(&self, kind: VariableType, reference: ValueReference) -> CosimResult<ScalarValue> {
        let refs = [reference];
        Ok(match kind {
            VariableType::Real => {
                let mut v = [0.0];
                self.get_real(&refs, &mut v)?;
                ScalarValue::Real(v[0])
            }
            VariableType::Integer => {
                let mut v = [0];
                self.get_integer(&refs, &mut v)?;
                ScalarValue::Integer(v[0])
            }
            VariableType::Boolean => {
                let mut v = [false];
                self.get_boolean(&refs, &mut v)?;
                ScalarValue::Boolean(v[0])
            }
            VariableType::String => {
                let mut v = [String::new()];
                self.get_string(&refs, &mut v)?;
                ScalarValue::String(std::mem::take(&mut v[0]))
            }
        })
    }

    /// Write one kind-tagged value.
    fn set_value(&mut self, reference: ValueReference, value: &ScalarValue) -> CosimResult<()> {
        let refs = [reference];
        match value {
            ScalarValue::Real(v)    => self.set_real(&refs, &[*v]),
            ScalarValue::Integer(v) => self.set_integer(&refs, &[*v]),
            ScalarValue::Boolean(v) => self.set_boolean(&refs, &[*v]),
            ScalarValue::String(v)  => self.set_string(&refs, std::slice::from_ref(v)),
        }
    }
}

/// Fail unless `refs` and the value buffer have the same length.
pub fn check_lengths(refs: usize, values: usize) -> CosimResult<()> {
    if refs == values {
        Ok(())
    } else {
        Err(CosimError::InvalidArgument(format!(
            "{refs} value references but {values} values"
        )))
    }
}
