//! Master algorithms: how large the next macro step is.
//!
//! The execution asks its algorithm for a step size before each step and
//! reports back after every slave completed it.  Algorithms are shared
//! (`Arc<Mutex<_>>`) so a caller can keep configuring one after handing it
//! to an execution, e.g. adding ECCO power bonds once slave indices exist.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use cosim_core::{CosimError, CosimResult, Duration, SlaveIndex, TimePoint, ValueReference};

/// Read access to slave outputs after a completed step.
pub trait SlaveReader {
    fn read_real(&self, slave: SlaveIndex, reference: ValueReference) -> CosimResult<f64>;
}

/// Decides the macro step size.
pub trait Algorithm: Send {
    /// Size of the next macro step.
    fn step_size(&self) -> Duration;

    /// Called once when the owning execution initializes.
    fn initialize(&mut self, _start: TimePoint) {}

    /// Called after all slaves completed a step of `step`.
    fn step_complete(&mut self, _step: Duration, _slaves: &dyn SlaveReader) -> CosimResult<()> {
        Ok(())
    }
}

/// An algorithm shared between an execution and whoever configures it.
pub type SharedAlgorithm = Arc<Mutex<dyn Algorithm>>;

// ── Fixed step ───────────────────────────────────────────────────────────────

/// Every macro step has the same length.
#[derive(Debug)]
pub struct FixedStepAlgorithm {
    step: Duration,
}

impl FixedStepAlgorithm {
    pub fn new(step: Duration) -> CosimResult<Self> {
        if !step.is_positive() {
            return Err(CosimError::InvalidArgument(format!(
                "step size must be positive, got {step}"
            )));
        }
        Ok(Self { step })
    }
}

impl Algorithm for FixedStepAlgorithm {
    fn step_size(&self) -> Duration {
        self.step
    }
}

// ── ECCO ─────────────────────────────────────────────────────────────────────

/// Tuning of the energy-conservation step-size controller.
///
/// Sizes are in seconds; rates are multiplicative bounds on how much the
/// step may change between two consecutive steps.
#[derive(Clone, Debug, PartialEq)]
pub struct EccoParams {
    pub safety_factor:   f64,
    pub step_size:       f64,
    pub min_step_size:   f64,
    pub max_step_size:   f64,
    pub min_change_rate: f64,
    pub max_change_rate: f64,
    pub abs_tolerance:   f64,
    pub rel_tolerance:   f64,
    pub p_gain:          f64,
    pub i_gain:          f64,
}

impl Default for EccoParams {
    fn default() -> Self {
        Self {
            safety_factor:   0.8,
            step_size:       1e-4,
            min_step_size:   1e-4,
            max_step_size:   0.01,
            min_change_rate: 0.2,
            max_change_rate: 1.5,
            abs_tolerance:   1e-4,
            rel_tolerance:   1e-4,
            p_gain:          0.2,
            i_gain:          0.15,
        }
    }
}

impl EccoParams {
    fn validate(&self) -> CosimResult<()> {
        let invalid = |what: &str| Err(CosimError::InvalidArgument(format!("ECCO: {what}")));
        if !(self.min_step_size > 0.0 && self.min_step_size <= self.max_step_size) {
            return invalid("step size bounds must satisfy 0 < min <= max");
        }
        if !(self.min_step_size..=self.max_step_size).contains(&self.step_size) {
            return invalid("initial step size must lie within the step size bounds");
        }
        if !(self.min_change_rate > 0.0 && self.min_change_rate <= self.max_change_rate) {
            return invalid("change rate bounds must satisfy 0 < min <= max");
        }
        if !(self.safety_factor > 0.0 && self.abs_tolerance >= 0.0 && self.rel_tolerance >= 0.0) {
            return invalid("safety factor must be positive and tolerances non-negative");
        }
        if self.abs_tolerance == 0.0 && self.rel_tolerance == 0.0 {
            return invalid("at least one tolerance must be positive");
        }
        Ok(())
    }
}

/// Two coupled ports exchanging power: each side has an output (flow or
/// effort) and an input (the conjugate variable).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PowerBond {
    pub slave_a:  SlaveIndex,
    pub output_a: ValueReference,
    pub input_a:  ValueReference,
    pub slave_b:  SlaveIndex,
    pub output_b: ValueReference,
    pub input_b:  ValueReference,
}

/// Adaptive step size from the power residual across power bonds, with a
/// PI controller on the normalized residual.
#[derive(Debug)]
pub struct EccoAlgorithm {
    params:     EccoParams,
    bonds:      Vec<PowerBond>,
    step:       f64,
    prev_error: Option<f64>,
}

impl EccoAlgorithm {
    pub fn new(params: EccoParams) -> CosimResult<Self> {
        params.validate()?;
        let step = params.step_size;
        Ok(Self { params, bonds: Vec::new(), step, prev_error: None })
    }

    pub fn add_power_bond(&mut self, bond: PowerBond) {
        self.bonds.push(bond);
    }

    pub fn power_bonds(&self) -> &[PowerBond] {
        &self.bonds
    }

    pub fn params(&self) -> &EccoParams {
        &self.params
    }

    /// Largest normalized power residual over all bonds.
    fn residual(&self, slaves: &dyn SlaveReader) -> CosimResult<f64> {
        let mut worst: f64 = 0.0;
        for bond in &self.bonds {
            let power_a = slaves.read_real(bond.slave_a, bond.output_a)?
                * slaves.read_real(bond.slave_a, bond.input_a)?;
            let power_b = slaves.read_real(bond.slave_b, bond.output_b)?
                * slaves.read_real(bond.slave_b, bond.input_b)?;
            let scale = self.params.abs_tolerance
                + self.params.rel_tolerance * power_a.abs().max(power_b.abs());
            worst = worst.max((power_a - power_b).abs() / scale);
        }
        Ok(worst)
    }
}

impl Algorithm for EccoAlgorithm {
    fn step_size(&self) -> Duration {
        Duration::from_secs_f64(self.step).max(Duration(1))
    }

    fn initialize(&mut self, _start: TimePoint) {
        self.step = self.params.step_size;
        self.prev_error = None;
    }

    fn step_complete(&mut self, _step: Duration, slaves: &dyn SlaveReader) -> CosimResult<()> {
        if self.bonds.is_empty() {
            return Ok(());
        }
        let p = &self.params;
        let error = self.residual(slaves)?;

        let rate = if error <= f64::EPSILON {
            p.max_change_rate
        } else {
            let prev = self.prev_error.unwrap_or(error).max(f64::EPSILON);
            p.safety_factor * error.powf(-p.i_gain) * (prev / error).powf(p.p_gain)
        };
        let rate = rate.clamp(p.min_change_rate, p.max_change_rate);
        self.step = (self.step * rate).clamp(p.min_step_size, p.max_step_size);
        self.prev_error = Some(error.max(f64::EPSILON));
        trace!(error, rate, step = self.step, "ecco step size adapted");
        Ok(())
    }
}
