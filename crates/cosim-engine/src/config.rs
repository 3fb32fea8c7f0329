//! System-structure files: a whole execution described in TOML.
//!
//! ```toml
//! start_time = 0.0
//!
//! [algorithm]
//! type      = "fixed_step"
//! step_size = 0.1
//!
//! [[simulators]]
//! name   = "a"
//! source = "builtin:identity"
//! initial_values = { realIn = 1.5 }
//!
//! [[simulators]]
//! name   = "b"
//! source = "builtin:identity"
//!
//! [[connections]]
//! source = "a.realOut"
//! target = "b.realIn"
//! ```
//!
//! An `ecco` algorithm takes the [`EccoParams`] fields (all optional) plus
//! `power_bonds`, each naming `a_output`, `a_input`, `b_output`, `b_input`
//! as `"slave.variable"`.
//!
//! A path may name the file itself or a directory holding
//! [`SYSTEM_STRUCTURE_FILE`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use tracing::info;

use cosim_core::{
    CosimError, CosimResult, Duration, ScalarValue, SlaveIndex, TimePoint, VariableId, VariableType,
};

use crate::algorithm::{EccoAlgorithm, EccoParams, FixedStepAlgorithm, PowerBond, SharedAlgorithm};
use crate::execution::Execution;
use crate::models::ModelResolver;

/// File looked up when a system-structure path names a directory.
pub const SYSTEM_STRUCTURE_FILE: &str = "SystemStructure.toml";

// ── Values ───────────────────────────────────────────────────────────────────

/// A literal value in a configuration or scenario file, converted to the
/// target variable's kind on use.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(String),
}

impl ConfigValue {
    pub fn to_scalar(&self, kind: VariableType) -> CosimResult<ScalarValue> {
        let mismatch = || CosimError::BadFile(format!("value {self:?} does not fit a {kind} variable"));
        Ok(match (kind, self) {
            (VariableType::Real, ConfigValue::Real(v))          => ScalarValue::Real(*v),
            (VariableType::Real, ConfigValue::Integer(v))       => ScalarValue::Real(*v as f64),
            (VariableType::Integer, ConfigValue::Integer(v))    => {
                ScalarValue::Integer(i32::try_from(*v).map_err(|_| mismatch())?)
            }
            (VariableType::Boolean, ConfigValue::Boolean(v))    => ScalarValue::Boolean(*v),
            (VariableType::String, ConfigValue::String(v))      => ScalarValue::String(v.clone()),
            _ => return Err(mismatch()),
        })
    }
}

// ── File format ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Deserialize)]
pub struct SystemStructure {
    #[serde(default)]
    pub start_time:  Option<f64>,
    #[serde(default)]
    pub algorithm:   Option<AlgorithmConfig>,
    #[serde(default)]
    pub simulators:  Vec<SimulatorConfig>,
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlgorithmConfig {
    FixedStep {
        step_size: f64,
    },
    Ecco {
        #[serde(default)]
        safety_factor:   Option<f64>,
        #[serde(default)]
        step_size:       Option<f64>,
        #[serde(default)]
        min_step_size:   Option<f64>,
        #[serde(default)]
        max_step_size:   Option<f64>,
        #[serde(default)]
        min_change_rate: Option<f64>,
        #[serde(default)]
        max_change_rate: Option<f64>,
        #[serde(default)]
        abs_tolerance:   Option<f64>,
        #[serde(default)]
        rel_tolerance:   Option<f64>,
        #[serde(default)]
        p_gain:          Option<f64>,
        #[serde(default)]
        i_gain:          Option<f64>,
        #[serde(default)]
        power_bonds:     Vec<PowerBondConfig>,
    },
}

#[derive(Clone, Debug, Deserialize)]
pub struct SimulatorConfig {
    pub name:           String,
    pub source:         String,
    #[serde(default)]
    pub initial_values: BTreeMap<String, ConfigValue>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ConnectionConfig {
    pub source: String,
    pub target: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PowerBondConfig {
    pub a_output: String,
    pub a_input:  String,
    pub b_output: String,
    pub b_input:  String,
}

/// Read and parse a system-structure file (or directory).
pub fn load_system_structure(path: &Path) -> CosimResult<SystemStructure> {
    let file: PathBuf = if path.is_dir() {
        path.join(SYSTEM_STRUCTURE_FILE)
    } else {
        path.to_path_buf()
    };
    let text = std::fs::read_to_string(&file)?;
    toml::from_str(&text).map_err(|e| CosimError::BadFile(format!("{}: {e}", file.display())))
}

// ── Building ─────────────────────────────────────────────────────────────────

/// Caller-supplied replacements for values in the file.
#[derive(Copy, Clone, Debug, Default)]
pub struct ExecutionOverrides {
    pub start_time: Option<TimePoint>,
    /// Forces a fixed-step algorithm with this step, ignoring the file's.
    pub step_size:  Option<Duration>,
}

/// An execution built from a system structure, plus its name→index map.
pub struct BuiltSystem {
    pub execution: Execution,
    pub entities:  BTreeMap<String, SlaveIndex>,
}

fn split_qualified(name: &str) -> CosimResult<(&str, &str)> {
    name.split_once('.')
        .ok_or_else(|| CosimError::BadFile(format!("'{name}' is not of the form slave.variable")))
}

fn find(execution: &Execution, qualified: &str) -> CosimResult<VariableId> {
    let (slave, variable) = split_qualified(qualified)?;
    execution.find_variable(slave, variable)
}

fn ecco_params(config: &AlgorithmConfig) -> Option<EccoParams> {
    let AlgorithmConfig::Ecco {
        safety_factor,
        step_size,
        min_step_size,
        max_step_size,
        min_change_rate,
        max_change_rate,
        abs_tolerance,
        rel_tolerance,
        p_gain,
        i_gain,
        ..
    } = config
    else {
        return None;
    };
    let d = EccoParams::default();
    Some(EccoParams {
        safety_factor:   safety_factor.unwrap_or(d.safety_factor),
        step_size:       step_size.unwrap_or(d.step_size),
        min_step_size:   min_step_size.unwrap_or(d.min_step_size),
        max_step_size:   max_step_size.unwrap_or(d.max_step_size),
        min_change_rate: min_change_rate.unwrap_or(d.min_change_rate),
        max_change_rate: max_change_rate.unwrap_or(d.max_change_rate),
        abs_tolerance:   abs_tolerance.unwrap_or(d.abs_tolerance),
        rel_tolerance:   rel_tolerance.unwrap_or(d.rel_tolerance),
        p_gain:          p_gain.unwrap_or(d.p_gain),
        i_gain:          i_gain.unwrap_or(d.i_gain),
    })
}

/// Instantiate every simulator, connection, initial value, and power bond
/// of `structure`.
pub fn build_execution(
    structure: &SystemStructure,
    resolver:  &ModelResolver,
    overrides: ExecutionOverrides,
) -> CosimResult<BuiltSystem> {
    let start = overrides
        .start_time
        .or(structure.start_time.map(TimePoint::from_secs_f64))
        .unwrap_or_default();

    let mut ecco = None;
    let algorithm: SharedAlgorithm = match (overrides.step_size, &structure.algorithm) {
        (Some(step), _) => Arc::new(Mutex::new(FixedStepAlgorithm::new(step)?)),
        (None, Some(AlgorithmConfig::FixedStep { step_size })) => {
            Arc::new(Mutex::new(FixedStepAlgorithm::new(Duration::from_secs_f64(*step_size))?))
        }
        (None, Some(config)) => {
            let params = ecco_params(config).unwrap_or_default();
            let algo = Arc::new(Mutex::new(EccoAlgorithm::new(params)?));
            ecco = Some(algo.clone());
            algo
        }
        (None, None) => {
            return Err(CosimError::BadFile(
                "the system structure names no algorithm and no step size was given".into(),
            ));
        }
    };

    let mut execution = Execution::new(start, algorithm);
    let mut entities = BTreeMap::new();
    for sim in &structure.simulators {
        let slave = resolver.resolve(&sim.source)?;
        let index = execution.add_slave(slave, &sim.name)?;
        entities.insert(sim.name.clone(), index);
    }

    for sim in &structure.simulators {
        for (name, raw) in &sim.initial_values {
            let id = execution.find_variable(&sim.name, name)?;
            execution.set_initial_value(id.slave, id.reference, raw.to_scalar(id.kind)?)?;
        }
    }

    for c in &structure.connections {
        let source = find(&execution, &c.source)?;
        let target = find(&execution, &c.target)?;
        execution.connect_variables(source, target)?;
    }

    if let (Some(algo), Some(AlgorithmConfig::Ecco { power_bonds, .. })) = (ecco, &structure.algorithm) {
        let mut algo = algo.lock();
        for bond in power_bonds {
            let (a_out, a_in) = (find(&execution, &bond.a_output)?, find(&execution, &bond.a_input)?);
            let (b_out, b_in) = (find(&execution, &bond.b_output)?, find(&execution, &bond.b_input)?);
            if a_out.slave != a_in.slave || b_out.slave != b_in.slave {
                return Err(CosimError::BadFile("both ends of a power bond side must be on one slave".into()));
            }
            algo.add_power_bond(PowerBond {
                slave_a:  a_out.slave,
                output_a: a_out.reference,
                input_a:  a_in.reference,
                slave_b:  b_out.slave,
                output_b: b_out.reference,
                input_b:  b_in.reference,
            });
        }
    }

    info!(
        simulators = entities.len(),
        connections = structure.connections.len(),
        start = %start,
        "execution built from system structure"
    );
    Ok(BuiltSystem { execution, entities })
}
