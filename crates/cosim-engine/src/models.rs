//! Built-in models and URI-based model resolution.
//!
//! # URIs
//!
//! | Form                 | Resolves to                                        |
//! |----------------------|----------------------------------------------------|
//! | `builtin:<name>`     | A factory registered under `<name>`                |
//! | `builtin://<name>`   | Same                                               |
//! | anything else        | A file path.  Missing → I/O error (ENOENT); present → unsupported, model import is not available |
//!
//! # Built-in models
//!
//! | Name       | Variables                                                                  |
//! |------------|----------------------------------------------------------------------------|
//! | `identity` | `realIn`/`realOut`, `intIn`/`intOut`, `boolIn`/`boolOut`, `stringIn`/`stringOut`; each pair shares reference 0 of its kind |
//! | `fail`     | boolean input `fail` (0), real parameter `maxStepSize` (0)                 |
//! | `mass`     | real: input `force` (0), parameter `mass` (1), output `velocity` (2), local `position` (3), parameter `initialVelocity` (4) |
//! | `damper`   | real: input `velocity` (0), parameter `damping` (1), output `force` (2)    |

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use cosim_core::{
    Causality, CosimError, CosimResult, Duration, ModelDescription, TimePoint, ValueReference,
    Variability, VariableDescription, VariableType,
};

use crate::slave::{Slave, StepOutcome, check_lengths};

// ── ValueStore ───────────────────────────────────────────────────────────────

/// Backing storage for a built-in model's variables, one map per kind.
///
/// Aliased variables (same kind and reference) share a single cell.
#[derive(Clone, Debug, Default)]
pub struct ValueStore {
    reals:    BTreeMap<ValueReference, f64>,
    integers: BTreeMap<ValueReference, i32>,
    booleans: BTreeMap<ValueReference, bool>,
    strings:  BTreeMap<ValueReference, String>,
}

impl ValueStore {
    /// Zero-initialized storage for every variable in `model`.
    pub fn for_model(model: &ModelDescription) -> Self {
        let mut store = Self::default();
        for v in &model.variables {
            match v.kind {
                VariableType::Real    => { store.reals.insert(v.reference, 0.0); }
                VariableType::Integer => { store.integers.insert(v.reference, 0); }
                VariableType::Boolean => { store.booleans.insert(v.reference, false); }
                VariableType::String  => { store.strings.insert(v.reference, String::new()); }
            }
        }
        store
    }

    pub fn real(&self, vr: u32) -> f64 {
        self.reals.get(&ValueReference(vr)).copied().unwrap_or_default()
    }

    pub fn boolean(&self, vr: u32) -> bool {
        self.booleans.get(&ValueReference(vr)).copied().unwrap_or_default()
    }

    pub fn put_real(&mut self, vr: u32, value: f64) {
        self.reals.insert(ValueReference(vr), value);
    }
}

fn read<T: Clone>(
    map:  &BTreeMap<ValueReference, T>,
    kind: VariableType,
    refs: &[ValueReference],
    out:  &mut [T],
) -> CosimResult<()> {
    check_lengths(refs.len(), out.len())?;
    for (slot, vr) in out.iter_mut().zip(refs) {
        *slot = map
            .get(vr)
            .cloned()
            .ok_or_else(|| CosimError::Model(format!("unknown {kind} value reference {}", vr.0)))?;
    }
    Ok(())
}

fn write<T: Clone>(
    map:    &mut BTreeMap<ValueReference, T>,
    kind:   VariableType,
    refs:   &[ValueReference],
    values: &[T],
) -> CosimResult<()> {
    check_lengths(refs.len(), values.len())?;
    if let Some(vr) = refs.iter().find(|vr| !map.contains_key(vr)) {
        return Err(CosimError::Model(format!("unknown {kind} value reference {}", vr.0)));
    }
    for (vr, value) in refs.iter().zip(values) {
        map.insert(*vr, value.clone());
    }
    Ok(())
}

// ── BuiltinSlave ─────────────────────────────────────────────────────────────

type StartFn = fn(&mut ValueStore) -> CosimResult<()>;
type StepFn = fn(&mut ValueStore, TimePoint, Duration) -> CosimResult<StepOutcome>;

/// A model implemented in Rust: a variable table plus start/step functions
/// acting on a [`ValueStore`].
pub struct BuiltinSlave {
    description: ModelDescription,
    values:      ValueStore,
    on_start:    StartFn,
    on_step:     StepFn,
}

impl BuiltinSlave {
    pub fn new(description: ModelDescription, on_start: StartFn, on_step: StepFn) -> Self {
        let values = ValueStore::for_model(&description);
        Self { description, values, on_start, on_step }
    }

    /// Set a real default before the instance is handed out.
    fn with_real(mut self, vr: u32, value: f64) -> Self {
        self.values.put_real(vr, value);
        self
    }
}

impl Slave for BuiltinSlave {
    fn model_description(&self) -> &ModelDescription {
        &self.description
    }

    fn start_simulation(&mut self) -> CosimResult<()> {
        (self.on_start)(&mut self.values)
    }

    fn do_step(&mut self, current: TimePoint, step: Duration) -> CosimResult<StepOutcome> {
        (self.on_step)(&mut self.values, current, step)
    }

    fn get_real(&self, refs: &[ValueReference], out: &mut [f64]) -> CosimResult<()> {
        read(&self.values.reals, VariableType::Real, refs, out)
    }

    fn get_integer(&self, refs: &[ValueReference], out: &mut [i32]) -> CosimResult<()> {
        read(&self.values.integers, VariableType::Integer, refs, out)
    }

    fn get_boolean(&self, refs: &[ValueReference], out: &mut [bool]) -> CosimResult<()> {
        read(&self.values.booleans, VariableType::Boolean, refs, out)
    }

    fn get_string(&self, refs: &[ValueReference], out: &mut [String]) -> CosimResult<()> {
        read(&self.values.strings, VariableType::String, refs, out)
    }

    fn set_real(&mut self, refs: &[ValueReference], values: &[f64]) -> CosimResult<()> {
        write(&mut self.values.reals, VariableType::Real, refs, values)
    }

    fn set_integer(&mut self, refs: &[ValueReference], values: &[i32]) -> CosimResult<()> {
        write(&mut self.values.integers, VariableType::Integer, refs, values)
    }

    fn set_boolean(&mut self, refs: &[ValueReference], values: &[bool]) -> CosimResult<()> {
        write(&mut self.values.booleans, VariableType::Boolean, refs, values)
    }

    fn set_string(&mut self, refs: &[ValueReference], values: &[String]) -> CosimResult<()> {
        write(&mut self.values.strings, VariableType::String, refs, values)
    }
}

// ── Model definitions ────────────────────────────────────────────────────────

fn var(
    name:        &str,
    vr:          u32,
    kind:        VariableType,
    causality:   Causality,
    variability: Variability,
) -> VariableDescription {
    VariableDescription::new(name, vr, kind, causality, variability)
}

fn model(name: &str, description: &str, variables: Vec<VariableDescription>) -> ModelDescription {
    ModelDescription {
        name:        name.to_owned(),
        description: description.to_owned(),
        version:     env!("CARGO_PKG_VERSION").to_owned(),
        variables,
    }
}

fn no_start(_: &mut ValueStore) -> CosimResult<()> {
    Ok(())
}

/// Outputs mirror inputs: each in/out pair is one storage cell.
pub fn identity() -> BuiltinSlave {
    use Causality::{Input, Output};
    use Variability::Discrete;
    use VariableType::{Boolean, Integer, Real, String};

    let description = model(
        "identity",
        "Copies every input to the output of the same kind",
        vec![
            var("realIn", 0, Real, Input, Discrete),
            var("intIn", 0, Integer, Input, Discrete),
            var("boolIn", 0, Boolean, Input, Discrete),
            var("stringIn", 0, String, Input, Discrete),
            var("realOut", 0, Real, Output, Discrete),
            var("intOut", 0, Integer, Output, Discrete),
            var("boolOut", 0, Boolean, Output, Discrete),
            var("stringOut", 0, String, Output, Discrete),
        ],
    );
    BuiltinSlave::new(description, no_start, |_, _, _| Ok(StepOutcome::Complete))
}

/// Fails on demand, and discards steps longer than `maxStepSize` when that
/// parameter is positive.
pub fn fail() -> BuiltinSlave {
    let description = model(
        "fail",
        "Reports a model error on the first step after 'fail' is set",
        vec![
            var("fail", 0, VariableType::Boolean, Causality::Input, Variability::Discrete),
            var("maxStepSize", 0, VariableType::Real, Causality::Parameter, Variability::Fixed),
        ],
    );
    BuiltinSlave::new(description, no_start, |values, current, step| {
        if values.boolean(0) {
            return Err(CosimError::Model(format!("model failure requested at {current}")));
        }
        let max = values.real(0);
        if max > 0.0 && step.as_secs_f64() > max {
            return Ok(StepOutcome::Discarded);
        }
        Ok(StepOutcome::Complete)
    })
}

/// A point mass driven by an external force (semi-implicit Euler).
pub fn mass() -> BuiltinSlave {
    use Causality::{Input, Local, Output, Parameter};
    use Variability::{Continuous, Fixed};
    use VariableType::Real;

    let description = model(
        "mass",
        "One-degree-of-freedom mass",
        vec![
            var("force", 0, Real, Input, Continuous),
            var("mass", 1, Real, Parameter, Fixed),
            var("velocity", 2, Real, Output, Continuous),
            var("position", 3, Real, Local, Continuous),
            var("initialVelocity", 4, Real, Parameter, Fixed),
        ],
    );
    BuiltinSlave::new(
        description,
        |values| {
            values.put_real(2, values.real(4));
            Ok(())
        },
        |values, _, step| {
            let m = values.real(1);
            if m <= 0.0 {
                return Err(CosimError::Model(format!("mass must be positive, got {m}")));
            }
            let h = step.as_secs_f64();
            let v = values.real(2) + values.real(0) / m * h;
            values.put_real(2, v);
            values.put_real(3, values.real(3) + v * h);
            Ok(StepOutcome::Complete)
        },
    )
    .with_real(1, 1.0)
}

/// A linear damper: `force = -damping * velocity`.
pub fn damper() -> BuiltinSlave {
    use Causality::{Input, Output, Parameter};
    use Variability::{Continuous, Fixed};
    use VariableType::Real;

    fn update(values: &mut ValueStore) -> CosimResult<()> {
        values.put_real(2, -values.real(1) * values.real(0));
        Ok(())
    }

    let description = model(
        "damper",
        "Linear viscous damper",
        vec![
            var("velocity", 0, Real, Input, Continuous),
            var("damping", 1, Real, Parameter, Fixed),
            var("force", 2, Real, Output, Continuous),
        ],
    );
    BuiltinSlave::new(description, update, |values, _, _| {
        update(values)?;
        Ok(StepOutcome::Complete)
    })
    .with_real(1, 1.0)
}

// ── ModelResolver ────────────────────────────────────────────────────────────

/// Creates a fresh, independent slave instance.
pub type SlaveFactory = Arc<dyn Fn() -> Box<dyn Slave> + Send + Sync>;

const BUILTIN_SCHEME: &str = "builtin:";

/// Maps model URIs to slave factories.
#[derive(Clone)]
pub struct ModelResolver {
    factories: BTreeMap<String, SlaveFactory>,
}

impl Default for ModelResolver {
    /// A resolver knowing the four built-in models.
    fn default() -> Self {
        let mut resolver = Self::empty();
        resolver.register("identity", Arc::new(|| Box::new(identity())));
        resolver.register("fail", Arc::new(|| Box::new(fail())));
        resolver.register("mass", Arc::new(|| Box::new(mass())));
        resolver.register("damper", Arc::new(|| Box::new(damper())));
        resolver
    }
}

impl ModelResolver {
    pub fn empty() -> Self {
        Self { factories: BTreeMap::new() }
    }

    /// Register (or replace) the factory behind `builtin:<name>`.
    pub fn register(&mut self, name: impl Into<String>, factory: SlaveFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Instantiate the model behind `uri`.
    pub fn resolve(&self, uri: &str) -> CosimResult<Box<dyn Slave>> {
        if let Some(rest) = uri.strip_prefix(BUILTIN_SCHEME) {
            let name = rest.trim_start_matches("//");
            return self
                .factories
                .get(name)
                .map(|factory| factory())
                .ok_or_else(|| CosimError::InvalidArgument(format!("unknown built-in model '{name}'")));
        }

        // A plain path: report a missing file as the OS does.
        std::fs::metadata(Path::new(uri))?;
        Err(CosimError::UnsupportedFeature(format!(
            "cannot load '{uri}': only built-in models are available"
        )))
    }
}
