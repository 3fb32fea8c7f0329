//! Variable metadata and values.

use std::fmt;

use crate::ids::ValueReference;

// ── Enumerations ─────────────────────────────────────────────────────────────

/// The four scalar kinds a model variable can have.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum VariableType {
    Real,
    Integer,
    String,
    Boolean,
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VariableType::Real    => "real",
            VariableType::Integer => "integer",
            VariableType::String  => "string",
            VariableType::Boolean => "boolean",
        })
    }
}

/// Role of a variable in the data flow of its model.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Causality {
    Input,
    Parameter,
    Output,
    CalculatedParameter,
    Local,
    Independent,
}

impl Causality {
    /// Whether values may be written into a variable of this causality.
    pub fn is_settable(self) -> bool {
        matches!(self, Causality::Input | Causality::Parameter)
    }
}

/// How a variable's value may change over time.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Variability {
    Constant,
    Fixed,
    Tunable,
    Discrete,
    Continuous,
}

// ── Descriptions ─────────────────────────────────────────────────────────────

/// Static description of one model variable.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariableDescription {
    pub name:        String,
    pub reference:   ValueReference,
    pub kind:        VariableType,
    pub causality:   Causality,
    pub variability: Variability,
}

impl VariableDescription {
    pub fn new(
        name:        impl Into<String>,
        reference:   u32,
        kind:        VariableType,
        causality:   Causality,
        variability: Variability,
    ) -> Self {
        Self {
            name: name.into(),
            reference: ValueReference(reference),
            kind,
            causality,
            variability,
        }
    }
}

/// Static description of a model: identity plus its variable table.
#[derive(Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelDescription {
    pub name:        String,
    pub description: String,
    pub version:     String,
    pub variables:   Vec<VariableDescription>,
}

impl ModelDescription {
    /// Look a variable up by name.
    pub fn find_by_name(&self, name: &str) -> Option<&VariableDescription> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// First variable of `kind` with the given reference.
    ///
    /// Several variables may alias one reference (an input and an output
    /// sharing storage); any of them identifies the same value.
    pub fn find_by_reference(
        &self,
        kind:      VariableType,
        reference: ValueReference,
    ) -> Option<&VariableDescription> {
        self.variables
            .iter()
            .find(|v| v.kind == kind && v.reference == reference)
    }

    /// Whether any variable of `kind` satisfying `pred` has this reference.
    pub fn has_reference_where(
        &self,
        kind:      VariableType,
        reference: ValueReference,
        pred:      impl Fn(&VariableDescription) -> bool,
    ) -> bool {
        self.variables
            .iter()
            .any(|v| v.kind == kind && v.reference == reference && pred(v))
    }

    /// Distinct references of `kind`, in ascending order.
    pub fn references(&self, kind: VariableType) -> Vec<ValueReference> {
        let mut refs: Vec<ValueReference> = self
            .variables
            .iter()
            .filter(|v| v.kind == kind)
            .map(|v| v.reference)
            .collect();
        refs.sort_unstable();
        refs.dedup();
        refs
    }
}

// ── Values ───────────────────────────────────────────────────────────────────

/// A single variable value of any kind.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScalarValue {
    Real(f64),
    Integer(i32),
    Boolean(bool),
    String(String),
}

impl ScalarValue {
    pub fn kind(&self) -> VariableType {
        match self {
            ScalarValue::Real(_)    => VariableType::Real,
            ScalarValue::Integer(_) => VariableType::Integer,
            ScalarValue::Boolean(_) => VariableType::Boolean,
            ScalarValue::String(_)  => VariableType::String,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Real(v)    => write!(f, "{v}"),
            ScalarValue::Integer(v) => write!(f, "{v}"),
            ScalarValue::Boolean(v) => write!(f, "{v}"),
            ScalarValue::String(v)  => f.write_str(v),
        }
    }
}
