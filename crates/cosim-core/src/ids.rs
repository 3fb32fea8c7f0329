//! Strongly typed identifier wrappers.
//!
//! All IDs are `Copy + Ord + Hash` so they work as map keys and sort keys
//! without ceremony.  The inner integer is `pub` because the C surface passes
//! these as plain integers; inside Rust prefer the typed wrappers.

use std::fmt;

use crate::variable::VariableType;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty), $label:literal;) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, " {}"), self.0)
            }
        }

        impl From<$inner> for $name {
            #[inline(always)]
            fn from(raw: $inner) -> $name {
                $name(raw)
            }
        }
    };
}

typed_id! {
    /// Position of a slave within its execution.  Assigned densely from 0 in
    /// insertion order and never reused.
    pub struct SlaveIndex(i32), "slave";
}

typed_id! {
    /// Model-defined identifier of a variable, unique within one kind.
    pub struct ValueReference(u32), "value reference";
}

typed_id! {
    /// Count of completed macro steps.  The first completed step is 1.
    pub struct StepNumber(i64), "step";
}

impl SlaveIndex {
    /// Cast to `usize` for indexing, or `None` for a negative index.
    #[inline]
    pub fn to_usize(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl StepNumber {
    #[inline]
    pub fn next(self) -> StepNumber {
        StepNumber(self.0 + 1)
    }
}

// ── VariableId ───────────────────────────────────────────────────────────────

/// Fully qualified variable: which slave, which kind, which reference.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariableId {
    pub slave:     SlaveIndex,
    pub kind:      VariableType,
    pub reference: ValueReference,
}

impl VariableId {
    pub fn new(slave: SlaveIndex, kind: VariableType, reference: ValueReference) -> Self {
        Self { slave, kind, reference }
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} variable {}", self.slave, self.kind, self.reference.0)
    }
}
