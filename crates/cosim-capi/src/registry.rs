//! Generational handle registry.
//!
//! A handle packs a slot index (low 32 bits) and the slot's generation
//! (high 32 bits).  Generations start at 1 and advance every time a slot is
//! freed, so the raw value 0 is never issued and a handle that outlived its
//! object is detected instead of aliasing whatever reuses the slot.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use cosim_core::{CosimError, CosimResult};

/// A typed opaque handle as it crosses the C boundary.
pub trait Handle: Copy {
    /// Noun used in error messages.
    const KIND: &'static str;

    fn from_raw(raw: u64) -> Self;
    fn raw(self) -> u64;

    #[inline]
    fn is_null(self) -> bool {
        self.raw() == 0
    }
}

/// Generate a `#[repr(transparent)]` handle newtype.
macro_rules! handle_type {
    ($(#[$attr:meta])* $name:ident, $kind:literal) => {
        $(#[$attr])*
        #[repr(transparent)]
        #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
        pub struct $name(pub u64);

        impl $name {
            pub const NULL: $name = $name(0);
        }

        impl Handle for $name {
            const KIND: &'static str = $kind;

            #[inline(always)]
            fn from_raw(raw: u64) -> Self {
                $name(raw)
            }

            #[inline(always)]
            fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($kind, " handle {:#x}"), self.0)
            }
        }
    };
}

handle_type! {
    /// `cosim_execution*`
    ExecutionHandle, "execution"
}
handle_type! {
    /// `cosim_slave*`
    SlaveHandle, "slave"
}
handle_type! {
    /// `cosim_observer*`
    ObserverHandle, "observer"
}
handle_type! {
    /// `cosim_manipulator*`
    ManipulatorHandle, "manipulator"
}
handle_type! {
    /// `cosim_algorithm*`
    AlgorithmHandle, "algorithm"
}

// ── Registry ─────────────────────────────────────────────────────────────────

struct Slot<T> {
    generation: u32,
    value:      Option<Arc<T>>,
}

struct Slots<T> {
    entries: Vec<Slot<T>>,
    free:    Vec<u32>,
}

/// Owns every live object of one handle family.
///
/// Lookups hand out `Arc` clones so an object stays alive for the duration
/// of a call even if another thread destroys its handle meanwhile.
pub struct HandleRegistry<H, T> {
    slots:   Mutex<Slots<T>>,
    _handle: std::marker::PhantomData<fn() -> H>,
}

impl<H: Handle, T> Default for HandleRegistry<H, T> {
    fn default() -> Self {
        Self::new()
    }
}

fn split(raw: u64) -> (usize, u32) {
    ((raw & u64::from(u32::MAX)) as usize, (raw >> 32) as u32)
}

impl<H: Handle, T> HandleRegistry<H, T> {
    pub fn new() -> Self {
        Self {
            slots:   Mutex::new(Slots { entries: Vec::new(), free: Vec::new() }),
            _handle: std::marker::PhantomData,
        }
    }

    /// Store `value` and return its new handle.
    pub fn insert(&self, value: T) -> H {
        let mut slots = self.slots.lock();
        let index = match slots.free.pop() {
            Some(index) => index,
            None => {
                slots.entries.push(Slot { generation: 1, value: None });
                (slots.entries.len() - 1) as u32
            }
        };
        let slot = &mut slots.entries[index as usize];
        slot.value = Some(Arc::new(value));
        H::from_raw((u64::from(slot.generation) << 32) | u64::from(index))
    }

    pub fn get(&self, handle: H) -> CosimResult<Arc<T>> {
        if handle.is_null() {
            return Err(CosimError::InvalidArgument(format!("null {} handle", H::KIND)));
        }
        let (index, generation) = split(handle.raw());
        let slots = self.slots.lock();
        slots
            .entries
            .get(index)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.value.clone())
            .ok_or_else(|| stale::<H>(handle))
    }

    /// Release the object behind `handle`.  A null handle is a no-op and
    /// returns `Ok(None)`; a stale one is an error.
    pub fn remove(&self, handle: H) -> CosimResult<Option<Arc<T>>> {
        if handle.is_null() {
            return Ok(None);
        }
        let (index, generation) = split(handle.raw());
        let mut slots = self.slots.lock();
        let slot = slots
            .entries
            .get_mut(index)
            .filter(|slot| slot.generation == generation && slot.value.is_some())
            .ok_or_else(|| stale::<H>(handle))?;
        let value = slot.value.take();
        slot.generation = slot.generation.wrapping_add(1).max(1);
        slots.free.push(index as u32);
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.slots.lock().entries.iter().filter(|s| s.value.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn stale<H: Handle>(handle: H) -> CosimError {
    CosimError::InvalidArgument(format!(
        "invalid {} handle {:#x} (already destroyed or never created)",
        H::KIND,
        handle.raw()
    ))
}
