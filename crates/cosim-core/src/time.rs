//! Simulation time model.
//!
//! # Design
//!
//! Time is an integer count of nanoseconds.  `TimePoint` is an absolute
//! position on the simulation time axis and `Duration` a signed distance
//! between two of them:
//!
//!   seconds = nanoseconds * 1e-9
//!
//! Keeping the canonical unit integral means step arithmetic is exact: ten
//! steps of 0.1 s land on exactly 1 s, and step-number/time lookups compare
//! without tolerance.  Conversions to and from floating-point seconds exist
//! for configuration files and status reporting only.

use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// Nanoseconds per second.
pub const NANOS_PER_SEC: i64 = 1_000_000_000;

fn secs_to_nanos(secs: f64) -> i64 {
    (secs * NANOS_PER_SEC as f64).round() as i64
}

// ── Duration ─────────────────────────────────────────────────────────────────

/// A signed span of simulation time in nanoseconds.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Duration(pub i64);

impl Duration {
    pub const ZERO: Duration = Duration(0);

    #[inline]
    pub const fn from_nanos(nanos: i64) -> Duration {
        Duration(nanos)
    }

    /// Round `secs` to the nearest nanosecond.
    #[inline]
    pub fn from_secs_f64(secs: f64) -> Duration {
        Duration(secs_to_nanos(secs))
    }

    #[inline]
    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / NANOS_PER_SEC as f64
    }

    #[inline]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Convert to a wall-clock `std::time::Duration`, clamping negatives to zero.
    pub fn to_std(self) -> std::time::Duration {
        std::time::Duration::from_nanos(self.0.max(0) as u64)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.as_secs_f64())
    }
}

// ── TimePoint ────────────────────────────────────────────────────────────────

/// An absolute simulation time in nanoseconds since the time origin.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimePoint(pub i64);

impl TimePoint {
    pub const ZERO: TimePoint = TimePoint(0);

    #[inline]
    pub const fn from_nanos(nanos: i64) -> TimePoint {
        TimePoint(nanos)
    }

    #[inline]
    pub fn from_secs_f64(secs: f64) -> TimePoint {
        TimePoint(secs_to_nanos(secs))
    }

    #[inline]
    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / NANOS_PER_SEC as f64
    }

    /// `self + step`, or `None` past the end of the time axis.
    #[inline]
    pub const fn checked_add(self, step: Duration) -> Option<TimePoint> {
        match self.0.checked_add(step.0) {
            Some(nanos) => Some(TimePoint(nanos)),
            None => None,
        }
    }

    /// `self - span`, clamped to the ends of the time axis.
    #[inline]
    pub const fn saturating_sub(self, span: Duration) -> TimePoint {
        TimePoint(self.0.saturating_sub(span.0))
    }
}

impl Add<Duration> for TimePoint {
    type Output = TimePoint;
    #[inline]
    fn add(self, rhs: Duration) -> TimePoint {
        TimePoint(self.0 + rhs.0)
    }
}

impl AddAssign<Duration> for TimePoint {
    #[inline]
    fn add_assign(&mut self, rhs: Duration) {
        self.0 += rhs.0;
    }
}

impl Sub<Duration> for TimePoint {
    type Output = TimePoint;
    #[inline]
    fn sub(self, rhs: Duration) -> TimePoint {
        TimePoint(self.0 - rhs.0)
    }
}

impl Sub for TimePoint {
    type Output = Duration;
    #[inline]
    fn sub(self, rhs: TimePoint) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={}s", self.as_secs_f64())
    }
}
