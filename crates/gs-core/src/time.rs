//! Simulated time.
//!
//! Unlike a tick-based model, resource sharing produces completion dates
//! anywhere on the real line, so the canonical unit is an `f64` number of
//! simulated seconds.  [`SimTime`] wraps it with a *total* order
//! (`f64::total_cmp`) so dates can key `BTreeMap`s and binary heaps.
//! Non-finite dates are rejected in debug builds.

use std::cmp::Ordering;
use std::fmt;

// ── SimTime ──────────────────────────────────────────────────────────────────

/// An absolute simulated date in seconds.
#[derive(Copy, Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimTime(pub f64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0.0);

    #[inline]
    pub fn new(secs: f64) -> SimTime {
        debug_assert!(secs.is_finite(), "simulated dates must be finite, got {secs}");
        SimTime(secs)
    }

    #[inline]
    pub fn secs(self) -> f64 {
        self.0
    }

    /// The date `delta` seconds after `self`.
    #[inline]
    pub fn offset(self, delta: f64) -> SimTime {
        SimTime::new(self.0 + delta)
    }

    /// Seconds elapsed from `earlier` to `self` (negative if `earlier` is later).
    #[inline]
    pub fn since(self, earlier: SimTime) -> f64 {
        self.0 - earlier.0
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl std::ops::Add<f64> for SimTime {
    type Output = SimTime;
    #[inline]
    fn add(self, rhs: f64) -> SimTime {
        self.offset(rhs)
    }
}

impl std::ops::Sub for SimTime {
    type Output = f64;
    #[inline]
    fn sub(self, rhs: SimTime) -> f64 {
        self.since(rhs)
    }
}

impl From<f64> for SimTime {
    fn from(secs: f64) -> Self {
        SimTime::new(secs)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}s", self.0)
    }
}

// ── SimClock ─────────────────────────────────────────────────────────────────

/// The single simulated clock shared by every model of one engine.
///
/// Only the orchestrating loop advances it; models receive `now` by value.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimClock {
    now: SimTime,
    /// Number of completed rounds (diagnostics only).
    rounds: u64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn now(&self) -> SimTime {
        self.now
    }

    #[inline]
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Advance by `delta` seconds.  Negative deltas are clamped to zero so
    /// the clock never goes backwards.
    pub fn advance(&mut self, delta: f64) -> SimTime {
        self.now = self.now.offset(delta.max(0.0));
        self.rounds += 1;
        self.now
    }

    /// Jump to the absolute date `date`.  Earlier dates leave the clock
    /// where it is.
    pub fn advance_to(&mut self, date: SimTime) -> SimTime {
        self.now = self.now.max(date);
        self.rounds += 1;
        self.now
    }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (round {})", self.now, self.rounds)
    }
}
