//! Steady/burst cycle
//!
//! A table's traffic is a square wave. Every cycle of `cycle_duration`
//! seconds opens with a burst window of `burst_duration` seconds during which
//! both the emission rate and the batch row ceiling are scaled by
//! `burst_multiplier`. The rest of the cycle is steady.

use std::{fmt, num::NonZeroU32};

use crate::{Error, TICKS_PER_SECOND};

/// The phase a table is in for a single emission cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Base rate and base row ceiling.
    Steady,
    /// Rate and row ceiling scaled by the burst multiplier.
    Burst,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Steady => "steady",
            Phase::Burst => "burst",
        };
        write!(f, "{s}")
    }
}

/// The immutable traffic parameters of one table.
///
/// Assigned once when the table is created and never recomputed, so tables
/// with different profiles drift out of phase with one another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Profile {
    /// Batches per second outside of a burst.
    pub steady_rate: f64,
    /// Scale applied to rate and row ceiling inside a burst.
    pub burst_multiplier: f64,
    /// Seconds at the start of every cycle spent bursting.
    pub burst_duration: u32,
    /// Seconds per cycle.
    pub cycle_duration: NonZeroU32,
    /// Row ceiling per batch outside of a burst.
    pub max_rows: u32,
}

/// The effective traffic parameters at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shape {
    /// Phase at this instant.
    pub phase: Phase,
    /// Effective emission rate, batches per second.
    pub rate: f64,
    /// Effective per-batch row ceiling.
    pub max_rows: u32,
}

impl Profile {
    /// The phase after `elapsed` whole seconds since the cycle start.
    #[must_use]
    pub fn phase_at(&self, elapsed: u64) -> Phase {
        let phase_clock = elapsed % u64::from(self.cycle_duration.get());
        if phase_clock < u64::from(self.burst_duration) {
            Phase::Burst
        } else {
            Phase::Steady
        }
    }

    /// The effective rate and row ceiling after `elapsed` whole seconds.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn shape_at(&self, elapsed: u64) -> Shape {
        match self.phase_at(elapsed) {
            Phase::Steady => Shape {
                phase: Phase::Steady,
                rate: self.steady_rate,
                max_rows: self.max_rows,
            },
            Phase::Burst => Shape {
                phase: Phase::Burst,
                rate: self.steady_rate * self.burst_multiplier,
                // Float to int casts saturate, which is the behavior we want
                // for absurd multipliers.
                max_rows: (f64::from(self.max_rows) * self.burst_multiplier).floor() as u32,
            },
        }
    }
}

impl Shape {
    /// One emission interval, `1 / rate` seconds, in clock ticks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rate`] if the rate is not finite and positive.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn interval_ticks(&self) -> Result<u64, Error> {
        if !self.rate.is_finite() || self.rate <= 0.0 {
            return Err(Error::Rate(self.rate));
        }
        Ok((TICKS_PER_SECOND as f64 / self.rate) as u64)
    }
}
