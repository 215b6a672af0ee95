//! The tidal traffic shaper
//!
//! Each table driver owns one [`Throttle`]. The throttle knows when its table
//! was created and, from the time elapsed since then, whether the table is in
//! its steady or burst phase. It reports the effective emission rate and row
//! ceiling for the current instant and paces the driver by waiting one
//! emission interval.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(clippy::unwrap_used)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![allow(clippy::cast_precision_loss)]

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use tokio::time::{self, Duration, Instant};

pub mod cycle;

pub use cycle::{Phase, Profile, Shape};

/// Clock ticks are microseconds.
pub const TICKS_PER_SECOND: u64 = 1_000_000;

/// Errors produced by [`Throttle`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum Error {
    /// The effective rate is zero, negative or not finite. Waiting on such a
    /// rate would either never return or divide by zero.
    #[error("Effective rate must be finite and positive, got {0}")]
    Rate(f64),
}

#[async_trait]
/// The `Clock` used by every throttle
pub trait Clock {
    /// The number of ticks elapsed since the clock was created
    fn ticks_elapsed(&self) -> u64;
    /// Wait for `ticks` amount of time
    async fn wait(&self, ticks: u64);
}

#[derive(Debug, Clone, Copy)]
/// A clock that operates with respect to real-clock time.
///
/// The instant of construction is the table's cycle start. It is never
/// reset.
pub struct RealClock {
    start: Instant,
}

impl Default for RealClock {
    fn default() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

#[async_trait]
impl Clock for RealClock {
    /// Return the number of ticks since `Clock` was created.
    ///
    /// # Panics
    ///
    /// Function will panic if the number of ticks elapsed is greater than u64::MAX.
    #[allow(clippy::cast_possible_truncation)]
    fn ticks_elapsed(&self) -> u64 {
        let ticks_since: u128 = Instant::now().duration_since(self.start).as_micros();
        assert!(
            ticks_since <= u128::from(u64::MAX),
            "584,554 years elapsed since last call!"
        );
        ticks_since as u64
    }

    async fn wait(&self, ticks: u64) {
        time::sleep(Duration::from_micros(ticks)).await;
    }
}

#[derive(Debug, Clone, Default)]
/// A clock that only moves when told to.
///
/// `wait` advances the clock by the requested ticks and returns at once, so a
/// throttle driven by this clock runs in simulated time. Clones share the same
/// tick counter.
pub struct ManualClock {
    ticks: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock positioned `ticks` after its start.
    #[must_use]
    pub fn at(ticks: u64) -> Self {
        Self {
            ticks: Arc::new(AtomicU64::new(ticks)),
        }
    }

    /// Move the clock to exactly `ticks` after its start.
    pub fn set(&self, ticks: u64) {
        self.ticks.store(ticks, Ordering::SeqCst);
    }

    /// Move the clock forward by `ticks`.
    pub fn advance(&self, ticks: u64) {
        self.ticks.fetch_add(ticks, Ordering::SeqCst);
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn ticks_elapsed(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    async fn wait(&self, ticks: u64) {
        self.advance(ticks);
        tokio::task::yield_now().await;
    }
}

/// The per-table throttle
#[derive(Debug)]
pub struct Throttle<C = RealClock> {
    profile: Profile,
    clock: C,
}

impl Throttle<RealClock> {
    /// Create a new `Throttle` whose cycle starts now.
    #[must_use]
    pub fn new(profile: Profile) -> Self {
        Self::with_clock(profile, RealClock::default())
    }
}

impl<C> Throttle<C>
where
    C: Clock + Send + Sync,
{
    /// Create a new `Throttle` against an arbitrary clock.
    pub fn with_clock(profile: Profile, clock: C) -> Self {
        Self { profile, clock }
    }

    /// The immutable profile of this throttle.
    #[must_use]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Whole seconds elapsed since the cycle start.
    #[must_use]
    pub fn elapsed_seconds(&self) -> u64 {
        self.clock.ticks_elapsed() / TICKS_PER_SECOND
    }

    /// The effective phase, rate and row ceiling at this instant.
    #[must_use]
    pub fn shape(&self) -> Shape {
        self.profile.shape_at(self.elapsed_seconds())
    }

    /// Block for one emission interval of `shape`, `1 / shape.rate` seconds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rate`] without waiting if the rate is not finite and
    /// positive.
    pub async fn wait(&self, shape: &Shape) -> Result<(), Error> {
        let ticks = shape.interval_ticks()?;
        if ticks > 0 {
            self.clock.wait(ticks).await;
        }
        Ok(())
    }
}
