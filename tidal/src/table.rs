//! Per-table state.
//!
//! A table is a name plus a [`Throttle`] whose [`Profile`] is drawn once, at
//! creation, from half to all of each configured maximum. Tables created
//! together therefore burst out of step with one another. Nothing about a
//! table changes after creation. Its phase is a function of time elapsed
//! since then.

use std::num::NonZeroU32;

use rand::Rng;
use tidal_throttle::{Clock, Profile, RealClock, Throttle};

use crate::config::Config;

/// One simulated table.
#[derive(Debug)]
pub struct Table<C = RealClock> {
    name: String,
    throttle: Throttle<C>,
}

/// Draw a table's profile from the configured maxima.
///
/// The burst multiplier is drawn from `[m/2, m]`, burst and cycle durations
/// from `[d/2, d]` whole seconds. A cycle is at least one second long.
pub fn profile<R>(config: &Config, rng: &mut R) -> Profile
where
    R: Rng + ?Sized,
{
    let multiplier = config.burst_multiplier;
    let burst_multiplier = rng.random_range(multiplier / 2.0..=multiplier);
    let burst_duration = rng.random_range(config.burst_duration / 2..=config.burst_duration);
    let cycle_duration = rng.random_range(config.cycle_duration / 2..=config.cycle_duration);
    Profile {
        steady_rate: config.rate,
        burst_multiplier,
        burst_duration,
        cycle_duration: NonZeroU32::new(cycle_duration).unwrap_or(NonZeroU32::MIN),
        max_rows: config.max_row,
    }
}

impl Table<RealClock> {
    /// Create table number `index`. Its cycle starts now.
    pub fn new<R>(index: u32, config: &Config, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        Self::with_clock(index, config, rng, RealClock::default())
    }
}

impl<C> Table<C>
where
    C: Clock + Send + Sync,
{
    /// Create table number `index` against an arbitrary clock.
    pub fn with_clock<R>(index: u32, config: &Config, rng: &mut R, clock: C) -> Self
    where
        R: Rng + ?Sized,
    {
        Self {
            name: format!("{}{index}", config.table_prefix),
            throttle: Throttle::with_clock(profile(config, rng), clock),
        }
    }

    /// The table name, prefix then index.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The table's throttle.
    #[must_use]
    pub fn throttle(&self) -> &Throttle<C> {
        &self.throttle
    }

    /// The table's immutable traffic profile.
    #[must_use]
    pub fn profile(&self) -> &Profile {
        self.throttle.profile()
    }
}

/// Create every configured table, numbered from zero.
pub fn tables<R>(config: &Config, rng: &mut R) -> Vec<Table>
where
    R: Rng + ?Sized,
{
    (0..config.table_num)
        .map(|index| Table::new(index, config, rng))
        .collect()
}
