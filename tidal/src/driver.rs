//! The table driver.
//!
//! One driver runs per table. Every iteration it asks the table's throttle
//! for the current phase, waits one emission interval, fabricates a batch of
//! access-log rows and hands it to the shared sink. A failed write is logged
//! and counted, never retried, and never stops the driver.
//!
//! ## Metrics
//!
//! `rows_generated`: Rows fabricated
//! `rows_written`: Rows the sink acknowledged
//! `batches_written`: Batches the sink accepted
//! `batch_failure`: Batches the sink refused
//! `burst_active`: 1 while the table is bursting, else 0
//! `effective_rate`: Batches per second at the current phase
//!
//! Every metric is labelled with `table`.

use std::sync::Arc;

use metrics::{counter, gauge};
use rand::{Rng, SeedableRng, rngs::SmallRng};
use tidal_payload::{AccessLog, Batch};
use tidal_signal::Watcher;
use tidal_throttle::{Clock, Phase, RealClock, Shape};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::{config::Config, ingest::Ingest, table, table::Table};

#[derive(thiserror::Error, Debug)]
/// Errors produced by [`Driver`]. All are fatal.
pub enum Error {
    /// See [`tidal_throttle::Error`].
    #[error(transparent)]
    Throttle(#[from] tidal_throttle::Error),
    /// See [`tidal_payload::Error`].
    #[error(transparent)]
    Payload(#[from] tidal_payload::Error),
}

/// Drives one table until shutdown.
#[derive(Debug)]
pub struct Driver<C = RealClock> {
    table: Table<C>,
    generator: AccessLog,
    min_rows: u32,
    rng: SmallRng,
    ingest: Arc<dyn Ingest>,
    labels: Vec<(String, String)>,
    phase: Option<Phase>,
}

impl<C> Driver<C>
where
    C: Clock + Send + Sync,
{
    /// Create a new [`Driver`] for `table`.
    ///
    /// `rng` is this driver's own stream. Drivers never share one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Payload`] if the field weights in `config` are
    /// unusable, see [`AccessLog::new`].
    pub fn new(
        table: Table<C>,
        config: &Config,
        ingest: Arc<dyn Ingest>,
        rng: SmallRng,
    ) -> Result<Self, Error> {
        let generator = AccessLog::new(config.access_log())?;
        let (min_rows, _) = tidal_payload::normalize(config.min_row, config.max_row);
        let labels = vec![("table".to_string(), table.name().to_string())];
        Ok(Self {
            table,
            generator,
            min_rows,
            rng,
            ingest,
            labels,
            phase: None,
        })
    }

    /// The driven table.
    #[must_use]
    pub fn table(&self) -> &Table<C> {
        &self.table
    }

    fn observe(&mut self, shape: &Shape) {
        if self.phase == Some(shape.phase) {
            return;
        }
        info!(
            "Table {} entering {} phase: {:.2} batches/s, up to {} rows",
            self.table.name(),
            shape.phase,
            shape.rate,
            shape.max_rows
        );
        let burst = if shape.phase == Phase::Burst { 1.0 } else { 0.0 };
        gauge!("burst_active", &self.labels).set(burst);
        gauge!("effective_rate", &self.labels).set(shape.rate);
        self.phase = Some(shape.phase);
    }

    /// Run a single emission cycle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Throttle`] if the effective rate is not positive and
    /// [`Error::Payload`] if the schema refuses a row. A sink failure is not
    /// an error here.
    pub async fn step(&mut self) -> Result<(), Error> {
        let shape = self.table.throttle().shape();
        self.observe(&shape);
        self.table.throttle().wait(&shape).await?;

        // A burst multiplier below one can pull the ceiling under the floor.
        let max_rows = shape.max_rows.max(self.min_rows);
        let rows = self.rng.random_range(self.min_rows..=max_rows);
        let name = self.table.name();
        debug!("Generating {rows} rows for table {name}");

        let mut batch = Batch::with_capacity(name, rows as usize)?;
        for _ in 0..rows {
            batch.push_row(self.generator.generate(&mut self.rng))?;
        }
        counter!("rows_generated", &self.labels).increment(u64::from(rows));

        match self.ingest.write(&batch).await {
            Ok(ack) => {
                debug!("Table {name} wrote {} rows: {}", ack.rows, ack.detail);
                counter!("batches_written", &self.labels).increment(1);
                counter!("rows_written", &self.labels).increment(ack.rows);
            }
            Err(err) => {
                error!("Failed to write {rows} rows to table {name}: {err}");
                counter!("batch_failure", &self.labels).increment(1);
            }
        }
        Ok(())
    }

    /// Run [`Driver`] until a shutdown signal is received.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`Driver::step`].
    pub async fn spin(mut self, shutdown: Watcher) -> Result<(), Error> {
        let shutdown_wait = shutdown.recv();
        tokio::pin!(shutdown_wait);
        loop {
            tokio::select! {
                result = self.step() => result?,
                () = &mut shutdown_wait => {
                    info!("Table {} received shutdown signal", self.table.name());
                    return Ok(());
                },
            }
        }
    }
}

/// Create every table and spawn its driver onto a [`JoinSet`].
///
/// Each driver gets its own RNG stream seeded from `rng` and its own
/// registration with `shutdown`.
///
/// # Errors
///
/// Returns an error if a driver cannot be built or `shutdown` has already
/// fired.
pub fn spawn_all(
    config: &Config,
    ingest: &Arc<dyn Ingest>,
    shutdown: &Watcher,
    rng: &mut SmallRng,
) -> Result<JoinSet<Result<(), Error>>, Error> {
    let mut drivers = JoinSet::new();
    for table in table::tables(config, rng) {
        let profile = table.profile();
        info!(
            "Table {}: burst x{:.2} for {}s of every {}s",
            table.name(),
            profile.burst_multiplier,
            profile.burst_duration,
            profile.cycle_duration
        );
        let driver = Driver::new(
            table,
            config,
            Arc::clone(ingest),
            SmallRng::from_rng(&mut *rng),
        )?;
        drivers.spawn(driver.spin(shutdown.register()));
    }
    Ok(drivers)
}
