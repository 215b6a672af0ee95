use std::time::Duration;

use clap::Parser;
use jemallocator::Jemalloc;
use metrics_exporter_prometheus::PrometheusBuilder;
use rand::{SeedableRng, rngs::SmallRng};
use tidal::{config::Config, driver, ingest};
use tokio::{runtime::Builder, signal};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// Seconds the runtime is given to wind down outstanding tasks.
const MAX_SHUTDOWN_DELAY: Duration = Duration::from_secs(10);

#[derive(thiserror::Error, Debug)]
enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(#[from] tidal::config::Error),
    #[error("Sink error: {0}")]
    Ingest(#[from] ingest::Error),
    #[error("Driver returned an error: {0}")]
    Driver(#[from] driver::Error),
    #[error("Failed to install Prometheus exporter: {0}")]
    Prometheus(#[from] metrics_exporter_prometheus::BuildError),
}

async fn inner_main(config: Config) -> Result<(), Error> {
    let (shutdown_watcher, shutdown_broadcast) = tidal_signal::signal();

    if let Some(addr) = config.prometheus_addr {
        PrometheusBuilder::new().with_http_listener(addr).install()?;
        info!("Serving Prometheus metrics on {addr}");
    }

    let sink = ingest::build(&config)?;
    let mut rng = match config.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_rng(&mut rand::rng()),
    };
    let mut drivers = driver::spawn_all(&config, &sink, &shutdown_watcher, &mut rng)?;

    // Any watcher left alive here would hold `signal_and_wait` open forever.
    drop(shutdown_watcher);
    let res = loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("received ctrl-c");
                break Ok(());
            },
            res = drivers.join_next() => {
                match res {
                    Some(Ok(Ok(()))) => { /* Driver shut down successfully */ }
                    Some(Ok(Err(err))) => {
                        error!("Driver shut down unexpectedly: {err}");
                        break Err(Error::Driver(err));
                    }
                    Some(Err(err)) => error!("Could not join the spawned driver task: {err}"),
                    None => {
                        info!("All drivers finished");
                        break Ok(());
                    }
                }
            },
        }
    };
    shutdown_broadcast.signal_and_wait().await;
    res
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(false)
        .finish()
        .init();

    let version = env!("CARGO_PKG_VERSION");
    info!("Starting tidal {version} run.");

    let config = Config::parse().validate().map_err(|err| {
        error!("Configuration validation failed: {err}");
        err
    })?;
    info!(
        "Writing {} tables as user {:?} to {}:{}",
        config.table_num, config.db_username, config.db_host, config.db_port
    );

    let runtime = Builder::new_multi_thread()
        .enable_io()
        .enable_time()
        .build()?;
    let res = runtime.block_on(inner_main(config));
    info!(
        "Shutting down runtime with a {} second delay. May leave orphaned tasks.",
        MAX_SHUTDOWN_DELAY.as_secs(),
    );
    runtime.shutdown_timeout(MAX_SHUTDOWN_DELAY);
    info!("Bye. :)");
    res
}
