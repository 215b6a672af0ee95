//! This module controls configuration parsing from the environment.
//!
//! Every setting is read once, at startup, from an environment variable or
//! from the matching long flag. The validated [`Config`] is then passed by
//! reference to every component. Nothing reads the environment after that.

use std::{fmt, net::SocketAddr};

use clap::{Parser, ValueEnum};
use tidal_payload::{MethodWeights, PathLength, access_log};

/// Default steady rate, batches per second per table.
pub const DEFAULT_RATE: f64 = 2.0;
/// Default store port.
pub const DEFAULT_DB_PORT: u16 = 5001;
/// Default table name prefix.
pub const DEFAULT_TABLE_PREFIX: &str = "nginx_logs_";
/// Most rows a single batch may hold, burst included.
pub const MAX_BATCH_ROWS: u32 = 100_000;

/// Errors produced by [`Config::validate`].
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    /// The steady rate is not a positive, finite number.
    #[error("RATE must be finite and positive, got {0}")]
    Rate(f64),
    /// The burst multiplier is not a positive, finite number.
    #[error("BURST_MULTIPLIER must be finite and positive, got {0}")]
    BurstMultiplier(f64),
    /// A zero cycle leaves the burst phase undefined.
    #[error("CYCLE_DURATION must be at least one second")]
    CycleDuration,
    /// The burst row ceiling is beyond [`MAX_BATCH_ROWS`].
    #[error("MAX_ROW times BURST_MULTIPLIER must not exceed {MAX_BATCH_ROWS} rows, got {0}")]
    BatchRows(f64),
    /// At least one table is required.
    #[error("TABLE_NUM must be at least one")]
    TableCount,
    /// Table names must be bare SQL identifiers.
    #[error("TABLE_PREFIX must start with a letter or underscore and hold only ASCII letters, digits and underscores, got {0:?}")]
    TablePrefix(String),
    /// The store sink needs somewhere to write.
    #[error("DB_HOST must be set when writing to GreptimeDB")]
    Host,
    /// See [`tidal_payload::Error`].
    #[error(transparent)]
    Payload(#[from] tidal_payload::Error),
}

/// The ingestion collaborator receiving batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Sink {
    /// Write to GreptimeDB over its HTTP SQL API.
    Greptime,
    /// Accept and drop every batch. Useful as a dry run.
    Discard,
}

#[derive(Parser, Clone, PartialEq)]
#[clap(version, about, long_about = None)]
/// Main configuration struct for this program
pub struct Config {
    /// steady rate of batches per second, per table
    #[clap(long, env = "RATE", default_value_t = DEFAULT_RATE)]
    pub rate: f64,
    /// percent of client addresses that are IPv4
    #[clap(long, env = "IPV4_PERCENT", default_value_t = 100)]
    pub ipv4_percent: u8,
    /// percent of responses that are 200
    #[clap(long, env = "STATUS_OK_PERCENT", default_value_t = 80)]
    pub status_ok_percent: u8,
    /// fewest path segments
    #[clap(long, env = "PATH_MIN", default_value_t = 1)]
    pub path_min: u32,
    /// most path segments
    #[clap(long, env = "PATH_MAX", default_value_t = 5)]
    pub path_max: u32,
    /// percent of requests that are GET
    #[clap(long, env = "GET_PERCENT", default_value_t = 60)]
    pub get_percent: u8,
    /// percent of requests that are POST
    #[clap(long, env = "POST_PERCENT", default_value_t = 30)]
    pub post_percent: u8,
    /// percent of requests that are PUT
    #[clap(long, env = "PUT_PERCENT", default_value_t = 0)]
    pub put_percent: u8,
    /// percent of requests that are PATCH
    #[clap(long, env = "PATCH_PERCENT", default_value_t = 0)]
    pub patch_percent: u8,
    /// percent of requests that are DELETE
    #[clap(long, env = "DELETE_PERCENT", default_value_t = 0)]
    pub delete_percent: u8,
    /// fewest rows per batch
    #[clap(long, env = "MIN_ROW", default_value_t = 5)]
    pub min_row: u32,
    /// most rows per batch outside of a burst
    #[clap(long, env = "MAX_ROW", default_value_t = 100)]
    pub max_row: u32,
    /// number of tables, each driven independently
    #[clap(long, env = "TABLE_NUM", default_value_t = 10)]
    pub table_num: u32,
    /// largest burst multiplier, each table draws its own from half to full
    #[clap(long, env = "BURST_MULTIPLIER", default_value_t = 10.0)]
    pub burst_multiplier: f64,
    /// longest burst in seconds, each table draws its own from half to full
    #[clap(long, env = "BURST_DURATION", default_value_t = 30)]
    pub burst_duration: u32,
    /// longest cycle in seconds, each table draws its own from half to full
    #[clap(long, env = "CYCLE_DURATION", default_value_t = 60)]
    pub cycle_duration: u32,
    /// store host name
    #[clap(long, env = "DB_HOST", default_value = "")]
    pub db_host: String,
    /// store database name
    #[clap(long, env = "DATABASE", default_value = "")]
    pub database: String,
    /// store port
    #[clap(long, env = "DB_PORT", default_value_t = DEFAULT_DB_PORT)]
    pub db_port: u16,
    /// store user name
    #[clap(long, env = "DB_USERNAME", default_value = "")]
    pub db_username: String,
    /// store password
    #[clap(long, env = "DB_PASSWORD", default_value = "", hide_env_values = true)]
    pub db_password: String,
    /// talk plain HTTP to the store instead of HTTPS
    #[clap(long, env = "DB_INSECURE")]
    pub db_insecure: bool,
    /// store request timeout in seconds, no timeout when unset
    #[clap(long, env = "WRITE_TIMEOUT_SECONDS")]
    pub write_timeout_seconds: Option<u64>,
    /// table name prefix, table N is named PREFIX + N
    #[clap(long, env = "TABLE_PREFIX", default_value = DEFAULT_TABLE_PREFIX)]
    pub table_prefix: String,
    /// where batches are written
    #[clap(long, env = "SINK", value_enum, default_value_t = Sink::Greptime)]
    pub sink: Sink,
    /// seed for every random choice, drawn from the OS when unset
    #[clap(long, env = "SEED")]
    pub seed: Option<u64>,
    /// address to serve Prometheus metrics on, disabled when unset
    #[clap(long, env = "PROMETHEUS_ADDR")]
    pub prometheus_addr: Option<SocketAddr>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rate: DEFAULT_RATE,
            ipv4_percent: 100,
            status_ok_percent: 80,
            path_min: 1,
            path_max: 5,
            get_percent: 60,
            post_percent: 30,
            put_percent: 0,
            patch_percent: 0,
            delete_percent: 0,
            min_row: 5,
            max_row: 100,
            table_num: 10,
            burst_multiplier: 10.0,
            burst_duration: 30,
            cycle_duration: 60,
            db_host: String::new(),
            database: String::new(),
            db_port: DEFAULT_DB_PORT,
            db_username: String::new(),
            db_password: String::new(),
            db_insecure: false,
            write_timeout_seconds: None,
            table_prefix: DEFAULT_TABLE_PREFIX.to_string(),
            sink: Sink::Greptime,
            seed: None,
            prometheus_addr: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("rate", &self.rate)
            .field("ipv4_percent", &self.ipv4_percent)
            .field("status_ok_percent", &self.status_ok_percent)
            .field("path_min", &self.path_min)
            .field("path_max", &self.path_max)
            .field("methods", &self.methods())
            .field("min_row", &self.min_row)
            .field("max_row", &self.max_row)
            .field("table_num", &self.table_num)
            .field("burst_multiplier", &self.burst_multiplier)
            .field("burst_duration", &self.burst_duration)
            .field("cycle_duration", &self.cycle_duration)
            .field("db_host", &self.db_host)
            .field("database", &self.database)
            .field("db_port", &self.db_port)
            .field("db_username", &self.db_username)
            .field("db_password", &"<redacted>")
            .field("db_insecure", &self.db_insecure)
            .field("write_timeout_seconds", &self.write_timeout_seconds)
            .field("table_prefix", &self.table_prefix)
            .field("sink", &self.sink)
            .field("seed", &self.seed)
            .field("prometheus_addr", &self.prometheus_addr)
            .finish()
    }
}

impl Config {
    /// Normalize bounds and reject settings the generator cannot run with.
    ///
    /// Path and row bounds below one are raised to one and swapped if
    /// inverted.
    ///
    /// # Errors
    ///
    /// Returns an error for a non-positive rate or burst multiplier, a zero
    /// cycle, zero tables, a table prefix that is not a bare identifier, a
    /// missing store host, a burst row ceiling above [`MAX_BATCH_ROWS`], a
    /// percentage above 100, or GET and POST percentages summing to 100 or
    /// more.
    pub fn validate(mut self) -> Result<Self, Error> {
        if !self.rate.is_finite() || self.rate <= 0.0 {
            return Err(Error::Rate(self.rate));
        }
        if !self.burst_multiplier.is_finite() || self.burst_multiplier <= 0.0 {
            return Err(Error::BurstMultiplier(self.burst_multiplier));
        }
        if self.cycle_duration == 0 {
            return Err(Error::CycleDuration);
        }
        if self.table_num == 0 {
            return Err(Error::TableCount);
        }
        if !is_identifier(&self.table_prefix) {
            return Err(Error::TablePrefix(self.table_prefix));
        }
        if self.sink == Sink::Greptime && self.db_host.is_empty() {
            return Err(Error::Host);
        }

        (self.path_min, self.path_max) = tidal_payload::normalize(self.path_min, self.path_max);
        (self.min_row, self.max_row) = tidal_payload::normalize(self.min_row, self.max_row);
        let ceiling = f64::from(self.max_row) * self.burst_multiplier.max(1.0);
        if ceiling > f64::from(MAX_BATCH_ROWS) {
            return Err(Error::BatchRows(ceiling));
        }

        // Surface percentage and method weight errors now rather than from
        // inside a driver.
        access_log::AccessLog::new(self.access_log())?;

        Ok(self)
    }

    /// Request method weights.
    #[must_use]
    pub fn methods(&self) -> MethodWeights {
        MethodWeights {
            get: self.get_percent,
            post: self.post_percent,
            put: self.put_percent,
            patch: self.patch_percent,
            delete: self.delete_percent,
        }
    }

    /// Field weights for the access-log generator.
    #[must_use]
    pub fn access_log(&self) -> access_log::Config {
        access_log::Config {
            ipv4_percent: self.ipv4_percent,
            status_ok_percent: self.status_ok_percent,
            methods: self.methods(),
            path_length: PathLength {
                min: self.path_min,
                max: self.path_max,
            },
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, FromArgMatches};

    use super::{Config, Error, MAX_BATCH_ROWS, Sink};

    // Parse flags alone. Env lookups are switched off so the host
    // environment cannot leak into the result.
    fn parse(args: &[&str]) -> Result<Config, clap::Error> {
        let matches = Config::command()
            .mut_args(|arg| arg.env(None::<&'static str>))
            .try_get_matches_from(args)?;
        Config::from_arg_matches(&matches)
    }

    fn discard() -> Config {
        Config {
            sink: Sink::Discard,
            ..Config::default()
        }
    }

    #[test]
    fn defaults_match_cli_defaults() {
        let parsed = parse(&["tidal"]).expect("defaults parse");
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn flags_override_defaults() {
        let parsed = parse(&[
            "tidal",
            "--rate",
            "0.5",
            "--table-num",
            "3",
            "--sink",
            "discard",
            "--seed",
            "42",
        ])
        .expect("flags parse");
        assert!((parsed.rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(parsed.table_num, 3);
        assert_eq!(parsed.sink, Sink::Discard);
        assert_eq!(parsed.seed, Some(42));
    }

    #[test]
    fn validate_normalizes_bounds() {
        let config = Config {
            path_min: 5,
            path_max: 1,
            min_row: 0,
            max_row: 0,
            ..discard()
        }
        .validate()
        .expect("valid config");
        assert_eq!((config.path_min, config.path_max), (1, 5));
        assert_eq!((config.min_row, config.max_row), (1, 1));
    }

    #[test]
    fn validate_rejects_saturated_get_post() {
        let result = Config {
            get_percent: 50,
            post_percent: 50,
            ..discard()
        }
        .validate();
        assert_eq!(
            result,
            Err(Error::Payload(tidal_payload::Error::MethodWeights(100)))
        );
    }

    #[test]
    fn validate_rejects_non_positive_rate() {
        assert_eq!(
            Config {
                rate: 0.0,
                ..discard()
            }
            .validate(),
            Err(Error::Rate(0.0))
        );
        assert!(matches!(
            Config {
                rate: f64::NAN,
                ..discard()
            }
            .validate(),
            Err(Error::Rate(_))
        ));
    }

    #[test]
    fn validate_caps_burst_rows() {
        let result = Config {
            burst_multiplier: 1e9,
            ..discard()
        }
        .validate();
        assert!(matches!(result, Err(Error::BatchRows(rows)) if rows > f64::from(MAX_BATCH_ROWS)));
        let result = Config {
            max_row: MAX_BATCH_ROWS + 1,
            burst_multiplier: 0.5,
            ..discard()
        }
        .validate();
        assert!(matches!(result, Err(Error::BatchRows(_))));
        let config = Config {
            max_row: MAX_BATCH_ROWS / 10,
            burst_multiplier: 10.0,
            ..discard()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_cycle_and_tables() {
        assert_eq!(
            Config {
                cycle_duration: 0,
                ..discard()
            }
            .validate(),
            Err(Error::CycleDuration)
        );
        assert_eq!(
            Config {
                table_num: 0,
                ..discard()
            }
            .validate(),
            Err(Error::TableCount)
        );
    }

    #[test]
    fn validate_requires_host_for_greptime() {
        assert_eq!(Config::default().validate(), Err(Error::Host));
        let config = Config {
            db_host: "localhost".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_quoted_prefix() {
        assert!(matches!(
            Config {
                table_prefix: "logs; drop".to_string(),
                ..discard()
            }
            .validate(),
            Err(Error::TablePrefix(_))
        ));
        assert!(matches!(
            Config {
                table_prefix: "0logs".to_string(),
                ..discard()
            }
            .validate(),
            Err(Error::TablePrefix(_))
        ));
    }

    #[test]
    fn debug_redacts_password() {
        let config = Config {
            db_password: "hunter2".to_string(),
            ..Config::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
