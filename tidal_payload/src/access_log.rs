//! Web-server access-log records.

use std::{
    net::IpAddr,
    time::{SystemTime, UNIX_EPOCH},
};

use crate::{
    Error, Method, MethodWeights, PathLength, Value, check_percentage, ip, path, status,
    user_agent::UserAgent,
};

/// Protocol version stamped on every request.
pub const HTTP_VERSION: &str = "HTTP/1.1";

/// Referrer stamped on every request.
pub const REFERRER: &str = "-";

/// Field weights for [`AccessLog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Percent of client addresses that are IPv4.
    pub ipv4_percent: u8,
    /// Percent of responses that are 200.
    pub status_ok_percent: u8,
    /// Request method weights.
    pub methods: MethodWeights,
    /// Path segment count bounds.
    pub path_length: PathLength,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ipv4_percent: 100,
            status_ok_percent: 80,
            methods: MethodWeights::default(),
            path_length: PathLength::default(),
        }
    }
}

/// One access-log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRow {
    /// Client address.
    pub ip: IpAddr,
    /// Request method.
    pub method: Method,
    /// Request path.
    pub path: String,
    /// Protocol version.
    pub http_version: &'static str,
    /// Response status.
    pub status_code: u16,
    /// Response body size in bytes.
    pub bytes_sent: u32,
    /// Referrer.
    pub referrer: &'static str,
    /// Client user agent.
    pub user_agent: String,
    /// Generation instant, milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
}

impl LogRow {
    /// Positional values in [`crate::schema::ACCESS_LOG`] order.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn into_values(self) -> Vec<Value> {
        vec![
            Value::String(self.ip.to_string()),
            Value::String(self.method.as_str().to_string()),
            Value::String(self.path),
            Value::String(self.http_version.to_string()),
            Value::Int32(i32::from(self.status_code)),
            // Body sizes are bounded far below i32::MAX.
            Value::Int32(self.bytes_sent as i32),
            Value::String(self.referrer.to_string()),
            Value::String(self.user_agent),
            Value::TimestampMillisecond(self.timestamp_ms),
        ]
    }
}

/// Access-log row generator.
#[derive(Debug, Clone, Copy)]
pub struct AccessLog {
    config: Config,
}

impl AccessLog {
    /// Construct a new instance of `AccessLog`, normalizing the path bounds.
    ///
    /// # Errors
    ///
    /// Returns an error if any percentage lies outside 0..=100 or the method
    /// weights are unusable, see [`MethodWeights::validate`].
    pub fn new(config: Config) -> Result<Self, Error> {
        check_percentage("IPv4", config.ipv4_percent)?;
        check_percentage("status OK", config.status_ok_percent)?;
        let methods = config.methods.validate()?;
        Ok(Self {
            config: Config {
                methods,
                path_length: config.path_length.normalized(),
                ..config
            },
        })
    }

    /// The normalized configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Generate a row stamped with the current wall-clock time.
    pub fn generate<R>(&self, rng: &mut R) -> LogRow
    where
        R: rand::Rng + ?Sized,
    {
        self.generate_at(rng, now_millis())
    }

    /// Generate a row stamped `timestamp_ms`.
    pub fn generate_at<R>(&self, rng: &mut R, timestamp_ms: i64) -> LogRow
    where
        R: rand::Rng + ?Sized,
    {
        let status_code = status::status_code(rng, self.config.status_ok_percent);
        let user_agent: UserAgent = rng.random();
        LogRow {
            ip: ip::address(rng, self.config.ipv4_percent),
            method: self.config.methods.choose(rng),
            path: path::path(rng, self.config.path_length),
            http_version: HTTP_VERSION,
            status_code,
            bytes_sent: status::bytes_sent(rng, status_code),
            referrer: REFERRER,
            user_agent: user_agent.to_string(),
            timestamp_ms,
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn now_millis() -> i64 {
    // A clock set before 1970 stamps rows at the epoch.
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;
    use rand::{SeedableRng, rngs::SmallRng};

    use super::{AccessLog, Config, HTTP_VERSION, REFERRER};
    use crate::{Batch, Error, MethodWeights, PathLength, status};

    #[test]
    fn new_normalizes_path_length() {
        let generator = AccessLog::new(Config {
            path_length: PathLength { min: 5, max: 0 },
            ..Config::default()
        })
        .expect("valid config");
        assert_eq!(
            generator.config().path_length,
            PathLength { min: 1, max: 5 }
        );
    }

    #[test]
    fn new_rejects_saturated_get_post() {
        let result = AccessLog::new(Config {
            methods: MethodWeights {
                get: 70,
                post: 30,
                ..MethodWeights::default()
            },
            ..Config::default()
        });
        assert!(matches!(result, Err(Error::MethodWeights(100))));
    }

    #[test]
    fn new_rejects_out_of_range_percentage() {
        let result = AccessLog::new(Config {
            status_ok_percent: 101,
            ..Config::default()
        });
        assert!(matches!(result, Err(Error::Percentage { .. })));
    }

    proptest! {
        // Every generated row fits the schema.
        #[test]
        fn rows_fit_schema(seed: u64, rows in 1usize..32) {
            let mut rng = SmallRng::seed_from_u64(seed);
            let generator = AccessLog::new(Config::default()).expect("valid config");
            let mut batch = Batch::with_capacity("nginx_logs_0", rows).expect("named table");
            for _ in 0..rows {
                batch.push_row(generator.generate(&mut rng)).expect("row fits schema");
            }
            prop_assert_eq!(batch.len(), rows);
        }

        #[test]
        fn constants_and_status_bytes(seed: u64, timestamp_ms: i64) {
            let mut rng = SmallRng::seed_from_u64(seed);
            let generator = AccessLog::new(Config::default()).expect("valid config");
            let row = generator.generate_at(&mut rng, timestamp_ms);
            prop_assert_eq!(row.http_version, HTTP_VERSION);
            prop_assert_eq!(row.referrer, REFERRER);
            prop_assert_eq!(row.timestamp_ms, timestamp_ms);
            // Default weights are all IPv4.
            prop_assert!(row.ip.is_ipv4());
            if row.status_code == status::OK {
                prop_assert!(status::OK_BYTES.contains(&row.bytes_sent));
            } else {
                prop_assert!(status::NON_OK_BYTES.contains(&row.bytes_sent));
            }
        }
    }
}
