//! The ingestion collaborator.
//!
//! Drivers hand every finished [`Batch`] to an [`Ingest`]. One sink is built
//! at startup and shared by all drivers, so implementations must be safe to
//! call concurrently.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use tidal_payload::Batch;

use crate::config::{Config, Sink};

pub mod discard;
pub mod greptime;

pub use discard::Discard;
pub use greptime::Greptime;

#[derive(thiserror::Error, Debug)]
/// Errors produced by [`Ingest`] implementations.
pub enum Error {
    /// The sink could not be constructed. Fatal.
    #[error("Failed to build sink: {0}")]
    Build(String),
    /// Wrapper around [`reqwest::Error`].
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The store answered with a non-success status.
    #[error("Store responded {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, as text
        body: String,
    },
    /// The store accepted the request but reported a failure in its body.
    #[error("Store reported an error: {0}")]
    Response(String),
}

/// What a sink reports back for a write. Only ever logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// Rows the sink reports as written.
    pub rows: u64,
    /// Opaque description of the response.
    pub detail: String,
}

#[async_trait]
/// A destination for access-log batches
pub trait Ingest: fmt::Debug + Send + Sync {
    /// Write one batch.
    ///
    /// # Errors
    ///
    /// Any error is transient from the caller's point of view: the batch is
    /// dropped and the caller moves on.
    async fn write(&self, batch: &Batch) -> Result<Ack, Error>;
}

/// Construct the sink selected by `config`.
///
/// # Errors
///
/// Returns [`Error::Build`] if the HTTP client cannot be constructed.
pub fn build(config: &Config) -> Result<Arc<dyn Ingest>, Error> {
    match config.sink {
        Sink::Greptime => Ok(Arc::new(Greptime::new(config)?)),
        Sink::Discard => Ok(Arc::new(Discard)),
    }
}

#[cfg(test)]
mod test {
    use super::{Config, Sink, build};

    #[tokio::test]
    async fn build_discard() {
        let config = Config {
            sink: Sink::Discard,
            ..Config::default()
        };
        assert!(build(&config).is_ok());
    }

    #[tokio::test]
    async fn build_greptime() {
        let config = Config {
            db_host: "localhost".to_string(),
            ..Config::default()
        };
        assert!(build(&config).is_ok());
    }
}
