//! A sink that accepts and drops every batch.

use async_trait::async_trait;
use tidal_payload::Batch;
use tracing::trace;

use super::{Ack, Error, Ingest};

/// Accepts every batch, writes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

#[async_trait]
impl Ingest for Discard {
    async fn write(&self, batch: &Batch) -> Result<Ack, Error> {
        trace!("discarding {} rows for {}", batch.len(), batch.table());
        Ok(Ack {
            rows: batch.len() as u64,
            detail: "discarded".to_string(),
        })
    }
}
