//! The tidal access-log load generator.
//!
//! This library supports the tidal binary found elsewhere in this project.
//! Each simulated table gets a [`table::Table`] with its own randomized
//! steady/burst profile and a [`driver::Driver`] that paces itself against
//! that profile, fabricates access-log batches and hands them to a shared
//! [`ingest::Ingest`] sink.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_copy_implementations)]
#![deny(missing_debug_implementations)]
#![allow(clippy::cast_precision_loss)]

pub(crate) mod codec;
pub mod config;
pub mod driver;
pub mod ingest;
pub mod table;
