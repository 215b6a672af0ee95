//! The tidal payloads
//!
//! This library fabricates web-server access-log records. Every field has its
//! own small generator, each a function of its weighting parameters and a
//! caller supplied source of randomness. [`AccessLog`] strings them together
//! into a [`LogRow`] and [`Batch`] collects rows against the fixed
//! access-log [`schema`].

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

pub mod access_log;
pub mod ip;
pub mod method;
pub mod path;
pub mod schema;
pub mod status;
pub mod user_agent;

pub use access_log::{AccessLog, LogRow};
pub use method::{Method, MethodWeights};
pub use path::PathLength;
pub use schema::{Batch, Column, ColumnType, Value};

/// Errors produced by payload construction.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// GET and POST weights leave nothing for the remaining methods.
    #[error("GET and POST percentages add up to {0}, must be below 100")]
    MethodWeights(u16),
    /// A percentage lies outside 0..=100.
    #[error("{name} percentage must be within 0..=100, got {value}")]
    Percentage {
        /// The offending setting.
        name: &'static str,
        /// Its value.
        value: u8,
    },
    /// A batch was opened for a table with no name.
    #[error("Table name must not be empty")]
    EmptyTable,
    /// A row carried the wrong number of values.
    #[error("Row has {got} values but the schema has {expected} columns")]
    Arity {
        /// Columns in the schema.
        expected: usize,
        /// Values in the row.
        got: usize,
    },
    /// A row value did not match its column's type.
    #[error("Column {column} holds {expected} values, got {got}")]
    ColumnType {
        /// The column name.
        column: &'static str,
        /// The column's declared type.
        expected: ColumnType,
        /// The type of the value offered.
        got: ColumnType,
    },
}

/// Raise `min` and `max` to at least one, then order them.
///
/// Applied to both path segment bounds and batch row bounds.
#[must_use]
pub fn normalize(min: u32, max: u32) -> (u32, u32) {
    let min = min.max(1);
    let max = max.max(1);
    if min > max { (max, min) } else { (min, max) }
}

/// Upper bound, inclusive, of every percentage roll.
pub(crate) const ROLL_MAX: u8 = 100;

/// Draw a uniform percentage roll in `0..=100`.
pub(crate) fn roll<R>(rng: &mut R) -> u8
where
    R: rand::Rng + ?Sized,
{
    rng.random_range(0..=ROLL_MAX)
}

/// Reject a percentage outside `0..=100`.
pub(crate) fn check_percentage(name: &'static str, value: u8) -> Result<u8, Error> {
    if value > ROLL_MAX {
        return Err(Error::Percentage { name, value });
    }
    Ok(value)
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::normalize;

    #[test]
    fn normalize_swaps_inverted_bounds() {
        assert_eq!(normalize(5, 1), (1, 5));
    }

    #[test]
    fn normalize_raises_zero() {
        assert_eq!(normalize(0, 5), (1, 5));
        assert_eq!(normalize(0, 0), (1, 1));
        assert_eq!(normalize(3, 0), (1, 3));
    }

    proptest! {
        #[test]
        fn normalized_bounds_are_ordered_and_positive(min: u32, max: u32) {
            let (lo, hi) = normalize(min, max);
            prop_assert!(lo >= 1);
            prop_assert!(lo <= hi);
            prop_assert_eq!((lo, hi), normalize(lo, hi));
        }
    }
}
