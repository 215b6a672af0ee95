//! The access-log table schema and batches built against it.
//!
//! Every table shares one fixed, ordered column list. Only the table name
//! differs. A [`Batch`] checks each row it accepts against that list so a
//! malformed row is refused at build time rather than by the store.

use std::fmt;

use crate::{Error, LogRow};

/// The semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// UTF-8 string field.
    String,
    /// 32-bit signed integer field.
    Int32,
    /// Millisecond precision timestamp. The time index of the table.
    TimestampMillisecond,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnType::String => "string",
            ColumnType::Int32 => "int32",
            ColumnType::TimestampMillisecond => "timestamp_millisecond",
        };
        write!(f, "{s}")
    }
}

/// A named, typed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Column name.
    pub name: &'static str,
    /// Column type.
    pub kind: ColumnType,
}

const fn column(name: &'static str, kind: ColumnType) -> Column {
    Column { name, kind }
}

/// The access-log columns, in row order. Eight fields then the timestamp.
pub const ACCESS_LOG: [Column; 9] = [
    column("ip", ColumnType::String),
    column("http_method", ColumnType::String),
    column("path", ColumnType::String),
    column("http_version", ColumnType::String),
    column("status_code", ColumnType::Int32),
    column("body_bytes_sent", ColumnType::Int32),
    column("referrer", ColumnType::String),
    column("user_agent", ColumnType::String),
    column("time_local", ColumnType::TimestampMillisecond),
];

/// One positional value of a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// See [`ColumnType::String`].
    String(String),
    /// See [`ColumnType::Int32`].
    Int32(i32),
    /// See [`ColumnType::TimestampMillisecond`], milliseconds since the Unix
    /// epoch.
    TimestampMillisecond(i64),
}

impl Value {
    /// The column type this value fits.
    #[must_use]
    pub fn kind(&self) -> ColumnType {
        match self {
            Value::String(_) => ColumnType::String,
            Value::Int32(_) => ColumnType::Int32,
            Value::TimestampMillisecond(_) => ColumnType::TimestampMillisecond,
        }
    }
}

/// Rows bound for one table, checked against the access-log schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    table: String,
    columns: &'static [Column],
    rows: Vec<Vec<Value>>,
}

impl Batch {
    /// Open an empty batch for `table` with room for `capacity` rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyTable`] if `table` is empty.
    pub fn with_capacity(table: &str, capacity: usize) -> Result<Self, Error> {
        if table.is_empty() {
            return Err(Error::EmptyTable);
        }
        Ok(Self {
            table: table.to_string(),
            columns: &ACCESS_LOG,
            rows: Vec::with_capacity(capacity),
        })
    }

    /// Append positional `values`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Arity`] if the value count differs from the column
    /// count and [`Error::ColumnType`] on the first value whose type differs
    /// from its column. The batch is unchanged on error.
    pub fn push(&mut self, values: Vec<Value>) -> Result<(), Error> {
        if values.len() != self.columns.len() {
            return Err(Error::Arity {
                expected: self.columns.len(),
                got: values.len(),
            });
        }
        for (column, value) in self.columns.iter().zip(values.iter()) {
            if column.kind != value.kind() {
                return Err(Error::ColumnType {
                    column: column.name,
                    expected: column.kind,
                    got: value.kind(),
                });
            }
        }
        self.rows.push(values);
        Ok(())
    }

    /// Append a generated access-log row.
    ///
    /// # Errors
    ///
    /// See [`Batch::push`].
    pub fn push_row(&mut self, row: LogRow) -> Result<(), Error> {
        self.push(row.into_values())
    }

    /// The destination table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The column list, in row order.
    #[must_use]
    pub fn columns(&self) -> &'static [Column] {
        self.columns
    }

    /// The accepted rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the batch holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::{ACCESS_LOG, Batch, ColumnType, Value};
    use crate::Error;

    fn values() -> Vec<Value> {
        vec![
            Value::String("10.0.0.1".to_string()),
            Value::String("GET".to_string()),
            Value::String("/index.html".to_string()),
            Value::String("HTTP/1.1".to_string()),
            Value::Int32(200),
            Value::Int32(1024),
            Value::String("-".to_string()),
            Value::String("curl/8.0".to_string()),
            Value::TimestampMillisecond(1_700_000_000_000),
        ]
    }

    #[test]
    fn schema_is_eight_fields_and_a_timestamp() {
        assert_eq!(ACCESS_LOG.len(), 9);
        let timestamps = ACCESS_LOG
            .iter()
            .filter(|c| c.kind == ColumnType::TimestampMillisecond)
            .count();
        assert_eq!(timestamps, 1);
        assert_eq!(
            ACCESS_LOG.last().map(|c| c.kind),
            Some(ColumnType::TimestampMillisecond)
        );
    }

    #[test]
    fn accepts_well_formed_row() {
        let mut batch = Batch::with_capacity("nginx_logs_0", 1).expect("named table");
        batch.push(values()).expect("row fits schema");
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.table(), "nginx_logs_0");
    }

    #[test]
    fn rejects_short_row() {
        let mut batch = Batch::with_capacity("t", 1).expect("named table");
        let mut row = values();
        row.pop();
        assert_eq!(
            batch.push(row),
            Err(Error::Arity {
                expected: 9,
                got: 8
            })
        );
        assert!(batch.is_empty());
    }

    #[test]
    fn rejects_mistyped_value() {
        let mut batch = Batch::with_capacity("t", 1).expect("named table");
        let mut row = values();
        row[4] = Value::String("200".to_string());
        assert_eq!(
            batch.push(row),
            Err(Error::ColumnType {
                column: "status_code",
                expected: ColumnType::Int32,
                got: ColumnType::String,
            })
        );
        assert!(batch.is_empty());
    }

    #[test]
    fn rejects_empty_table_name() {
        assert_eq!(Batch::with_capacity("", 0), Err(Error::EmptyTable));
    }
}
