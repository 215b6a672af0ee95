//! SQL rendering of access-log batches for GreptimeDB.
//!
//! Table names reach this module already validated as bare identifiers, see
//! [`crate::config::Config::validate`], and column names come from the fixed
//! schema. Only string values need escaping.

use tidal_payload::{Batch, Column, ColumnType, Value};

fn sql_type(kind: ColumnType) -> &'static str {
    match kind {
        ColumnType::String => "STRING",
        ColumnType::Int32 => "INT",
        ColumnType::TimestampMillisecond => "TIMESTAMP(3)",
    }
}

/// `CREATE TABLE IF NOT EXISTS` for `table` with `columns`.
///
/// The millisecond timestamp column is the table's time index.
pub(crate) fn create_table(table: &str, columns: &[Column]) -> String {
    let definitions: Vec<String> = columns
        .iter()
        .map(|column| {
            let mut definition = format!("{} {}", column.name, sql_type(column.kind));
            if column.kind == ColumnType::TimestampMillisecond {
                definition.push_str(" TIME INDEX");
            }
            definition
        })
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {table} ({})",
        definitions.join(", ")
    )
}

/// One multi-row `INSERT` carrying every row of `batch`.
///
/// Callers must not pass an empty batch, the statement would have no
/// `VALUES` tuples.
pub(crate) fn insert(batch: &Batch) -> String {
    let names: Vec<&str> = batch.columns().iter().map(|column| column.name).collect();
    let mut statement = format!(
        "INSERT INTO {} ({}) VALUES ",
        batch.table(),
        names.join(", ")
    );
    for (index, row) in batch.rows().iter().enumerate() {
        if index > 0 {
            statement.push_str(", ");
        }
        statement.push('(');
        for (position, value) in row.iter().enumerate() {
            if position > 0 {
                statement.push_str(", ");
            }
            push_literal(&mut statement, value);
        }
        statement.push(')');
    }
    statement
}

fn push_literal(statement: &mut String, value: &Value) {
    match value {
        Value::String(s) => {
            statement.push('\'');
            statement.push_str(&s.replace('\'', "''"));
            statement.push('\'');
        }
        Value::Int32(i) => statement.push_str(&i.to_string()),
        Value::TimestampMillisecond(ms) => statement.push_str(&ms.to_string()),
    }
}
