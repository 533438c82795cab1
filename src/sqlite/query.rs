use std::collections::VecDeque;

use rusqlite::fallible_iterator::FallibleIterator;
use rusqlite::types::Value;
use rusqlite::{Batch, Connection, Statement};

use super::params::NamedParams;
use crate::command::Command;
use crate::error::SqlSessionError;
use crate::reader::ResultBuffer;
use crate::types::{CommandType, RowValues};

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
///
/// Returns `SqlSessionError::SqliteError` if the value cannot be read.
pub fn sqlite_extract_value(row: &rusqlite::Row, idx: usize) -> Result<RowValues, SqlSessionError> {
    let value: Value = row.get(idx)?;
    match value {
        Value::Null => Ok(RowValues::Null),
        Value::Integer(i) => Ok(RowValues::Int(i)),
        Value::Real(f) => Ok(RowValues::Float(f)),
        Value::Text(s) => Ok(RowValues::Text(s)),
        Value::Blob(b) => Ok(RowValues::Blob(b)),
    }
}

/// What running a command produced.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub rows_affected: usize,
    /// One entry per statement that returned columns.
    pub results: Vec<ResultBuffer>,
}

/// Run every statement of `command` in order, binding named parameters per statement.
///
/// Statements that return columns are read to completion into `results`. Rows affected
/// are counted only for statements that inserted, updated or deleted rows.
///
/// # Errors
///
/// Returns `SqlSessionError::Unimplemented` for stored procedures, `ParameterError` for
/// unmatched or unused parameters, and the driver error otherwise.
pub fn run_batch(conn: &Connection, command: &Command) -> Result<BatchOutcome, SqlSessionError> {
    if command.command_type() == CommandType::StoredProcedure {
        return Err(SqlSessionError::Unimplemented(
            "SQLite does not support stored procedures".to_string(),
        ));
    }

    let mut params = NamedParams::new(command.parameters())?;
    let mut outcome = BatchOutcome::default();
    let mut batch = Batch::new(conn, command.text());
    while let Some(mut stmt) = batch.next()? {
        params.bind(&mut stmt)?;
        // changes() keeps the last DML count across DDL; only trust it if this statement wrote
        let total_before = conn.total_changes();
        if stmt.column_count() > 0 {
            outcome.results.push(read_all(&mut stmt)?);
        } else {
            stmt.raw_execute()?;
        }
        if conn.total_changes() != total_before {
            outcome.rows_affected += changes(conn)?;
        }
    }
    params.ensure_all_used()?;
    Ok(outcome)
}

fn read_all(stmt: &mut Statement<'_>) -> Result<ResultBuffer, SqlSessionError> {
    let columns: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let mut rows = VecDeque::new();
    let mut query = stmt.raw_query();
    while let Some(row) = query.next()? {
        let values = (0..columns.len())
            .map(|i| sqlite_extract_value(row, i))
            .collect::<Result<Vec<_>, _>>()?;
        rows.push_back(values);
    }
    Ok((columns, rows))
}

fn changes(conn: &Connection) -> Result<usize, SqlSessionError> {
    usize::try_from(conn.changes()).map_err(|e| {
        SqlSessionError::ExecutionError(format!("Invalid rows affected count: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::SqlParameter;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT);")
            .unwrap();
        conn
    }

    #[test]
    fn counts_rows_across_statements() {
        let conn = setup();
        let mut cmd = Command::new(
            "INSERT INTO t VALUES (@id, @name); INSERT INTO t VALUES (@id + 1, @name);",
        );
        cmd.add_parameter(SqlParameter::new("id", 1));
        cmd.add_parameter(SqlParameter::new("name", "a"));
        let outcome = run_batch(&conn, &cmd).unwrap();
        assert_eq!(outcome.rows_affected, 2);
        assert!(outcome.results.is_empty());
    }

    #[test]
    fn ddl_does_not_repeat_the_previous_dml_count() {
        let conn = setup();
        let cmd = Command::new(
            "INSERT INTO t VALUES (1, 'a'), (2, 'b'), (3, 'c'); CREATE TABLE u (a INTEGER)",
        );
        assert_eq!(run_batch(&conn, &cmd).unwrap().rows_affected, 3);

        let cmd = Command::new("DROP TABLE u");
        assert_eq!(run_batch(&conn, &cmd).unwrap().rows_affected, 0);
    }

    #[test]
    fn buffers_each_select() {
        let conn = setup();
        conn.execute_batch("INSERT INTO t VALUES (1, 'a'), (2, 'b');")
            .unwrap();
        let cmd = Command::new("SELECT id FROM t ORDER BY id; UPDATE t SET name = 'z'; SELECT name FROM t");
        let outcome = run_batch(&conn, &cmd).unwrap();
        assert_eq!(outcome.rows_affected, 2);
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[0].0, vec!["id".to_string()]);
        assert_eq!(outcome.results[0].1.len(), 2);
        assert_eq!(outcome.results[1].1[0], vec![RowValues::Text("z".into())]);
    }

    #[test]
    fn stored_procedures_are_unimplemented() {
        let conn = setup();
        let mut cmd = Command::new("do_things");
        cmd.set_command_type(CommandType::StoredProcedure);
        assert!(matches!(
            run_batch(&conn, &cmd),
            Err(SqlSessionError::Unimplemented(_))
        ));
    }
}
