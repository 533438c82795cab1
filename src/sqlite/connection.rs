use rusqlite::Connection;
use tracing::debug;

use super::config::SqliteOptions;
use super::query::run_batch;
use crate::command::Command;
use crate::driver::{Backend, RowCursor};
use crate::error::SqlSessionError;
use crate::reader::BufferedCursor;
use crate::types::{ConnectionState, Provider};

/// `SQLite` connection behind the session's `Backend` seam.
#[derive(Default)]
pub struct SqliteBackend {
    conn: Option<Connection>,
}

impl SqliteBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn conn(&self) -> Result<&Connection, SqlSessionError> {
        self.conn.as_ref().ok_or_else(|| {
            SqlSessionError::ConnectionError("SQLite connection is not open".to_string())
        })
    }
}

impl Backend for SqliteBackend {
    fn provider(&self) -> Provider {
        Provider::Sqlite
    }

    fn state(&self) -> ConnectionState {
        if self.conn.is_some() {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        }
    }

    fn open(&mut self, connection_string: &str) -> Result<(), SqlSessionError> {
        let options = SqliteOptions::parse(connection_string)?;
        self.conn = Some(options.open()?);
        debug!(mode = ?options.mode, "SQLite connection opened");
        Ok(())
    }

    fn close(&mut self) -> Result<(), SqlSessionError> {
        match self.conn.take() {
            Some(conn) => {
                conn.close().map_err(|(_, err)| err)?;
                debug!("SQLite connection closed");
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn begin_transaction(&mut self) -> Result<(), SqlSessionError> {
        Ok(self.conn()?.execute_batch("BEGIN")?)
    }

    fn commit(&mut self) -> Result<(), SqlSessionError> {
        Ok(self.conn()?.execute_batch("COMMIT")?)
    }

    fn rollback(&mut self) -> Result<(), SqlSessionError> {
        let conn = self.conn()?;
        if conn.is_autocommit() {
            return Ok(());
        }
        Ok(conn.execute_batch("ROLLBACK")?)
    }

    fn execute_non_query(&mut self, command: &Command) -> Result<usize, SqlSessionError> {
        Ok(run_batch(self.conn()?, command)?.rows_affected)
    }

    fn open_cursor<'a>(
        &'a mut self,
        command: &'a Command,
    ) -> Result<Box<dyn RowCursor + 'a>, SqlSessionError> {
        let outcome = run_batch(self.conn()?, command)?;
        Ok(Box::new(BufferedCursor::new(outcome.results)))
    }
}
