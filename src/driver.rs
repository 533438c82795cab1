//! The seam between a [`Session`](crate::Session) and a concrete database driver.

use crate::command::Command;
use crate::error::SqlSessionError;
use crate::types::{ConnectionState, Provider, RowValues};

/// Forward-only cursor over the result sets of one executed command.
///
/// A cursor starts positioned on the first result set (if any).
pub trait RowCursor {
    /// Column names of the current result set; empty if the command produced none.
    fn columns(&self) -> &[String];

    /// Next row of the current result set, or `None` once it is exhausted.
    ///
    /// # Errors
    ///
    /// Returns the driver error if reading fails.
    fn next_row(&mut self) -> Result<Option<Vec<RowValues>>, SqlSessionError>;

    /// Skip whatever remains of the current result set and move to the next one.
    ///
    /// Returns `false` when there are no more result sets.
    ///
    /// # Errors
    ///
    /// Returns the driver error if reading fails.
    fn next_result(&mut self) -> Result<bool, SqlSessionError>;
}

/// Connection, transaction and command primitives of one driver.
///
/// A backend owns at most one connection. The session decides when to open, close and
/// begin transactions; the backend only carries them out.
pub trait Backend: Send {
    fn provider(&self) -> Provider;

    fn state(&self) -> ConnectionState;

    /// Open a connection. Only called while the state is `Closed` or `Broken`.
    ///
    /// # Errors
    ///
    /// Returns the driver error if the connection cannot be established.
    fn open(&mut self, connection_string: &str) -> Result<(), SqlSessionError>;

    /// Close the connection if one is held. Closing a closed backend is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the driver error if shutting the connection down fails.
    fn close(&mut self) -> Result<(), SqlSessionError>;

    /// # Errors
    ///
    /// Returns the driver error if the transaction cannot be started.
    fn begin_transaction(&mut self) -> Result<(), SqlSessionError>;

    /// # Errors
    ///
    /// Returns the driver error if the commit fails.
    fn commit(&mut self) -> Result<(), SqlSessionError>;

    /// # Errors
    ///
    /// Returns the driver error if the rollback fails.
    fn rollback(&mut self) -> Result<(), SqlSessionError>;

    /// Execute `command` and return the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns the driver error, or `ParameterError` for unusable parameters.
    fn execute_non_query(&mut self, command: &Command) -> Result<usize, SqlSessionError>;

    /// Execute `command` and return a cursor over its result sets.
    ///
    /// # Errors
    ///
    /// Returns the driver error, or `ParameterError` for unusable parameters.
    fn open_cursor<'a>(
        &'a mut self,
        command: &'a Command,
    ) -> Result<Box<dyn RowCursor + 'a>, SqlSessionError>;
}

/// Create the backend for `provider`.
///
/// # Errors
///
/// Returns `SqlSessionError::Unimplemented` if the provider's cargo feature is disabled,
/// or the error raised while setting the backend up.
pub fn create_backend(provider: Provider) -> Result<Box<dyn Backend>, SqlSessionError> {
    match provider {
        #[cfg(feature = "mssql")]
        Provider::SqlServer => Ok(Box::new(crate::mssql::MssqlBackend::new()?)),
        #[cfg(not(feature = "mssql"))]
        Provider::SqlServer => Err(SqlSessionError::Unimplemented(
            "SQL Server support requires the `mssql` feature".to_string(),
        )),
        #[cfg(feature = "sqlite")]
        Provider::Sqlite => Ok(Box::new(crate::sqlite::SqliteBackend::new())),
        #[cfg(not(feature = "sqlite"))]
        Provider::Sqlite => Err(SqlSessionError::Unimplemented(
            "SQLite support requires the `sqlite` feature".to_string(),
        )),
    }
}
