use tracing::{debug, info, warn};

use crate::command::{Command, SqlParameter};
use crate::config::ConnectionStrings;
use crate::driver::{Backend, create_backend};
use crate::error::SqlSessionError;
use crate::reader::{DataReader, fill_dataset, fill_table};
use crate::results::{DataSet, DataTable};
use crate::types::{CommandType, ConnectionState, Provider, RowValues};

/// Lifecycle of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Connected, no transaction. The next execution is the last one.
    Ready,
    /// Connected inside a transaction; executions keep the session alive.
    InTransaction,
    /// Resources released; every execution fails with `Disposed`.
    Disposed,
}

/// One connection, one command and at most one transaction.
///
/// A session opened with [`Session::open`] is single-shot: the first execution releases
/// the connection, whether it succeeds or not, and later executions fail with
/// [`SqlSessionError::Disposed`]. A session opened with [`Session::open_transactional`]
/// stays connected until [`commit`](Session::commit), [`rollback`](Session::rollback) or
/// [`dispose`](Session::dispose). Dropping a session disposes it, rolling back any
/// uncommitted transaction.
///
/// ```rust,no_run
/// use sql_session::prelude::*;
///
/// # fn main() -> Result<(), SqlSessionError> {
/// let config = ConnectionStrings::from_json_file("connections.json")?;
/// let mut session = Session::open(&config, "Main")?;
/// session.set_command_text("INSERT INTO users (id, name) VALUES (@id, @name)");
/// session.add_parameter("id", 1);
/// session.add_parameter("name", "a");
/// assert_eq!(session.execute_non_query()?, 1);
/// assert!(session.is_disposed());
/// # Ok(())
/// # }
/// ```
pub struct Session {
    backend: Box<dyn Backend>,
    command: Command,
    connection_string: String,
    state: SessionState,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("provider", &self.backend.provider())
            .field("connection", &self.backend.state())
            .field("state", &self.state)
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Open a single-shot session on the connection string named `name`.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::ConfigError` if `name` does not resolve or its provider is
    /// unknown, or the driver error if the connection cannot be opened.
    pub fn open(config: &ConnectionStrings, name: &str) -> Result<Self, SqlSessionError> {
        Self::connect(config, name, false)
    }

    /// Open a session and begin a transaction on it.
    ///
    /// # Errors
    ///
    /// As [`Session::open`], plus the driver error if the transaction cannot be started.
    pub fn open_transactional(
        config: &ConnectionStrings,
        name: &str,
    ) -> Result<Self, SqlSessionError> {
        Self::connect(config, name, true)
    }

    fn connect(
        config: &ConnectionStrings,
        name: &str,
        transactional: bool,
    ) -> Result<Self, SqlSessionError> {
        let entry = config.resolve(name).ok_or_else(|| {
            SqlSessionError::ConfigError(format!("No connection string named {name:?}"))
        })?;
        let backend = create_backend(entry.provider()?)?;
        Self::with_backend(backend, entry.connection_string.clone(), transactional)
    }

    /// Build a session on a caller-supplied backend.
    ///
    /// The connection is opened immediately. If opening or beginning the transaction fails,
    /// the backend is closed before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns the backend's error from opening or beginning the transaction.
    pub fn with_backend(
        backend: Box<dyn Backend>,
        connection_string: impl Into<String>,
        transactional: bool,
    ) -> Result<Self, SqlSessionError> {
        let mut session = Session {
            backend,
            command: Command::default(),
            connection_string: connection_string.into(),
            state: SessionState::Ready,
        };

        if let Err(err) = session.start(transactional) {
            session.state = SessionState::Disposed;
            if let Err(close_err) = session.backend.close() {
                warn!(error = %close_err, "failed to close connection after a failed open");
            }
            return Err(err);
        }

        Ok(session)
    }

    fn start(&mut self, transactional: bool) -> Result<(), SqlSessionError> {
        self.ensure_open()?;
        if transactional {
            self.backend.begin_transaction()?;
            self.state = SessionState::InTransaction;
            info!(provider = ?self.backend.provider(), "transaction started");
        }
        Ok(())
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.state == SessionState::Disposed
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.state == SessionState::InTransaction
    }

    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.backend.state()
    }

    #[must_use]
    pub fn provider(&self) -> Provider {
        self.backend.provider()
    }

    #[must_use]
    pub fn command(&self) -> &Command {
        &self.command
    }

    #[must_use]
    pub fn command_text(&self) -> &str {
        self.command.text()
    }

    pub fn set_command_text(&mut self, text: impl Into<String>) {
        self.command.set_text(text);
    }

    #[must_use]
    pub fn command_type(&self) -> CommandType {
        self.command.command_type()
    }

    pub fn set_command_type(&mut self, command_type: CommandType) {
        self.command.set_command_type(command_type);
    }

    #[must_use]
    pub fn parameters(&self) -> &[SqlParameter] {
        self.command.parameters()
    }

    /// Append a named value to the command's parameters.
    pub fn add_parameter(&mut self, name: impl Into<String>, value: impl Into<RowValues>) {
        self.command.add_parameter(SqlParameter::new(name, value));
    }

    /// Append a fully described parameter (e.g. one carrying an explicit SQL type).
    pub fn add_sql_parameter(&mut self, parameter: SqlParameter) {
        self.command.add_parameter(parameter);
    }

    /// Clear the parameters, then add `parameters` in order.
    pub fn set_parameters<I>(&mut self, parameters: I)
    where
        I: IntoIterator<Item = SqlParameter>,
    {
        self.command.set_parameters(parameters);
    }

    pub fn clear_parameters(&mut self) {
        self.command.clear_parameters();
    }

    /// Execute the command and return the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns `Disposed` on a spent session, `ExecutionError` for empty command text,
    /// or the driver error.
    pub fn execute_non_query(&mut self) -> Result<usize, SqlSessionError> {
        self.run("non_query", |backend, command| {
            let affected = backend.execute_non_query(command)?;
            debug!(rows_affected = affected, "non-query executed");
            Ok(affected)
        })
    }

    /// Execute the command and convert the first column of the first row to an integer.
    ///
    /// A command that returns no rows yields 0.
    ///
    /// # Errors
    ///
    /// As [`execute_non_query`](Session::execute_non_query), plus `ExecutionError` if the
    /// value is NULL or not numeric.
    pub fn execute_scalar(&mut self) -> Result<i64, SqlSessionError> {
        match self.execute_scalar_value()? {
            Some(value) => value.to_scalar_int(),
            None => Ok(0),
        }
    }

    /// Execute the command and return the first column of the first row, unconverted.
    ///
    /// # Errors
    ///
    /// As [`execute_non_query`](Session::execute_non_query).
    pub fn execute_scalar_value(&mut self) -> Result<Option<RowValues>, SqlSessionError> {
        self.run("scalar", |backend, command| {
            let mut cursor = backend.open_cursor(command)?;
            let first = cursor
                .next_row()?
                .and_then(|row| row.into_iter().next());
            Ok(first)
        })
    }

    /// Execute the command and hand a forward-only reader to `read`.
    ///
    /// The reader is bound to the live connection and is only valid inside `read`; the
    /// session's resources are released once `read` returns (outside a transaction).
    ///
    /// # Errors
    ///
    /// As [`execute_non_query`](Session::execute_non_query), plus any error `read` returns.
    pub fn execute_reader<T, F>(&mut self, read: F) -> Result<T, SqlSessionError>
    where
        F: FnOnce(&mut DataReader<'_>) -> Result<T, SqlSessionError>,
    {
        self.run("reader", |backend, command| {
            let cursor = backend.open_cursor(command)?;
            let mut reader = DataReader::new(cursor);
            read(&mut reader)
        })
    }

    /// Execute the command and materialize its first result set.
    ///
    /// # Errors
    ///
    /// As [`execute_non_query`](Session::execute_non_query).
    pub fn fetch_table(&mut self) -> Result<DataTable, SqlSessionError> {
        self.run("table", |backend, command| {
            let mut cursor = backend.open_cursor(command)?;
            let table = fill_table(cursor.as_mut(), DataSet::table_name(0))?;
            debug!(rows = table.len(), "table filled");
            Ok(table)
        })
    }

    /// Execute the command and materialize every result set.
    ///
    /// # Errors
    ///
    /// As [`execute_non_query`](Session::execute_non_query).
    pub fn fetch_dataset(&mut self) -> Result<DataSet, SqlSessionError> {
        self.run("dataset", |backend, command| {
            let mut cursor = backend.open_cursor(command)?;
            let dataset = fill_dataset(cursor.as_mut())?;
            debug!(tables = dataset.len(), "dataset filled");
            Ok(dataset)
        })
    }

    /// Commit the transaction and release the session.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveTransaction` if the session was not opened transactionally,
    /// `Disposed` on a spent session, or the driver error.
    pub fn commit(&mut self) -> Result<(), SqlSessionError> {
        self.ensure_usable()?;
        if self.state != SessionState::InTransaction {
            return Err(SqlSessionError::NoActiveTransaction);
        }
        let outcome = self.backend.commit();
        if outcome.is_ok() {
            info!(provider = ?self.backend.provider(), "transaction committed");
            self.state = SessionState::Ready;
        }
        self.finish(outcome)
    }

    /// Roll the transaction back and release the session.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveTransaction` if the session was not opened transactionally,
    /// `Disposed` on a spent session, or the driver error.
    pub fn rollback(&mut self) -> Result<(), SqlSessionError> {
        self.ensure_usable()?;
        if self.state != SessionState::InTransaction {
            return Err(SqlSessionError::NoActiveTransaction);
        }
        let outcome = self.backend.rollback();
        if outcome.is_ok() {
            info!(provider = ?self.backend.provider(), "transaction rolled back");
            self.state = SessionState::Ready;
        }
        self.finish(outcome)
    }

    /// Release the transaction (rolling it back if still active) and the connection.
    ///
    /// Disposing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the driver error from the rollback or from closing the connection. The
    /// session is disposed either way.
    pub fn dispose(&mut self) -> Result<(), SqlSessionError> {
        if self.state == SessionState::Disposed {
            return Ok(());
        }

        let rollback = if self.state == SessionState::InTransaction
            && self.backend.state() == ConnectionState::Open
        {
            info!(provider = ?self.backend.provider(), "rolling back uncommitted transaction");
            self.backend.rollback()
        } else {
            Ok(())
        };

        self.state = SessionState::Disposed;
        let close = self.backend.close();
        debug!(provider = ?self.backend.provider(), "session disposed");
        rollback.and(close)
    }

    fn ensure_usable(&self) -> Result<(), SqlSessionError> {
        if self.state == SessionState::Disposed {
            return Err(SqlSessionError::Disposed);
        }
        Ok(())
    }

    fn ensure_open(&mut self) -> Result<(), SqlSessionError> {
        match self.backend.state() {
            ConnectionState::Open => Ok(()),
            ConnectionState::Broken if self.state == SessionState::InTransaction => {
                Err(SqlSessionError::ConnectionError(
                    "Connection broke while a transaction was active".to_string(),
                ))
            }
            ConnectionState::Closed | ConnectionState::Broken => {
                debug!(provider = ?self.backend.provider(), "opening connection");
                self.backend.open(&self.connection_string)
            }
        }
    }

    fn run<T, F>(&mut self, mode: &'static str, op: F) -> Result<T, SqlSessionError>
    where
        F: FnOnce(&mut dyn Backend, &Command) -> Result<T, SqlSessionError>,
    {
        self.ensure_usable()?;
        debug!(
            mode,
            command_type = ?self.command.command_type(),
            parameters = self.command.parameters().len(),
            in_transaction = self.in_transaction(),
            "executing command"
        );

        let outcome = self
            .command
            .ensure_executable()
            .and_then(|()| self.ensure_open());
        let outcome = match outcome {
            Ok(()) => op(self.backend.as_mut(), &self.command),
            Err(err) => Err(err),
        };

        if self.state == SessionState::InTransaction {
            outcome
        } else {
            self.finish(outcome)
        }
    }

    /// Dispose, keeping the operation's error ahead of any cleanup error.
    fn finish<T>(&mut self, outcome: Result<T, SqlSessionError>) -> Result<T, SqlSessionError> {
        match (outcome, self.dispose()) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(cleanup)) => Err(cleanup),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(cleanup)) => {
                warn!(error = %cleanup, "failed to release session after a failed operation");
                Err(err)
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(err) = self.dispose() {
            warn!(error = %err, "failed to dispose session on drop");
        }
    }
}
