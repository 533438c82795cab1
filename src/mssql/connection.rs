use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use super::client::{MssqlClient, create_mssql_client};
use super::params::{bind_query_params, build_statement};
use super::query::MssqlCursor;
use crate::command::Command;
use crate::driver::{Backend, RowCursor};
use crate::error::SqlSessionError;
use crate::types::{ConnectionState, Provider};

/// SQL Server connection driven synchronously.
///
/// The tiberius client is async; each backend owns a current-thread runtime and
/// blocks on it for every round trip.
pub struct MssqlBackend {
    runtime: Runtime,
    client: Option<MssqlClient>,
    broken: bool,
}

impl MssqlBackend {
    /// Build an unopened backend.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::IoError` if the runtime cannot be created.
    pub fn new() -> Result<Self, SqlSessionError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            runtime,
            client: None,
            broken: false,
        })
    }

    /// Run a plain batch (no RPC) such as `BEGIN TRANSACTION`.
    fn simple(&mut self, sql: &str) -> Result<(), SqlSessionError> {
        let Self {
            runtime,
            client,
            broken,
        } = self;
        let client = client.as_mut().ok_or_else(not_open)?;
        let result = runtime.block_on(async {
            client.simple_query(sql).await?.into_results().await?;
            Ok::<_, SqlSessionError>(())
        });
        mark_broken(broken, result)
    }
}

fn not_open() -> SqlSessionError {
    SqlSessionError::ConnectionError("SQL Server connection is not open".to_string())
}

fn mark_broken<T>(
    broken: &mut bool,
    result: Result<T, SqlSessionError>,
) -> Result<T, SqlSessionError> {
    if let Err(err) = &result {
        if err.is_connection_fault() {
            *broken = true;
        }
    }
    result
}

impl Backend for MssqlBackend {
    fn provider(&self) -> Provider {
        Provider::SqlServer
    }

    fn state(&self) -> ConnectionState {
        match (&self.client, self.broken) {
            (None, _) => ConnectionState::Closed,
            (Some(_), true) => ConnectionState::Broken,
            (Some(_), false) => ConnectionState::Open,
        }
    }

    fn open(&mut self, connection_string: &str) -> Result<(), SqlSessionError> {
        self.client = None;
        self.broken = false;
        let client = self
            .runtime
            .block_on(create_mssql_client(connection_string))?;
        self.client = Some(client);
        debug!("SQL Server connection opened");
        Ok(())
    }

    fn close(&mut self) -> Result<(), SqlSessionError> {
        self.broken = false;
        match self.client.take() {
            Some(client) => {
                self.runtime.block_on(client.close())?;
                debug!("SQL Server connection closed");
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn begin_transaction(&mut self) -> Result<(), SqlSessionError> {
        self.simple("BEGIN TRANSACTION")
    }

    fn commit(&mut self) -> Result<(), SqlSessionError> {
        self.simple("COMMIT TRANSACTION")
    }

    fn rollback(&mut self) -> Result<(), SqlSessionError> {
        self.simple("IF @@TRANCOUNT > 0 ROLLBACK TRANSACTION")
    }

    /// Sums every row count the server reports for the batch. SQL Server reports a count
    /// for `SELECT` as well as for DML, so a batch mixing both includes the selected rows;
    /// `SET NOCOUNT ON` before a statement suppresses its count.
    fn execute_non_query(&mut self, command: &Command) -> Result<usize, SqlSessionError> {
        let sql = build_statement(command)?;
        let query = bind_query_params(sql, command.parameters());
        let Self {
            runtime,
            client,
            broken,
        } = self;
        let client = client.as_mut().ok_or_else(not_open)?;
        let result = runtime.block_on(async {
            let done = query.execute(client).await?;
            Ok::<_, SqlSessionError>(done.rows_affected().iter().sum::<u64>())
        });
        let rows_affected = mark_broken(broken, result)?;

        usize::try_from(rows_affected).map_err(|e| {
            SqlSessionError::ExecutionError(format!("Invalid rows affected count: {e}"))
        })
    }

    fn open_cursor<'a>(
        &'a mut self,
        command: &'a Command,
    ) -> Result<Box<dyn RowCursor + 'a>, SqlSessionError> {
        let sql = build_statement(command)?;
        let query = bind_query_params(sql, command.parameters());
        let Self {
            runtime,
            client,
            broken,
        } = self;
        let client = client.as_mut().ok_or_else(not_open)?;
        let result = runtime
            .block_on(query.query(client))
            .map_err(SqlSessionError::from);
        let stream = mark_broken(broken, result)?;
        Ok(Box::new(MssqlCursor::new(runtime, stream, broken)?))
    }
}
