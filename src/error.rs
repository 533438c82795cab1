use thiserror::Error;

/// Errors produced by a [`Session`](crate::Session).
///
/// Driver failures pass through unchanged; the remaining variants cover the
/// session's own bookkeeping.
#[derive(Debug, Error)]
pub enum SqlSessionError {
    #[cfg(feature = "mssql")]
    #[error(transparent)]
    MssqlError(#[from] tiberius::error::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),

    #[error("Session has been disposed")]
    Disposed,

    #[error("No active transaction on this session")]
    NoActiveTransaction,
}

impl SqlSessionError {
    /// True when the error means the underlying connection can no longer be used.
    #[must_use]
    pub fn is_connection_fault(&self) -> bool {
        match self {
            SqlSessionError::IoError(_) => true,
            #[cfg(feature = "mssql")]
            SqlSessionError::MssqlError(tiberius::error::Error::Io { .. }) => true,
            _ => false,
        }
    }
}
