use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

use crate::error::SqlSessionError;

/// Values that can be bound as command parameters or read back from a result row.
///
/// The same enum is used for every backend, so calling code never touches driver types:
/// ```rust
/// use sql_session::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::from("alice"),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            // "YYYY-MM-DD HH:MM:SS" with optional fraction, as SQLite stores them
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Convert a scalar result to an integer.
    ///
    /// Floats are rounded, booleans map to 1/0 and text is parsed after trimming.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::ExecutionError` for NULL or any value that has no
    /// integer reading.
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_scalar_int(&self) -> Result<i64, SqlSessionError> {
        match self {
            RowValues::Int(i) => Ok(*i),
            RowValues::Float(f) if f.is_finite() => Ok(f.round() as i64),
            RowValues::Bool(b) => Ok(i64::from(*b)),
            RowValues::Text(s) => s.trim().parse::<i64>().map_err(|e| {
                SqlSessionError::ExecutionError(format!("Scalar text {s:?} is not an integer: {e}"))
            }),
            RowValues::Null => Err(SqlSessionError::ExecutionError(
                "Scalar value is NULL".to_string(),
            )),
            other => Err(SqlSessionError::ExecutionError(format!(
                "Scalar value {other:?} cannot be converted to an integer"
            ))),
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<NaiveDateTime> for RowValues {
    fn from(value: NaiveDateTime) -> Self {
        RowValues::Timestamp(value)
    }
}

impl From<Vec<u8>> for RowValues {
    fn from(value: Vec<u8>) -> Self {
        RowValues::Blob(value)
    }
}

impl From<JsonValue> for RowValues {
    fn from(value: JsonValue) -> Self {
        RowValues::JSON(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// How the command text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CommandType {
    /// An SQL statement or batch
    #[default]
    Text,
    /// The name of a stored procedure
    StoredProcedure,
}

/// State of the driver connection behind a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Closed,
    Open,
    /// The connection faulted mid-operation and must be reopened
    Broken,
}

/// The database engine a connection string entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// SQL Server (tiberius)
    SqlServer,
    /// `SQLite` (rusqlite)
    Sqlite,
}

impl Provider {
    /// Map a configured provider name to a backend.
    ///
    /// An empty name means SQL Server.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::ConfigError` for an unrecognized provider name.
    pub fn from_name(provider_name: &str) -> Result<Self, SqlSessionError> {
        match provider_name.trim().to_lowercase().as_str() {
            "" | "system.data.sqlclient" | "microsoft.data.sqlclient" | "mssql" | "sqlserver" => {
                Ok(Provider::SqlServer)
            }
            "system.data.sqlite" | "microsoft.data.sqlite" | "sqlite" => Ok(Provider::Sqlite),
            other => Err(SqlSessionError::ConfigError(format!(
                "Unknown provider name: {other}"
            ))),
        }
    }
}
