use rusqlite::{Connection, OpenFlags};

use crate::error::SqlSessionError;

/// How the database file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqliteMode {
    ReadOnly,
    ReadWrite,
    #[default]
    ReadWriteCreate,
    Memory,
}

impl SqliteMode {
    fn parse(value: &str) -> Result<Self, SqlSessionError> {
        match value.to_ascii_lowercase().as_str() {
            "readonly" => Ok(Self::ReadOnly),
            "readwrite" => Ok(Self::ReadWrite),
            "readwritecreate" => Ok(Self::ReadWriteCreate),
            "memory" => Ok(Self::Memory),
            _ => Err(SqlSessionError::ConfigError(format!(
                "Invalid SQLite Mode: {value:?}"
            ))),
        }
    }

    fn flags(self) -> OpenFlags {
        let base = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        match self {
            Self::ReadOnly => base | OpenFlags::SQLITE_OPEN_READ_ONLY,
            Self::ReadWrite => base | OpenFlags::SQLITE_OPEN_READ_WRITE,
            Self::ReadWriteCreate => {
                base | OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
            }
            Self::Memory => {
                base | OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_MEMORY
            }
        }
    }
}

/// Parsed `SQLite` connection string.
///
/// Accepts either a bare path or `Data Source=<path>;Mode=<mode>;Foreign Keys=<bool>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteOptions {
    pub data_source: String,
    pub mode: SqliteMode,
    pub foreign_keys: Option<bool>,
}

impl SqliteOptions {
    /// Parse a connection string.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::ConfigError` for unknown keys, malformed pairs, an invalid
    /// mode or a missing data source.
    pub fn parse(connection_string: &str) -> Result<Self, SqlSessionError> {
        let trimmed = connection_string.trim();
        if !trimmed.contains('=') {
            return Self::from_data_source(trimmed.to_string(), SqliteMode::default(), None);
        }

        let mut data_source = None;
        let mut mode = SqliteMode::default();
        let mut foreign_keys = None;
        for pair in trimmed.split(';').filter(|p| !p.trim().is_empty()) {
            let (raw_key, value) = pair.split_once('=').ok_or_else(|| {
                SqlSessionError::ConfigError(format!("Malformed SQLite connection string pair: {pair:?}"))
            })?;
            let key = raw_key
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_ascii_lowercase();
            let value = value.trim();
            match key.as_str() {
                "datasource" | "filename" => data_source = Some(value.to_string()),
                "mode" => mode = SqliteMode::parse(value)?,
                "foreignkeys" => foreign_keys = Some(parse_bool(value)?),
                _ => {
                    return Err(SqlSessionError::ConfigError(format!(
                        "Unsupported SQLite connection string keyword: {:?}",
                        raw_key.trim()
                    )));
                }
            }
        }
        Self::from_data_source(data_source.unwrap_or_default(), mode, foreign_keys)
    }

    fn from_data_source(
        data_source: String,
        mode: SqliteMode,
        foreign_keys: Option<bool>,
    ) -> Result<Self, SqlSessionError> {
        let mode = if data_source == ":memory:" {
            SqliteMode::Memory
        } else {
            mode
        };
        if data_source.is_empty() && mode != SqliteMode::Memory {
            return Err(SqlSessionError::ConfigError(
                "SQLite connection string has no Data Source".to_string(),
            ));
        }
        Ok(Self {
            data_source,
            mode,
            foreign_keys,
        })
    }

    /// Open a connection as described.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::SqliteError` if the database cannot be opened.
    pub fn open(&self) -> Result<Connection, SqlSessionError> {
        let conn = match self.mode {
            SqliteMode::Memory => Connection::open_in_memory_with_flags(self.mode.flags())?,
            mode => Connection::open_with_flags(&self.data_source, mode.flags())?,
        };
        if let Some(enabled) = self.foreign_keys {
            conn.pragma_update(None, "foreign_keys", enabled)?;
        }
        Ok(conn)
    }
}

fn parse_bool(value: &str) -> Result<bool, SqlSessionError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(SqlSessionError::ConfigError(format!(
            "Invalid boolean in SQLite connection string: {value:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_path() {
        let opts = SqliteOptions::parse("/tmp/app.db").unwrap();
        assert_eq!(opts.data_source, "/tmp/app.db");
        assert_eq!(opts.mode, SqliteMode::ReadWriteCreate);
        assert_eq!(opts.foreign_keys, None);
    }

    #[test]
    fn keyword_pairs_are_case_and_space_insensitive() {
        let opts =
            SqliteOptions::parse("data source = app.db; MODE=ReadOnly;Foreign Keys=True").unwrap();
        assert_eq!(opts.data_source, "app.db");
        assert_eq!(opts.mode, SqliteMode::ReadOnly);
        assert_eq!(opts.foreign_keys, Some(true));
    }

    #[test]
    fn memory_source_implies_memory_mode() {
        let opts = SqliteOptions::parse("Data Source=:memory:").unwrap();
        assert_eq!(opts.mode, SqliteMode::Memory);
        assert!(SqliteOptions::parse(":memory:").unwrap().open().is_ok());
    }

    #[test]
    fn rejects_unknown_keyword_and_missing_source() {
        assert!(matches!(
            SqliteOptions::parse("Data Source=a.db;Pooling=true"),
            Err(SqlSessionError::ConfigError(_))
        ));
        assert!(matches!(
            SqliteOptions::parse("Mode=ReadWrite"),
            Err(SqlSessionError::ConfigError(_))
        ));
        assert!(matches!(
            SqliteOptions::parse("Data Source=a.db;Mode=Sometimes"),
            Err(SqlSessionError::ConfigError(_))
        ));
    }
}
