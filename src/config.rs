use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SqlSessionError;
use crate::types::Provider;

/// One named connection string entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStringSettings {
    pub name: String,
    #[serde(default)]
    pub provider_name: String,
    pub connection_string: String,
}

impl ConnectionStringSettings {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        provider_name: impl Into<String>,
        connection_string: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            provider_name: provider_name.into(),
            connection_string: connection_string.into(),
        }
    }

    /// Backend selected by this entry's provider name.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::ConfigError` if the provider name is not recognized.
    pub fn provider(&self) -> Result<Provider, SqlSessionError> {
        Provider::from_name(&self.provider_name)
    }
}

/// Ordered store of connection strings, passed explicitly into
/// [`Session::open`](crate::Session::open).
///
/// Load it from JSON shaped like:
/// ```json
/// { "connectionStrings": [
///     { "name": "Main", "providerName": "System.Data.SqlClient",
///       "connectionString": "Server=tcp:localhost,1433;Database=app;User Id=sa;Password=..." }
/// ] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStrings {
    #[serde(default)]
    connection_strings: Vec<ConnectionStringSettings>,
}

impl ConnectionStrings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, keeping insertion order.
    #[must_use]
    pub fn with(mut self, entry: ConnectionStringSettings) -> Self {
        self.connection_strings.push(entry);
        self
    }

    pub fn push(&mut self, entry: ConnectionStringSettings) {
        self.connection_strings.push(entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConnectionStringSettings> {
        self.connection_strings.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.connection_strings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connection_strings.is_empty()
    }

    /// Parse a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::ConfigError` if the document is not valid JSON of the
    /// expected shape.
    pub fn from_json_str(json: &str) -> Result<Self, SqlSessionError> {
        serde_json::from_str(json).map_err(|e| {
            SqlSessionError::ConfigError(format!("Invalid connection string store: {e}"))
        })
    }

    /// Read and parse a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::ConfigError` if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SqlSessionError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SqlSessionError::ConfigError(format!(
                "Cannot read connection string store {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json_str(&raw)
    }

    /// Find the first entry whose name matches `name` case-insensitively.
    ///
    /// Entries with an empty name or connection string never match.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&ConnectionStringSettings> {
        let wanted = name.to_lowercase();
        self.connection_strings.iter().find(|entry| {
            !entry.name.is_empty()
                && !entry.connection_string.is_empty()
                && entry.name.to_lowercase() == wanted
        })
    }

    /// Connection string for `name`, or `None` when no entry matches.
    #[must_use]
    pub fn connection_string(&self, name: &str) -> Option<&str> {
        self.resolve(name).map(|entry| entry.connection_string.as_str())
    }
}

impl FromIterator<ConnectionStringSettings> for ConnectionStrings {
    fn from_iter<I: IntoIterator<Item = ConnectionStringSettings>>(iter: I) -> Self {
        Self {
            connection_strings: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ConnectionStrings {
        ConnectionStrings::new()
            .with(ConnectionStringSettings::new("Blank", "", ""))
            .with(ConnectionStringSettings::new("Main", "mssql", "Server=a"))
            .with(ConnectionStringSettings::new("MAIN", "mssql", "Server=b"))
            .with(ConnectionStringSettings::new("Local", "sqlite", "Data Source=x.db"))
    }

    #[test]
    fn resolves_case_insensitively_first_match_wins() {
        let cfg = store();
        assert_eq!(cfg.connection_string("main"), Some("Server=a"));
        assert_eq!(cfg.connection_string("LOCAL"), Some("Data Source=x.db"));
    }

    #[test]
    fn skips_entries_without_connection_string() {
        assert_eq!(store().connection_string("blank"), None);
        assert_eq!(store().connection_string("missing"), None);
    }

    #[test]
    fn parses_json() {
        let cfg = ConnectionStrings::from_json_str(
            r#"{"connectionStrings":[{"name":"Reports","connectionString":"Server=r"}]}"#,
        )
        .unwrap();
        let entry = cfg.resolve("reports").unwrap();
        assert_eq!(entry.provider().unwrap(), Provider::SqlServer);
    }

    #[test]
    fn malformed_json_is_config_error() {
        let err = ConnectionStrings::from_json_str("{ nope").unwrap_err();
        assert!(matches!(err, SqlSessionError::ConfigError(_)));
    }
}
