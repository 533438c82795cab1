// SQLite backend built on rusqlite.
//
// - config: connection-string parsing and opening
// - params: value conversion and named binding
// - query: statement-by-statement execution and row extraction
// - connection: the `Backend` implementation

pub mod config;
pub mod connection;
pub mod params;
pub mod query;

pub use config::{SqliteMode, SqliteOptions};
pub use connection::SqliteBackend;
