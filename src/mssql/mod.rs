// SQL Server backend built on tiberius.
//
// - client: connection-string parsing and TCP/TDS login
// - params: statement rendering and positional binding
// - query: streaming cursor and column extraction
// - connection: the synchronous `Backend` implementation

pub mod client;
pub mod connection;
pub mod params;
pub mod query;

pub use client::{MssqlClient, create_mssql_client};
pub use connection::MssqlBackend;
