//! Synchronous database sessions: one connection, one command, at most one transaction.
//!
//! A [`Session`] is opened by name from a [`ConnectionStrings`] store. Without a
//! transaction it runs exactly one command and then releases its connection; with a
//! transaction it stays open until [`Session::commit`], [`Session::rollback`] or drop.

pub mod prelude;

pub mod command;
pub mod config;
pub mod driver;
pub mod error;
pub mod reader;
pub mod results;
pub mod session;
pub mod types;

#[cfg(feature = "mssql")]
pub mod mssql;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use command::{Command, SqlParameter};
pub use config::{ConnectionStringSettings, ConnectionStrings};
pub use driver::{Backend, RowCursor, create_backend};
pub use error::SqlSessionError;
pub use reader::DataReader;
pub use results::{DataRow, DataSet, DataTable};
pub use session::{Session, SessionState};
pub use types::{CommandType, ConnectionState, Provider, RowValues};
