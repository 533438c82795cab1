//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types
//! to make it easier to get started with the library.

pub use crate::command::SqlParameter;
pub use crate::config::ConnectionStrings;
pub use crate::error::SqlSessionError;
pub use crate::reader::DataReader;
pub use crate::results::{DataRow, DataSet, DataTable};
pub use crate::session::Session;
pub use crate::types::{CommandType, RowValues};
