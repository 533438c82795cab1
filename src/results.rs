use std::collections::HashMap;
use std::sync::Arc;

use crate::types::RowValues;

/// Column names plus a name → index lookup, shared by every row of one result set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Columns {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Columns {
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            // Duplicate column names resolve to the first occurrence
            index.entry(name.clone()).or_insert(i);
        }
        Self { names, index }
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Index of a column, exact match first, then case-insensitive.
    #[must_use]
    pub fn position(&self, column_name: &str) -> Option<usize> {
        if let Some(&idx) = self.index.get(column_name) {
            return Some(idx);
        }
        self.names
            .iter()
            .position(|col| col.eq_ignore_ascii_case(column_name))
    }
}

/// A row from a query result
///
/// This struct represents a single row, with access to both the column names and the values.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRow {
    columns: Arc<Columns>,
    /// The values for this row
    pub values: Vec<RowValues>,
}

impl DataRow {
    /// Create a new row
    ///
    /// # Arguments
    ///
    /// * `columns` - The column names, shared across a result set
    /// * `values` - The values for this row
    #[must_use]
    pub fn new(columns: Arc<Columns>, values: Vec<RowValues>) -> Self {
        Self { columns, values }
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        self.columns.names()
    }

    /// Get the index of a column by name
    ///
    /// # Returns
    ///
    /// The index of the column, or None if not found
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.columns.position(column_name)
    }

    /// Get a value from the row by column name
    ///
    /// # Returns
    ///
    /// The value at the column, or None if the column wasn't found
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }
}

/// One materialized result set, disconnected from the connection that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    name: String,
    columns: Arc<Columns>,
    /// The rows returned by the query
    pub rows: Vec<DataRow>,
}

impl DataTable {
    #[must_use]
    pub fn new(name: impl Into<String>, columns: Arc<Columns>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn columns(&self) -> &Arc<Columns> {
        &self.columns
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        self.columns.names()
    }

    /// Append a row sharing this table's columns.
    pub fn add_row_values(&mut self, values: Vec<RowValues>) {
        self.rows.push(DataRow::new(Arc::clone(&self.columns), values));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Every result set produced by one command, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSet {
    pub tables: Vec<DataTable>,
}

impl DataSet {
    /// Name given to the `index`-th table: `Table`, `Table1`, `Table2`, ...
    #[must_use]
    pub fn table_name(index: usize) -> String {
        if index == 0 {
            "Table".to_string()
        } else {
            format!("Table{index}")
        }
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&DataTable> {
        self.tables
            .iter()
            .find(|table| table.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
