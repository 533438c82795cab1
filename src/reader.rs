use std::collections::VecDeque;
use std::sync::Arc;

use crate::driver::RowCursor;
use crate::error::SqlSessionError;
use crate::results::{Columns, DataRow, DataSet, DataTable};
use crate::types::RowValues;

/// Forward-only reader over the rows of an executing command.
///
/// Only available inside [`Session::execute_reader`](crate::Session::execute_reader);
/// the reader cannot outlive the connection it reads from.
pub struct DataReader<'a> {
    cursor: Box<dyn RowCursor + 'a>,
    columns: Arc<Columns>,
}

impl<'a> DataReader<'a> {
    pub(crate) fn new(cursor: Box<dyn RowCursor + 'a>) -> Self {
        let columns = Arc::new(Columns::new(cursor.columns().to_vec()));
        Self { cursor, columns }
    }

    /// Column names of the current result set.
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        self.columns.names()
    }

    /// Advance to the next row of the current result set.
    ///
    /// # Errors
    ///
    /// Returns the driver error if reading fails.
    pub fn read(&mut self) -> Result<Option<DataRow>, SqlSessionError> {
        Ok(self
            .cursor
            .next_row()?
            .map(|values| DataRow::new(Arc::clone(&self.columns), values)))
    }

    /// Move to the next result set. Returns `false` when there is none.
    ///
    /// # Errors
    ///
    /// Returns the driver error if reading fails.
    pub fn next_result(&mut self) -> Result<bool, SqlSessionError> {
        let advanced = self.cursor.next_result()?;
        if advanced {
            self.columns = Arc::new(Columns::new(self.cursor.columns().to_vec()));
        }
        Ok(advanced)
    }
}

impl Iterator for DataReader<'_> {
    type Item = Result<DataRow, SqlSessionError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read().transpose()
    }
}

/// Drain the cursor's current result set into a table.
pub(crate) fn fill_table(
    cursor: &mut dyn RowCursor,
    name: impl Into<String>,
) -> Result<DataTable, SqlSessionError> {
    let columns = Arc::new(Columns::new(cursor.columns().to_vec()));
    let mut table = DataTable::new(name, columns);
    while let Some(values) = cursor.next_row()? {
        table.add_row_values(values);
    }
    Ok(table)
}

/// Drain every result set into a dataset. Statements that return no columns
/// (plain DML inside a batch) do not produce a table.
pub(crate) fn fill_dataset(cursor: &mut dyn RowCursor) -> Result<DataSet, SqlSessionError> {
    let mut dataset = DataSet::default();
    loop {
        if !cursor.columns().is_empty() {
            let name = DataSet::table_name(dataset.tables.len());
            dataset.tables.push(fill_table(cursor, name)?);
        }
        if !cursor.next_result()? {
            break;
        }
    }
    Ok(dataset)
}

/// Cursor over result sets that were read up front.
#[cfg_attr(not(feature = "sqlite"), allow(dead_code))]
pub(crate) struct BufferedCursor {
    pending: VecDeque<ResultBuffer>,
    current: ResultBuffer,
}

/// Column names and rows of one result set.
pub(crate) type ResultBuffer = (Vec<String>, VecDeque<Vec<RowValues>>);

#[cfg_attr(not(feature = "sqlite"), allow(dead_code))]
impl BufferedCursor {
    pub(crate) fn new(sets: Vec<ResultBuffer>) -> Self {
        let mut pending: VecDeque<_> = sets.into_iter().collect();
        let current = pending.pop_front().unwrap_or_default();
        Self { pending, current }
    }
}

impl RowCursor for BufferedCursor {
    fn columns(&self) -> &[String] {
        &self.current.0
    }

    fn next_row(&mut self) -> Result<Option<Vec<RowValues>>, SqlSessionError> {
        Ok(self.current.1.pop_front())
    }

    fn next_result(&mut self) -> Result<bool, SqlSessionError> {
        match self.pending.pop_front() {
            Some(next) => {
                self.current = next;
                Ok(true)
            }
            None => {
                self.current = ResultBuffer::default();
                Ok(false)
            }
        }
    }
}
