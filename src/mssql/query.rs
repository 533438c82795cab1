use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures_util::TryStreamExt;
use tiberius::{ColumnData, FromSql, QueryItem, QueryStream, ResultMetadata, Row};
use tokio::runtime::Runtime;

use crate::driver::RowCursor;
use crate::error::SqlSessionError;
use crate::types::RowValues;

/// Streaming cursor over a SQL Server response.
///
/// Rows are pulled from the wire one at a time; nothing is buffered beyond the
/// metadata of the next result set.
pub struct MssqlCursor<'a> {
    runtime: &'a Runtime,
    stream: QueryStream<'a>,
    broken: &'a mut bool,
    columns: Vec<String>,
    /// Metadata of the following result set, seen while reading the current one.
    pending: Option<ResultMetadata>,
    finished: bool,
}

impl<'a> MssqlCursor<'a> {
    /// Wrap `stream` and position the cursor on its first result set.
    ///
    /// # Errors
    ///
    /// Returns the driver error if the first response token cannot be read.
    pub fn new(
        runtime: &'a Runtime,
        stream: QueryStream<'a>,
        broken: &'a mut bool,
    ) -> Result<Self, SqlSessionError> {
        let mut cursor = Self {
            runtime,
            stream,
            broken,
            columns: Vec::new(),
            pending: None,
            finished: false,
        };
        match cursor.pull()? {
            Some(QueryItem::Metadata(meta)) => cursor.columns = column_names(&meta),
            Some(QueryItem::Row(_)) => {
                return Err(SqlSessionError::ExecutionError(
                    "SQL Server sent a row before its column metadata".to_string(),
                ));
            }
            None => cursor.finished = true,
        }
        Ok(cursor)
    }

    fn pull(&mut self) -> Result<Option<QueryItem>, SqlSessionError> {
        match self.runtime.block_on(self.stream.try_next()) {
            Ok(item) => Ok(item),
            Err(err) => {
                let err = SqlSessionError::from(err);
                if err.is_connection_fault() {
                    *self.broken = true;
                }
                Err(err)
            }
        }
    }
}

impl RowCursor for MssqlCursor<'_> {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Vec<RowValues>>, SqlSessionError> {
        if self.finished || self.pending.is_some() {
            return Ok(None);
        }
        match self.pull()? {
            Some(QueryItem::Row(row)) => Ok(Some(row_values(row)?)),
            Some(QueryItem::Metadata(meta)) => {
                self.pending = Some(meta);
                Ok(None)
            }
            None => {
                self.finished = true;
                Ok(None)
            }
        }
    }

    fn next_result(&mut self) -> Result<bool, SqlSessionError> {
        while self.next_row()?.is_some() {}
        match self.pending.take() {
            Some(meta) => {
                self.columns = column_names(&meta);
                Ok(true)
            }
            None => {
                self.columns.clear();
                Ok(false)
            }
        }
    }
}

fn column_names(meta: &ResultMetadata) -> Vec<String> {
    meta.columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect()
}

/// Convert every column of a SQL Server row.
///
/// # Errors
///
/// Returns an error for column types that have no `RowValues` counterpart.
pub fn row_values(row: Row) -> Result<Vec<RowValues>, SqlSessionError> {
    row.into_iter().map(|data| extract_value(&data)).collect()
}

/// Extract a value from one column of a row
fn extract_value(data: &ColumnData<'static>) -> Result<RowValues, SqlSessionError> {
    let value = match data {
        ColumnData::U8(v) => v.map(|v| RowValues::Int(i64::from(v))),
        ColumnData::I16(v) => v.map(|v| RowValues::Int(i64::from(v))),
        ColumnData::I32(v) => v.map(|v| RowValues::Int(i64::from(v))),
        ColumnData::I64(v) => v.map(RowValues::Int),
        ColumnData::F32(v) => v.map(|v| RowValues::Float(f64::from(v))),
        ColumnData::F64(v) => v.map(RowValues::Float),
        ColumnData::Bit(v) => v.map(RowValues::Bool),
        ColumnData::String(v) => v.as_ref().map(|s| RowValues::Text(s.to_string())),
        ColumnData::Guid(v) => v.map(|g| RowValues::Text(g.to_string())),
        ColumnData::Binary(v) => v.as_ref().map(|b| RowValues::Blob(b.to_vec())),
        ColumnData::Numeric(v) => v.map(|n| RowValues::Float(f64::from(n))),
        ColumnData::Xml(v) => v
            .as_ref()
            .map(|xml| RowValues::Text(xml.clone().into_owned().into_string())),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(data)?.map(RowValues::Timestamp)
        }
        ColumnData::Date(_) => NaiveDate::from_sql(data)?
            .map(|d| RowValues::Timestamp(d.and_time(NaiveTime::MIN))),
        ColumnData::Time(_) => NaiveTime::from_sql(data)?.map(|t| RowValues::Text(t.to_string())),
        ColumnData::DateTimeOffset(_) => {
            DateTime::<Utc>::from_sql(data)?.map(|dt| RowValues::Timestamp(dt.naive_utc()))
        }
    };
    Ok(value.unwrap_or(RowValues::Null))
}
