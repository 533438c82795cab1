use rusqlite::Statement;
use rusqlite::types::Value;

use crate::command::SqlParameter;
use crate::error::SqlSessionError;
use crate::types::RowValues;

/// Convert a single `RowValue` to a rusqlite `Value`.
#[must_use]
pub fn row_value_to_sqlite_value(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Integer(*i),
        RowValues::Float(f) => Value::Real(*f),
        RowValues::Text(s) => Value::Text(s.clone()),
        RowValues::Bool(b) => Value::Integer(i64::from(*b)),
        RowValues::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        RowValues::Null => Value::Null,
        RowValues::JSON(jval) => Value::Text(jval.to_string()),
        RowValues::Blob(bytes) => Value::Blob(bytes.clone()),
    }
}

/// Named parameters of one command, with a record of which ones a statement consumed.
pub struct NamedParams<'p> {
    parameters: &'p [SqlParameter],
    names: Vec<&'p str>,
    used: Vec<bool>,
}

impl<'p> NamedParams<'p> {
    /// # Errors
    ///
    /// Returns `SqlSessionError::ParameterError` if any parameter name is invalid.
    pub fn new(parameters: &'p [SqlParameter]) -> Result<Self, SqlSessionError> {
        let names = parameters
            .iter()
            .map(SqlParameter::bare_name)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            parameters,
            names,
            used: vec![false; parameters.len()],
        })
    }

    /// Bind every placeholder of `stmt` (`:name`, `@name` or `$name`) from the command's
    /// parameters. Names match case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::ParameterError` for a placeholder with no matching
    /// parameter, or for positional (`?`) placeholders.
    pub fn bind(&mut self, stmt: &mut Statement<'_>) -> Result<(), SqlSessionError> {
        for index in 1..=stmt.parameter_count() {
            let placeholder = stmt
                .parameter_name(index)
                .ok_or_else(|| {
                    SqlSessionError::ParameterError(format!(
                        "Positional placeholder at index {index} is not supported; use named parameters"
                    ))
                })?
                .to_string();
            let bare = placeholder.trim_start_matches([':', '@', '$']);
            let position = self
                .names
                .iter()
                .position(|name| name.eq_ignore_ascii_case(bare))
                .ok_or_else(|| {
                    SqlSessionError::ParameterError(format!(
                        "Must add a value for parameter {placeholder}"
                    ))
                })?;
            stmt.raw_bind_parameter(
                index,
                row_value_to_sqlite_value(&self.parameters[position].value),
            )?;
            self.used[position] = true;
        }
        Ok(())
    }

    /// Fail if a parameter was never referenced by any statement.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::ParameterError` naming the first unused parameter.
    pub fn ensure_all_used(&self) -> Result<(), SqlSessionError> {
        match self.used.iter().position(|used| !used) {
            Some(position) => Err(SqlSessionError::ParameterError(format!(
                "Parameter {:?} is not referenced by the command",
                self.parameters[position].name
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::*;

    #[test]
    fn binds_any_prefix_case_insensitively() {
        let conn = Connection::open_in_memory().unwrap();
        let params = vec![SqlParameter::new("@A", 2), SqlParameter::new("b", "x")];
        let mut named = NamedParams::new(&params).unwrap();
        let mut stmt = conn.prepare("SELECT :a + 1, $B").unwrap();
        named.bind(&mut stmt).unwrap();
        named.ensure_all_used().unwrap();
        let mut rows = stmt.raw_query();
        let row = rows.next().unwrap().unwrap();
        assert_eq!(row.get::<_, i64>(0).unwrap(), 3);
        assert_eq!(row.get::<_, String>(1).unwrap(), "x");
    }

    #[test]
    fn missing_and_unused_parameters_are_errors() {
        let conn = Connection::open_in_memory().unwrap();
        let params = vec![SqlParameter::new("a", 1)];
        let mut named = NamedParams::new(&params).unwrap();
        let mut stmt = conn.prepare("SELECT @other").unwrap();
        assert!(matches!(
            named.bind(&mut stmt),
            Err(SqlSessionError::ParameterError(_))
        ));
        assert!(matches!(
            named.ensure_all_used(),
            Err(SqlSessionError::ParameterError(_))
        ));
    }

    #[test]
    fn positional_placeholders_are_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        let mut named = NamedParams::new(&[]).unwrap();
        let mut stmt = conn.prepare("SELECT ?").unwrap();
        assert!(named.bind(&mut stmt).is_err());
    }
}
