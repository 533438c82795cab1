use std::sync::LazyLock;

use regex::Regex;

use crate::error::SqlSessionError;
use crate::types::{CommandType, RowValues};

static PARAM_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@?[A-Za-z_][A-Za-z0-9_]*$").expect("static parameter-name pattern")
});

/// A named command parameter.
///
/// `sql_type` is the driver-specific escape hatch: when set, the backend declares the
/// parameter with that type instead of one inferred from the value (e.g. `decimal(18,2)`
/// for SQL Server).
///
/// On SQL Server, text commands cannot use names of the form `P<digits>` (`@P1`, `@p2`);
/// the driver binds values under those names.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlParameter {
    pub name: String,
    pub value: RowValues,
    pub sql_type: Option<String>,
}

impl SqlParameter {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<RowValues>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            sql_type: None,
        }
    }

    #[must_use]
    pub fn with_sql_type(mut self, sql_type: impl Into<String>) -> Self {
        self.sql_type = Some(sql_type.into());
        self
    }

    /// Name without a leading `@`.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::ParameterError` if the name is not a plain identifier.
    pub fn bare_name(&self) -> Result<&str, SqlSessionError> {
        if !PARAM_NAME.is_match(&self.name) {
            return Err(SqlSessionError::ParameterError(format!(
                "Invalid parameter name: {:?}",
                self.name
            )));
        }
        Ok(self.name.trim_start_matches('@'))
    }
}

/// Command text, type and parameters, reused across executions on one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Command {
    text: String,
    command_type: CommandType,
    parameters: Vec<SqlParameter>,
}

impl Command {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    #[must_use]
    pub fn command_type(&self) -> CommandType {
        self.command_type
    }

    pub fn set_command_type(&mut self, command_type: CommandType) {
        self.command_type = command_type;
    }

    #[must_use]
    pub fn parameters(&self) -> &[SqlParameter] {
        &self.parameters
    }

    pub fn add_parameter(&mut self, parameter: SqlParameter) {
        self.parameters.push(parameter);
    }

    /// Replace every parameter with `parameters`, in order.
    pub fn set_parameters<I>(&mut self, parameters: I)
    where
        I: IntoIterator<Item = SqlParameter>,
    {
        self.parameters.clear();
        self.parameters.extend(parameters);
    }

    pub fn clear_parameters(&mut self) {
        self.parameters.clear();
    }

    /// Check that there is something to execute.
    ///
    /// # Errors
    ///
    /// Returns `SqlSessionError::ExecutionError` when the command text is blank.
    pub fn ensure_executable(&self) -> Result<(), SqlSessionError> {
        if self.text.trim().is_empty() {
            return Err(SqlSessionError::ExecutionError(
                "Command text has not been set".to_string(),
            ));
        }
        Ok(())
    }
}
