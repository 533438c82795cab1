use std::fmt::Write;
use std::sync::LazyLock;

use regex::Regex;
use tiberius::Query;

use crate::command::{Command, SqlParameter};
use crate::error::SqlSessionError;
use crate::types::{CommandType, RowValues};

static PROCEDURE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\[[^\]]+\]|[A-Za-z_#][A-Za-z0-9_@$#]*)(\.(\[[^\]]+\]|[A-Za-z_][A-Za-z0-9_@$#]*)){0,3}$")
        .expect("static procedure-name pattern")
});

static SQL_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_ ]*(\(\s*(?i:max|\d+)\s*(,\s*\d+\s*)?\))?$")
        .expect("static sql-type pattern")
});

/// `@P1`, `@p2`, ... are the names tiberius binds values to; a declaration with one of
/// them would shadow the bound value.
fn is_positional_name(name: &str) -> bool {
    name.strip_prefix(['P', 'p'])
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// SQL Server type used to declare a parameter holding `value`.
fn inferred_sql_type(value: &RowValues) -> &'static str {
    match value {
        RowValues::Int(_) => "bigint",
        RowValues::Float(_) => "float",
        RowValues::Bool(_) => "bit",
        RowValues::Timestamp(_) => "datetime2",
        RowValues::Blob(_) => "varbinary(max)",
        RowValues::Text(_) | RowValues::JSON(_) | RowValues::Null => "nvarchar(max)",
    }
}

fn declared_sql_type(parameter: &SqlParameter) -> Result<&str, SqlSessionError> {
    match parameter.sql_type.as_deref() {
        Some(sql_type) if SQL_TYPE.is_match(sql_type.trim()) => Ok(sql_type.trim()),
        Some(sql_type) => Err(SqlSessionError::ParameterError(format!(
            "Invalid SQL type {sql_type:?} for parameter {:?}",
            parameter.name
        ))),
        None => Ok(inferred_sql_type(&parameter.value)),
    }
}

/// Render the batch sent to SQL Server for `command`.
///
/// Driver placeholders are positional (`@P1..@Pn`), so named parameters are mapped onto
/// them: text commands get a `DECLARE @name type = @Pn;` preamble, stored procedures are
/// called with `@name = @Pn` arguments.
///
/// # Errors
///
/// Returns `SqlSessionError::ParameterError` for an invalid parameter name or SQL type,
/// `SqlSessionError::ExecutionError` for an invalid procedure name.
pub fn build_statement(command: &Command) -> Result<String, SqlSessionError> {
    match command.command_type() {
        CommandType::Text => {
            let mut sql = String::new();
            for (i, parameter) in command.parameters().iter().enumerate() {
                let name = parameter.bare_name()?;
                if is_positional_name(name) {
                    return Err(SqlSessionError::ParameterError(format!(
                        "Parameter name @{name} is reserved for positional binding"
                    )));
                }
                let sql_type = declared_sql_type(parameter)?;
                let _ = writeln!(sql, "DECLARE @{name} {sql_type} = @P{};", i + 1);
            }
            sql.push_str(command.text());
            Ok(sql)
        }
        CommandType::StoredProcedure => {
            let procedure = command.text().trim();
            if !PROCEDURE_NAME.is_match(procedure) {
                return Err(SqlSessionError::ExecutionError(format!(
                    "Invalid stored procedure name: {procedure:?}"
                )));
            }
            let mut sql = format!("EXEC {procedure}");
            for (i, parameter) in command.parameters().iter().enumerate() {
                let name = parameter.bare_name()?;
                let sep = if i == 0 { " " } else { ", " };
                let _ = write!(sql, "{sep}@{name} = @P{}", i + 1);
            }
            Ok(sql)
        }
    }
}

/// Bind parameter values positionally, in command order.
pub fn bind_query_params(sql: String, parameters: &[SqlParameter]) -> Query<'static> {
    let mut query = Query::new(sql);

    for parameter in parameters {
        match &parameter.value {
            RowValues::Int(i) => query.bind(*i),
            RowValues::Float(f) => query.bind(*f),
            RowValues::Text(s) => query.bind(s.clone()),
            RowValues::Bool(b) => query.bind(*b),
            RowValues::Timestamp(dt) => query.bind(*dt),
            RowValues::Null => query.bind(Option::<String>::None),
            RowValues::JSON(jsval) => query.bind(jsval.to_string()),
            RowValues::Blob(bytes) => query.bind(bytes.clone()),
        }
    }

    query
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(text: &str, command_type: CommandType, params: Vec<SqlParameter>) -> Command {
        let mut cmd = Command::new(text);
        cmd.set_command_type(command_type);
        cmd.set_parameters(params);
        cmd
    }

    #[test]
    fn text_without_parameters_is_sent_verbatim() {
        let cmd = command("SELECT 1", CommandType::Text, vec![]);
        assert_eq!(build_statement(&cmd).unwrap(), "SELECT 1");
    }

    #[test]
    fn text_parameters_become_declarations() {
        let cmd = command(
            "INSERT INTO t (id, name) VALUES (@id, @name)",
            CommandType::Text,
            vec![SqlParameter::new("@id", 1), SqlParameter::new("name", "a")],
        );
        assert_eq!(
            build_statement(&cmd).unwrap(),
            "DECLARE @id bigint = @P1;\n\
             DECLARE @name nvarchar(max) = @P2;\n\
             INSERT INTO t (id, name) VALUES (@id, @name)"
        );
    }

    #[test]
    fn explicit_sql_type_overrides_inference() {
        let cmd = command(
            "SELECT @price",
            CommandType::Text,
            vec![SqlParameter::new("price", 9.5).with_sql_type("decimal(18, 2)")],
        );
        assert!(
            build_statement(&cmd)
                .unwrap()
                .starts_with("DECLARE @price decimal(18, 2) = @P1;")
        );
    }

    #[test]
    fn rejects_injected_sql_type() {
        let cmd = command(
            "SELECT @x",
            CommandType::Text,
            vec![SqlParameter::new("x", 1).with_sql_type("int; DROP TABLE t")],
        );
        assert!(matches!(
            build_statement(&cmd),
            Err(SqlSessionError::ParameterError(_))
        ));
    }

    #[test]
    fn rejects_names_reserved_for_positional_binding() {
        for name in ["P1", "@p2", "p10"] {
            let cmd = command(
                "SELECT 1",
                CommandType::Text,
                vec![SqlParameter::new(name, 1)],
            );
            assert!(matches!(
                build_statement(&cmd),
                Err(SqlSessionError::ParameterError(_))
            ));
        }
        let cmd = command(
            "SELECT @P, @Page",
            CommandType::Text,
            vec![SqlParameter::new("P", 1), SqlParameter::new("Page", 2)],
        );
        assert!(build_statement(&cmd).is_ok());
    }

    #[test]
    fn stored_procedure_call() {
        let cmd = command(
            "dbo.[Update User]",
            CommandType::StoredProcedure,
            vec![SqlParameter::new("id", 1), SqlParameter::new("@name", RowValues::Null)],
        );
        assert_eq!(
            build_statement(&cmd).unwrap(),
            "EXEC dbo.[Update User] @id = @P1, @name = @P2"
        );
    }

    #[test]
    fn rejects_invalid_procedure_name() {
        let cmd = command("sp; DROP TABLE x", CommandType::StoredProcedure, vec![]);
        assert!(matches!(
            build_statement(&cmd),
            Err(SqlSessionError::ExecutionError(_))
        ));
    }
}
