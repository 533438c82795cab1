#![cfg(feature = "mssql")]

use sql_session::prelude::*;
use sql_session::{ConnectionStringSettings, ConnectionState};

/// ADO connection string of a disposable SQL Server database, e.g.
/// `Server=tcp:localhost,1433;Database=tempdb;User Id=sa;Password=...;TrustServerCertificate=true`.
fn config() -> Option<ConnectionStrings> {
    let connection_string = std::env::var("SQL_SESSION_MSSQL").ok()?;
    Some(ConnectionStrings::new().with(ConnectionStringSettings::new(
        "Main",
        "System.Data.SqlClient",
        connection_string,
    )))
}

#[test]
fn sql_server_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let Some(config) = config() else {
        eprintln!("SQL_SESSION_MSSQL not set; skipping SQL Server test");
        return Ok(());
    };

    let mut session = Session::open(&config, "Main")?;
    assert_eq!(session.connection_state(), ConnectionState::Open);
    session.set_command_text(
        "IF OBJECT_ID('dbo.sql_session_users') IS NOT NULL DROP TABLE dbo.sql_session_users;
         CREATE TABLE dbo.sql_session_users (id INT PRIMARY KEY, name NVARCHAR(50) NOT NULL);
         INSERT INTO dbo.sql_session_users (id, name) VALUES (10, N'ten'), (20, N'twenty');",
    );
    session.execute_non_query()?;

    let mut session = Session::open(&config, "Main")?;
    session.set_command_text("INSERT INTO dbo.sql_session_users (id, name) VALUES (@id, @name)");
    session.add_parameter("id", 1);
    session.add_parameter("name", "a");
    assert_eq!(session.execute_non_query()?, 1);
    assert!(matches!(
        session.execute_non_query(),
        Err(SqlSessionError::Disposed)
    ));

    let mut session = Session::open_transactional(&config, "Main")?;
    session.set_command_text("UPDATE dbo.sql_session_users SET name = N'changed' WHERE id = @id");
    session.add_parameter("id", 10);
    session.execute_non_query()?;
    session.set_parameters([SqlParameter::new("id", 20)]);
    session.execute_non_query()?;
    session.set_command_text(
        "UPDATE dbo.sql_session_users SET name = N'again' WHERE id = @id;
         SELECT id FROM dbo.sql_session_users WHERE id = @id;",
    );
    assert_eq!(session.execute_non_query()?, 2);
    session.set_command_text(
        "UPDATE dbo.sql_session_users SET name = N'again' WHERE id = @id;
         SET NOCOUNT ON;
         SELECT id FROM dbo.sql_session_users WHERE id = @id;",
    );
    assert_eq!(session.execute_non_query()?, 1);
    session.rollback()?;

    let mut session = Session::open(&config, "Main")?;
    session.set_command_text(
        "SELECT id, name FROM dbo.sql_session_users ORDER BY id;
         SELECT COUNT(*) AS total FROM dbo.sql_session_users WHERE name = @name;",
    );
    session.add_sql_parameter(SqlParameter::new("name", "changed").with_sql_type("nvarchar(50)"));
    let dataset = session.fetch_dataset()?;
    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.tables[0].len(), 3);
    assert_eq!(
        dataset.tables[0].rows[1].get("name"),
        Some(&RowValues::Text("ten".into()))
    );
    assert_eq!(
        dataset.tables[1].rows[0].get("total"),
        Some(&RowValues::Int(0))
    );

    let mut session = Session::open(&config, "Main")?;
    session.set_command_text("DROP TABLE dbo.sql_session_users");
    session.execute_non_query()?;
    Ok(())
}
