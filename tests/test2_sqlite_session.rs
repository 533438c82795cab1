#![cfg(feature = "sqlite")]

use sql_session::prelude::*;
use sql_session::{ConnectionStringSettings, SessionState};
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    config: ConnectionStrings,
}

fn fixture() -> Result<Fixture, Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("session.db");
    let config = ConnectionStrings::new().with(ConnectionStringSettings::new(
        "Test",
        "System.Data.SQLite",
        format!("Data Source={}", path.display()),
    ));

    let mut session = Session::open(&config, "Test")?;
    session.set_command_text(
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
         INSERT INTO users (id, name) VALUES (10, 'ten'), (20, 'twenty');",
    );
    session.execute_non_query()?;

    Ok(Fixture { _dir: dir, config })
}

fn name_of(config: &ConnectionStrings, id: i64) -> Result<Option<String>, SqlSessionError> {
    let mut session = Session::open(config, "Test")?;
    session.set_command_text("SELECT name FROM users WHERE id = @id");
    session.add_parameter("id", id);
    let value = session.execute_scalar_value()?;
    Ok(value.and_then(|v| v.as_text().map(str::to_owned)))
}

#[test]
fn single_shot_insert_returns_one_and_disposes() -> Result<(), Box<dyn std::error::Error>> {
    let fx = fixture()?;
    let mut session = Session::open(&fx.config, "Test")?;
    session.set_command_text("INSERT INTO users (id, name) VALUES (@id, @name)");
    session.add_parameter("id", 1);
    session.add_parameter("name", "a");

    assert_eq!(session.execute_non_query()?, 1);
    assert_eq!(session.state(), SessionState::Disposed);
    assert!(matches!(
        session.execute_non_query(),
        Err(SqlSessionError::Disposed)
    ));
    assert_eq!(name_of(&fx.config, 1)?, Some("a".to_string()));
    Ok(())
}

#[test]
fn commit_makes_writes_durable() -> Result<(), Box<dyn std::error::Error>> {
    let fx = fixture()?;
    let mut session = Session::open_transactional(&fx.config, "Test")?;
    session.set_command_text("UPDATE users SET name = @name WHERE id = @id");
    session.set_parameters([SqlParameter::new("id", 10), SqlParameter::new("name", "TEN")]);
    assert_eq!(session.execute_non_query()?, 1);

    session.set_command_text("INSERT INTO users (id, name) VALUES (@id, @name)");
    session.set_parameters([SqlParameter::new("id", 30), SqlParameter::new("name", "thirty")]);
    assert_eq!(session.execute_non_query()?, 1);
    assert!(session.in_transaction());

    session.commit()?;
    assert!(session.is_disposed());

    assert_eq!(name_of(&fx.config, 10)?, Some("TEN".to_string()));
    assert_eq!(name_of(&fx.config, 30)?, Some("thirty".to_string()));
    Ok(())
}

#[test]
fn rollback_reverts_both_updates() -> Result<(), Box<dyn std::error::Error>> {
    let fx = fixture()?;
    let mut session = Session::open_transactional(&fx.config, "Test")?;
    session.set_command_text("UPDATE users SET name = 'changed' WHERE id = @id");
    session.add_parameter("id", 10);
    session.execute_non_query()?;
    session.set_parameters([SqlParameter::new("id", 20)]);
    session.execute_non_query()?;

    session.rollback()?;
    assert!(session.is_disposed());

    assert_eq!(name_of(&fx.config, 10)?, Some("ten".to_string()));
    assert_eq!(name_of(&fx.config, 20)?, Some("twenty".to_string()));
    Ok(())
}

#[test]
fn dropping_a_transactional_session_rolls_back() -> Result<(), Box<dyn std::error::Error>> {
    let fx = fixture()?;
    {
        let mut session = Session::open_transactional(&fx.config, "Test")?;
        session.set_command_text("DELETE FROM users");
        assert_eq!(session.execute_non_query()?, 2);
    }
    assert_eq!(name_of(&fx.config, 20)?, Some("twenty".to_string()));
    Ok(())
}

#[test]
fn ddl_reports_no_affected_rows_after_dml() -> Result<(), Box<dyn std::error::Error>> {
    let fx = fixture()?;

    let mut session = Session::open(&fx.config, "Test")?;
    session.set_command_text(
        "CREATE TABLE t (a INTEGER);
         INSERT INTO t VALUES (1), (2), (3);
         CREATE TABLE u (a INTEGER);",
    );
    assert_eq!(session.execute_non_query()?, 3);

    let mut session = Session::open_transactional(&fx.config, "Test")?;
    session.set_command_text("DELETE FROM t");
    assert_eq!(session.execute_non_query()?, 3);
    session.set_command_text("CREATE TABLE v (a INTEGER)");
    assert_eq!(session.execute_non_query()?, 0);
    session.rollback()?;
    Ok(())
}

#[test]
fn bulk_parameter_replacement_drops_leftovers() -> Result<(), Box<dyn std::error::Error>> {
    let fx = fixture()?;

    let mut session = Session::open_transactional(&fx.config, "Test")?;
    session.set_command_text("SELECT COUNT(*) FROM users WHERE name = @name");
    session.add_parameter("name", "ten");
    assert_eq!(session.execute_scalar()?, 1);

    session.set_command_text("SELECT COUNT(*) FROM users WHERE id > @min");
    session.set_parameters([SqlParameter::new("@min", 15)]);
    assert_eq!(session.execute_scalar()?, 1);

    // appending instead of replacing leaves @name unreferenced
    session.add_parameter("name", "ten");
    assert!(matches!(
        session.execute_scalar(),
        Err(SqlSessionError::ParameterError(_))
    ));
    session.rollback()?;
    Ok(())
}

#[test]
fn scalar_conversions() -> Result<(), Box<dyn std::error::Error>> {
    let fx = fixture()?;
    let mut session = Session::open_transactional(&fx.config, "Test")?;

    session.set_command_text("SELECT id FROM users WHERE id = -1");
    assert_eq!(session.execute_scalar()?, 0);

    session.set_command_text("SELECT 2.6");
    assert_eq!(session.execute_scalar()?, 3);

    session.set_command_text("SELECT ' 42 '");
    assert_eq!(session.execute_scalar()?, 42);

    session.set_command_text("SELECT NULL");
    assert!(matches!(
        session.execute_scalar(),
        Err(SqlSessionError::ExecutionError(_))
    ));

    session.commit()?;
    Ok(())
}

#[test]
fn misuse_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let fx = fixture()?;

    let mut session = Session::open(&fx.config, "Test")?;
    assert!(matches!(
        session.commit(),
        Err(SqlSessionError::NoActiveTransaction)
    ));
    session.set_command_text("   ");
    assert!(matches!(
        session.execute_non_query(),
        Err(SqlSessionError::ExecutionError(_))
    ));
    assert!(session.is_disposed());

    let mut session = Session::open(&fx.config, "Test")?;
    session.set_command_type(CommandType::StoredProcedure);
    session.set_command_text("usp_anything");
    assert!(matches!(
        session.execute_non_query(),
        Err(SqlSessionError::Unimplemented(_))
    ));
    assert!(session.is_disposed());
    Ok(())
}
