use pgsteward_core::{Error, Session, VersionError, VersionTag, probe};

#[path = "support/fake_connection.rs"]
mod fake_connection;

use fake_connection::FakeConnection;

const SHOW_SQL: &str = "SHOW server_version";
const SELECT_SQL: &str = "SELECT version()";

#[test]
fn show_server_version_is_the_lightweight_path() {
    let mut conn = FakeConnection::default();
    conn.set_scalar(SHOW_SQL, Some("9.6.10"));

    let server = probe(&mut conn).expect("probe");
    assert_eq!(server.tag, VersionTag::new(9, 6));
    assert_eq!(server.description, "PostgreSQL 9.6.10");
}

#[test]
fn falls_back_to_select_version_when_show_fails() {
    let mut conn = FakeConnection::default();
    conn.set_fail_on(SHOW_SQL, "syntax error");
    conn.set_scalar(
        SELECT_SQL,
        Some("PostgreSQL 12.3 on x86_64-pc-linux-gnu, compiled by gcc 9.3.0, 64-bit"),
    );

    let server = probe(&mut conn).expect("probe via fallback");
    // Families from 10 on are major-only.
    assert_eq!(server.tag, VersionTag::new(12, 0));
    assert_eq!(server.description, "PostgreSQL 12.3");
}

#[test]
fn probe_failure_is_indeterminate_not_unsupported() {
    let mut conn = FakeConnection::default();
    conn.set_fail_on(SHOW_SQL, "connection reset");
    conn.set_fail_on(SELECT_SQL, "connection reset");

    let error = probe(&mut conn).expect_err("both probes failed");
    assert!(matches!(error, VersionError::Indeterminate { .. }));
}

#[test]
fn version_text_without_a_number_is_indeterminate() {
    let mut conn = FakeConnection::default();
    conn.set_scalar(SHOW_SQL, Some("EnterpriseDB special"));

    let error = probe(&mut conn).expect_err("no numeric token");
    assert!(matches!(error, VersionError::Indeterminate { .. }));
}

#[test]
fn session_open_selects_the_matching_dialect() {
    let conn = FakeConnection::default();
    conn.set_scalar(SHOW_SQL, Some("13.2"));

    let session = Session::open(Box::new(conn)).expect("session");
    assert_eq!(session.dialect().version(), VersionTag::new(13, 0));
    assert_eq!(session.server_description(), "PostgreSQL 13.2");
    assert_eq!(session.current_schema(), "public");
}

#[test]
fn session_open_rejects_prehistoric_servers() {
    let conn = FakeConnection::default();
    conn.set_scalar(SHOW_SQL, Some("6.5"));

    let error = Session::open(Box::new(conn)).expect_err("6.5 predates the chain");
    assert!(matches!(
        error,
        Error::Version(VersionError::Unsupported { .. })
    ));
}
