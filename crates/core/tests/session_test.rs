use pgsteward_core::{Session, Template};

#[path = "support/fake_connection.rs"]
mod fake_connection;

use fake_connection::FakeConnection;

const SHOW_SQL: &str = "SHOW server_version";

fn session_at(version: &str) -> (Session, FakeConnection) {
    let conn = FakeConnection::default();
    conn.set_scalar(SHOW_SQL, Some(version));
    let handle = conn.clone();
    let session = Session::open(Box::new(conn)).expect("session opens");
    (session, handle)
}

#[test]
fn set_schema_updates_the_session_only_after_the_server_accepts() {
    let (mut session, handle) = session_at("13.2");
    assert_eq!(session.current_schema(), "public");

    session.set_schema("billing").expect("schema switch");
    assert_eq!(session.current_schema(), "billing");
    assert!(
        handle
            .executed_sql()
            .contains(&"SET search_path TO \"billing\"".to_string())
    );

    handle.set_fail_on("SET search_path TO \"missing\"", "schema does not exist");
    session
        .set_schema("missing")
        .expect_err("server rejects the schema");
    assert_eq!(session.current_schema(), "billing", "rejected switch is not recorded");
}

#[test]
fn cancel_goes_out_of_band() {
    let (session, handle) = session_at("13.2");
    assert!(session.cancel());
    assert_eq!(handle.cancel_requests(), 1);
}

#[test]
fn cancel_backend_is_declined_without_touching_old_servers() {
    // pg_cancel_backend exists on every supported revision.
    let (mut session, handle) = session_at("7.4.30");
    assert!(session.cancel_backend(123).expect("cancel call"));
    assert!(
        handle
            .executed_sql()
            .contains(&"SELECT pg_catalog.pg_cancel_backend(123)".to_string())
    );

    // pg_terminate_backend arrived in 8.4.
    let (mut session, handle) = session_at("8.3.23");
    assert!(!session.terminate_backend(123).expect("declined, not an error"));
    assert_eq!(handle.executed_sql(), vec![SHOW_SQL.to_string()]);

    let (mut session, handle) = session_at("8.4.22");
    assert!(session.terminate_backend(123).expect("terminate call"));
    assert!(
        handle
            .executed_sql()
            .contains(&"SELECT pg_catalog.pg_terminate_backend(123)".to_string())
    );
}

#[test]
fn run_template_picks_the_version_correct_query() {
    let (mut session, handle) = session_at("9.1.24");
    session.run_template(Template::BackendsQuery).expect("query runs");
    let executed = handle.executed_sql();
    let backends = executed.last().expect("one query ran");
    assert!(backends.contains("procpid"), "pre-9.2 column name: {backends}");

    let (mut session, handle) = session_at("9.2.4");
    session.run_template(Template::BackendsQuery).expect("query runs");
    let executed = handle.executed_sql();
    let backends = executed.last().expect("one query ran");
    assert!(!backends.contains("procpid"), "9.2 renamed the column: {backends}");
    assert!(backends.contains("pid"));
}
