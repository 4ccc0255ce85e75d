use std::io::Cursor;

use pgsteward_core::{OpenConstruct, ScriptError, run_script};

#[path = "support/fake_connection.rs"]
mod fake_connection;

use fake_connection::FakeConnection;

fn collect_statements(conn: &mut FakeConnection, script: &str) -> Vec<(String, bool, u64)> {
    let mut seen = Vec::new();
    run_script(conn, Cursor::new(script.to_string()), |text, result, line| {
        seen.push((text.to_string(), result.is_ok(), line));
    })
    .expect("script should not be truncated");
    seen
}

#[test]
fn line_comments_do_not_create_statement_boundaries() {
    let mut conn = FakeConnection::default();
    let script = "SELECT 1; -- comment with a ; inside\nSELECT 2;\n";

    let seen = collect_statements(&mut conn, script);
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].0, "SELECT 1");
    assert_eq!(seen[1].0, "SELECT 2");
    assert_eq!(seen[1].2, 2);
}

#[test]
fn dollar_quoted_bodies_keep_their_semicolons() {
    let mut conn = FakeConnection::default();
    let script =
        "CREATE FUNCTION f() RETURNS int AS $$ BEGIN RETURN 1; END; $$ LANGUAGE sql;\n";

    let seen = collect_statements(&mut conn, script);
    assert_eq!(seen.len(), 1);
    assert!(seen[0].0.contains("BEGIN RETURN 1; END;"));
}

#[test]
fn tagged_dollar_quotes_close_only_on_the_same_tag() {
    let mut conn = FakeConnection::default();
    let script = "SELECT $body$ nested $$ and ; stay $body$;\nSELECT 2;\n";

    let seen = collect_statements(&mut conn, script);
    assert_eq!(seen.len(), 2);
    assert!(seen[0].0.contains("nested $$ and ; stay"));
}

#[test]
fn positional_parameters_are_not_dollar_quotes() {
    let mut conn = FakeConnection::default();
    let script = "PREPARE p AS SELECT $1; EXECUTE p(1);\n";

    let seen = collect_statements(&mut conn, script);
    assert_eq!(seen.len(), 2);
}

#[test]
fn nested_block_comments_are_buffered_not_split() {
    let mut conn = FakeConnection::default();
    let script = "SELECT /* outer ; /* inner ; */ still out */ 1;\nSELECT 2;\n";

    let seen = collect_statements(&mut conn, script);
    assert_eq!(seen.len(), 2);
    assert!(seen[0].0.contains("inner"), "comment text stays buffered");
}

#[test]
fn quoted_semicolons_do_not_split() {
    let mut conn = FakeConnection::default();
    let script = "SELECT 'a;b', \"odd;name\";\nSELECT 'it''s; quoted';\nSELECT 'esc\\'; ok';\n";

    let seen = collect_statements(&mut conn, script);
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[1].0, "SELECT 'it''s; quoted'");
    assert_eq!(seen[2].0, "SELECT 'esc\\'; ok'");
}

#[test]
fn parenthesized_semicolons_do_not_split() {
    let mut conn = FakeConnection::default();
    let script = "CREATE RULE r AS ON INSERT TO t DO (SELECT 1; SELECT 2);\n";

    let seen = collect_statements(&mut conn, script);
    assert_eq!(seen.len(), 1);
}

#[test]
fn statements_span_lines_and_keep_line_numbers() {
    let mut conn = FakeConnection::default();
    let script = "SELECT\n  1\n;\nSELECT 2;\n";

    let seen = collect_statements(&mut conn, script);
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].0, "SELECT\n  1");
    assert_eq!(seen[0].2, 3);
    assert_eq!(seen[1].2, 4);
}

#[test]
fn trailing_text_without_semicolon_is_an_implicit_statement() {
    let mut conn = FakeConnection::default();
    let script = "SELECT 1;\nSELECT 2\n";

    let seen = collect_statements(&mut conn, script);
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].0, "SELECT 2");
}

#[test]
fn failing_statements_are_reported_and_the_script_continues() {
    let mut conn = FakeConnection::default();
    conn.set_fail_on("SELECT boom", "synthetic failure");
    let script = "SELECT 1;\nSELECT boom;\nSELECT 3;\n";

    let mut seen = Vec::new();
    let summary = run_script(&mut conn, Cursor::new(script), |text, result, _| {
        seen.push((text.to_string(), result.is_ok()));
    })
    .expect("failing statements do not truncate the script");

    assert_eq!(summary.statements, 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(seen[1], ("SELECT boom".to_string(), false));
    assert_eq!(seen[2], ("SELECT 3".to_string(), true));
}

#[test]
fn copy_in_switches_to_line_passthrough_until_the_terminator() {
    let mut conn = FakeConnection::default();
    conn.mark_copy_in("COPY t (a, b) FROM stdin");
    let script = "COPY t (a, b) FROM stdin;\n1\tfoo\n2\tbar\n\\.\nSELECT 1;\n";

    let seen = collect_statements(&mut conn, script);
    assert_eq!(seen.len(), 2, "copy data lines are not statements");
    assert_eq!(conn.copy_lines(), vec!["1\tfoo", "2\tbar"]);
    assert_eq!(conn.copy_ends(), 1);
    assert_eq!(seen[1].0, "SELECT 1");
}

#[test]
fn copy_data_may_contain_quotes_and_semicolons() {
    let mut conn = FakeConnection::default();
    conn.mark_copy_in("COPY t FROM stdin");
    let script = "COPY t FROM stdin;\nit's; \"raw\" data $tag$\n\\.\nSELECT 1;\n";

    let seen = collect_statements(&mut conn, script);
    assert_eq!(seen.len(), 2);
    assert_eq!(conn.copy_lines(), vec!["it's; \"raw\" data $tag$"]);
}

#[test]
fn unterminated_dollar_quote_is_a_truncation_error() {
    let mut conn = FakeConnection::default();
    let script = "SELECT 1;\nSELECT $$ never closed\n";

    let error = run_script(&mut conn, Cursor::new(script), |_, _, _| {})
        .expect_err("dollar quote never closes");
    match error {
        ScriptError::Unterminated { construct, line } => {
            assert_eq!(construct, OpenConstruct::DollarQuote);
            assert_eq!(line, 2);
        }
        other => panic!("expected unterminated error, got {other:?}"),
    }
}

#[test]
fn unterminated_quote_and_comment_are_distinct_from_statement_failures() {
    let mut conn = FakeConnection::default();
    let error = run_script(&mut conn, Cursor::new("SELECT 'open\n"), |_, _, _| {})
        .expect_err("quote never closes");
    assert!(matches!(
        error,
        ScriptError::Unterminated {
            construct: OpenConstruct::SingleQuote,
            ..
        }
    ));

    let mut conn = FakeConnection::default();
    let error = run_script(&mut conn, Cursor::new("/* open\ncomment\n"), |_, _, _| {})
        .expect_err("comment never closes");
    assert!(matches!(
        error,
        ScriptError::Unterminated {
            construct: OpenConstruct::Comment,
            ..
        }
    ));
}

#[test]
fn unterminated_copy_reports_the_copy_statement_line() {
    let mut conn = FakeConnection::default();
    conn.mark_copy_in("COPY t FROM stdin");
    let script = "COPY t FROM stdin;\n1\tfoo\n";

    let error = run_script(&mut conn, Cursor::new(script), |_, _, _| {})
        .expect_err("terminator never arrives");
    assert!(matches!(
        error,
        ScriptError::Unterminated {
            construct: OpenConstruct::CopyData,
            line: 1,
        }
    ));
}

#[test]
fn whitespace_only_input_executes_nothing() {
    let mut conn = FakeConnection::default();
    let seen = collect_statements(&mut conn, "\n   \n\t\n");
    assert!(seen.is_empty());
    assert!(conn.executed_sql().is_empty());
}
