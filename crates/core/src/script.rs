//! Multi-statement script lexer and executor.
//!
//! Consumes a line stream incrementally (scripts can be arbitrarily
//! large), splits it into statements with a character-level state
//! machine that persists across line boundaries, executes each
//! statement, and hands the text, execution result, and line number to
//! a caller-supplied callback. Malformed SQL is never a lexer error; it
//! is just a failing statement reported through the callback. The only
//! lexer-level failure is input that ends inside an open construct.

use std::io::BufRead;

use crate::connection::{Connection, ExecOutcome};
use crate::error::{ExecutionError, OpenConstruct, ScriptError};

/// Result of one executed statement, as seen by the callback.
pub type StatementResult = Result<ExecOutcome, ExecutionError>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScriptSummary {
    pub statements: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
}

/// Terminator line for the bulk-data sub-protocol: a backslash and a
/// period, alone on the line.
const COPY_END_MARKER: &str = "\\.";

struct Lexer {
    quote: Quote,
    dollar: Option<Vec<char>>,
    comment_depth: u32,
    paren_depth: u32,
    /// Length of the current trailing-backslash run inside a
    /// single-quoted literal.
    backslashes: usize,
    buffer: String,
    /// Line on which the currently-open construct (or copy transfer)
    /// started, for the truncation error.
    construct_line: u64,
}

impl Lexer {
    fn new() -> Self {
        Self {
            quote: Quote::None,
            dollar: None,
            comment_depth: 0,
            paren_depth: 0,
            backslashes: 0,
            buffer: String::new(),
            construct_line: 0,
        }
    }

    fn open_construct(&self) -> Option<OpenConstruct> {
        if self.comment_depth > 0 {
            Some(OpenConstruct::Comment)
        } else if self.dollar.is_some() {
            Some(OpenConstruct::DollarQuote)
        } else {
            match self.quote {
                Quote::Single => Some(OpenConstruct::SingleQuote),
                Quote::Double => Some(OpenConstruct::DoubleQuote),
                Quote::None => None,
            }
        }
    }
}

/// Run a script against a connection, invoking `on_statement` once per
/// executed statement with `(text, result, line)` where `line` is the
/// line carrying the statement's terminator (or the last line, for the
/// implicit final statement).
pub fn run_script<R, F>(
    conn: &mut dyn Connection,
    input: R,
    mut on_statement: F,
) -> Result<ScriptSummary, ScriptError>
where
    R: BufRead,
    F: FnMut(&str, &StatementResult, u64),
{
    let mut lexer = Lexer::new();
    let mut summary = ScriptSummary::default();
    let mut line_no: u64 = 0;
    // Some(text of the COPY statement) while forwarding bulk data;
    // the bool records whether forwarding already failed.
    let mut copy: Option<(String, bool)> = None;

    for line in input.lines() {
        let line = line?;
        line_no += 1;

        if copy.is_some() {
            if line == COPY_END_MARKER {
                if let Some((copy_sql, failed)) = copy.take()
                    && !failed
                    && let Err(err) = conn.copy_end()
                {
                    summary.failed += 1;
                    on_statement(&copy_sql, &Err(err), line_no);
                }
            } else if let Some((copy_sql, failed)) = copy.as_mut()
                && !*failed
                && let Err(err) = conn.copy_line(&line)
            {
                *failed = true;
                summary.failed += 1;
                on_statement(copy_sql, &Err(err), line_no);
            }
            continue;
        }

        scan_line(
            &mut lexer,
            &line,
            line_no,
            conn,
            &mut summary,
            &mut copy,
            &mut on_statement,
        );

        if copy.is_none() && !lexer.buffer.is_empty() {
            lexer.buffer.push('\n');
        }
    }

    if let Some((_, failed)) = copy {
        if !failed {
            // Give the driver a chance to flush what it has; the script
            // is still truncated either way.
            let _ = conn.copy_end();
        }
        return Err(ScriptError::Unterminated {
            construct: OpenConstruct::CopyData,
            line: lexer.construct_line,
        });
    }
    if let Some(construct) = lexer.open_construct() {
        return Err(ScriptError::Unterminated {
            construct,
            line: lexer.construct_line,
        });
    }

    // End of input with pending text is an implicit final statement.
    finish_statement(&mut lexer, line_no, conn, &mut summary, &mut copy, &mut on_statement);

    Ok(summary)
}

fn scan_line<F>(
    lexer: &mut Lexer,
    line: &str,
    line_no: u64,
    conn: &mut dyn Connection,
    summary: &mut ScriptSummary,
    copy: &mut Option<(String, bool)>,
    on_statement: &mut F,
) where
    F: FnMut(&str, &StatementResult, u64),
{
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        // A COPY statement ending mid-line switches the rest of the
        // stream to passthrough; data starts on the next physical line.
        if copy.is_some() {
            return;
        }
        let ch = chars[i];

        if lexer.comment_depth > 0 {
            // Comment text stays in the buffer; the server, not the
            // lexer, decides whether comments affect semantics.
            if ch == '*' && chars.get(i + 1) == Some(&'/') {
                lexer.buffer.push_str("*/");
                lexer.comment_depth -= 1;
                i += 2;
            } else if ch == '/' && chars.get(i + 1) == Some(&'*') {
                lexer.buffer.push_str("/*");
                lexer.comment_depth += 1;
                i += 2;
            } else {
                lexer.buffer.push(ch);
                i += 1;
            }
            continue;
        }

        if let Some(delimiter) = &lexer.dollar {
            // Only the exact opening tag closes a dollar-quoted block;
            // nothing inside it is recognized.
            let len = delimiter.len();
            let closes = chars[i..].starts_with(delimiter.as_slice());
            if closes {
                for tag_char in &chars[i..i + len] {
                    lexer.buffer.push(*tag_char);
                }
                lexer.dollar = None;
                i += len;
            } else {
                lexer.buffer.push(ch);
                i += 1;
            }
            continue;
        }

        match lexer.quote {
            Quote::Single => {
                lexer.buffer.push(ch);
                if ch == '\\' {
                    lexer.backslashes += 1;
                } else {
                    if ch == '\'' && lexer.backslashes % 2 == 0 {
                        lexer.quote = Quote::None;
                    }
                    lexer.backslashes = 0;
                }
                i += 1;
            }
            Quote::Double => {
                // Backslashes do not escape inside double quotes.
                lexer.buffer.push(ch);
                if ch == '"' {
                    lexer.quote = Quote::None;
                }
                i += 1;
            }
            Quote::None => match ch {
                '\'' => {
                    lexer.quote = Quote::Single;
                    lexer.backslashes = 0;
                    lexer.construct_line = line_no;
                    lexer.buffer.push(ch);
                    i += 1;
                }
                '"' => {
                    lexer.quote = Quote::Double;
                    lexer.construct_line = line_no;
                    lexer.buffer.push(ch);
                    i += 1;
                }
                '-' if chars.get(i + 1) == Some(&'-') => {
                    // Line comment: truncates the rest of the physical
                    // line, so a `;` in it is never a boundary. Block
                    // comments, by contrast, stay buffered.
                    i = chars.len();
                }
                '/' if chars.get(i + 1) == Some(&'*') => {
                    lexer.comment_depth = 1;
                    lexer.construct_line = line_no;
                    lexer.buffer.push_str("/*");
                    i += 2;
                }
                '$' => {
                    if let Some(tag_len) = dollar_tag_length(&chars[i..]) {
                        lexer.dollar = Some(chars[i..i + tag_len].to_vec());
                        lexer.construct_line = line_no;
                        for tag_char in &chars[i..i + tag_len] {
                            lexer.buffer.push(*tag_char);
                        }
                        i += tag_len;
                    } else {
                        lexer.buffer.push(ch);
                        i += 1;
                    }
                }
                '(' => {
                    lexer.paren_depth += 1;
                    lexer.buffer.push(ch);
                    i += 1;
                }
                ')' => {
                    lexer.paren_depth = lexer.paren_depth.saturating_sub(1);
                    lexer.buffer.push(ch);
                    i += 1;
                }
                ';' if lexer.paren_depth == 0 => {
                    finish_statement(lexer, line_no, conn, summary, copy, on_statement);
                    i += 1;
                }
                _ => {
                    lexer.buffer.push(ch);
                    i += 1;
                }
            },
        }
    }
}

/// Length of a dollar-quote delimiter (`$$` or `$tag$`) starting at
/// `chars[0]`, which is known to be `$`. Returns `None` when what
/// follows is not a delimiter, e.g. a positional parameter like `$1`.
fn dollar_tag_length(chars: &[char]) -> Option<usize> {
    let mut j = 1;
    if let Some(first) = chars.get(j)
        && (first.is_ascii_alphabetic() || *first == '_')
    {
        j += 1;
        while chars
            .get(j)
            .is_some_and(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        {
            j += 1;
        }
    }
    (chars.get(j) == Some(&'$')).then_some(j + 1)
}

fn finish_statement<F>(
    lexer: &mut Lexer,
    line_no: u64,
    conn: &mut dyn Connection,
    summary: &mut ScriptSummary,
    copy: &mut Option<(String, bool)>,
    on_statement: &mut F,
) where
    F: FnMut(&str, &StatementResult, u64),
{
    let text = lexer.buffer.trim().to_string();
    lexer.buffer.clear();
    lexer.paren_depth = 0;
    if text.is_empty() {
        return;
    }

    let result = conn.execute(&text);
    summary.statements += 1;
    if result.is_err() {
        summary.failed += 1;
    }
    on_statement(&text, &result, line_no);

    if matches!(result, Ok(ExecOutcome::CopyIn)) {
        lexer.construct_line = line_no;
        *copy = Some((text, false));
    }
}
