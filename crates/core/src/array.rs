//! Decoder and encoder for the server's one-dimensional array literal
//! text, `{elem,elem,...}`. Elements may be double-quoted, with `\"`
//! and `\\` as the only escapes inside quotes.
//!
//! Fidelity limitation inherited from the format: an unquoted `NULL`
//! token and the quoted string `"NULL"` both decode to the string
//! `NULL`; callers that need to distinguish them cannot.

use crate::error::TextParseError;

/// Parse array literal text into its elements, in order. A trailing
/// top-level comma yields a final empty element; `{}` is the empty
/// array.
pub fn parse_array(text: &str) -> Result<Vec<String>, TextParseError> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .ok_or(TextParseError::MalformedArray {
            text: text.to_string(),
            reason: "missing outer braces",
        })?;
    if inner.is_empty() {
        return Ok(Vec::new());
    }

    let mut elements = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut iter = inner.chars();

    while let Some(ch) = iter.next() {
        match ch {
            '\\' if in_quotes => {
                // Escape only exists inside quotes; keep it verbatim for
                // the unescaping pass below.
                current.push(ch);
                match iter.next() {
                    Some(escaped) => current.push(escaped),
                    None => {
                        return Err(TextParseError::MalformedArray {
                            text: text.to_string(),
                            reason: "dangling backslash escape",
                        });
                    }
                }
            }
            '"' => {
                current.push(ch);
                in_quotes = !in_quotes;
            }
            ',' if !in_quotes => elements.push(unescape_element(std::mem::take(&mut current))),
            _ => current.push(ch),
        }
    }
    if in_quotes {
        return Err(TextParseError::MalformedArray {
            text: text.to_string(),
            reason: "unterminated quote",
        });
    }
    elements.push(unescape_element(current));
    Ok(elements)
}

fn unescape_element(raw: String) -> String {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        let inner = &raw[1..raw.len() - 1];
        let mut value = String::with_capacity(inner.len());
        let mut iter = inner.chars();
        while let Some(ch) = iter.next() {
            if ch == '\\' {
                if let Some(escaped) = iter.next() {
                    value.push(escaped);
                }
            } else {
                value.push(ch);
            }
        }
        value
    } else {
        raw
    }
}

/// Serialize elements back to array literal text. The output re-parses
/// to the same sequence; it is not guaranteed byte-identical to the
/// text the sequence was decoded from.
#[must_use]
pub fn format_array<S: AsRef<str>>(elements: &[S]) -> String {
    let mut text = String::from("{");
    for (index, element) in elements.iter().enumerate() {
        if index > 0 {
            text.push(',');
        }
        let element = element.as_ref();
        if needs_quoting(element) {
            text.push('"');
            for ch in element.chars() {
                if ch == '"' || ch == '\\' {
                    text.push('\\');
                }
                text.push(ch);
            }
            text.push('"');
        } else {
            text.push_str(element);
        }
    }
    text.push('}');
    text
}

/// Quote anything ambiguous: empty elements, the NULL token, and
/// elements containing delimiters, quotes, escapes, or whitespace.
fn needs_quoting(element: &str) -> bool {
    element.is_empty()
        || element.eq_ignore_ascii_case("null")
        || element
            .chars()
            .any(|ch| matches!(ch, ',' | '"' | '\\' | '{' | '}') || ch.is_whitespace())
}
