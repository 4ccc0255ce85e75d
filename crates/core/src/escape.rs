//! Quoting for object names and string literals. Always quotes rather
//! than deciding per-identifier whether quoting is needed; the output
//! is valid either way and reproducible output matters more than
//! minimal output.

#[must_use]
pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

#[must_use]
pub fn qualified(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_identifier(schema), quote_identifier(name))
}

/// Quote a string literal. Values containing a backslash are emitted as
/// an escape-string literal (`E'...'`) with the backslashes doubled, so
/// the text reads back identically whatever the server's
/// `standard_conforming_strings` setting is.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    if value.contains('\\') {
        format!(
            "E'{}'",
            value.replace('\\', "\\\\").replace('\'', "''")
        )
    } else {
        format!("'{}'", value.replace('\'', "''"))
    }
}
