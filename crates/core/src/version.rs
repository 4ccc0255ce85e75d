use crate::connection::Connection;
use crate::dialect::VersionTag;
use crate::error::VersionError;

const SHOW_SERVER_VERSION_SQL: &str = "SHOW server_version";
const SELECT_VERSION_SQL: &str = "SELECT version()";

/// What the probe learned about the connected server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerVersion {
    /// The raw text the server returned.
    pub raw: String,
    /// The revision-family tag used for dialect selection. Minor is
    /// collapsed to 0 from major 10 on, where families are major-only.
    pub tag: VersionTag,
    /// Human-readable description for display, e.g. "PostgreSQL 13.2".
    pub description: String,
}

/// Determine the server version: the lightweight `SHOW` first, the full
/// `SELECT version()` as fallback. A probe that cannot produce a parsed
/// version is `Indeterminate`, which is a connectivity-shaped failure;
/// whether the parsed version is *supported* is decided later by
/// dialect selection.
pub fn probe(conn: &mut dyn Connection) -> Result<ServerVersion, VersionError> {
    let raw = match conn.query_scalar(SHOW_SERVER_VERSION_SQL) {
        Ok(Some(value)) if !value.trim().is_empty() => value,
        _ => match conn.query_scalar(SELECT_VERSION_SQL) {
            Ok(Some(value)) => value,
            Ok(None) => {
                return Err(VersionError::Indeterminate {
                    message: "version query returned no rows".to_string(),
                });
            }
            Err(err) => {
                return Err(VersionError::Indeterminate {
                    message: err.to_string(),
                });
            }
        },
    };

    let token = numeric_token(&raw).ok_or_else(|| VersionError::Indeterminate {
        message: format!("no version number in `{raw}`"),
    })?;
    let tag = parse_tag(token).ok_or_else(|| VersionError::Indeterminate {
        message: format!("unparsable version number `{token}`"),
    })?;

    Ok(ServerVersion {
        description: format!("PostgreSQL {token}"),
        raw,
        tag,
    })
}

/// First whitespace-separated token that starts with a digit. Version
/// text is free-form ("PostgreSQL 13.2 on x86_64, ..."); only the
/// leading numeric token matters.
fn numeric_token(raw: &str) -> Option<&str> {
    raw.split_whitespace()
        .find(|token| token.starts_with(|ch: char| ch.is_ascii_digit()))
}

fn parse_tag(token: &str) -> Option<VersionTag> {
    let mut parts = token.split('.');
    let major = parse_component(parts.next()?)?;
    let minor = parts.next().and_then(parse_component).unwrap_or(0);
    if major >= 10 {
        Some(VersionTag::new(major, 0))
    } else {
        Some(VersionTag::new(major, minor))
    }
}

fn parse_component(raw: &str) -> Option<u16> {
    let digits: String = raw.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}
