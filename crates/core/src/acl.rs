//! Decoder for the server's permission-list text format:
//! `{[grantee]=privchars[/grantor],...}`. Grantee and grantor may be
//! double-quoted with `""` as an escaped literal quote; a `*` after a
//! privilege character marks grant option on that privilege.

use std::collections::BTreeSet;

use crate::error::TextParseError;
use crate::escape::quote_identifier;

/// One privilege name, ordered the way GRANT statements list them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Privilege {
    Select,
    Insert,
    Update,
    Delete,
    Truncate,
    References,
    Trigger,
    Rule,
    Execute,
    Usage,
    Create,
    Temporary,
    Connect,
}

impl Privilege {
    /// The single-character code the server uses in ACL text.
    #[must_use]
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'r' => Some(Self::Select),
            'a' => Some(Self::Insert),
            'w' => Some(Self::Update),
            'd' => Some(Self::Delete),
            'D' => Some(Self::Truncate),
            'x' => Some(Self::References),
            't' => Some(Self::Trigger),
            'R' => Some(Self::Rule),
            'X' => Some(Self::Execute),
            'U' => Some(Self::Usage),
            'C' => Some(Self::Create),
            'T' => Some(Self::Temporary),
            'c' => Some(Self::Connect),
            _ => None,
        }
    }

    #[must_use]
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Truncate => "TRUNCATE",
            Self::References => "REFERENCES",
            Self::Trigger => "TRIGGER",
            Self::Rule => "RULE",
            Self::Execute => "EXECUTE",
            Self::Usage => "USAGE",
            Self::Create => "CREATE",
            Self::Temporary => "TEMPORARY",
            Self::Connect => "CONNECT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GranteeKind {
    Public,
    User,
    Group,
    Role,
}

/// One decoded grant record. `with_grant_option` is a subset of
/// `granted` by construction; `grantor` of `None` means the object
/// owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantEntry {
    pub kind: GranteeKind,
    pub name: Option<String>,
    pub granted: BTreeSet<Privilege>,
    pub with_grant_option: BTreeSet<Privilege>,
    pub grantor: Option<String>,
}

impl GrantEntry {
    /// Re-synthesize GRANT statements for schema export. Privileges held
    /// with grant option go out as a second statement so the option bit
    /// is not widened to the rest.
    #[must_use]
    pub fn grant_statements(&self, object_sql: &str) -> Vec<String> {
        let grantee = match (&self.kind, &self.name) {
            (GranteeKind::Public, _) => "PUBLIC".to_string(),
            (GranteeKind::Group, Some(name)) => format!("GROUP {}", quote_identifier(name)),
            (_, Some(name)) => quote_identifier(name),
            // A named kind without a name never comes out of the parser.
            (_, None) => "PUBLIC".to_string(),
        };

        let plain: Vec<&str> = self
            .granted
            .iter()
            .filter(|privilege| !self.with_grant_option.contains(privilege))
            .map(Privilege::keyword)
            .collect();
        let optioned: Vec<&str> = self
            .with_grant_option
            .iter()
            .map(Privilege::keyword)
            .collect();

        let mut statements = Vec::new();
        if !plain.is_empty() {
            statements.push(format!(
                "GRANT {} ON {object_sql} TO {grantee}",
                plain.join(", ")
            ));
        }
        if !optioned.is_empty() {
            statements.push(format!(
                "GRANT {} ON {object_sql} TO {grantee} WITH GRANT OPTION",
                optioned.join(", ")
            ));
        }
        statements
    }
}

/// Decoded ACL in the order the server emitted it. Order carries no
/// semantic weight but is preserved for reproducible dumps.
pub type GrantList = Vec<GrantEntry>;

const GROUP_PREFIX: &str = "group ";

/// Parse raw ACL text. An empty ACL (`{}` or blank) means the object
/// runs on all-default privileges and decodes to an explicitly-empty
/// list, not an error. `has_roles` selects whether named grantees are
/// roles or users/groups (`group ` prefix is only a marker in the
/// latter dialects).
pub fn parse_acl(text: &str, has_roles: bool) -> Result<GrantList, TextParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let inner = trimmed
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .ok_or(TextParseError::MalformedAcl {
            text: text.to_string(),
            reason: "missing outer braces",
        })?;
    if inner.is_empty() {
        return Ok(Vec::new());
    }

    split_items(inner, text)?
        .into_iter()
        .map(|item| parse_item(&item, has_roles))
        .collect()
}

/// Split on top-level commas only. A quote immediately followed by
/// another quote is an escaped literal quote, not a toggle.
fn split_items(inner: &str, original: &str) -> Result<Vec<String>, TextParseError> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars().peekable();
    let mut in_quotes = false;

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                current.push(ch);
                if in_quotes && chars.peek() == Some(&'"') {
                    current.push('"');
                    let _ = chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                items.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    if in_quotes {
        return Err(TextParseError::MalformedAcl {
            text: original.to_string(),
            reason: "unterminated quote",
        });
    }
    items.push(current);
    Ok(items)
}

fn parse_item(item: &str, has_roles: bool) -> Result<GrantEntry, TextParseError> {
    let (grantee_raw, rights) =
        split_first_unquoted(item, '=').ok_or(TextParseError::MalformedAcl {
            text: item.to_string(),
            reason: "missing `=` separator",
        })?;

    let (kind, name) = parse_grantee(grantee_raw, has_roles);

    let (privchars, grantor_raw) = match split_first_unquoted(rights, '/') {
        Some((privchars, grantor)) => (privchars, Some(grantor)),
        None => (rights, None),
    };

    let mut granted = BTreeSet::new();
    let mut with_grant_option = BTreeSet::new();
    let mut previous: Option<Privilege> = None;
    for code in privchars.chars() {
        if code == '*' {
            let privilege = previous.ok_or(TextParseError::MalformedAcl {
                text: item.to_string(),
                reason: "grant-option marker without a preceding privilege",
            })?;
            with_grant_option.insert(privilege);
            continue;
        }
        let privilege = Privilege::from_code(code).ok_or(TextParseError::UnknownPrivilege {
            code,
            entry: item.to_string(),
        })?;
        granted.insert(privilege);
        previous = Some(privilege);
    }

    let grantor = grantor_raw
        .map(unquote)
        .filter(|grantor| !grantor.is_empty());

    Ok(GrantEntry {
        kind,
        name,
        granted,
        with_grant_option,
        grantor,
    })
}

fn parse_grantee(raw: &str, has_roles: bool) -> (GranteeKind, Option<String>) {
    if raw.is_empty() {
        return (GranteeKind::Public, None);
    }
    if !has_roles && let Some(group_name) = raw.strip_prefix(GROUP_PREFIX) {
        return (GranteeKind::Group, Some(unquote(group_name)));
    }
    let kind = if has_roles {
        GranteeKind::Role
    } else {
        GranteeKind::User
    };
    (kind, Some(unquote(raw)))
}

/// Split at the first occurrence of `separator` outside double quotes.
/// Doubled quotes inside a quoted span are escaped literal quotes.
fn split_first_unquoted(text: &str, separator: char) -> Option<(&str, &str)> {
    let mut in_quotes = false;
    let mut iter = text.char_indices().peekable();
    while let Some((index, ch)) = iter.next() {
        if ch == '"' {
            if in_quotes && iter.peek().is_some_and(|(_, next)| *next == '"') {
                let _ = iter.next();
            } else {
                in_quotes = !in_quotes;
            }
        } else if ch == separator && !in_quotes {
            return Some((&text[..index], &text[index + separator.len_utf8()..]));
        }
    }
    None
}

fn unquote(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].replace("\"\"", "\"")
    } else {
        trimmed.to_string()
    }
}
