use std::collections::BTreeMap;

/// Connection parameters handed to a backend. Field layout mirrors what
/// the common client libraries accept; `extra` carries backend-specific
/// keys without widening this struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: String,
    pub socket: Option<String>,
    pub extra: BTreeMap<String, String>,
}

impl ConnectConfig {
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            host: None,
            port: None,
            user: None,
            password: None,
            database: database.into(),
            socket: None,
            extra: BTreeMap::new(),
        }
    }
}
