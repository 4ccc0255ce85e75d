//! The dialect chain: one level per supported server-revision family,
//! ordered oldest to newest. Each level records only what changed
//! relative to the next-older level; the oldest level (7.4) is total
//! over every capability and template by construction, so a lookup can
//! never fall through undefined.

use std::fmt;

use crate::error::VersionError;

/// A server-revision family tag. From version 10 on the server dropped
/// minor numbers from the family name, so those tags carry minor 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionTag {
    pub major: u16,
    pub minor: u16,
}

impl VersionTag {
    #[must_use]
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.major >= 10 {
            write!(f, "{}", self.major)
        } else {
            write!(f, "{}.{}", self.major, self.minor)
        }
    }
}

/// Optional server features, one strictly-boolean flag per feature.
///
/// `ALL` exists so tests can sweep the whole matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    AlterColumnType,
    AlterDatabaseOwner,
    AlterDatabaseRename,
    AlterSchemaOwner,
    AlterSequenceSchema,
    AlterSequenceStart,
    AlterTableSchema,
    Autovacuum,
    ByteaHexDefault,
    ConcurrentIndexBuild,
    CreateTableLike,
    DatabaseCollation,
    DisableTriggers,
    DomainConstraints,
    EnumTypes,
    EventTriggers,
    Extensions,
    FullTextSearch,
    FunctionAlterOwner,
    FunctionAlterSchema,
    FunctionCosting,
    GeneratedColumns,
    GrantOption,
    IdentityColumns,
    LogicalReplication,
    MaterializedViews,
    NamedParameters,
    PreparedTransactions,
    Procedures,
    QueryCancel,
    QueryKill,
    ReadOnlyQueries,
    Roles,
    RowSecurity,
    ServerAdminFunctions,
    SharedComments,
    Tablespaces,
    UserRename,
    VirtualTransactionId,
    WindowFunctions,
}

impl Capability {
    pub const ALL: [Capability; 40] = [
        Capability::AlterColumnType,
        Capability::AlterDatabaseOwner,
        Capability::AlterDatabaseRename,
        Capability::AlterSchemaOwner,
        Capability::AlterSequenceSchema,
        Capability::AlterSequenceStart,
        Capability::AlterTableSchema,
        Capability::Autovacuum,
        Capability::ByteaHexDefault,
        Capability::ConcurrentIndexBuild,
        Capability::CreateTableLike,
        Capability::DatabaseCollation,
        Capability::DisableTriggers,
        Capability::DomainConstraints,
        Capability::EnumTypes,
        Capability::EventTriggers,
        Capability::Extensions,
        Capability::FullTextSearch,
        Capability::FunctionAlterOwner,
        Capability::FunctionAlterSchema,
        Capability::FunctionCosting,
        Capability::GeneratedColumns,
        Capability::GrantOption,
        Capability::IdentityColumns,
        Capability::LogicalReplication,
        Capability::MaterializedViews,
        Capability::NamedParameters,
        Capability::PreparedTransactions,
        Capability::Procedures,
        Capability::QueryCancel,
        Capability::QueryKill,
        Capability::ReadOnlyQueries,
        Capability::Roles,
        Capability::RowSecurity,
        Capability::ServerAdminFunctions,
        Capability::SharedComments,
        Capability::Tablespaces,
        Capability::UserRename,
        Capability::VirtualTransactionId,
        Capability::WindowFunctions,
    ];
}

/// Introspection queries whose text differs across server revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    BackendsQuery,
    LocksQuery,
    TablespacesQuery,
}

impl Template {
    pub const ALL: [Template; 3] = [
        Template::BackendsQuery,
        Template::LocksQuery,
        Template::TablespacesQuery,
    ];
}

struct Level {
    version: VersionTag,
    capabilities: &'static [(Capability, bool)],
    templates: &'static [(Template, &'static str)],
}

/// Every capability at the oldest chain level. Exhaustive by match, so
/// adding a flag without a 7.4 value is a compile error, not a silent
/// fall-through.
const fn oldest_capability(capability: Capability) -> bool {
    match capability {
        Capability::AlterDatabaseRename
        | Capability::DomainConstraints
        | Capability::GrantOption
        | Capability::QueryCancel
        | Capability::ReadOnlyQueries
        | Capability::UserRename => true,
        Capability::AlterColumnType
        | Capability::AlterDatabaseOwner
        | Capability::AlterSchemaOwner
        | Capability::AlterSequenceSchema
        | Capability::AlterSequenceStart
        | Capability::AlterTableSchema
        | Capability::Autovacuum
        | Capability::ByteaHexDefault
        | Capability::ConcurrentIndexBuild
        | Capability::CreateTableLike
        | Capability::DatabaseCollation
        | Capability::DisableTriggers
        | Capability::EnumTypes
        | Capability::EventTriggers
        | Capability::Extensions
        | Capability::FullTextSearch
        | Capability::FunctionAlterOwner
        | Capability::FunctionAlterSchema
        | Capability::FunctionCosting
        | Capability::GeneratedColumns
        | Capability::IdentityColumns
        | Capability::LogicalReplication
        | Capability::MaterializedViews
        | Capability::NamedParameters
        | Capability::PreparedTransactions
        | Capability::Procedures
        | Capability::QueryKill
        | Capability::Roles
        | Capability::RowSecurity
        | Capability::ServerAdminFunctions
        | Capability::SharedComments
        | Capability::Tablespaces
        | Capability::VirtualTransactionId
        | Capability::WindowFunctions => false,
    }
}

const BACKENDS_QUERY_74: &str = "SELECT procpid AS pid, usename, current_query AS query, query_start \
     FROM pg_catalog.pg_stat_activity ORDER BY procpid";
const BACKENDS_QUERY_92: &str = "SELECT pid, usename, state, query, query_start \
     FROM pg_catalog.pg_stat_activity ORDER BY pid";

const LOCKS_QUERY_74: &str = "SELECT l.relation::regclass AS relname, l.transaction, l.pid, l.mode, l.granted \
     FROM pg_catalog.pg_locks l ORDER BY l.pid";
const LOCKS_QUERY_83: &str = "SELECT l.relation::regclass AS relname, l.virtualtransaction, l.pid, l.mode, l.granted \
     FROM pg_catalog.pg_locks l ORDER BY l.pid";

const TABLESPACES_QUERY_80: &str = "SELECT spcname, pg_catalog.pg_get_userbyid(spcowner) AS spcowner, spclocation \
     FROM pg_catalog.pg_tablespace ORDER BY spcname";
const TABLESPACES_QUERY_92: &str = "SELECT spcname, pg_catalog.pg_get_userbyid(spcowner) AS spcowner, \
     pg_catalog.pg_tablespace_location(oid) AS spclocation \
     FROM pg_catalog.pg_tablespace ORDER BY spcname";

/// Every template at the oldest chain level, exhaustive like
/// [`oldest_capability`]. Templates for features the oldest dialect
/// lacks carry the text of the revision that introduced them; the
/// matching capability flag gates whether they are ever issued.
const fn oldest_template(template: Template) -> &'static str {
    match template {
        Template::BackendsQuery => BACKENDS_QUERY_74,
        Template::LocksQuery => LOCKS_QUERY_74,
        Template::TablespacesQuery => TABLESPACES_QUERY_80,
    }
}

static CHAIN: [Level; 18] = [
    Level {
        version: VersionTag::new(7, 4),
        capabilities: &[],
        templates: &[],
    },
    Level {
        version: VersionTag::new(8, 0),
        capabilities: &[
            (Capability::AlterColumnType, true),
            (Capability::AlterDatabaseOwner, true),
            (Capability::AlterSchemaOwner, true),
            (Capability::CreateTableLike, true),
            (Capability::FunctionAlterOwner, true),
            (Capability::NamedParameters, true),
            (Capability::Tablespaces, true),
        ],
        templates: &[],
    },
    Level {
        version: VersionTag::new(8, 1),
        capabilities: &[
            (Capability::AlterSequenceSchema, true),
            (Capability::AlterTableSchema, true),
            (Capability::Autovacuum, true),
            (Capability::DisableTriggers, true),
            (Capability::FunctionAlterSchema, true),
            (Capability::PreparedTransactions, true),
            (Capability::Roles, true),
            (Capability::ServerAdminFunctions, true),
        ],
        templates: &[],
    },
    Level {
        version: VersionTag::new(8, 2),
        capabilities: &[
            (Capability::ConcurrentIndexBuild, true),
            (Capability::SharedComments, true),
        ],
        templates: &[],
    },
    Level {
        version: VersionTag::new(8, 3),
        capabilities: &[
            (Capability::EnumTypes, true),
            (Capability::FullTextSearch, true),
            (Capability::FunctionCosting, true),
            (Capability::VirtualTransactionId, true),
        ],
        templates: &[(Template::LocksQuery, LOCKS_QUERY_83)],
    },
    Level {
        version: VersionTag::new(8, 4),
        capabilities: &[
            (Capability::AlterSequenceStart, true),
            (Capability::DatabaseCollation, true),
            (Capability::QueryKill, true),
            (Capability::WindowFunctions, true),
        ],
        templates: &[],
    },
    Level {
        version: VersionTag::new(9, 0),
        capabilities: &[(Capability::ByteaHexDefault, true)],
        templates: &[],
    },
    Level {
        version: VersionTag::new(9, 1),
        capabilities: &[(Capability::Extensions, true)],
        templates: &[],
    },
    Level {
        version: VersionTag::new(9, 2),
        capabilities: &[],
        templates: &[
            (Template::BackendsQuery, BACKENDS_QUERY_92),
            (Template::TablespacesQuery, TABLESPACES_QUERY_92),
        ],
    },
    Level {
        version: VersionTag::new(9, 3),
        capabilities: &[
            (Capability::EventTriggers, true),
            (Capability::MaterializedViews, true),
        ],
        templates: &[],
    },
    Level {
        version: VersionTag::new(9, 4),
        capabilities: &[],
        templates: &[],
    },
    Level {
        version: VersionTag::new(9, 5),
        capabilities: &[(Capability::RowSecurity, true)],
        templates: &[],
    },
    Level {
        version: VersionTag::new(9, 6),
        capabilities: &[],
        templates: &[],
    },
    Level {
        version: VersionTag::new(10, 0),
        capabilities: &[
            (Capability::IdentityColumns, true),
            (Capability::LogicalReplication, true),
        ],
        templates: &[],
    },
    Level {
        version: VersionTag::new(11, 0),
        capabilities: &[(Capability::Procedures, true)],
        templates: &[],
    },
    Level {
        version: VersionTag::new(12, 0),
        capabilities: &[(Capability::GeneratedColumns, true)],
        templates: &[],
    },
    Level {
        version: VersionTag::new(13, 0),
        capabilities: &[],
        templates: &[],
    },
    Level {
        version: VersionTag::new(14, 0),
        capabilities: &[],
        templates: &[],
    },
];

/// One selected server-revision family. Cheap to copy; resolved against
/// the static chain on every lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectConfig {
    level: usize,
}

impl DialectConfig {
    /// Select the dialect for a detected server version: exact family
    /// match first, otherwise the newest family not newer than the
    /// server, otherwise the server predates the chain entirely.
    pub fn select(tag: VersionTag) -> Result<Self, VersionError> {
        let mut best: Option<usize> = None;
        for (index, level) in CHAIN.iter().enumerate() {
            if level.version == tag {
                return Ok(Self { level: index });
            }
            if level.version < tag {
                best = Some(index);
            }
        }
        best.map(|level| Self { level }).ok_or_else(|| {
            VersionError::Unsupported {
                version: tag.to_string(),
            }
        })
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (0..CHAIN.len()).map(|level| Self { level })
    }

    #[must_use]
    pub fn version(&self) -> VersionTag {
        CHAIN[self.level].version
    }

    /// Resolve a capability flag by walking from this level toward the
    /// oldest ancestor; the first explicit override wins and the oldest
    /// level is total.
    #[must_use]
    pub fn has(&self, capability: Capability) -> bool {
        for level in CHAIN[..=self.level].iter().rev() {
            for (candidate, value) in level.capabilities {
                if *candidate == capability {
                    return *value;
                }
            }
        }
        oldest_capability(capability)
    }

    /// Resolve a SQL-template override the same way as [`Self::has`].
    #[must_use]
    pub fn template(&self, template: Template) -> &'static str {
        for level in CHAIN[..=self.level].iter().rev() {
            for (candidate, text) in level.templates {
                if *candidate == template {
                    return text;
                }
            }
        }
        oldest_template(template)
    }
}
