//! SQLite-backed inventory source.
//!
//! The connection is opened read-only on the first query and reused for the
//! rest of the run. Text columns that are `NULL` are read as empty strings.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use super::{ChildEdge, ChildrenMode, DataSource, HostRow, SourceError};

/// Reference schema for an inventory database.
///
/// `children_all` is the transitive closure of `children`. `UNION` (rather than
/// `UNION ALL`) keeps the recursion finite when the edges contain a cycle.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS "group" (
    id        INTEGER PRIMARY KEY,
    name      TEXT NOT NULL UNIQUE,
    variables TEXT
);

CREATE TABLE IF NOT EXISTS inventory (
    id        INTEGER PRIMARY KEY,
    host      TEXT NOT NULL,
    hostname  TEXT,
    "group"   TEXT NOT NULL,
    host_vars TEXT
);

CREATE TABLE IF NOT EXISTS children (
    id     INTEGER PRIMARY KEY,
    parent TEXT NOT NULL,
    child  TEXT NOT NULL
);

CREATE VIEW IF NOT EXISTS children_all AS
WITH RECURSIVE closure(parent, child) AS (
    SELECT parent, child FROM children
    UNION
    SELECT closure.parent, children.child
    FROM closure JOIN children ON children.parent = closure.child
)
SELECT parent, child FROM closure;
"#;

const HOSTS_QUERY: &str = r#"SELECT host, hostname, "group", host_vars FROM inventory ORDER BY id"#;
const GROUP_QUERY: &str = r#"SELECT variables FROM "group" WHERE name = ?1"#;
const CHILDREN_QUERY: &str = "SELECT parent, child FROM children ORDER BY id";
const CHILDREN_ALL_QUERY: &str = "SELECT parent, child FROM children_all";

/// Inventory source reading from a SQLite database file.
pub struct SqliteSource {
    path: PathBuf,
    conn: Option<Connection>,
}

impl SqliteSource {
    /// Create a source for the database at `path`. Nothing is opened yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            conn: None,
        }
    }

    /// Path of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the connection has been opened.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Create the reference schema on an existing connection.
    pub fn create_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(SCHEMA)
    }

    fn connection(&mut self) -> Result<&Connection, SourceError> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => {
                log::debug!("Opening inventory database {}", self.path.display());
                Connection::open_with_flags(
                    &self.path,
                    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )
                .map_err(|source| SourceError::Open {
                    path: self.path.display().to_string(),
                    source,
                })?
            }
        };

        let conn: &Connection = self.conn.insert(conn);
        Ok(conn)
    }
}

fn query_err(query: &'static str) -> impl FnOnce(rusqlite::Error) -> SourceError {
    move |source| SourceError::Query { query, source }
}

impl DataSource for SqliteSource {
    fn host_rows(&mut self) -> Result<Vec<HostRow>, SourceError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(HOSTS_QUERY).map_err(query_err(HOSTS_QUERY))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(HostRow {
                    host: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    hostname: row.get(1)?,
                    group: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    host_vars: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                })
            })
            .map_err(query_err(HOSTS_QUERY))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(query_err(HOSTS_QUERY))?;

        log::debug!("Fetched {} host rows", rows.len());
        Ok(rows)
    }

    fn group_variables(&mut self, name: &str) -> Result<Option<String>, SourceError> {
        let conn = self.connection()?;
        let variables = conn
            .query_row(GROUP_QUERY, params![name], |row| {
                row.get::<_, Option<String>>(0)
            })
            .optional()
            .map_err(query_err(GROUP_QUERY))?;

        Ok(variables.map(Option::unwrap_or_default))
    }

    fn child_edges(&mut self, mode: ChildrenMode) -> Result<Vec<ChildEdge>, SourceError> {
        let query = match mode {
            ChildrenMode::Immediate => CHILDREN_QUERY,
            ChildrenMode::All => CHILDREN_ALL_QUERY,
        };

        let conn = self.connection()?;
        let mut stmt = conn.prepare(query).map_err(query_err(query))?;
        let edges = stmt
            .query_map([], |row| {
                Ok(ChildEdge {
                    parent: row.get(0)?,
                    child: row.get(1)?,
                })
            })
            .map_err(query_err(query))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(query_err(query))?;

        log::debug!("Fetched {} {} child edges", edges.len(), mode);
        Ok(edges)
    }
}
