use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{params, Connection, Transaction};
use tracing::{debug, warn};

use crate::extract::{FileBatch, StoreView};
use crate::hash;
use crate::types::{NodeKey, StoreError, StoreStats};

/// Version stamped into file metadata rows; bump when extraction output
/// changes shape so stale rows are re-analyzed.
pub const ANALYSIS_VERSION: u32 = 1;

struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: "
    -- Declarations
    CREATE TABLE ast_nodes (
        id INTEGER PRIMARY KEY,
        file_path TEXT NOT NULL,
        package_name TEXT NOT NULL DEFAULT '',
        type_name TEXT NOT NULL DEFAULT '',
        method_name TEXT NOT NULL DEFAULT '',
        field_name TEXT NOT NULL DEFAULT '',
        node_type TEXT NOT NULL CHECK (node_type IN ('package', 'type', 'method', 'field', 'variable')),
        start_line INTEGER NOT NULL,
        end_line INTEGER NOT NULL DEFAULT 0,
        line_count INTEGER NOT NULL DEFAULT 1,
        cyclomatic_complexity INTEGER NOT NULL DEFAULT 0,
        parameter_count INTEGER NOT NULL DEFAULT 0,
        return_count INTEGER NOT NULL DEFAULT 0,
        parameters_blob TEXT NOT NULL DEFAULT '[]',
        return_values_blob TEXT NOT NULL DEFAULT '[]',
        file_hash TEXT NOT NULL DEFAULT '',
        last_modified INTEGER NOT NULL DEFAULT 0,
        UNIQUE (file_path, package_name, type_name, method_name, field_name)
    );
    CREATE INDEX idx_ast_nodes_file ON ast_nodes(file_path);
    CREATE INDEX idx_ast_nodes_package ON ast_nodes(package_name);
    CREATE INDEX idx_ast_nodes_type ON ast_nodes(type_name);
    CREATE INDEX idx_ast_nodes_method ON ast_nodes(method_name);
    CREATE INDEX idx_ast_nodes_kind ON ast_nodes(node_type);
    CREATE INDEX idx_ast_nodes_complexity ON ast_nodes(cyclomatic_complexity);

    -- Edges between declarations; to_ast_id NULL = target outside the
    -- analyzed set
    CREATE TABLE ast_relationships (
        id INTEGER PRIMARY KEY,
        from_ast_id INTEGER NOT NULL REFERENCES ast_nodes(id) ON DELETE CASCADE,
        to_ast_id INTEGER REFERENCES ast_nodes(id) ON DELETE CASCADE,
        line_no INTEGER NOT NULL DEFAULT 0,
        relationship_type TEXT NOT NULL CHECK (relationship_type IN ('call', 'reference', 'inheritance', 'implements', 'import')),
        text TEXT NOT NULL DEFAULT ''
    );
    CREATE INDEX idx_ast_rel_from ON ast_relationships(from_ast_id);
    CREATE INDEX idx_ast_rel_to ON ast_relationships(to_ast_id);
    CREATE INDEX idx_ast_rel_kind ON ast_relationships(relationship_type);
    CREATE INDEX idx_ast_rel_line ON ast_relationships(line_no);

    -- Deduplicated catalog of external declarations
    CREATE TABLE library_nodes (
        id INTEGER PRIMARY KEY,
        package TEXT NOT NULL DEFAULT '',
        class TEXT NOT NULL DEFAULT '',
        method TEXT NOT NULL DEFAULT '',
        field TEXT NOT NULL DEFAULT '',
        node_type TEXT NOT NULL DEFAULT 'type',
        language TEXT NOT NULL DEFAULT '',
        framework TEXT NOT NULL DEFAULT '',
        UNIQUE (package, class, method, field)
    );

    CREATE TABLE library_relationships (
        id INTEGER PRIMARY KEY,
        ast_id INTEGER NOT NULL REFERENCES ast_nodes(id) ON DELETE CASCADE,
        library_id INTEGER NOT NULL REFERENCES library_nodes(id) ON DELETE CASCADE,
        line_no INTEGER NOT NULL DEFAULT 0,
        relationship_type TEXT NOT NULL DEFAULT 'call',
        text TEXT NOT NULL DEFAULT ''
    );
    CREATE INDEX idx_lib_rel_ast ON library_relationships(ast_id);
    CREATE INDEX idx_lib_rel_library ON library_relationships(library_id);

    -- Per-file cache validation
    CREATE TABLE file_metadata (
        id INTEGER PRIMARY KEY,
        file_path TEXT NOT NULL UNIQUE,
        file_hash TEXT NOT NULL,
        file_size INTEGER NOT NULL DEFAULT 0,
        last_modified INTEGER NOT NULL DEFAULT 0,
        last_analyzed INTEGER NOT NULL DEFAULT 0,
        analysis_version INTEGER NOT NULL DEFAULT 1
    );
    CREATE INDEX idx_file_metadata_hash ON file_metadata(file_hash);
    CREATE INDEX idx_file_metadata_mtime ON file_metadata(last_modified);
    ",
}];

/// SQLite-backed AST cache.
///
/// One handle per analysis root. The connection is guarded by a mutex:
/// writes are serialized, and no operation holds the lock for longer than a
/// single transaction. The handle is `Send + Sync`; clone an `Arc<AstStore>`
/// to share it across threads.
pub struct AstStore {
    conn: Mutex<Connection>,
}

impl AstStore {
    /// Open or create an AST cache at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                    path: parent.display().to_string(),
                    message: e.to_string(),
                })?;
            }
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Create an in-memory cache (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Open the cache for an analysis root at its default location under the
    /// OS user cache directory, one database file per root.
    pub fn open_default(root: &Path) -> Result<Self, StoreError> {
        Self::open(&Self::default_db_path(root))
    }

    /// Default database path for an analysis root.
    pub fn default_db_path(root: &Path) -> PathBuf {
        let cache = dirs::cache_dir().unwrap_or_else(std::env::temp_dir);
        let stem = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "root".to_string());
        let digest = hash::content_hash(root.to_string_lossy().as_bytes());
        cache
            .join("girder")
            .join(format!("{}-{}.db", stem, &digest[..12]))
    }

    fn from_connection(mut conn: Connection) -> Result<Self, StoreError> {
        // journal_mode is a query, not an update: a file-backed store
        // reports "wal", in-memory reports "memory".
        let _mode: String =
            conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        conn.busy_timeout(Duration::from_millis(5000))?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        apply_migrations(&mut conn)?;
        Ok(AstStore {
            conn: Mutex::new(conn),
        })
    }

    /// Highest applied schema migration version.
    pub fn schema_version(&self) -> Result<u32, StoreError> {
        let conn = self.conn.lock();
        let version: u32 = conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )?;
        Ok(version)
    }

    /// Whether `path` must be re-extracted: true when no metadata is stored,
    /// the file is gone, or its content hash changed since the last analysis.
    pub fn needs_reanalysis(&self, path: &Path) -> Result<bool, StoreError> {
        let key = path.to_string_lossy();
        let stored = match self.file_metadata(&key)? {
            Some(meta) => meta,
            None => return Ok(true),
        };
        if !path.exists() {
            return Ok(true);
        }
        let current = hash::file_hash(path).map_err(|e| StoreError::Io {
            path: key.into_owned(),
            message: e.to_string(),
        })?;
        Ok(current != stored.file_hash)
    }

    /// Atomically replace all stored data for `path` with the batch.
    ///
    /// Nodes whose identity tuple already exists keep their persistent id;
    /// removed nodes are deleted (cascading their relationships); advisory
    /// relationship ids are rewritten to persistent ids. On any failure the
    /// transaction rolls back and the store is unchanged.
    pub fn replace_file(&self, path: &str, batch: &FileBatch) -> Result<(), StoreError> {
        for node in &batch.nodes {
            node.validate()?;
            if node.file_path != path {
                return Err(StoreError::InvalidBatch(format!(
                    "node {} belongs to {}, not {}",
                    node.qualified_name(),
                    node.file_path,
                    path
                )));
            }
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let remap = upsert_nodes(&tx, path, batch)?;
        replace_relationships(&tx, path, batch, &remap)?;
        replace_library_uses(&tx, path, batch, &remap)?;
        upsert_metadata(&tx, path, batch)?;
        tx.commit()?;

        debug!(
            file = path,
            nodes = batch.nodes.len(),
            relationships = batch.relationships.len(),
            library_uses = batch.library_uses.len(),
            "replaced file"
        );
        Ok(())
    }

    /// Remove all data for `path`, cascading relationships. Unknown paths
    /// are a no-op success.
    pub fn delete_file(&self, path: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let nodes = tx.execute("DELETE FROM ast_nodes WHERE file_path = ?1", params![path])?;
        tx.execute(
            "DELETE FROM file_metadata WHERE file_path = ?1",
            params![path],
        )?;
        tx.commit()?;
        debug!(file = path, nodes, "deleted file");
        Ok(())
    }

    /// Stored metadata for a file, if any.
    pub fn file_metadata(
        &self,
        path: &str,
    ) -> Result<Option<crate::types::FileMetadata>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, file_path, file_hash, file_size, last_modified, last_analyzed, analysis_version
             FROM file_metadata WHERE file_path = ?1",
        )?;
        let mut rows = stmt.query_map(params![path], |row| {
            Ok(crate::types::FileMetadata {
                id: row.get(0)?,
                file_path: row.get(1)?,
                file_hash: row.get(2)?,
                file_size: row.get(3)?,
                last_modified: row.get(4)?,
                last_analyzed: row.get(5)?,
                analysis_version: row.get(6)?,
            })
        })?;
        match rows.next() {
            Some(meta) => Ok(Some(meta?)),
            None => Ok(None),
        }
    }

    /// Aggregate row counts across all tables.
    pub fn stats(&self) -> Result<StoreStats, StoreError> {
        let conn = self.conn.lock();
        let count = |table: &str| -> Result<u64, StoreError> {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?)
        };
        Ok(StoreStats {
            files: count("file_metadata")?,
            nodes: count("ast_nodes")?,
            relationships: count("ast_relationships")?,
            library_nodes: count("library_nodes")?,
            library_relationships: count("library_relationships")?,
        })
    }

    pub(crate) fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let conn = self.conn.lock();
        f(&conn)
    }
}

impl StoreView for AstStore {
    fn lookup_id(&self, key: &NodeKey) -> Result<Option<i64>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id FROM ast_nodes
                 WHERE file_path = ?1 AND package_name = ?2 AND type_name = ?3
                   AND method_name = ?4 AND field_name = ?5",
            )?;
            let mut rows = stmt.query_map(
                params![key.file_path, key.package, key.type_name, key.method, key.field],
                |row| row.get::<_, i64>(0),
            )?;
            match rows.next() {
                Some(id) => Ok(Some(id?)),
                None => Ok(None),
            }
        })
    }

    fn nodes_of_file(&self, path: &str) -> Result<Vec<crate::types::AstNode>, StoreError> {
        crate::store::AstSource::nodes_of_file(self, path)
    }
}

fn apply_migrations(conn: &mut Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;
    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)
            .map_err(|e| StoreError::Migration {
                version: migration.version,
                message: e.to_string(),
            })?;
        tx.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            params![migration.version],
        )?;
        tx.commit()?;
        debug!(version = migration.version, "applied schema migration");
    }
    Ok(())
}

/// Step 2–4 of the replace: load the existing identity map, upsert incoming
/// nodes preserving ids, delete orphans. Returns advisory-id → persistent-id.
fn upsert_nodes(
    tx: &Transaction,
    path: &str,
    batch: &FileBatch,
) -> Result<HashMap<i64, i64>, StoreError> {
    let mut existing: HashMap<NodeKey, i64> = HashMap::new();
    {
        let mut stmt = tx.prepare(
            "SELECT id, package_name, type_name, method_name, field_name
             FROM ast_nodes WHERE file_path = ?1",
        )?;
        let rows = stmt.query_map(params![path], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                NodeKey {
                    file_path: path.to_string(),
                    package: row.get(1)?,
                    type_name: row.get(2)?,
                    method: row.get(3)?,
                    field: row.get(4)?,
                },
            ))
        })?;
        for row in rows {
            let (id, key) = row?;
            existing.insert(key, id);
        }
    }

    let mut remap: HashMap<i64, i64> = HashMap::with_capacity(batch.nodes.len());
    let mut kept: HashSet<i64> = HashSet::with_capacity(batch.nodes.len());
    for node in &batch.nodes {
        // line_count is derived; extractor-provided values are ignored.
        let line_count = node.effective_end_line() - node.start_line + 1;
        let parameters = serde_json::to_string(&node.parameters).unwrap_or_else(|_| "[]".into());
        let return_values =
            serde_json::to_string(&node.return_values).unwrap_or_else(|_| "[]".into());

        let persistent = match existing.get(&node.key()) {
            Some(&id) => {
                tx.execute(
                    "UPDATE ast_nodes SET node_type = ?1, start_line = ?2, end_line = ?3,
                        line_count = ?4, cyclomatic_complexity = ?5, parameter_count = ?6,
                        return_count = ?7, parameters_blob = ?8, return_values_blob = ?9,
                        file_hash = ?10, last_modified = ?11
                     WHERE id = ?12",
                    params![
                        node.kind.as_str(),
                        node.start_line,
                        node.end_line,
                        line_count,
                        node.cyclomatic_complexity,
                        node.parameter_count,
                        node.return_count,
                        parameters,
                        return_values,
                        node.file_hash,
                        node.last_modified,
                        id,
                    ],
                )?;
                id
            }
            None => {
                tx.execute(
                    "INSERT INTO ast_nodes (file_path, package_name, type_name, method_name,
                        field_name, node_type, start_line, end_line, line_count,
                        cyclomatic_complexity, parameter_count, return_count, parameters_blob,
                        return_values_blob, file_hash, last_modified)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                    params![
                        node.file_path,
                        node.package_name,
                        node.type_name,
                        node.method_name,
                        node.field_name,
                        node.kind.as_str(),
                        node.start_line,
                        node.end_line,
                        line_count,
                        node.cyclomatic_complexity,
                        node.parameter_count,
                        node.return_count,
                        parameters,
                        return_values,
                        node.file_hash,
                        node.last_modified,
                    ],
                )?;
                tx.last_insert_rowid()
            }
        };
        if remap.insert(node.id, persistent).is_some() {
            return Err(StoreError::InvalidBatch(format!(
                "duplicate advisory id {} in batch for {}",
                node.id, path
            )));
        }
        kept.insert(persistent);
    }

    // Nodes present before but absent from the batch are retired; their
    // relationships go with them via cascade.
    for id in existing.values().filter(|id| !kept.contains(*id)) {
        tx.execute("DELETE FROM ast_nodes WHERE id = ?1", params![id])?;
    }

    Ok(remap)
}

/// Step 5: drop the file's outgoing relationships and re-insert the batch's,
/// rewriting advisory ids through the remap.
fn replace_relationships(
    tx: &Transaction,
    path: &str,
    batch: &FileBatch,
    remap: &HashMap<i64, i64>,
) -> Result<(), StoreError> {
    tx.execute(
        "DELETE FROM ast_relationships
         WHERE from_ast_id IN (SELECT id FROM ast_nodes WHERE file_path = ?1)",
        params![path],
    )?;

    for rel in &batch.relationships {
        let from = *remap.get(&rel.from_id).ok_or_else(|| {
            StoreError::InvalidBatch(format!(
                "relationship at line {} references unknown advisory id {}",
                rel.line_no, rel.from_id
            ))
        })?;
        let to = match rel.to_id {
            None => None,
            Some(advisory) => match remap.get(&advisory) {
                Some(&persistent) => Some(persistent),
                // Not in the batch: the extractor resolved a persistent id
                // through the read view. Verify it still exists; if the
                // target raced with a deletion, degrade to an external call.
                None => {
                    let found: Option<i64> = tx
                        .query_row(
                            "SELECT id FROM ast_nodes WHERE id = ?1",
                            params![advisory],
                            |row| row.get(0),
                        )
                        .map(Some)
                        .or_else(|e| match e {
                            rusqlite::Error::QueryReturnedNoRows => Ok(None),
                            other => Err(other),
                        })?;
                    if found.is_none() {
                        warn!(
                            file = path,
                            target = advisory,
                            line = rel.line_no,
                            "relationship target no longer exists; storing as external"
                        );
                    }
                    found
                }
            },
        };
        tx.execute(
            "INSERT INTO ast_relationships (from_ast_id, to_ast_id, line_no, relationship_type, text)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![from, to, rel.line_no, rel.kind.as_str(), rel.text],
        )?;
    }
    Ok(())
}

/// Step 6: upsert library nodes (dedup on identity) and re-insert the file's
/// library relationships.
fn replace_library_uses(
    tx: &Transaction,
    path: &str,
    batch: &FileBatch,
    remap: &HashMap<i64, i64>,
) -> Result<(), StoreError> {
    tx.execute(
        "DELETE FROM library_relationships
         WHERE ast_id IN (SELECT id FROM ast_nodes WHERE file_path = ?1)",
        params![path],
    )?;

    for use_ in &batch.library_uses {
        let from = *remap.get(&use_.from_id).ok_or_else(|| {
            StoreError::InvalidBatch(format!(
                "library use at line {} references unknown advisory id {}",
                use_.line_no, use_.from_id
            ))
        })?;
        let lib = &use_.library;
        tx.execute(
            "INSERT INTO library_nodes (package, class, method, field, node_type, language, framework)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (package, class, method, field) DO NOTHING",
            params![
                lib.package,
                lib.class_name,
                lib.method_name,
                lib.field_name,
                lib.kind.as_str(),
                lib.language,
                lib.framework,
            ],
        )?;
        let library_id: i64 = tx.query_row(
            "SELECT id FROM library_nodes
             WHERE package = ?1 AND class = ?2 AND method = ?3 AND field = ?4",
            params![lib.package, lib.class_name, lib.method_name, lib.field_name],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO library_relationships (ast_id, library_id, line_no, relationship_type, text)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![from, library_id, use_.line_no, use_.kind.as_str(), use_.text],
        )?;
    }
    Ok(())
}

/// Step 7: record the file's fingerprint and analysis timestamp.
fn upsert_metadata(tx: &Transaction, path: &str, batch: &FileBatch) -> Result<(), StoreError> {
    tx.execute(
        "INSERT INTO file_metadata (file_path, file_hash, file_size, last_modified,
            last_analyzed, analysis_version)
         VALUES (?1, ?2, ?3, ?4, CAST(strftime('%s', 'now') AS INTEGER), ?5)
         ON CONFLICT (file_path) DO UPDATE SET
            file_hash = excluded.file_hash,
            file_size = excluded.file_size,
            last_modified = excluded.last_modified,
            last_analyzed = excluded.last_analyzed,
            analysis_version = excluded.analysis_version",
        params![
            path,
            batch.fingerprint.hash,
            batch.fingerprint.size,
            batch.fingerprint.modified,
            ANALYSIS_VERSION,
        ],
    )?;
    Ok(())
}
