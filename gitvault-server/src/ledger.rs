use chrono::{DateTime, Utc};
use gitvault_core::{EntityId, EntityKind};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

const SCHEMA_VERSION: i32 = 1;

/// One saved version of a path, as the service numbers them.
///
/// `content_hash` is `None` for deletions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub kind: EntityKind,
    pub entity: String,
    pub path: String,
    pub version: i64,
    pub commit_hash: String,
    pub content_hash: Option<String>,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl VersionRecord {
    pub fn new(entity: &EntityId, path: &str, version: i64, commit_hash: &str) -> Self {
        Self {
            kind: entity.kind,
            entity: entity.id.clone(),
            path: path.to_string(),
            version,
            commit_hash: commit_hash.to_string(),
            content_hash: None,
            title: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_content_hash(mut self, hash: String) -> Self {
        self.content_hash = Some(hash);
        self
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }
}

pub fn hash_content(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// SQLite-backed version numbering and content dedup for the service.
pub struct Ledger {
    conn: Connection,
}

impl Ledger {
    pub fn new<P: AsRef<Path>>(db_path: P) -> rusqlite::Result<Self> {
        let conn = Connection::open(db_path)?;
        let mut ledger = Self { conn };
        ledger.initialize()?;
        Ok(ledger)
    }

    pub fn in_memory() -> rusqlite::Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut ledger = Self { conn };
        ledger.initialize()?;
        Ok(ledger)
    }

    fn initialize(&mut self) -> rusqlite::Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS versions (
                kind TEXT NOT NULL,
                entity TEXT NOT NULL,
                path TEXT NOT NULL,
                version INTEGER NOT NULL,
                commit_hash TEXT NOT NULL,
                content_hash TEXT,
                title TEXT,
                created_at TEXT NOT NULL,
                PRIMARY KEY (kind, entity, path, version)
            );

            CREATE INDEX IF NOT EXISTS idx_versions_content
                ON versions(kind, entity, content_hash);
            "#,
        )?;

        let version: Option<i32> = self
            .conn
            .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
            .optional()?;

        if version.is_none() {
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )?;
        }

        Ok(())
    }

    pub fn record(&self, record: &VersionRecord) -> rusqlite::Result<()> {
        self.conn.execute(
            "INSERT INTO versions
                 (kind, entity, path, version, commit_hash, content_hash, title, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.kind.as_str(),
                record.entity,
                record.path,
                record.version,
                record.commit_hash,
                record.content_hash,
                record.title,
                record.created_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    pub fn next_version(&self, entity: &EntityId, path: &str) -> rusqlite::Result<i64> {
        let current: Option<i64> = self.conn.query_row(
            "SELECT MAX(version) FROM versions WHERE kind = ?1 AND entity = ?2 AND path = ?3",
            params![entity.kind.as_str(), entity.id, path],
            |row| row.get(0),
        )?;
        Ok(current.unwrap_or(0) + 1)
    }

    pub fn latest(&self, entity: &EntityId, path: &str) -> rusqlite::Result<Option<VersionRecord>> {
        self.conn
            .query_row(
                "SELECT kind, entity, path, version, commit_hash, content_hash, title, created_at
                 FROM versions WHERE kind = ?1 AND entity = ?2 AND path = ?3
                 ORDER BY version DESC LIMIT 1",
                params![entity.kind.as_str(), entity.id, path],
                record_from_row,
            )
            .optional()
    }

    /// Versions of `path`, newest first.
    pub fn versions(&self, entity: &EntityId, path: &str) -> rusqlite::Result<Vec<VersionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT kind, entity, path, version, commit_hash, content_hash, title, created_at
             FROM versions WHERE kind = ?1 AND entity = ?2 AND path = ?3
             ORDER BY version DESC",
        )?;

        let records = stmt
            .query_map(params![entity.kind.as_str(), entity.id, path], record_from_row)?
            .collect::<rusqlite::Result<Vec<VersionRecord>>>()?;

        Ok(records)
    }

    /// Another path of the same entity whose current content hashes to `content_hash`.
    pub fn find_duplicate(
        &self,
        entity: &EntityId,
        path: &str,
        content_hash: &str,
    ) -> rusqlite::Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT v.path FROM versions v
                 WHERE v.kind = ?1 AND v.entity = ?2 AND v.content_hash = ?3 AND v.path <> ?4
                   AND v.version = (
                       SELECT MAX(version) FROM versions
                       WHERE kind = v.kind AND entity = v.entity AND path = v.path
                   )
                 LIMIT 1",
                params![entity.kind.as_str(), entity.id, content_hash, path],
                |row| row.get(0),
            )
            .optional()
    }
}

fn record_from_row(row: &Row) -> rusqlite::Result<VersionRecord> {
    let kind: String = row.get(0)?;
    let created_at: String = row.get(7)?;

    Ok(VersionRecord {
        kind: EntityKind::parse(&kind).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("unknown entity kind {}", kind).into(),
            )
        })?,
        entity: row.get(1)?,
        path: row.get(2)?,
        version: row.get(3)?,
        commit_hash: row.get(4)?,
        content_hash: row.get(5)?,
        title: row.get(6)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    7,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
    })
}
