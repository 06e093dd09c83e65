//! SQLite-backed record store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use tracing::debug;

use super::{RecordStore, StoreError, StoredEntry};
use crate::record::{InfoHash, TorrentFile, TorrentRecord};

/// SQLite-backed record store.
///
/// One row per torrent in `torrents`, with its file list as ordered child
/// rows in `torrent_files`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS torrents (
                info_hash TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                size INTEGER NOT NULL,
                age TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS torrent_files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                info_hash TEXT NOT NULL REFERENCES torrents(info_hash) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                name TEXT NOT NULL,
                size INTEGER NOT NULL,
                UNIQUE(info_hash, position)
            );

            CREATE INDEX IF NOT EXISTS idx_torrent_files_hash ON torrent_files(info_hash);
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".to_string()))
    }

    /// Write a record with an explicit `updated_at`.
    ///
    /// Replaces the row and all of its files in one transaction. The original
    /// `created_at` is kept when the torrent was already stored.
    pub fn write_entry(
        &self,
        info_hash: &InfoHash,
        record: &TorrentRecord,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let size = to_sql_size(record.size)?;
        let file_sizes = record
            .files
            .iter()
            .map(|file| to_sql_size(file.size))
            .collect::<Result<Vec<_>, _>>()?;

        let mut conn = self.lock()?;
        let updated_at_str = updated_at.to_rfc3339_opts(SecondsFormat::Nanos, true);

        let tx = conn
            .transaction()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tx.execute(
            "INSERT INTO torrents (info_hash, name, size, age, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(info_hash) DO UPDATE SET
                name = excluded.name,
                size = excluded.size,
                age = excluded.age,
                updated_at = excluded.updated_at",
            params![
                info_hash.as_str(),
                &record.name,
                size,
                &record.age,
                &updated_at_str,
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        tx.execute(
            "DELETE FROM torrent_files WHERE info_hash = ?",
            params![info_hash.as_str()],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        for (position, (file, file_size)) in record.files.iter().zip(file_sizes).enumerate() {
            tx.execute(
                "INSERT INTO torrent_files (info_hash, position, name, size) VALUES (?, ?, ?, ?)",
                params![
                    info_hash.as_str(),
                    position as i64,
                    &file.name,
                    file_size
                ],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;
        }

        tx.commit()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    /// Read the entry for an info hash.
    pub fn read_entry(&self, info_hash: &InfoHash) -> Result<Option<StoredEntry>, StoreError> {
        let conn = self.lock()?;

        let row = conn.query_row(
            "SELECT name, size, age, updated_at FROM torrents WHERE info_hash = ?",
            params![info_hash.as_str()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        );

        let (name, size, age, updated_at_str) = match row {
            Ok(row) => row,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(StoreError::Database(e.to_string())),
        };

        let last_modified = DateTime::parse_from_rfc3339(&updated_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                StoreError::Database(format!("invalid updated_at {:?}: {}", updated_at_str, e))
            })?;

        let files = Self::load_files(&conn, info_hash)?;

        Ok(Some(StoredEntry {
            record: TorrentRecord {
                info_hash: info_hash.clone(),
                name,
                size,
                age,
                files,
            },
            last_modified,
        }))
    }

    fn load_files(conn: &Connection, info_hash: &InfoHash) -> Result<Vec<TorrentFile>, StoreError> {
        let mut stmt = conn
            .prepare("SELECT name, size FROM torrent_files WHERE info_hash = ? ORDER BY position")
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![info_hash.as_str()], |row| {
                Ok(TorrentFile {
                    name: row.get(0)?,
                    size: row.get(1)?,
                })
            })
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut files = Vec::new();
        for row in rows {
            files.push(row.map_err(|e| StoreError::Database(e.to_string()))?);
        }
        Ok(files)
    }
}

/// SQLite integers are signed; larger sizes could be written but never read back.
fn to_sql_size(size: u64) -> Result<i64, StoreError> {
    i64::try_from(size)
        .map_err(|_| StoreError::Serialization(format!("size {} exceeds SQLite range", size)))
}

#[async_trait]
impl RecordStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, info_hash: &InfoHash) -> Result<Option<StoredEntry>, StoreError> {
        self.read_entry(info_hash)
    }

    async fn put(
        &self,
        info_hash: &InfoHash,
        record: &TorrentRecord,
    ) -> Result<DateTime<Utc>, StoreError> {
        let now = Utc::now();
        self.write_entry(info_hash, record, now)?;
        debug!(info_hash = %info_hash, files = record.files.len(), "Stored torrent");
        Ok(now)
    }
}
