//! SQLite-backed document store for the local backend.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use super::{DocumentFields, DocumentPatch, DocumentStore};
use crate::error::{Error, Result};
use crate::record::MemoryRecord;

pub struct SqliteDocumentStore {
    path: PathBuf,
}

impl SqliteDocumentStore {
    /// Open (and initialize) the database at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self { path: path.into() };
        // Fail early on an unusable database file.
        store.connect()?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&self.path)
            .map_err(|e| Error::Other(format!("sqlite open: {}", e)))?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS memories (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                image_url TEXT NOT NULL DEFAULT '',
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_memories_created ON memories(created_at);
            "#,
        )
        .map_err(|e| Error::Other(format!("sqlite init: {}", e)))?;
        Ok(conn)
    }

    fn exists(&self, conn: &Connection, id: &str) -> Result<bool> {
        let row: Option<i64> = conn
            .query_row("SELECT 1 FROM memories WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| Error::Other(format!("sqlite select: {}", e)))?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn insert(&self, fields: DocumentFields) -> Result<String> {
        let conn = self.connect()?;
        let id = uuid::Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().timestamp_millis();
        conn.execute(
            "INSERT INTO memories (id, title, description, image_url, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, fields.title, fields.description, fields.image_url, created_at],
        )
        .map_err(|e| Error::Write(format!("sqlite insert: {}", e)))?;
        tracing::debug!(id = %id, "inserted memory document");
        Ok(id)
    }

    async fn update(&self, id: &str, patch: DocumentPatch) -> Result<()> {
        let conn = self.connect()?;
        if !self.exists(&conn, id)? {
            return Err(Error::NotFound(format!("memory {}", id)));
        }
        if let Some(title) = &patch.title {
            conn.execute(
                "UPDATE memories SET title = ?1 WHERE id = ?2",
                params![title, id],
            )
            .map_err(|e| Error::Write(format!("sqlite update title: {}", e)))?;
        }
        if let Some(description) = &patch.description {
            conn.execute(
                "UPDATE memories SET description = ?1 WHERE id = ?2",
                params![description, id],
            )
            .map_err(|e| Error::Write(format!("sqlite update description: {}", e)))?;
        }
        if let Some(image_url) = &patch.image_url {
            conn.execute(
                "UPDATE memories SET image_url = ?1 WHERE id = ?2",
                params![image_url, id],
            )
            .map_err(|e| Error::Write(format!("sqlite update image_url: {}", e)))?;
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let conn = self.connect()?;
        let n = conn
            .execute("DELETE FROM memories WHERE id = ?1", params![id])
            .map_err(|e| Error::DeleteDocument(format!("sqlite delete: {}", e)))?;
        if n == 0 {
            return Err(Error::NotFound(format!("memory {}", id)));
        }
        Ok(())
    }

    async fn list_created_desc(&self) -> Result<Vec<MemoryRecord>> {
        let conn = self.connect()?;
        // rowid tiebreak keeps same-millisecond inserts in newest-first order.
        let mut stmt = conn
            .prepare(
                "SELECT id, title, description, image_url, created_at FROM memories \
                 ORDER BY created_at DESC, rowid DESC",
            )
            .map_err(|e| Error::Other(format!("sqlite prepare: {}", e)))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(MemoryRecord {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    description: row.get(2)?,
                    image_url: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })
            .map_err(|e| Error::Other(format!("sqlite query: {}", e)))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(|e| Error::Other(format!("sqlite row: {}", e)))?);
        }
        Ok(records)
    }
}
