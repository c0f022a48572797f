//! SQLite index store.
//!
//! One `chunks` table holds content, JSON metadata, and the embedding as a
//! little-endian f32 blob. Similarity is computed in-process over all rows,
//! which is fine for the corpus sizes a single upload endpoint produces.
//!
//! The dimension is recorded in `index_meta` on first open; reopening the
//! same file with a different dimension is refused.

use crate::vector::rank_by_similarity;
use async_trait::async_trait;
use chrono::Utc;
use ragchat_core::document::{Chunk, RetrievedChunk, META_SOURCE};
use ragchat_core::error::IndexError;
use ragchat_core::index::{check_dimension, IndexStore};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, info};

pub struct SqliteIndex {
    pool: SqlitePool,
    dimension: usize,
}

impl SqliteIndex {
    /// Open (or create) an index database.
    ///
    /// Accepts a file path or any sqlx SQLite URL. `sqlite::memory:` gives an
    /// ephemeral database on a single connection.
    pub async fn open(path: &str, dimension: usize) -> Result<Self, IndexError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite://{path}")
        };
        let in_memory = url.contains(":memory:");

        let mut options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| IndexError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .synchronous(SqliteSynchronous::Normal);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Every connection to :memory: is its own database
        let max_connections = if in_memory { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| IndexError::Storage(format!("Failed to open SQLite: {e}")))?;

        let index = Self::from_pool(pool, dimension).await?;
        info!(path = %path, dimension, "SQLite index initialized");
        Ok(index)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool, dimension: usize) -> Result<Self, IndexError> {
        let index = Self { pool, dimension };
        index.run_migrations().await?;
        index.check_stored_dimension().await?;
        Ok(index)
    }

    async fn run_migrations(&self) -> Result<(), IndexError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id          TEXT PRIMARY KEY NOT NULL,
                source      TEXT NOT NULL,
                content     TEXT NOT NULL,
                metadata    TEXT NOT NULL DEFAULT '{}',
                embedding   BLOB NOT NULL,
                indexed_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| IndexError::MigrationFailed(format!("chunks table: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source)")
            .execute(&self.pool)
            .await
            .map_err(|e| IndexError::MigrationFailed(format!("source index: {e}")))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_meta (key TEXT PRIMARY KEY NOT NULL, value TEXT NOT NULL)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| IndexError::MigrationFailed(format!("meta table: {e}")))?;

        debug!("SQLite index migrations complete");
        Ok(())
    }

    async fn check_stored_dimension(&self) -> Result<(), IndexError> {
        sqlx::query("INSERT OR IGNORE INTO index_meta (key, value) VALUES ('dimension', ?1)")
            .bind(self.dimension.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| IndexError::Storage(format!("meta insert: {e}")))?;

        let stored: String = sqlx::query_scalar("SELECT value FROM index_meta WHERE key = 'dimension'")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| IndexError::QueryFailed(format!("meta read: {e}")))?;

        if stored != self.dimension.to_string() {
            return Err(IndexError::Storage(format!(
                "index was created with dimension {stored}, configured dimension is {}",
                self.dimension
            )));
        }
        Ok(())
    }

    /// Serialize an embedding vector to bytes.
    fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
        blob.chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<(Chunk, Vec<f32>), IndexError> {
        let id: String = row
            .try_get("id")
            .map_err(|e| IndexError::QueryFailed(format!("id column: {e}")))?;
        let content: String = row
            .try_get("content")
            .map_err(|e| IndexError::QueryFailed(format!("content column: {e}")))?;
        let metadata_json: String = row
            .try_get("metadata")
            .map_err(|e| IndexError::QueryFailed(format!("metadata column: {e}")))?;
        let blob: Vec<u8> = row
            .try_get("embedding")
            .map_err(|e| IndexError::QueryFailed(format!("embedding column: {e}")))?;

        let metadata: BTreeMap<String, String> = serde_json::from_str(&metadata_json)
            .map_err(|e| IndexError::QueryFailed(format!("metadata for {id}: {e}")))?;

        Ok((
            Chunk { id, content, metadata },
            Self::blob_to_embedding(&blob),
        ))
    }
}

#[async_trait]
impl IndexStore for SqliteIndex {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(&self, entries: Vec<(Chunk, Vec<f32>)>) -> Result<usize, IndexError> {
        for (chunk, vector) in &entries {
            check_dimension(&chunk.id, vector, self.dimension)?;
        }

        let indexed_at = Utc::now().to_rfc3339();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| IndexError::Storage(format!("BEGIN failed: {e}")))?;

        for (chunk, vector) in &entries {
            let metadata = serde_json::to_string(&chunk.metadata)
                .map_err(|e| IndexError::Storage(format!("Metadata serialization: {e}")))?;
            let source = chunk.metadata.get(META_SOURCE).cloned().unwrap_or_default();

            sqlx::query(
                r#"
                INSERT INTO chunks (id, source, content, metadata, embedding, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(id) DO UPDATE SET
                    source = excluded.source,
                    content = excluded.content,
                    metadata = excluded.metadata,
                    embedding = excluded.embedding,
                    indexed_at = excluded.indexed_at
                "#,
            )
            .bind(&chunk.id)
            .bind(&source)
            .bind(&chunk.content)
            .bind(&metadata)
            .bind(Self::embedding_to_blob(vector))
            .bind(&indexed_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| IndexError::Storage(format!("INSERT {} failed: {e}", chunk.id)))?;
        }

        // Dropping `tx` on an early return rolls the batch back
        tx.commit()
            .await
            .map_err(|e| IndexError::Storage(format!("COMMIT failed: {e}")))?;

        debug!(count = entries.len(), "Upserted chunks");
        Ok(entries.len())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>, IndexError> {
        if top_k == 0 {
            return Err(IndexError::InvalidTopK);
        }
        check_dimension("query", vector, self.dimension)?;

        let rows = sqlx::query("SELECT id, content, metadata, embedding FROM chunks")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IndexError::QueryFailed(format!("SELECT failed: {e}")))?;

        let entries = rows
            .iter()
            .map(Self::row_to_entry)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rank_by_similarity(
            entries.iter().map(|(chunk, v)| (chunk, v.as_slice())),
            vector,
            top_k,
        ))
    }

    async fn delete(&self, ids: &[String]) -> Result<usize, IndexError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| IndexError::Storage(format!("BEGIN failed: {e}")))?;

        let mut removed = 0u64;
        for id in ids {
            removed += sqlx::query("DELETE FROM chunks WHERE id = ?1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| IndexError::Storage(format!("DELETE {id} failed: {e}")))?
                .rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| IndexError::Storage(format!("COMMIT failed: {e}")))?;
        Ok(removed as usize)
    }

    async fn ids_for_source(&self, document_id: &str) -> Result<Vec<String>, IndexError> {
        sqlx::query_scalar::<_, String>("SELECT id FROM chunks WHERE source = ?1 ORDER BY id")
            .bind(document_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IndexError::QueryFailed(format!("source lookup: {e}")))
    }

    async fn count(&self) -> Result<usize, IndexError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| IndexError::QueryFailed(format!("COUNT failed: {e}")))?;
        Ok(n as usize)
    }
}
