//! SQLite-backed [`ChunkStore`] implementation.
//!
//! Embeddings are stored as little-endian `f32` BLOBs (see
//! [`vec_to_blob`]); a `NULL` embedding marks a fragment the provider
//! could not embed.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use agent_knowledge_core::embedding::{blob_to_vec, vec_to_blob};
use agent_knowledge_core::models::{Chunk, SourceType};
use agent_knowledge_core::store::ChunkStore;

const CHUNK_COLUMNS: &str =
    "id, source_type, source_id, owner_id, chunk_index, title, content, embedding";

/// Source ids bound per `IN (...)` query, well under SQLite's
/// bound-parameter limit.
const SOURCE_ID_BATCH: usize = 500;

/// SQLite implementation of the [`ChunkStore`] trait.
///
/// Wraps a [`SqlitePool`] and translates every `ChunkStore` method into
/// one or more SQL statements against the `chunks` and
/// `global_assignments` tables.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_chunk(row: &SqliteRow) -> Result<Chunk> {
    let source_type: String = row.try_get("source_type")?;
    let embedding: Option<Vec<u8>> = row.try_get("embedding")?;

    Ok(Chunk {
        id: row.try_get("id")?,
        source_type: source_type.parse()?,
        source_id: row.try_get("source_id")?,
        owner_id: row.try_get("owner_id")?,
        chunk_index: row.try_get("chunk_index")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        embedding: embedding.map(|blob| blob_to_vec(&blob)),
    })
}

#[async_trait]
impl ChunkStore for SqliteStore {
    async fn replace_chunks(
        &self,
        source_type: SourceType,
        source_id: &str,
        chunks: &[Chunk],
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks WHERE source_type = ? AND source_id = ?")
            .bind(source_type.as_str())
            .bind(source_id)
            .execute(&mut *tx)
            .await?;

        for chunk in chunks {
            sqlx::query(
                r#"
                INSERT INTO chunks (id, source_type, source_id, owner_id, chunk_index,
                                    title, content, embedding, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.id)
            .bind(chunk.source_type.as_str())
            .bind(&chunk.source_id)
            .bind(&chunk.owner_id)
            .bind(chunk.chunk_index)
            .bind(&chunk.title)
            .bind(&chunk.content)
            .bind(chunk.embedding.as_deref().map(vec_to_blob))
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_chunks(&self, source_type: SourceType, source_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM chunks WHERE source_type = ? AND source_id = ?")
            .bind(source_type.as_str())
            .bind(source_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn chunks_for_source(
        &self,
        source_type: SourceType,
        source_id: &str,
    ) -> Result<Vec<Chunk>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM chunks WHERE source_type = ? AND source_id = ? ORDER BY chunk_index ASC",
            CHUNK_COLUMNS
        ))
        .bind(source_type.as_str())
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_chunk).collect()
    }

    async fn agent_chunks(&self, owner_id: &str) -> Result<Vec<Chunk>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM chunks WHERE source_type = 'agent' AND owner_id = ? ORDER BY rowid ASC",
            CHUNK_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_chunk).collect()
    }

    async fn global_chunks(&self, source_ids: &[String]) -> Result<Vec<Chunk>> {
        let mut keyed: Vec<(i64, Chunk)> = Vec::new();

        for batch in source_ids.chunks(SOURCE_ID_BATCH) {
            let placeholders = vec!["?"; batch.len()].join(", ");
            let sql = format!(
                "SELECT rowid, {} FROM chunks WHERE source_type = 'global' AND source_id IN ({})",
                CHUNK_COLUMNS, placeholders
            );

            let mut query = sqlx::query(&sql);
            for id in batch {
                query = query.bind(id);
            }
            for row in query.fetch_all(&self.pool).await? {
                keyed.push((row.try_get("rowid")?, row_to_chunk(&row)?));
            }
        }

        // Batches are queried separately; restore storage order across them.
        keyed.sort_by_key(|(rowid, _)| *rowid);
        Ok(keyed.into_iter().map(|(_, chunk)| chunk).collect())
    }

    async fn assigned_global_chunks(&self, agent_id: &str) -> Result<Vec<Chunk>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.source_type, c.source_id, c.owner_id, c.chunk_index,
                   c.title, c.content, c.embedding
            FROM chunks c
            JOIN global_assignments a ON a.source_id = c.source_id
            WHERE c.source_type = 'global' AND a.agent_id = ?
            ORDER BY c.rowid ASC
            "#,
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_chunk).collect()
    }

    async fn assign_global(&self, agent_id: &str, source_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO global_assignments (agent_id, source_id, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(agent_id, source_id) DO NOTHING
            "#,
        )
        .bind(agent_id)
        .bind(source_id)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn unassign_global(&self, agent_id: &str, source_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM global_assignments WHERE agent_id = ? AND source_id = ?")
            .bind(agent_id)
            .bind(source_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn assigned_global_sources(&self, agent_id: &str) -> Result<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT source_id FROM global_assignments WHERE agent_id = ? ORDER BY source_id ASC",
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}
