//! Storage abstraction for chunk records.
//!
//! The [`ChunkStore`] trait defines every storage operation the indexer
//! and retriever need, enabling pluggable backends (SQLite in the app
//! crate, [`memory::InMemoryStore`] here).
//!
//! Every read and write is scoped by `(source_type, source_id)`, by
//! `owner_id`, or by an explicit set of global source ids; there is no
//! unscoped read across tenants.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Chunk, SourceType};

/// Abstract chunk storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`replace_chunks`](ChunkStore::replace_chunks) | Atomically swap a document's chunk set |
/// | [`delete_chunks`](ChunkStore::delete_chunks) | Remove a document's chunk set |
/// | [`chunks_for_source`](ChunkStore::chunks_for_source) | Read one document's chunks |
/// | [`agent_chunks`](ChunkStore::agent_chunks) | Agent-scoped chunks of one owner |
/// | [`global_chunks`](ChunkStore::global_chunks) | Global chunks of the given documents |
/// | [`assign_global`](ChunkStore::assign_global) | Grant an agent access to a global document |
/// | [`unassign_global`](ChunkStore::unassign_global) | Revoke that access |
/// | [`assigned_global_sources`](ChunkStore::assigned_global_sources) | Global documents granted to an agent |
/// | [`assigned_global_chunks`](ChunkStore::assigned_global_chunks) | Global chunks visible to an agent |
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Delete every chunk of `(source_type, source_id)` and insert `chunks`,
    /// as one atomic unit. Readers see either the old set or the new set,
    /// never a mix.
    async fn replace_chunks(
        &self,
        source_type: SourceType,
        source_id: &str,
        chunks: &[Chunk],
    ) -> Result<()>;

    /// Delete every chunk of `(source_type, source_id)`.
    ///
    /// Returns the number of chunks removed; deleting a missing set is a
    /// no-op returning `0`.
    async fn delete_chunks(&self, source_type: SourceType, source_id: &str) -> Result<u64>;

    /// All chunks of one document, ordered by `chunk_index`.
    async fn chunks_for_source(
        &self,
        source_type: SourceType,
        source_id: &str,
    ) -> Result<Vec<Chunk>>;

    /// All agent-scoped chunks owned by `owner_id`, in storage order.
    async fn agent_chunks(&self, owner_id: &str) -> Result<Vec<Chunk>>;

    /// All global chunks whose `source_id` is in `source_ids`, in storage order.
    async fn global_chunks(&self, source_ids: &[String]) -> Result<Vec<Chunk>>;

    /// Grant `agent_id` access to the global document `source_id`. Idempotent.
    async fn assign_global(&self, agent_id: &str, source_id: &str) -> Result<()>;

    /// Revoke `agent_id`'s access to the global document `source_id`. Idempotent.
    async fn unassign_global(&self, agent_id: &str, source_id: &str) -> Result<()>;

    /// Source ids of the global documents assigned to `agent_id`.
    async fn assigned_global_sources(&self, agent_id: &str) -> Result<Vec<String>>;

    /// Global chunks of every document assigned to `agent_id`, in storage
    /// order. Backends that can join assignments to chunks should override
    /// this.
    async fn assigned_global_chunks(&self, agent_id: &str) -> Result<Vec<Chunk>> {
        let assigned = self.assigned_global_sources(agent_id).await?;
        if assigned.is_empty() {
            return Ok(Vec::new());
        }
        self.global_chunks(&assigned).await
    }
}
