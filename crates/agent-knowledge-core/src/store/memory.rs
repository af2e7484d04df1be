//! In-memory [`ChunkStore`] implementation for testing and WASM targets.
//!
//! Uses `Vec` and `BTreeMap` behind `std::sync::RwLock` for thread safety.
//! Lock guards are never held across an `.await`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{Chunk, SourceType};

use super::ChunkStore;

/// In-memory store for testing and WASM environments.
#[derive(Default)]
pub struct InMemoryStore {
    chunks: RwLock<Vec<Chunk>>,
    /// agent id → assigned global source ids
    assignments: RwLock<BTreeMap<String, BTreeSet<String>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored chunks across all tenants.
    pub fn len(&self) -> Result<usize> {
        Ok(read(&self.chunks)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

fn is_source(chunk: &Chunk, source_type: SourceType, source_id: &str) -> bool {
    chunk.source_type == source_type && chunk.source_id == source_id
}

#[async_trait]
impl ChunkStore for InMemoryStore {
    async fn replace_chunks(
        &self,
        source_type: SourceType,
        source_id: &str,
        chunks: &[Chunk],
    ) -> Result<()> {
        let mut stored = write(&self.chunks)?;
        stored.retain(|c| !is_source(c, source_type, source_id));
        stored.extend_from_slice(chunks);
        Ok(())
    }

    async fn delete_chunks(&self, source_type: SourceType, source_id: &str) -> Result<u64> {
        let mut stored = write(&self.chunks)?;
        let before = stored.len();
        stored.retain(|c| !is_source(c, source_type, source_id));
        Ok((before - stored.len()) as u64)
    }

    async fn chunks_for_source(
        &self,
        source_type: SourceType,
        source_id: &str,
    ) -> Result<Vec<Chunk>> {
        let mut chunks: Vec<Chunk> = read(&self.chunks)?
            .iter()
            .filter(|c| is_source(c, source_type, source_id))
            .cloned()
            .collect();
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    async fn agent_chunks(&self, owner_id: &str) -> Result<Vec<Chunk>> {
        Ok(read(&self.chunks)?
            .iter()
            .filter(|c| {
                c.source_type == SourceType::Agent && c.owner_id.as_deref() == Some(owner_id)
            })
            .cloned()
            .collect())
    }

    async fn global_chunks(&self, source_ids: &[String]) -> Result<Vec<Chunk>> {
        if source_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(read(&self.chunks)?
            .iter()
            .filter(|c| c.source_type == SourceType::Global && source_ids.contains(&c.source_id))
            .cloned()
            .collect())
    }

    async fn assign_global(&self, agent_id: &str, source_id: &str) -> Result<()> {
        write(&self.assignments)?
            .entry(agent_id.to_string())
            .or_default()
            .insert(source_id.to_string());
        Ok(())
    }

    async fn unassign_global(&self, agent_id: &str, source_id: &str) -> Result<()> {
        let mut assignments = write(&self.assignments)?;
        if let Some(sources) = assignments.get_mut(agent_id) {
            sources.remove(source_id);
            if sources.is_empty() {
                assignments.remove(agent_id);
            }
        }
        Ok(())
    }

    async fn assigned_global_sources(&self, agent_id: &str) -> Result<Vec<String>> {
        Ok(read(&self.assignments)?
            .get(agent_id)
            .map(|sources| sources.iter().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(source_type: SourceType, source_id: &str, owner: Option<&str>, index: i64) -> Chunk {
        Chunk {
            id: format!("{}-{}-{}", source_type, source_id, index),
            source_type,
            source_id: source_id.to_string(),
            owner_id: owner.map(str::to_string),
            chunk_index: index,
            title: "t".to_string(),
            content: format!("content {}", index),
            embedding: Some(vec![1.0, 0.0]),
        }
    }

    #[tokio::test]
    async fn test_replace_swaps_whole_set() {
        let store = InMemoryStore::new();
        let old: Vec<Chunk> = (0..3)
            .map(|i| chunk(SourceType::Agent, "doc1", Some("a"), i))
            .collect();
        store.replace_chunks(SourceType::Agent, "doc1", &old).await.unwrap();

        let new = vec![chunk(SourceType::Agent, "doc1", Some("a"), 0)];
        store.replace_chunks(SourceType::Agent, "doc1", &new).await.unwrap();

        let stored = store.chunks_for_source(SourceType::Agent, "doc1").await.unwrap();
        assert_eq!(stored, new);
    }

    #[tokio::test]
    async fn test_delete_is_scoped_and_idempotent() {
        let store = InMemoryStore::new();
        store
            .replace_chunks(
                SourceType::Agent,
                "doc1",
                &[chunk(SourceType::Agent, "doc1", Some("a"), 0)],
            )
            .await
            .unwrap();
        store
            .replace_chunks(
                SourceType::Global,
                "doc1",
                &[chunk(SourceType::Global, "doc1", None, 0)],
            )
            .await
            .unwrap();

        assert_eq!(store.delete_chunks(SourceType::Agent, "doc1").await.unwrap(), 1);
        assert_eq!(store.delete_chunks(SourceType::Agent, "doc1").await.unwrap(), 0);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_agent_chunks_filter_by_owner() {
        let store = InMemoryStore::new();
        store
            .replace_chunks(
                SourceType::Agent,
                "doc1",
                &[chunk(SourceType::Agent, "doc1", Some("a"), 0)],
            )
            .await
            .unwrap();
        store
            .replace_chunks(
                SourceType::Agent,
                "doc2",
                &[chunk(SourceType::Agent, "doc2", Some("b"), 0)],
            )
            .await
            .unwrap();

        let a = store.agent_chunks("a").await.unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].source_id, "doc1");
        assert!(store.agent_chunks("c").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_assignments() {
        let store = InMemoryStore::new();
        store.assign_global("a", "g1").await.unwrap();
        store.assign_global("a", "g1").await.unwrap();
        store.assign_global("a", "g2").await.unwrap();
        assert_eq!(
            store.assigned_global_sources("a").await.unwrap(),
            vec!["g1".to_string(), "g2".to_string()]
        );

        store.unassign_global("a", "g1").await.unwrap();
        store.unassign_global("a", "missing").await.unwrap();
        assert_eq!(
            store.assigned_global_sources("a").await.unwrap(),
            vec!["g2".to_string()]
        );
        assert!(store.assigned_global_sources("b").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_global_chunks_by_source_set() {
        let store = InMemoryStore::new();
        for id in ["g1", "g2"] {
            store
                .replace_chunks(SourceType::Global, id, &[chunk(SourceType::Global, id, None, 0)])
                .await
                .unwrap();
        }
        let only_g2 = store.global_chunks(&["g2".to_string()]).await.unwrap();
        assert_eq!(only_g2.len(), 1);
        assert_eq!(only_g2[0].source_id, "g2");
        assert!(store.global_chunks(&[]).await.unwrap().is_empty());
    }
}
