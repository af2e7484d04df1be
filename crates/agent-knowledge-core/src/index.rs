//! Document indexing: chunk → embed → replace the stored chunk set.
//!
//! Embedding is attempted for every fragment, one at a time and in index
//! order. A fragment whose embedding is unavailable is skipped (or stored
//! without a vector when [`IndexerConfig::keep_unembedded`] is set); it
//! never aborts the rest of the batch. Store failures do propagate.
//!
//! The new set is published with a single [`ChunkStore::replace_chunks`]
//! call, so two overlapping re-index calls for the same document each
//! leave a complete set behind and never interleave their fragments.

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::chunk::{chunk_text, ChunkerConfig};
use crate::embedding::{embed_text, EmbeddingProvider, DEFAULT_MAX_INPUT_CHARS};
use crate::models::{Chunk, SourceType};
use crate::store::ChunkStore;

/// Indexer tuning, decoupled from application config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexerConfig {
    pub chunking: ChunkerConfig,
    /// Provider input bound, in characters.
    pub max_input_chars: usize,
    /// Store fragments whose embedding failed, with `embedding = None`.
    pub keep_unembedded: bool,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkerConfig::default(),
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            keep_unembedded: false,
        }
    }
}

/// Outcome of one index call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    /// Fragments produced by the chunker.
    pub fragments: usize,
    /// Fragments stored with an embedding.
    pub embedded: usize,
    /// Fragments whose embedding was unavailable.
    pub skipped: usize,
}

/// Builds and replaces the searchable representation of documents.
///
/// Cheap to clone; holds no lock across calls, so unrelated documents
/// can be indexed concurrently.
#[derive(Clone)]
pub struct Indexer {
    store: Arc<dyn ChunkStore>,
    provider: Arc<dyn EmbeddingProvider>,
    config: IndexerConfig,
}

impl Indexer {
    pub fn new(
        store: Arc<dyn ChunkStore>,
        provider: Arc<dyn EmbeddingProvider>,
        config: IndexerConfig,
    ) -> Self {
        Self {
            store,
            provider,
            config,
        }
    }

    /// (Re)index a document private to `owner_id`.
    pub async fn index_agent_document(
        &self,
        owner_id: &str,
        source_id: &str,
        title: &str,
        content: &str,
    ) -> Result<IndexReport> {
        self.index_document(SourceType::Agent, source_id, Some(owner_id), title, content)
            .await
    }

    /// (Re)index a document shared through global assignments.
    pub async fn index_global_document(
        &self,
        source_id: &str,
        title: &str,
        content: &str,
    ) -> Result<IndexReport> {
        self.index_document(SourceType::Global, source_id, None, title, content)
            .await
    }

    /// Remove every chunk of `(source_type, source_id)`; returns how many.
    pub async fn delete_chunks_by_source(
        &self,
        source_type: SourceType,
        source_id: &str,
    ) -> Result<u64> {
        self.store.delete_chunks(source_type, source_id).await
    }

    async fn index_document(
        &self,
        source_type: SourceType,
        source_id: &str,
        owner_id: Option<&str>,
        title: &str,
        content: &str,
    ) -> Result<IndexReport> {
        let drafts = chunk_text(content, title, &self.config.chunking);
        let mut report = IndexReport {
            fragments: drafts.len(),
            ..IndexReport::default()
        };

        let mut chunks = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let embedding = embed_text(
                self.provider.as_ref(),
                &draft.content,
                self.config.max_input_chars,
            )
            .await;

            if embedding.is_some() {
                report.embedded += 1;
            } else {
                report.skipped += 1;
                warn!(
                    %source_type,
                    source_id,
                    chunk_index = draft.chunk_index,
                    "no embedding for fragment"
                );
                if !self.config.keep_unembedded {
                    continue;
                }
            }

            chunks.push(Chunk {
                id: Uuid::new_v4().to_string(),
                source_type,
                source_id: source_id.to_string(),
                owner_id: owner_id.map(str::to_string),
                chunk_index: draft.chunk_index,
                title: draft.title,
                content: draft.content,
                embedding,
            });
        }

        self.store
            .replace_chunks(source_type, source_id, &chunks)
            .await?;

        debug!(
            %source_type,
            source_id,
            fragments = report.fragments,
            embedded = report.embedded,
            skipped = report.skipped,
            "indexed document"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use anyhow::bail;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Embeds text as `[len, 1.0]`; fails for texts containing `"FAIL"`.
    struct FlakyProvider {
        calls: Mutex<Vec<String>>,
    }

    impl FlakyProvider {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for FlakyProvider {
        fn model_name(&self) -> &str {
            "flaky"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.lock().unwrap().push(text.to_string());
            if text.contains("FAIL") {
                bail!("timeout");
            }
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    fn small_chunks() -> IndexerConfig {
        IndexerConfig {
            chunking: ChunkerConfig {
                max_chars: 20,
                overlap_chars: 0,
            },
            ..IndexerConfig::default()
        }
    }

    fn setup(config: IndexerConfig) -> (Arc<InMemoryStore>, Arc<FlakyProvider>, Indexer) {
        let store = Arc::new(InMemoryStore::new());
        let provider = Arc::new(FlakyProvider::new());
        let indexer = Indexer::new(store.clone(), provider.clone(), config);
        (store, provider, indexer)
    }

    #[tokio::test]
    async fn test_index_agent_document() {
        let (store, _, indexer) = setup(IndexerConfig::default());
        let report = indexer
            .index_agent_document("agentA", "doc1", "Title", "Some knowledge.")
            .await
            .unwrap();
        assert_eq!(report.fragments, 1);
        assert_eq!(report.embedded, 1);

        let chunks = store.chunks_for_source(SourceType::Agent, "doc1").await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].owner_id.as_deref(), Some("agentA"));
        assert_eq!(chunks[0].title, "Title");
        assert!(chunks[0].embedding.is_some());
    }

    #[tokio::test]
    async fn test_index_global_document_has_no_owner() {
        let (store, _, indexer) = setup(IndexerConfig::default());
        indexer
            .index_global_document("g1", "Shared", "Shared knowledge.")
            .await
            .unwrap();
        let chunks = store.chunks_for_source(SourceType::Global, "g1").await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].owner_id.is_none());
    }

    #[tokio::test]
    async fn test_reindex_is_idempotent() {
        let (store, _, indexer) = setup(small_chunks());
        let content = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        indexer
            .index_agent_document("a", "doc1", "t", content)
            .await
            .unwrap();
        let first = store.chunks_for_source(SourceType::Agent, "doc1").await.unwrap();
        indexer
            .index_agent_document("a", "doc1", "t", content)
            .await
            .unwrap();
        let second = store.chunks_for_source(SourceType::Agent, "doc1").await.unwrap();

        assert_eq!(first.len(), second.len());
        assert_eq!(store.len().unwrap(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.chunk_index, b.chunk_index);
            assert_eq!(a.content, b.content);
            assert_eq!(a.embedding, b.embedding);
        }
    }

    #[tokio::test]
    async fn test_update_removes_stale_fragments() {
        let (store, _, indexer) = setup(small_chunks());
        indexer
            .index_agent_document("a", "doc1", "t", "one two three four five six seven eight nine")
            .await
            .unwrap();
        indexer
            .index_agent_document("a", "doc1", "t", "short")
            .await
            .unwrap();
        let chunks = store.chunks_for_source(SourceType::Agent, "doc1").await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "short");
    }

    #[tokio::test]
    async fn test_empty_content_clears_existing_chunks() {
        let (store, provider, indexer) = setup(IndexerConfig::default());
        indexer
            .index_agent_document("a", "doc1", "t", "content")
            .await
            .unwrap();
        let report = indexer
            .index_agent_document("a", "doc1", "t", "   ")
            .await
            .unwrap();
        assert_eq!(report, IndexReport::default());
        assert!(store.is_empty().unwrap());
        assert_eq!(provider.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_fragment_is_skipped_not_fatal() {
        let (store, provider, indexer) = setup(small_chunks());
        let report = indexer
            .index_agent_document("a", "doc1", "t", "good words\nFAIL words\nmore good")
            .await
            .unwrap();
        assert_eq!(report.fragments, 3);
        assert_eq!(report.embedded, 2);
        assert_eq!(report.skipped, 1);

        let calls = provider.calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["good words", "FAIL words", "more good"]);

        let chunks = store.chunks_for_source(SourceType::Agent, "doc1").await.unwrap();
        let indices: Vec<i64> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[tokio::test]
    async fn test_keep_unembedded_stores_without_vector() {
        let config = IndexerConfig {
            keep_unembedded: true,
            ..small_chunks()
        };
        let (store, _, indexer) = setup(config);
        indexer
            .index_agent_document("a", "doc1", "t", "good words\nFAIL words")
            .await
            .unwrap();
        let chunks = store.chunks_for_source(SourceType::Agent, "doc1").await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].embedding.is_some());
        assert!(chunks[1].embedding.is_none());
    }

    #[tokio::test]
    async fn test_delete_chunks_by_source() {
        let (store, _, indexer) = setup(IndexerConfig::default());
        indexer
            .index_global_document("g1", "t", "content")
            .await
            .unwrap();
        assert_eq!(
            indexer
                .delete_chunks_by_source(SourceType::Global, "g1")
                .await
                .unwrap(),
            1
        );
        assert!(store.is_empty().unwrap());
        assert_eq!(
            indexer
                .delete_chunks_by_source(SourceType::Global, "g1")
                .await
                .unwrap(),
            0
        );
    }
}
