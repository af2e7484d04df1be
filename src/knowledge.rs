//! The knowledge base service.
//!
//! [`KnowledgeBase`] is what the document-management side of an
//! application talks to. It wires a [`ChunkStore`] and an
//! [`EmbeddingProvider`] into one [`Indexer`] and one [`Retriever`] and
//! exposes them as change notifications plus a context lookup:
//!
//! | Event | Call |
//! |-------|------|
//! | agent document created/updated | [`KnowledgeBase::agent_document_saved`] |
//! | global document created/updated | [`KnowledgeBase::global_document_saved`] |
//! | document removed | [`KnowledgeBase::document_deleted`] |
//! | global document (un)assigned | [`KnowledgeBase::assign_global`] / [`KnowledgeBase::unassign_global`] |
//! | agent about to answer | [`KnowledgeBase::context_for`] |
//!
//! Save notifications never fail: indexing errors are logged and the
//! document write path carries on.

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};

use agent_knowledge_core::embedding::EmbeddingProvider;
use agent_knowledge_core::index::{IndexReport, Indexer, IndexerConfig};
use agent_knowledge_core::models::{RetrievedChunk, SourceType};
use agent_knowledge_core::retrieve::Retriever;
use agent_knowledge_core::store::ChunkStore;

use crate::config::Config;
use crate::embedding::create_provider;
use crate::sqlite_store::SqliteStore;
use crate::{db, migrate};

pub struct KnowledgeBase {
    store: Arc<dyn ChunkStore>,
    indexer: Indexer,
    retriever: Retriever,
    default_top_k: usize,
}

impl KnowledgeBase {
    /// Open the configured SQLite database (applying the schema if needed)
    /// and build the configured embedding provider.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply_schema(&pool).await?;

        let store: Arc<dyn ChunkStore> = Arc::new(SqliteStore::new(pool));
        let provider = create_provider(&config.embedding)?;
        if !config.embedding.is_enabled() {
            warn!("embedding provider is disabled; documents will not be searchable");
        }

        Ok(Self::new(store, provider, config.indexer_config())
            .with_default_top_k(config.retrieval.top_k))
    }

    pub fn new(
        store: Arc<dyn ChunkStore>,
        provider: Arc<dyn EmbeddingProvider>,
        config: IndexerConfig,
    ) -> Self {
        let retriever = Retriever::new(store.clone(), provider.clone())
            .with_max_input_chars(config.max_input_chars);
        Self {
            indexer: Indexer::new(store.clone(), provider, config),
            store,
            retriever,
            default_top_k: agent_knowledge_core::retrieve::DEFAULT_TOP_K,
        }
    }

    pub fn with_default_top_k(mut self, top_k: usize) -> Self {
        self.default_top_k = top_k;
        self
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    pub fn store(&self) -> &Arc<dyn ChunkStore> {
        &self.store
    }

    /// Re-index an agent's private document. Returns `None` when indexing
    /// failed; the failure is logged, never raised.
    pub async fn agent_document_saved(
        &self,
        owner_id: &str,
        source_id: &str,
        title: &str,
        content: &str,
    ) -> Option<IndexReport> {
        match self
            .indexer
            .index_agent_document(owner_id, source_id, title, content)
            .await
        {
            Ok(report) => {
                info!(owner_id, source_id, embedded = report.embedded, "indexed agent document");
                Some(report)
            }
            Err(e) => {
                error!(owner_id, source_id, error = %e, "failed to index agent document");
                None
            }
        }
    }

    /// Re-index a shared document. Same failure policy as
    /// [`KnowledgeBase::agent_document_saved`].
    pub async fn global_document_saved(
        &self,
        source_id: &str,
        title: &str,
        content: &str,
    ) -> Option<IndexReport> {
        match self
            .indexer
            .index_global_document(source_id, title, content)
            .await
        {
            Ok(report) => {
                info!(source_id, embedded = report.embedded, "indexed global document");
                Some(report)
            }
            Err(e) => {
                error!(source_id, error = %e, "failed to index global document");
                None
            }
        }
    }

    /// Drop every chunk of a deleted document; returns how many were removed.
    pub async fn document_deleted(&self, source_type: SourceType, source_id: &str) -> Result<u64> {
        self.indexer
            .delete_chunks_by_source(source_type, source_id)
            .await
    }

    pub async fn assign_global(&self, agent_id: &str, source_id: &str) -> Result<()> {
        self.store.assign_global(agent_id, source_id).await
    }

    pub async fn unassign_global(&self, agent_id: &str, source_id: &str) -> Result<()> {
        self.store.unassign_global(agent_id, source_id).await
    }

    /// Fragments to ground an agent's reply. Empty on any failure.
    pub async fn context_for(
        &self,
        agent_id: &str,
        query: &str,
        top_k: Option<usize>,
    ) -> Vec<RetrievedChunk> {
        self.retriever
            .retrieve_or_empty(agent_id, query, top_k.unwrap_or(self.default_top_k))
            .await
    }

    /// Like [`KnowledgeBase::context_for`] but surfaces store errors.
    pub async fn retrieve(
        &self,
        agent_id: &str,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<RetrievedChunk>> {
        self.retriever
            .retrieve(agent_id, query, top_k.unwrap_or(self.default_top_k))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_knowledge_core::chunk::ChunkerConfig;
    use agent_knowledge_core::store::memory::InMemoryStore;
    use anyhow::bail;
    use async_trait::async_trait;

    /// Two-axis embedder: counts of "cat" and "dog".
    struct PetProvider;

    #[async_trait]
    impl EmbeddingProvider for PetProvider {
        fn model_name(&self) -> &str {
            "pets"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let cats = text.matches("cat").count() as f32;
            let dogs = text.matches("dog").count() as f32;
            if cats + dogs == 0.0 {
                bail!("no pets mentioned");
            }
            Ok(vec![cats, dogs])
        }
    }

    fn kb() -> KnowledgeBase {
        let config = IndexerConfig {
            chunking: ChunkerConfig {
                max_chars: 40,
                overlap_chars: 0,
            },
            ..IndexerConfig::default()
        };
        KnowledgeBase::new(Arc::new(InMemoryStore::new()), Arc::new(PetProvider), config)
            .with_default_top_k(5)
    }

    #[tokio::test]
    async fn test_saved_documents_become_context() {
        let kb = kb();
        let report = kb
            .agent_document_saved("A", "notes", "Notes", "the cat sat on the mat\nthe dog ran off")
            .await
            .unwrap();
        assert_eq!(report.fragments, 1);

        let context = kb.context_for("A", "cat", None).await;
        assert_eq!(context.len(), 1);
        assert_eq!(context[0].title, "Notes");
        assert!(kb.context_for("B", "cat", None).await.is_empty());
    }

    #[tokio::test]
    async fn test_global_assignment_lifecycle() {
        let kb = kb();
        kb.global_document_saved("handbook", "Handbook", "dog dog dog")
            .await
            .unwrap();
        assert!(kb.context_for("A", "dog", None).await.is_empty());

        kb.assign_global("A", "handbook").await.unwrap();
        assert_eq!(kb.context_for("A", "dog", None).await[0].title, "Handbook");

        kb.unassign_global("A", "handbook").await.unwrap();
        assert!(kb.context_for("A", "dog", None).await.is_empty());
    }

    #[tokio::test]
    async fn test_document_deleted_removes_context() {
        let kb = kb();
        kb.agent_document_saved("A", "notes", "Notes", "cat facts")
            .await
            .unwrap();
        assert_eq!(kb.document_deleted(SourceType::Agent, "notes").await.unwrap(), 1);
        assert!(kb.context_for("A", "cat", None).await.is_empty());
    }

    #[tokio::test]
    async fn test_unembeddable_query_returns_empty() {
        let kb = kb();
        kb.agent_document_saved("A", "notes", "Notes", "cat facts")
            .await
            .unwrap();
        assert!(kb.context_for("A", "fish", None).await.is_empty());
        assert!(kb.context_for("A", "cat", Some(0)).await.is_empty());
    }
}
