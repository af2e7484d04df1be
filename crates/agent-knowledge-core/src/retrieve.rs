//! Query-time retrieval of the fragments most relevant to a query.
//!
//! # Algorithm
//!
//! 1. Embed the query. If the provider is unavailable, return no results.
//! 2. Load candidates: the agent's own chunks, then the global chunks of
//!    every document assigned to the agent. Chunks without a stored
//!    embedding are dropped.
//! 3. Score each candidate with [`cosine_similarity`].
//! 4. Stable sort by score (desc) and keep the first `top_k`.
//! 5. Project to `{title, content}`.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error};

use crate::embedding::{embed_text, EmbeddingProvider, DEFAULT_MAX_INPUT_CHARS};
use crate::models::{Chunk, RetrievedChunk};
use crate::similarity::{cosine_similarity, top_k};
use crate::store::ChunkStore;

/// Default number of fragments returned per query.
pub const DEFAULT_TOP_K: usize = 10;

/// Answers queries against the chunks visible to one agent.
#[derive(Clone)]
pub struct Retriever {
    store: Arc<dyn ChunkStore>,
    provider: Arc<dyn EmbeddingProvider>,
    max_input_chars: usize,
}

impl Retriever {
    pub fn new(store: Arc<dyn ChunkStore>, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            provider,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        }
    }

    /// Override the provider input bound used when embedding queries.
    pub fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars;
        self
    }

    /// Return up to `top_k` fragments visible to `agent_id`, best first.
    ///
    /// `top_k == 0` returns `Ok(vec![])` before the provider is called.
    /// An unavailable embedding provider yields `Ok(vec![])`. Store
    /// failures are returned as errors; see [`Retriever::retrieve_or_empty`]
    /// for callers that must never fail.
    pub async fn retrieve(
        &self,
        agent_id: &str,
        query: &str,
        top_k_results: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        if top_k_results == 0 {
            return Ok(Vec::new());
        }

        let query_vec =
            match embed_text(self.provider.as_ref(), query, self.max_input_chars).await {
                Some(v) => v,
                None => return Ok(Vec::new()),
            };

        let candidates = self.candidates(agent_id).await?;
        let candidate_count = candidates.len();

        let scored: Vec<(Chunk, f32)> = candidates
            .into_iter()
            .filter_map(|chunk| {
                let score = cosine_similarity(&query_vec, chunk.embedding.as_deref()?);
                Some((chunk, score))
            })
            .collect();

        let ranked = top_k(scored, top_k_results);

        debug!(
            agent_id,
            candidates = candidate_count,
            returned = ranked.len(),
            "retrieved context"
        );

        Ok(ranked
            .into_iter()
            .map(|(chunk, _)| RetrievedChunk {
                title: chunk.title,
                content: chunk.content,
            })
            .collect())
    }

    /// Like [`Retriever::retrieve`], but logs store failures and returns
    /// an empty result instead, so consumers (e.g. a chat reply) proceed
    /// without context.
    pub async fn retrieve_or_empty(
        &self,
        agent_id: &str,
        query: &str,
        top_k_results: usize,
    ) -> Vec<RetrievedChunk> {
        match self.retrieve(agent_id, query, top_k_results).await {
            Ok(results) => results,
            Err(e) => {
                error!(agent_id, error = %e, "retrieval failed; continuing without context");
                Vec::new()
            }
        }
    }

    /// Owned agent chunks followed by assigned global chunks, all with an
    /// embedding.
    async fn candidates(&self, agent_id: &str) -> Result<Vec<Chunk>> {
        let mut candidates = self.store.agent_chunks(agent_id).await?;
        candidates.extend(self.store.assigned_global_chunks(agent_id).await?);

        candidates.retain(|c| c.embedding.is_some());
        Ok(candidates)
    }
}
