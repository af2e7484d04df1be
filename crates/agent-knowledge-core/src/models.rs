//! Core data models shared by the chunker, stores, indexer and retriever.

use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use serde::{Deserialize, Serialize};

/// Scope of the document a chunk was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Private to one agent (`owner_id` is set).
    Agent,
    /// Shared; visible to agents it has been assigned to.
    Global,
}

impl SourceType {
    /// Storage representation (`"agent"` / `"global"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Agent => "agent",
            SourceType::Global => "global",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "agent" => Ok(SourceType::Agent),
            "global" => Ok(SourceType::Global),
            other => bail!("Unknown source type: '{}'. Use agent or global.", other),
        }
    }
}

/// A fragment produced by the chunker, before it is embedded and stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkDraft {
    pub title: String,
    pub content: String,
    pub chunk_index: i64,
}

/// A stored chunk of a document's text.
///
/// Chunks are never mutated in place: a document's chunk set is replaced
/// wholesale whenever the document is re-indexed.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub source_type: SourceType,
    pub source_id: String,
    /// Owning agent for agent-scoped chunks, `None` for global chunks.
    pub owner_id: Option<String>,
    pub chunk_index: i64,
    /// Copied from the document at index time.
    pub title: String,
    pub content: String,
    /// `None` when the embedding provider was unavailable for this fragment.
    pub embedding: Option<Vec<f32>>,
}

/// A retrieval result as exposed to callers: scores and ids stay internal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetrievedChunk {
    pub title: String,
    pub content: String,
}
