//! # Agent Knowledge
//!
//! Per-agent and shared knowledge retrieval for conversational agents.
//!
//! Every document an agent owns, and every global document assigned to
//! it, is split into overlapping fragments, embedded, and stored. When the
//! agent is about to answer, the query is embedded and the most similar
//! fragments visible to that agent are returned as context.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────┐
//! │  Documents   │──▶│   Indexer    │──▶│  SQLite  │
//! │ agent/global │   │ Chunk+Embed  │   │  chunks  │
//! └──────────────┘   └──────────────┘   └────┬─────┘
//!                                            │
//!                    ┌──────────────┐        │
//!     query ────────▶│  Retriever   │◀───────┘
//!                    │ cosine top-K │
//!                    └──────────────┘
//! ```
//!
//! The algorithms live in the WASM-safe `agent-knowledge-core` crate;
//! this crate supplies the SQLite store, HTTP embedding providers,
//! configuration, and the `akb` CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite chunk store |
//! | [`embedding`] | Embedding providers |
//! | [`knowledge`] | The knowledge base service |

pub mod config;
pub mod db;
pub mod embedding;
pub mod knowledge;
pub mod migrate;
pub mod sqlite_store;

pub use agent_knowledge_core::{
    chunk_text, cosine_similarity, Chunk, ChunkDraft, ChunkStore, ChunkerConfig, EmbeddingProvider,
    IndexReport, Indexer, IndexerConfig, RetrievedChunk, Retriever, SourceType,
};
pub use knowledge::KnowledgeBase;
