//! # Agent Knowledge Core
//!
//! Shared, WASM-safe retrieval logic for Agent Knowledge: data models,
//! chunking, the embedding provider trait, cosine ranking, the chunk store
//! abstraction, and the indexer/retriever pipelines built on top of them.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or other
//! native-only dependencies. Concrete stores and embedding providers
//! live in the `agent-knowledge` application crate.
//!
//! ## Data Flow
//!
//! ```text
//! document change ─▶ Indexer ─▶ chunk ─▶ embed (one at a time) ─▶ replace chunk set
//! query           ─▶ Retriever ─▶ embed ─▶ scoped candidates ─▶ cosine ─▶ top-K
//! ```

pub mod chunk;
pub mod embedding;
pub mod index;
pub mod models;
pub mod retrieve;
pub mod similarity;
pub mod store;

pub use chunk::{chunk_text, ChunkerConfig};
pub use embedding::{embed_text, EmbeddingProvider};
pub use index::{IndexReport, Indexer, IndexerConfig};
pub use models::{Chunk, ChunkDraft, RetrievedChunk, SourceType};
pub use retrieve::Retriever;
pub use similarity::cosine_similarity;
pub use store::ChunkStore;
