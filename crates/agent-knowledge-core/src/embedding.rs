//! Embedding provider trait and vector utilities.
//!
//! Defines the [`EmbeddingProvider`] trait that all embedding backends
//! implement, the [`embed_text`] boundary that turns any provider failure
//! into "unavailable", and the BLOB codec used to persist vectors.
//!
//! Concrete provider implementations (OpenAI, Ollama, fastembed) live in
//! the `agent-knowledge` app crate.

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

/// Approximate characters-per-token ratio used to size provider inputs.
pub const CHARS_PER_TOKEN: usize = 4;

/// Default provider input bound: ~2048 tokens.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 2048 * CHARS_PER_TOKEN;

/// Trait for embedding providers.
///
/// Implementations map one text to one fixed-length vector. They are
/// expected to enforce their own request timeout; any error they return
/// is treated by the core as "embedding unavailable".
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Embed `text`, or return `None` if no embedding can be produced.
///
/// - Surrounding whitespace is trimmed; blank input returns `None`
///   without calling the provider.
/// - Input longer than `max_input_chars` characters is truncated first.
/// - Provider errors and empty vectors are logged and return `None`; the
///   caller never learns why the provider failed.
pub async fn embed_text(
    provider: &dyn EmbeddingProvider,
    text: &str,
    max_input_chars: usize,
) -> Option<Vec<f32>> {
    let input = truncate_chars(text.trim(), max_input_chars);
    if input.is_empty() {
        return None;
    }

    match provider.embed(input).await {
        Ok(vector) if vector.is_empty() => {
            warn!(model = provider.model_name(), "embedding provider returned an empty vector");
            None
        }
        Ok(vector) => Some(vector),
        Err(e) => {
            warn!(model = provider.model_name(), error = %e, "embedding unavailable");
            None
        }
    }
}

/// Longest prefix of `text` with at most `max_chars` characters.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// Each `f32` is stored as 4 bytes in little-endian order, producing
/// a BLOB of `vec.len() × 4` bytes. The round trip is bit-exact.
///
/// # Example
///
/// ```rust
/// use agent_knowledge_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12); // 3 × 4 bytes
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
///
/// Reverses [`vec_to_blob`]. Trailing bytes that do not form a whole
/// `f32` are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::sync::Mutex;

    /// Records every input it sees; fails when `fail` is set.
    struct RecordingProvider {
        seen: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingProvider {
        fn new(fail: bool) -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for RecordingProvider {
        fn model_name(&self) -> &str {
            "recording"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.seen.lock().unwrap().push(text.to_string());
            if self.fail {
                bail!("provider down");
            }
            Ok(vec![text.chars().count() as f32, 1.0])
        }
    }

    #[test]
    fn test_vec_blob_roundtrip() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001, f32::MIN_POSITIVE];
        let blob = vec_to_blob(&vec);
        let restored = blob_to_vec(&blob);
        assert_eq!(vec, restored);
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("héllo", 10), "héllo");
        assert_eq!(truncate_chars("héllo", 0), "");
    }

    #[tokio::test]
    async fn test_embed_blank_input_skips_provider() {
        let provider = RecordingProvider::new(false);
        assert!(embed_text(&provider, "  \n ", 100).await.is_none());
        assert!(provider.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_embed_leading_whitespace_never_reaches_provider() {
        let provider = RecordingProvider::new(false);
        let text = format!("{}hello", " ".repeat(10));
        assert!(embed_text(&provider, &text, 5).await.is_some());
        assert_eq!(*provider.seen.lock().unwrap(), vec!["hello".to_string()]);

        assert!(embed_text(&provider, "\n\t  ", 5).await.is_none());
        assert!(embed_text(&provider, "abc", 0).await.is_none());
        assert_eq!(provider.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_embed_truncates_long_input() {
        let provider = RecordingProvider::new(false);
        let text = "x".repeat(50);
        let vector = embed_text(&provider, &text, 10).await.unwrap();
        assert_eq!(vector[0], 10.0);
        assert_eq!(provider.seen.lock().unwrap()[0].len(), 10);
    }

    #[tokio::test]
    async fn test_embed_provider_error_is_unavailable() {
        let provider = RecordingProvider::new(true);
        assert!(embed_text(&provider, "hello", 100).await.is_none());
        assert_eq!(provider.seen.lock().unwrap().len(), 1);
    }
}
