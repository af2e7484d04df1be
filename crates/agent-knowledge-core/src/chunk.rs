//! Sliding-window text chunker with overlap.
//!
//! Splits document text into [`ChunkDraft`]s of at most `max_chars`
//! characters. Consecutive fragments share up to `overlap_chars`
//! characters of context so that a sentence cut at a window boundary is
//! still fully present in one of the two fragments.
//!
//! All sizes are measured in Unicode scalar values (`char`s), never bytes,
//! so multi-byte text is never split inside a code point.
//!
//! # Algorithm
//!
//! 1. Trim the input. Empty input yields no fragments.
//! 2. Open a window of `max_chars` characters at `start`.
//! 3. If the window ends before the end of the text, pull its end back to
//!    the last newline inside the window, else the last space, else cut
//!    hard at `max_chars` (may split a word).
//! 4. Trim the slice; keep it only if non-empty (empty slices do not
//!    consume an index).
//! 5. Unless this was the final window, move `start` back by
//!    `overlap_chars` from the window end. If that would not move past the
//!    previous start, jump to the window end instead, so every iteration
//!    makes progress.
//!
//! # Example
//!
//! ```rust
//! use agent_knowledge_core::chunk::{chunk_text, ChunkerConfig};
//!
//! let chunks = chunk_text("Hello world.\n\nSecond paragraph.", "Greeting", &ChunkerConfig::default());
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].chunk_index, 0);
//! assert_eq!(chunks[0].title, "Greeting");
//! ```

use serde::Deserialize;

use crate::models::ChunkDraft;

/// Default maximum fragment size, in characters.
pub const DEFAULT_MAX_CHARS: usize = 800;
/// Default overlap between consecutive fragments, in characters.
pub const DEFAULT_OVERLAP_CHARS: usize = 100;

/// Window sizes for [`chunk_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ChunkerConfig {
    /// Maximum characters per fragment (`M`).
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    /// Characters shared between consecutive fragments (`V`).
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

fn default_max_chars() -> usize {
    DEFAULT_MAX_CHARS
}

fn default_overlap_chars() -> usize {
    DEFAULT_OVERLAP_CHARS
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            overlap_chars: DEFAULT_OVERLAP_CHARS,
        }
    }
}

/// Split `content` into overlapping fragments, each carrying `title`.
///
/// Pure and deterministic: the same `(content, title, config)` always
/// yields the same sequence, which keeps re-indexing idempotent.
///
/// # Guarantees
///
/// - Empty or whitespace-only content yields an empty vector.
/// - Chunk indices are contiguous: `0, 1, 2, …, N-1`.
/// - Every fragment has at most `max_chars` characters.
/// - The loop always terminates, even when `overlap_chars >= max_chars`.
pub fn chunk_text(content: &str, title: &str, config: &ChunkerConfig) -> Vec<ChunkDraft> {
    let text: Vec<char> = content.trim().chars().collect();
    let len = text.len();
    let max_chars = config.max_chars.max(1);

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < len {
        let mut end = (start + max_chars).min(len);

        if end < len {
            end = start + break_point(&text[start..end]);
        }

        let piece: String = text[start..end].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            chunks.push(ChunkDraft {
                title: title.to_string(),
                content: piece.to_string(),
                chunk_index: chunks.len() as i64,
            });
        }

        if end >= len {
            break;
        }

        let next = end.saturating_sub(config.overlap_chars);
        start = if next <= start { end } else { next };
    }

    chunks
}

/// Length of the window prefix to keep: up to the last newline, else the
/// last space, else the whole window.
///
/// A separator at position 0 is ignored since cutting there would leave
/// nothing in the fragment.
fn break_point(window: &[char]) -> usize {
    window
        .iter()
        .rposition(|&c| c == '\n')
        .filter(|&pos| pos > 0)
        .or_else(|| window.iter().rposition(|&c| c == ' ').filter(|&pos| pos > 0))
        .unwrap_or(window.len())
}
