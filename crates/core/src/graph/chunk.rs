//! Overlapping text chunking for semantic search (`spec.md` §4.10 and
//! §9 open question 2).
//!
//! Unlike the original implementation — which computes chunk boundaries
//! but still embeds the whole note — chunks here are first-class: each
//! one is embedded and persisted as its own vector-store record keyed
//! `<node_id>_chunk_<i>`, carrying `(chunk_index, total_chunks)` metadata.
//! A note short enough to fit in one chunk is still "chunked" (a single
//! chunk covering the whole body), keeping the vector store's per-id
//! bookkeeping uniform.

/// One piece of a note's body, with its position among its siblings.
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub text: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// Split `text` into overlapping chunks of at most `chunk_size` characters,
/// preferring to break on sentence boundaries (`. `, `! `, `? `, newline)
/// near the target size rather than mid-word.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<TextChunk> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= chunk_size {
        return vec![TextChunk {
            text: text.to_string(),
            chunk_index: 0,
            total_chunks: 1,
        }];
    }

    let overlap = overlap.min(chunk_size.saturating_sub(1));
    let mut pieces = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let hard_end = (start + chunk_size).min(chars.len());
        let end = if hard_end == chars.len() {
            hard_end
        } else {
            find_sentence_boundary(&chars, start, hard_end).unwrap_or(hard_end)
        };

        let piece: String = chars[start..end].iter().collect();
        pieces.push(piece);

        if end >= chars.len() {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }

    let total = pieces.len();
    pieces
        .into_iter()
        .enumerate()
        .map(|(i, text)| TextChunk {
            text,
            chunk_index: i,
            total_chunks: total,
        })
        .collect()
}

/// Look backwards from `hard_end` (but not before `start + hard_end/2`) for
/// a sentence-ending punctuation mark followed by whitespace, or a newline.
fn find_sentence_boundary(chars: &[char], start: usize, hard_end: usize) -> Option<usize> {
    let floor = start + (hard_end - start) / 2;
    for i in (floor..hard_end).rev() {
        if chars[i] == '\n' {
            return Some(i + 1);
        }
        if i + 1 < hard_end && matches!(chars[i], '.' | '!' | '?') && chars[i + 1] == ' ' {
            return Some(i + 2);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = chunk_text("short body", 500, 50);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].total_chunks, 1);
    }

    #[test]
    fn long_text_splits_into_multiple_overlapping_chunks() {
        let body = "word ".repeat(300);
        let chunks = chunk_text(&body, 500, 50);
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i);
            assert_eq!(chunk.total_chunks, chunks.len());
        }
    }

    #[test]
    fn prefers_sentence_boundary_when_available() {
        let body = format!("{} More after.", "a".repeat(490));
        let chunks = chunk_text(&body, 500, 50);
        assert!(chunks[0].text.ends_with(". ") || chunks[0].text.len() <= 500);
    }
}
