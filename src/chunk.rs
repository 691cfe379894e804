//! Fixed-size overlapping text chunker.
//!
//! Splits extracted page texts into spans of at most `max_chars` characters,
//! carrying `overlap_chars` characters between consecutive spans so context
//! at span boundaries is not lost. Spans never cross pages, so every chunk
//! cites exactly one source page.
//!
//! Deterministic: identical input always yields identical span boundaries.

use crate::config::ChunkingConfig;
use crate::models::Chunk;

/// Split a document's page texts into chunks. `chunk_index` is contiguous
/// from 0 across the whole document; pages that are empty after trimming
/// produce no chunks.
pub fn chunk_pages(filename: &str, pages: &[String], cfg: &ChunkingConfig) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut ordinal: i64 = 0;

    for (page_idx, page) in pages.iter().enumerate() {
        let text = page.trim();
        if text.is_empty() {
            continue;
        }

        for span in split_spans(text, cfg.max_chars, cfg.overlap_chars) {
            chunks.push(Chunk {
                filename: filename.to_string(),
                page: (page_idx + 1) as i64,
                chunk_index: ordinal,
                text: span,
            });
            ordinal += 1;
        }
    }

    chunks
}

/// Sliding character window over one page's text. Boundaries always fall on
/// char boundaries, never inside a multi-byte sequence. Requires
/// `overlap < max_chars` (enforced by config validation).
fn split_spans(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    // Byte offset of every char boundary, plus the end of the string.
    let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    boundaries.push(text.len());
    let total_chars = boundaries.len() - 1;

    if total_chars <= max_chars {
        return vec![text.to_string()];
    }

    let mut spans = Vec::new();
    let mut start = 0usize;

    loop {
        let end = (start + max_chars).min(total_chars);
        spans.push(text[boundaries[start]..boundaries[end]].to_string());
        if end == total_chars {
            break;
        }
        start = end - overlap;
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(max_chars: usize, overlap_chars: usize) -> ChunkingConfig {
        ChunkingConfig {
            max_chars,
            overlap_chars,
        }
    }

    #[test]
    fn short_page_single_chunk() {
        let pages = vec!["Hello, world!".to_string()];
        let chunks = chunk_pages("a.pdf", &pages, &cfg(1000, 200));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello, world!");
        assert_eq!(chunks[0].page, 1);
        assert_eq!(chunks[0].chunk_index, 0);
    }

    #[test]
    fn empty_pages_produce_no_chunks() {
        let pages = vec![
            "".to_string(),
            "   \n ".to_string(),
            "content".to_string(),
        ];
        let chunks = chunk_pages("a.pdf", &pages, &cfg(1000, 200));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].page, 3);
    }

    #[test]
    fn long_page_splits_with_overlap() {
        let text: String = "abcdefghij".repeat(5); // 50 chars
        let chunks = chunk_pages("a.pdf", &[text.clone()], &cfg(20, 5));
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.text.chars().count() <= 20);
        }
        // Each span starts with the last 5 chars of the previous one.
        for pair in chunks.windows(2) {
            let prev_tail: String = pair[0]
                .text
                .chars()
                .rev()
                .take(5)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            assert!(pair[1].text.starts_with(&prev_tail));
        }
    }

    #[test]
    fn ordinals_contiguous_across_pages() {
        let pages = vec!["x".repeat(45), "y".repeat(45)];
        let chunks = chunk_pages("a.pdf", &pages, &cfg(20, 5));
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i64);
        }
        assert!(chunks.iter().any(|c| c.page == 1));
        assert!(chunks.iter().any(|c| c.page == 2));
    }

    #[test]
    fn spans_never_cross_pages() {
        let pages = vec!["a".repeat(30), "b".repeat(30)];
        let chunks = chunk_pages("a.pdf", &pages, &cfg(25, 5));
        for c in &chunks {
            let distinct: std::collections::HashSet<char> = c.text.chars().collect();
            assert_eq!(distinct.len(), 1);
        }
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let text = "héllo wörld ünïcode ".repeat(10);
        let chunks = chunk_pages("a.pdf", &[text], &cfg(16, 4));
        for c in &chunks {
            // Slicing inside a multi-byte char would have panicked already;
            // also check the window size held in chars, not bytes.
            assert!(c.text.chars().count() <= 16);
        }
    }

    #[test]
    fn deterministic() {
        let pages = vec!["Alpha beta gamma delta. ".repeat(20), "Second page.".to_string()];
        let c1 = chunk_pages("a.pdf", &pages, &cfg(50, 10));
        let c2 = chunk_pages("a.pdf", &pages, &cfg(50, 10));
        assert_eq!(c1, c2);
    }
}
