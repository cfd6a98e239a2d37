//! Page chunking.
//!
//! Two interchangeable strategies share the `Chunk` type and its invariants:
//! ids are `"{source_stem}_{seq:03}"` with `seq` sequential across one call,
//! every chunk is non-empty after trimming, and no chunk spans pages.
//!
//! - [`CharWindowChunker`]: character windows cut at the rightmost space,
//!   with a character overlap between consecutive windows.
//! - [`SentenceWindowChunker`]: whole sentences packed under a token budget,
//!   with trailing sentences carried over as overlap.

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Error, Result};
use crate::types::{Chunk, PageText};

/// The next window may be pulled forward to the start of a word when that
/// word begins fewer than `overlap / WORD_BOUNDARY_DIVISOR` characters past
/// the overlap point. Tunable; nothing else depends on the exact value.
pub const WORD_BOUNDARY_DIVISOR: usize = 2;

pub trait Chunker: Send + Sync {
    fn chunk(&self, pages: &[PageText]) -> Vec<Chunk>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStrategy {
    #[default]
    CharWindow,
    SentenceWindow,
}

/// `max_size`/`overlap` are characters for `char_window` and estimated
/// tokens for `sentence_window`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub strategy: ChunkStrategy,
    pub max_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { strategy: ChunkStrategy::CharWindow, max_size: 1000, overlap: 100 }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> { validate_window(self.max_size, self.overlap) }

    pub fn build(&self) -> Result<Box<dyn Chunker>> {
        Ok(match self.strategy {
            ChunkStrategy::CharWindow => Box::new(CharWindowChunker::new(self.max_size, self.overlap)?),
            ChunkStrategy::SentenceWindow => Box::new(SentenceWindowChunker::new(self.max_size, self.overlap)?),
        })
    }
}

/// Chunk with the character-window policy.
pub fn chunk_pages(pages: &[PageText], max_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    Ok(CharWindowChunker::new(max_size, overlap)?.chunk(pages))
}

fn validate_window(max_size: usize, overlap: usize) -> Result<()> {
    if max_size == 0 {
        return Err(Error::InvalidConfig("chunk max_size must be positive".to_string()));
    }
    if overlap >= max_size {
        return Err(Error::InvalidConfig(format!("chunk overlap ({overlap}) must be smaller than max_size ({max_size})")));
    }
    Ok(())
}

/// `"report.v2.pdf"` -> `"report.v2"`; names without a dot are kept whole.
pub fn source_stem(source: &str) -> &str {
    source.rsplit_once('.').map_or(source, |(stem, _)| stem)
}

/// Collects chunks and hands out sequential ids.
#[derive(Default)]
struct ChunkSink {
    chunks: Vec<Chunk>,
}

impl ChunkSink {
    fn push(&mut self, page: &PageText, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let id = format!("{}_{:03}", source_stem(&page.source), self.chunks.len() + 1);
        self.chunks.push(Chunk { id, page: page.page, text: text.to_string() });
    }

    fn finish(self, pages: usize) -> Vec<Chunk> {
        tracing::debug!(pages, chunks = self.chunks.len(), "chunked pages");
        self.chunks
    }
}

#[derive(Debug, Clone)]
pub struct CharWindowChunker {
    max_chars: usize,
    overlap: usize,
}

impl CharWindowChunker {
    pub fn new(max_chars: usize, overlap: usize) -> Result<Self> {
        validate_window(max_chars, overlap)?;
        Ok(Self { max_chars, overlap })
    }

    /// `[start, end)` character windows for a page longer than `max_chars`.
    fn windows(&self, chars: &[char]) -> Vec<(usize, usize)> {
        let len = chars.len();
        let mut out = Vec::new();
        let mut i = 0;
        while i < len {
            let end = rfind_space(chars, i, (i + self.max_chars).min(len)).unwrap_or(i + self.max_chars);
            out.push((i, end.min(len)));
            if end >= len {
                break;
            }
            let mut next = end.saturating_sub(self.overlap);
            if next <= i {
                next = i + 1;
            }
            // Applied whenever the cursor is inside the page, including when it already sits on a space.
            if next > 0 && next < len {
                if let Some(space) = find_space(chars, next) {
                    if space - next < self.overlap / WORD_BOUNDARY_DIVISOR {
                        next = space + 1;
                    }
                }
            }
            i = next;
        }
        out
    }
}

impl Chunker for CharWindowChunker {
    fn chunk(&self, pages: &[PageText]) -> Vec<Chunk> {
        let mut sink = ChunkSink::default();
        for page in pages {
            let chars: Vec<char> = page.text.chars().collect();
            if chars.len() <= self.max_chars {
                sink.push(page, &page.text);
                continue;
            }
            for (start, end) in self.windows(&chars) {
                let window: String = chars[start..end].iter().collect();
                sink.push(page, &window);
            }
        }
        sink.finish(pages.len())
    }
}

fn rfind_space(chars: &[char], from: usize, to: usize) -> Option<usize> {
    chars[from..to].iter().rposition(|&c| c == ' ').map(|p| from + p)
}

fn find_space(chars: &[char], from: usize) -> Option<usize> {
    chars[from..].iter().position(|&c| c == ' ').map(|p| from + p)
}

/// Rough token estimate: one token per 0.75 words.
pub fn estimate_tokens(text: &str) -> usize {
    let words = text.split_whitespace().count();
    if words == 0 { 0 } else { (words * 4 / 3).max(1) }
}

#[derive(Debug, Clone)]
pub struct SentenceWindowChunker {
    max_tokens: usize,
    overlap_tokens: usize,
}

impl SentenceWindowChunker {
    pub fn new(max_tokens: usize, overlap_tokens: usize) -> Result<Self> {
        validate_window(max_tokens, overlap_tokens)?;
        Ok(Self { max_tokens, overlap_tokens })
    }

    /// Sentences of the page, with any sentence over budget pre-split into word windows.
    fn units(&self, text: &str) -> Vec<(String, usize)> {
        let mut units = Vec::new();
        for sentence in text.split_sentence_bounds() {
            let sentence = sentence.trim();
            if sentence.is_empty() {
                continue;
            }
            let tokens = estimate_tokens(sentence);
            if tokens <= self.max_tokens {
                units.push((sentence.to_string(), tokens));
            } else {
                for piece in self.split_words(sentence) {
                    let tokens = estimate_tokens(&piece);
                    units.push((piece, tokens));
                }
            }
        }
        units
    }

    fn split_words(&self, sentence: &str) -> Vec<String> {
        let words: Vec<&str> = sentence.split_whitespace().collect();
        let per_window = (self.max_tokens * 3 / 4).max(1);
        let overlap_words = (self.overlap_tokens * 3 / 4).min(per_window - 1);
        let mut pieces = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + per_window).min(words.len());
            pieces.push(words[start..end].join(" "));
            if end >= words.len() {
                break;
            }
            start = end - overlap_words;
        }
        pieces
    }

    fn pack(&self, units: &[(String, usize)]) -> Vec<String> {
        let mut out = Vec::new();
        let mut start = 0;
        while start < units.len() {
            let mut end = start;
            let mut total = 0;
            while end < units.len() && (end == start || total + units[end].1 <= self.max_tokens) {
                total += units[end].1;
                end += 1;
            }
            out.push(units[start..end].iter().map(|(s, _)| s.as_str()).collect::<Vec<_>>().join(" "));
            if end >= units.len() {
                break;
            }
            // carry trailing sentences, but always advance by at least one unit
            let mut next = end;
            let mut carried = 0;
            while next > start + 1 && carried + units[next - 1].1 <= self.overlap_tokens {
                carried += units[next - 1].1;
                next -= 1;
            }
            // the next chunk must still have room for the first new unit
            while next < end && carried + units[end].1 > self.max_tokens {
                carried -= units[next].1;
                next += 1;
            }
            start = next;
        }
        out
    }
}

impl Chunker for SentenceWindowChunker {
    fn chunk(&self, pages: &[PageText]) -> Vec<Chunk> {
        let mut sink = ChunkSink::default();
        for page in pages {
            for piece in self.pack(&self.units(&page.text)) {
                sink.push(page, &piece);
            }
        }
        sink.finish(pages.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(page: u32, text: &str) -> PageText { PageText::new(page, text, "test.pdf") }

    fn sample_pages() -> Vec<PageText> {
        vec![
            page(1, "This is a short text that should fit in one chunk."),
            page(2, "This is a much longer text that will need to be split into multiple chunks because it exceeds the maximum character limit that we set for testing purposes. This text continues on and on with more content to ensure we test the chunking behavior properly."),
            page(3, "Another page with moderate length content that might be chunked."),
        ]
    }

    #[test]
    fn short_text_is_single_verbatim_chunk() {
        let chunks = chunk_pages(&sample_pages()[..1], 100, 20).expect("chunk");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "test_001");
        assert_eq!(chunks[0].page, 1);
        assert_eq!(chunks[0].text, "This is a short text that should fit in one chunk.");
    }

    #[test]
    fn long_text_splits_on_same_page() {
        let chunks = chunk_pages(&sample_pages()[1..2], 100, 20).expect("chunk");
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.page == 2));
        assert_eq!(chunks[0].id, "test_001");
        assert_eq!(chunks[1].id, "test_002");
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 100));
    }

    #[test]
    fn ids_are_sequential_across_pages() {
        let pages = sample_pages();
        let chunks = chunk_pages(&pages, 50, 10).expect("chunk");
        assert!(chunks.len() > pages.len());
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.id, format!("test_{:03}", i + 1));
        }
        for p in 1..=3 {
            assert!(chunks.iter().any(|c| c.page == p), "page {p} is represented");
        }
    }

    #[test]
    fn empty_input_and_empty_pages_yield_nothing() {
        assert!(chunk_pages(&[], 100, 20).expect("chunk").is_empty());
        let chunks = chunk_pages(&[page(1, ""), page(2, "   "), page(3, "kept")], 100, 20).expect("chunk");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "test_001");
        assert_eq!(chunks[0].page, 3);
    }

    #[test]
    fn source_extension_is_stripped_from_id() {
        let chunks = chunk_pages(&[PageText::new(1, "Test text", "document.pdf")], 100, 20).expect("chunk");
        assert_eq!(chunks[0].id, "document_001");
        assert_eq!(source_stem("archive.tar.gz"), "archive.tar");
        assert_eq!(source_stem("README"), "README");
    }

    #[test]
    fn word_boundaries_are_preserved() {
        let text = "The quick brown fox jumps over the lazy dog again and again";
        let chunks = chunk_pages(&[page(1, text)], 20, 5).expect("chunk");
        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].text, "The quick brown fox");
        let single_letters = chunks.iter().filter(|c| c.text.chars().count() == 1 && c.text.chars().all(char::is_alphabetic)).count();
        assert!(single_letters <= 2, "stray letters: {chunks:?}");
    }

    #[test]
    fn first_window_ends_on_a_word() {
        let chunks = chunk_pages(&[page(1, "word1 word2 word3 word4")], 12, 3).expect("chunk");
        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].text, "word1 word2");
    }

    #[test]
    fn space_free_text_falls_back_to_hard_cuts() {
        let text = "abcdefghijklmnopqrstuvwxyz";
        let chunks = chunk_pages(&[page(1, text)], 10, 3).expect("chunk");
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].text, "abcdefghij");
        assert_eq!(chunks[1].text, "hijklmnopq");
        let total: usize = chunks.iter().map(|c| c.text.len()).sum();
        assert!(total >= text.len() - 3);
        assert!(chunks.last().is_some_and(|c| c.text.ends_with('z')));
    }

    #[test]
    fn large_overlap_still_terminates() {
        let text = "ab cd ef gh ij kl mn op qr st uv wx yz";
        let chunks = chunk_pages(&[page(1, text)], 6, 5).expect("chunk");
        assert!(!chunks.is_empty());
        assert!(chunks.last().is_some_and(|c| c.text.ends_with("yz")));
    }

    #[test]
    fn windows_cover_every_non_space_character() {
        let text = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do eiusmod tempor incididunt ut labore et dolore magna aliqua.";
        let chars: Vec<char> = text.chars().collect();
        for (max, overlap) in [(16, 0), (16, 4), (25, 10), (9, 8)] {
            let chunker = CharWindowChunker::new(max, overlap).expect("chunker");
            let mut covered = vec![false; chars.len()];
            for (s, e) in chunker.windows(&chars) {
                covered[s..e].iter_mut().for_each(|c| *c = true);
            }
            for (i, c) in chars.iter().enumerate() {
                assert!(covered[i] || c.is_whitespace(), "char {i} dropped for max={max} overlap={overlap}");
            }
        }
    }

    #[test]
    fn multibyte_text_is_cut_on_characters() {
        let text = "äöü ßéè ñçå øæœ ÿ€£ ¥©® ±µ¶";
        let chunks = chunk_pages(&[page(1, text)], 8, 2).expect("chunk");
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 8));
    }

    #[test]
    fn invalid_windows_are_rejected() {
        assert!(matches!(CharWindowChunker::new(0, 0), Err(Error::InvalidConfig(_))));
        assert!(matches!(CharWindowChunker::new(10, 10), Err(Error::InvalidConfig(_))));
        assert!(matches!(SentenceWindowChunker::new(5, 7), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn sentence_windows_pack_whole_sentences_with_overlap() {
        let text = "Alpha beta gamma. Delta epsilon zeta. Eta theta iota. Kappa lambda mu. Nu xi omicron.";
        let chunker = SentenceWindowChunker::new(8, 4).expect("chunker");
        let chunks = chunker.chunk(&[page(4, text)]);
        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].text, "Alpha beta gamma. Delta epsilon zeta.");
        assert!(chunks[1].text.starts_with("Delta epsilon zeta."), "second chunk carries the overlap sentence");
        assert!(chunks.iter().all(|c| estimate_tokens(&c.text) <= 8));
        assert!(chunks.iter().all(|c| c.page == 4));
        assert!(chunks.last().is_some_and(|c| c.text.ends_with("Nu xi omicron.")));
    }

    #[test]
    fn carried_overlap_never_forms_a_chunk_alone() {
        // estimated tokens per sentence: 4, 2, 5
        let text = "One two three. Four five. Six seven eight nine.";
        let chunker = SentenceWindowChunker::new(6, 3).expect("chunker");
        let chunks = chunker.chunk(&[page(1, text)]);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["One two three. Four five.", "Six seven eight nine."]);
        assert_eq!(chunks[1].id, "test_002");
    }

    #[test]
    fn oversized_sentence_is_split_by_words() {
        let text = "one two three four five six seven eight nine ten eleven twelve thirteen fourteen";
        let chunker = SentenceWindowChunker::new(4, 1).expect("chunker");
        let chunks = chunker.chunk(&[page(1, text)]);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| estimate_tokens(&c.text) <= 4));
        assert!(chunks.last().is_some_and(|c| c.text.ends_with("fourteen")));
    }

    #[test]
    fn config_selects_strategy() {
        let cfg = ChunkingConfig { strategy: ChunkStrategy::SentenceWindow, max_size: 8, overlap: 0 };
        let chunks = cfg.build().expect("build").chunk(&[page(1, "First one here. Second one here. Third.")]);
        assert_eq!(chunks[0].text, "First one here. Second one here.");
        assert!(ChunkingConfig { overlap: 1000, ..ChunkingConfig::default() }.validate().is_err());
    }
}
