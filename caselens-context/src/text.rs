//! Word-count chunking of extracted document text.
//!
//! A document's text is split on Unicode whitespace into words, and the word
//! sequence is cut into consecutive windows of `chunk_size` words. Windows never
//! overlap and never cross a document boundary, since one call handles one
//! document. A window is kept only when it holds strictly more than `min_words`
//! words; short windows (in practice only the trailing remainder) carry no
//! retrievable signal and are dropped.
//!
//! ```
//! use caselens_context::text::WordChunker;
//!
//! let chunker = WordChunker::new(500, 20);
//! let text = vec!["word"; 1021].join(" ");
//!
//! let chunks = chunker.chunk("doc1.pdf", &text);
//! assert_eq!(chunks.len(), 3);
//! assert_eq!(chunks[2].word_count, 21);
//! ```
//!
//! Chunk text is re-joined with single spaces, so original line breaks and runs of
//! whitespace are not preserved.

use serde::{Deserialize, Serialize};

/// Default chunk size in words.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Default noise threshold. Chunks need strictly more words than this.
pub const DEFAULT_MIN_WORDS: usize = 20;

/// A contiguous slice of one document's word sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Identifier of the source document.
    pub source: String,
    /// Position of this chunk among the document's kept chunks (0-indexed).
    pub sequence: usize,
    /// Index of the first word of this chunk within the document.
    pub word_offset: usize,
    /// Number of words in this chunk.
    pub word_count: usize,
    /// Chunk words joined by single spaces.
    pub text: String,
}

/// Splits text into fixed-size word windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordChunker {
    chunk_size: usize,
    min_words: usize,
}

impl Default for WordChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_MIN_WORDS)
    }
}

impl WordChunker {
    /// Create a chunker. A `chunk_size` of zero is treated as one word.
    pub fn new(chunk_size: usize, min_words: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            min_words,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn min_words(&self) -> usize {
        self.min_words
    }

    /// Chunk one document. Order of the returned chunks follows the text.
    pub fn chunk(&self, source: &str, text: &str) -> Vec<TextChunk> {
        let words: Vec<&str> = text.split_whitespace().collect();

        words
            .chunks(self.chunk_size)
            .enumerate()
            .filter(|(_, window)| window.len() > self.min_words)
            .enumerate()
            .map(|(sequence, (window_index, window))| TextChunk {
                source: source.to_string(),
                sequence,
                word_offset: window_index * self.chunk_size,
                word_count: window.len(),
                text: window.join(" "),
            })
            .collect()
    }

    /// Single chunk holding the whole text, bypassing the size and noise rules.
    ///
    /// Used for tabular case rows, which are embedded as one unit however short.
    /// Blank text still yields no chunk.
    pub fn whole(&self, source: &str, text: &str) -> Vec<TextChunk> {
        let word_count = text.split_whitespace().count();
        if word_count == 0 {
            return Vec::new();
        }
        vec![TextChunk {
            source: source.to_string(),
            sequence: 0,
            word_offset: 0,
            word_count,
            text: text.trim().to_string(),
        }]
    }
}
