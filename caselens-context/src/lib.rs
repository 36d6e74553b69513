//! Text shaping for the caselens retrieval core.
//!
//! - [`text`]: split extracted document text into fixed-size word chunks
//! - [`prompt`]: render retrieved passages into a prompt-ready context block

pub mod prompt;
pub mod text;

pub use prompt::{NOT_FOUND_SENTINEL, Passage, build_answer_prompt, format_context};
pub use text::{DEFAULT_CHUNK_SIZE, DEFAULT_MIN_WORDS, TextChunk, WordChunker};
