//! Prompt-context assembly for the answer generation path.
//!
//! Retrieved passages are rendered one after another, in the order the retriever
//! ranked them, each with a fixed header naming its source and confidence:
//!
//! ```text
//! [1] source: manual.pdf | confidence: 100.0%
//! <passage text>
//!
//! [2] source: faq.md | confidence: 42.5%
//! <passage text>
//! ```
//!
//! This block only ever feeds a generator. The case similarity path shows results
//! directly and never goes through here.

use serde::{Deserialize, Serialize};

/// Returned to the user when the answer is not grounded in retrieved context.
pub const NOT_FOUND_SENTINEL: &str = "Not found in documents";

/// One retrieved passage, reduced to the fields the prompt needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub source: String,
    pub text: String,
    /// Per-query confidence in `[0, 100]`.
    pub confidence: f32,
}

impl Passage {
    pub fn new(source: impl Into<String>, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
            confidence,
        }
    }
}

/// Concatenate passages into one prompt-ready block, preserving their order.
///
/// Passages with blank text are skipped; numbering stays dense over the ones kept.
/// An empty input yields an empty string.
pub fn format_context(passages: &[Passage]) -> String {
    passages
        .iter()
        .filter(|p| !p.text.trim().is_empty())
        .enumerate()
        .map(|(i, p)| {
            format!(
                "[{}] source: {} | confidence: {:.1}%\n{}",
                i + 1,
                p.source,
                p.confidence,
                p.text.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Wrap a formatted context block and a question into the grounded-answer prompt.
pub fn build_answer_prompt(context: &str, question: &str) -> String {
    format!(
        "Answer ONLY using the context below.\n\
         If the answer is not in the context, say: \"{NOT_FOUND_SENTINEL}\".\n\n\
         Context:\n{context}\n\n\
         Question:\n{}\n\n\
         Answer:",
        question.trim()
    )
}
