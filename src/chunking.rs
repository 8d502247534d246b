//! Word-budget chunking.
//!
//! Text is tokenized on Unicode whitespace and regrouped into chunks of at most `max_words`
//! tokens, re-joined with single spaces. Original spacing and line breaks are not preserved;
//! the token sequence is. Each chunk carries its position so summaries can be matched back to it
//! regardless of completion order.

use serde::Serialize;

/// One word-bounded segment of extracted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextChunk {
    /// Zero-based position of the chunk within the document.
    pub index: usize,
    /// Tokens of the chunk joined by single spaces.
    pub text: String,
    /// Number of tokens in `text`.
    pub word_count: usize,
}

/// Split `text` into ordered chunks holding at most `max_words` tokens each.
///
/// Empty or whitespace-only input yields no chunks. A budget of zero is treated as one.
pub fn chunk_words(text: &str, max_words: usize) -> Vec<TextChunk> {
    let budget = max_words.max(1);
    let words: Vec<&str> = text.split_whitespace().collect();

    words
        .chunks(budget)
        .enumerate()
        .map(|(index, group)| TextChunk {
            index,
            text: group.join(" "),
            word_count: group.len(),
        })
        .collect()
}
