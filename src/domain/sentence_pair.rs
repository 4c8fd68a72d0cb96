// ============================================================
// Layer 3 — SentencePair Domain Type
// ============================================================
// One conversational exchange: a query line and the line that
// answered it. Both sides are already normalised (lowercase,
// ASCII, punctuation spaced) by the time a pair is built.

use serde::{Deserialize, Serialize};

/// A (query, response) pair of normalised sentences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentencePair {
    /// The line the model reads
    pub query: String,

    /// The line the model learns to produce
    pub response: String,
}

impl SentencePair {
    pub fn new(query: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            query:    query.into(),
            response: response.into(),
        }
    }

    /// Words in the query, split on single spaces like the vocabulary does
    pub fn query_words(&self) -> impl Iterator<Item = &str> {
        self.query.split(' ')
    }

    pub fn response_words(&self) -> impl Iterator<Item = &str> {
        self.response.split(' ')
    }

    /// True when both sides have strictly fewer than `max_length` words.
    /// One slot is left free for the EOS token appended at batching time.
    pub fn fits(&self, max_length: usize) -> bool {
        self.query_words().count() < max_length && self.response_words().count() < max_length
    }
}
