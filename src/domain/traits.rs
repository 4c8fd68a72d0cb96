// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer talks to these traits rather than to
// concrete loaders or models, so the chat loop can be driven by
// a stub in tests and the pair source can be swapped.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::sentence_pair::SentencePair;

// ─── PairSource ───────────────────────────────────────────────────────────────
/// Any component that can produce normalised sentence pairs.
///
/// Implementations:
///   - FormattedPairLoader → reads the tab-separated pair file
pub trait PairSource {
    fn load_pairs(&self) -> Result<Vec<SentencePair>>;
}

// ─── Responder ────────────────────────────────────────────────────────────────
/// Anything that can answer one line of user input.
///
/// Implementations:
///   - Inferencer → greedy decoding with a trained checkpoint
pub trait Responder {
    /// Returns the reply with EOS / PAD tokens already removed.
    /// A `ChatbotError::UnknownWord` error means the turn can be retried.
    fn respond(&self, line: &str) -> Result<String>;
}
