// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits that describe what the
// chatbot works with: sentence pairs, the vocabulary that maps
// words to indices, and the errors callers need to tell apart.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A normalised (query, response) utterance pair
pub mod sentence_pair;

// Word ↔ index mapping with reserved PAD / SOS / EOS tokens
pub mod vocabulary;

// Errors that must be distinguishable by callers
pub mod error;

// Core abstractions (traits) that other layers implement
pub mod traits;
