// ============================================================
// Layer 4 — Text Preprocessor
// ============================================================
// Normalises a raw movie line (or a line typed into the chat
// loop) into the form the vocabulary is built from.
//
// Normalisation steps (applied in order):
//   1. Lowercase and trim
//   2. Fold to ASCII: NFD-decompose and drop combining marks
//      ("café" → "cafe")
//   3. Put a space in front of . ! ?   ("hi!" → "hi !")
//   4. Replace every run of characters outside [a-zA-Z.!?]
//      with a single space
//   5. Collapse whitespace and trim
//
// Training pairs and chat input MUST go through the same
// function, otherwise lookups in the vocabulary will miss.
//
// Reference: Rust Book §8 (Strings in Rust)
//            unicode-normalization crate documentation

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Normalise one sentence. Takes a &str and returns an owned String.
    pub fn normalize(&self, text: &str) -> String {
        // ── Steps 1 + 2: lowercase, trim, strip accents ──────────────────────
        let folded: String = text
            .trim()
            .to_lowercase()
            .nfd()
            .filter(|c| !is_combining_mark(*c))
            .collect();

        // ── Steps 3 + 4: space out punctuation, blank everything else ────────
        let mut spaced = String::with_capacity(folded.len() + 8);
        for c in folded.chars() {
            match c {
                '.' | '!' | '?' => {
                    spaced.push(' ');
                    spaced.push(c);
                }
                c if c.is_ascii_alphabetic() => spaced.push(c),
                _ => spaced.push(' '),
            }
        }

        // ── Step 5: collapse whitespace ──────────────────────────────────────
        spaced.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}
