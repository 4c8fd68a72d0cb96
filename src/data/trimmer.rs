// ============================================================
// Layer 4 — Pair Filtering and Rare-Word Trimming
// ============================================================
// Shrinks the problem before training:
//
//   1. filter_pairs     drop pairs where either side has
//                       max_length words or more
//   2. build_vocabulary count every word of the kept pairs
//   3. trim_rare_words  drop words seen fewer than min_count
//                       times, then drop every pair that still
//                       mentions one of them
//
// After step 3 every word of every remaining pair is in the
// vocabulary, which is what the batcher relies on.
//
// Reference: Rust Book §13 (Iterators and Closures)

use crate::domain::{sentence_pair::SentencePair, vocabulary::Vocabulary};

/// Keep pairs whose query and response both have fewer than `max_length` words
pub fn filter_pairs(pairs: Vec<SentencePair>, max_length: usize) -> Vec<SentencePair> {
    let before = pairs.len();
    let kept: Vec<SentencePair> = pairs.into_iter().filter(|p| p.fits(max_length)).collect();
    tracing::info!("Trimmed to {} sentence pairs (from {})", kept.len(), before);
    kept
}

/// Count every word of every pair into a fresh vocabulary
pub fn build_vocabulary(name: &str, pairs: &[SentencePair]) -> Vocabulary {
    let mut voc = Vocabulary::new(name);
    for pair in pairs {
        voc.add_sentence(&pair.query);
        voc.add_sentence(&pair.response);
    }
    tracing::info!("Counted words: {}", voc.num_words);
    voc
}

/// Trim the vocabulary and keep only pairs made entirely of surviving words
pub fn trim_rare_words(
    voc:       &mut Vocabulary,
    pairs:     Vec<SentencePair>,
    min_count: usize,
) -> Vec<SentencePair> {
    voc.trim(min_count);

    let before = pairs.len();
    let keep: Vec<SentencePair> = pairs
        .into_iter()
        .filter(|pair| {
            pair.query_words().all(|w| voc.contains(w))
                && pair.response_words().all(|w| voc.contains(w))
        })
        .collect();

    tracing::info!(
        "Trimmed from {} pairs to {}, {:.4} of total",
        before,
        keep.len(),
        keep.len() as f64 / before.max(1) as f64,
    );
    keep
}
