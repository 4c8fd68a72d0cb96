// ============================================================
// Layer 3 — Vocabulary
// ============================================================
// Bidirectional word ↔ index mapping plus per-word counts.
//
// Indices 0, 1 and 2 are reserved and never reassigned:
//   PAD = 0  padding for short sentences in a batch
//   SOS = 1  first decoder input
//   EOS = 2  appended to every tokenised sentence
//
// Words get consecutive indices in the order they are first
// seen. trim() rebuilds the mapping keeping only frequent words,
// again in first-seen order, so indices stay deterministic.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::error::ChatbotError;

pub const PAD_TOKEN: u32 = 0;
pub const SOS_TOKEN: u32 = 1;
pub const EOS_TOKEN: u32 = 2;

const RESERVED: [(u32, &str); 3] = [(PAD_TOKEN, "PAD"), (SOS_TOKEN, "SOS"), (EOS_TOKEN, "EOS")];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub name:       String,
    pub trimmed:    bool,
    pub word2index: HashMap<String, u32>,
    pub word2count: HashMap<String, usize>,
    pub index2word: HashMap<u32, String>,
    /// Size of the vocabulary including the three reserved tokens
    pub num_words:  usize,
}

impl Vocabulary {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name:       name.into(),
            trimmed:    false,
            word2index: HashMap::new(),
            word2count: HashMap::new(),
            index2word: reserved_index2word(),
            num_words:  RESERVED.len(),
        }
    }

    pub fn add_sentence(&mut self, sentence: &str) {
        for word in sentence.split(' ') {
            self.add_word(word);
        }
    }

    pub fn add_word(&mut self, word: &str) {
        match self.word2count.get_mut(word) {
            Some(count) => *count += 1,
            None => {
                let index = self.num_words as u32;
                self.word2index.insert(word.to_string(), index);
                self.word2count.insert(word.to_string(), 1);
                self.index2word.insert(index, word.to_string());
                self.num_words += 1;
            }
        }
    }

    /// Remove words seen fewer than `min_count` times.
    ///
    /// Only the first call has an effect. Counts of kept words are reset
    /// to 1, the same as re-adding each kept word once.
    pub fn trim(&mut self, min_count: usize) {
        if self.trimmed {
            return;
        }
        self.trimmed = true;

        let keep_words: Vec<String> = (RESERVED.len() as u32..self.num_words as u32)
            .filter_map(|index| self.index2word.get(&index))
            .filter(|word| self.word2count.get(*word).copied().unwrap_or(0) >= min_count)
            .cloned()
            .collect();

        tracing::info!(
            "keep_words {} / {} = {:.4}",
            keep_words.len(),
            self.word2index.len(),
            keep_words.len() as f64 / self.word2index.len().max(1) as f64,
        );

        self.word2index.clear();
        self.word2count.clear();
        self.index2word = reserved_index2word();
        self.num_words  = RESERVED.len();
        for word in &keep_words {
            self.add_word(word);
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.word2index.contains_key(word)
    }

    pub fn index_of(&self, word: &str) -> Result<u32, ChatbotError> {
        self.word2index
            .get(word)
            .copied()
            .ok_or_else(|| ChatbotError::UnknownWord(word.to_string()))
    }

    /// Tokenise a normalised sentence and append EOS.
    pub fn indexes_from_sentence(&self, sentence: &str) -> Result<Vec<u32>, ChatbotError> {
        let mut indexes = sentence
            .split(' ')
            .map(|word| self.index_of(word))
            .collect::<Result<Vec<u32>, _>>()?;
        indexes.push(EOS_TOKEN);
        Ok(indexes)
    }

    pub fn word_of(&self, index: u32) -> Option<&str> {
        self.index2word.get(&index).map(String::as_str)
    }

    pub fn is_reserved_word(word: &str) -> bool {
        RESERVED.iter().any(|(_, reserved)| *reserved == word)
    }
}

fn reserved_index2word() -> HashMap<u32, String> {
    RESERVED
        .iter()
        .map(|(index, word)| (*index, word.to_string()))
        .collect()
}
