use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::domain::{error::ChatbotError, sentence_pair::SentencePair, vocabulary::Vocabulary};

/// One tokenised training pair. Both sequences end with EOS and are unpadded;
/// padding happens per batch in `PairBatcher`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedPair {
    pub query:    Vec<u32>,
    pub response: Vec<u32>,
}

impl EncodedPair {
    /// Tokenise both sides. A word missing from the vocabulary means the
    /// trimming step was skipped or used another vocabulary.
    pub fn encode(voc: &Vocabulary, pair: &SentencePair) -> Result<Self, ChatbotError> {
        Ok(Self {
            query:    voc.indexes_from_sentence(&pair.query)?,
            response: voc.indexes_from_sentence(&pair.response)?,
        })
    }
}

pub struct PairDataset {
    pairs: Vec<EncodedPair>,
}

impl PairDataset {
    pub fn new(pairs: Vec<EncodedPair>) -> Self { Self { pairs } }

    pub fn from_sentences(voc: &Vocabulary, pairs: &[SentencePair]) -> Result<Self, ChatbotError> {
        let encoded = pairs
            .iter()
            .map(|pair| EncodedPair::encode(voc, pair))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(encoded))
    }
}

impl Dataset<EncodedPair> for PairDataset {
    fn get(&self, index: usize) -> Option<EncodedPair> {
        self.pairs.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.pairs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vocabulary::EOS_TOKEN;

    #[test]
    fn test_from_sentences_encodes_with_eos() {
        let mut voc = Vocabulary::new("t");
        voc.add_sentence("hello");
        voc.add_sentence("hi there");

        let dataset = PairDataset::from_sentences(&voc, &[SentencePair::new("hello", "hi there")]).unwrap();
        assert_eq!(dataset.len(), 1);
        let item = dataset.get(0).unwrap();
        assert_eq!(item.query, vec![3, EOS_TOKEN]);
        assert_eq!(item.response, vec![4, 5, EOS_TOKEN]);
    }

    #[test]
    fn test_unknown_word_is_a_precondition_error() {
        let voc = Vocabulary::new("t");
        let result = PairDataset::from_sentences(&voc, &[SentencePair::new("hello", "hi")]);
        assert!(matches!(result, Err(ChatbotError::UnknownWord(_))));
    }
}
