// ============================================================
// Layer 5 — Greedy Search Decoder
// ============================================================
// Autoregressive decoding for a single sentence:
//
//   encode once → input = SOS
//   repeat max_length times:
//     probs  = decoder step
//     token  = argmax(probs), score = max(probs)
//     input  = token
//
// Decoding never stops early on EOS; the caller strips EOS and
// PAD from the result before showing it.

use burn::prelude::*;

use crate::ml::model::{start_tokens, Seq2Seq};

/// Chosen token IDs and their probabilities, one per decoding step
#[derive(Debug, Clone, PartialEq)]
pub struct GreedyOutput {
    pub tokens: Vec<u32>,
    pub scores: Vec<f32>,
}

pub struct GreedySearchDecoder<'a, B: Backend> {
    model: &'a Seq2Seq<B>,
}

impl<'a, B: Backend> GreedySearchDecoder<'a, B> {
    pub fn new(model: &'a Seq2Seq<B>) -> Self {
        Self { model }
    }

    /// input: [len, 1] token IDs of one sentence (EOS included)
    pub fn decode(&self, input: Tensor<B, 2, Int>, length: usize, max_length: usize) -> GreedyOutput {
        let device  = input.device();
        let encoded = self.model.encode(input, &[length]);

        let mut hidden = self.model.decoder_initial_hidden(encoded.hidden);
        let mut decoder_input = start_tokens::<B>(1, &device);

        let mut tokens = Vec::with_capacity(max_length);
        let mut scores = Vec::with_capacity(max_length);

        for _ in 0..max_length {
            let out = self.model.decode_step(decoder_input, hidden, encoded.outputs.clone());
            hidden = out.hidden;

            let (score, index) = out.probs.max_dim_with_indices(1);
            let token = index.clone().into_scalar().elem::<i64>();

            tokens.push(token as u32);
            scores.push(score.into_scalar().elem::<f32>());
            decoder_input = index.reshape([1, 1]);
        }

        GreedyOutput { tokens, scores }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vocabulary::{EOS_TOKEN, PAD_TOKEN};
    use crate::ml::{attention::AttentionMethod, model::Seq2SeqConfig};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn decode(max_length: usize) -> GreedyOutput {
        let device = Default::default();
        let model  = Seq2SeqConfig::new(9, 8, 2, 2, 0.0, AttentionMethod::General).init::<TestBackend>(&device);
        let input  = Tensor::<TestBackend, 2, Int>::from_ints([[4], [5], [2]], &device);
        GreedySearchDecoder::new(&model).decode(input, 3, max_length)
    }

    #[test]
    fn test_runs_exactly_max_length_steps() {
        let out = decode(6);
        assert_eq!(out.tokens.len(), 6);
        assert_eq!(out.scores.len(), 6);
        assert!(out.tokens.iter().all(|&t| t < 9));
        assert!(out.scores.iter().all(|&s| s > 0.0 && s <= 1.0));
    }

    #[test]
    fn test_filtering_special_tokens_never_fails() {
        let out = decode(4);
        let words: Vec<u32> = out
            .tokens
            .into_iter()
            .filter(|&t| t != EOS_TOKEN && t != PAD_TOKEN)
            .collect();
        assert!(words.len() <= 4);
    }
}
