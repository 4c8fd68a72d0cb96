// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Loads a trained checkpoint and answers one sentence at a time:
//
//   normalise → word indexes + EOS → [len, 1] tensor
//   → greedy decoding → drop EOS / PAD → join words
//
// Inference runs on a plain (non-autodiff) backend, where
// dropout layers pass their input through unchanged.

use anyhow::{Context, Result};
use burn::prelude::*;

use crate::data::{batcher::PairBatcher, preprocessor::Preprocessor};
use crate::domain::{
    traits::Responder,
    vocabulary::{Vocabulary, EOS_TOKEN, PAD_TOKEN},
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    greedy::GreedySearchDecoder,
    model::{Seq2Seq, Seq2SeqConfig},
};

pub struct Inferencer<B: Backend> {
    model:        Seq2Seq<B>,
    model_config: Seq2SeqConfig,
    vocabulary:   Vocabulary,
    batcher:      PairBatcher<B>,
    preprocessor: Preprocessor,
    max_length:   usize,
}

impl<B: Backend> Inferencer<B> {
    pub fn new(
        model:        Seq2Seq<B>,
        model_config: Seq2SeqConfig,
        vocabulary:   Vocabulary,
        max_length:   usize,
        device:       B::Device,
    ) -> Self {
        Self {
            model,
            model_config,
            vocabulary,
            batcher: PairBatcher::new(device),
            preprocessor: Preprocessor::new(),
            max_length,
        }
    }

    /// Rebuild the model described by the checkpoint's state file and
    /// load its weights.
    pub fn from_checkpoint(
        ckpt_manager: &CheckpointManager,
        iteration:    usize,
        max_length:   usize,
        device:       B::Device,
    ) -> Result<Self> {
        let state  = ckpt_manager.load_state(iteration)?;
        let record = ckpt_manager.load_model_record::<B>(iteration, &device)?;

        state.model.validate().context("Checkpoint holds an invalid model configuration")?;
        let model = state.model.init::<B>(&device).load_record(record);
        tracing::info!(
            "Model loaded from iteration {} ({})",
            state.iteration,
            state.model.architecture()
        );

        Ok(Self::new(model, state.model, state.vocabulary, max_length, device))
    }

    pub fn model_config(&self) -> &Seq2SeqConfig {
        &self.model_config
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Greedy reply to an already normalised sentence, special tokens removed
    pub fn evaluate(&self, sentence: &str) -> Result<Vec<String>> {
        let indexes = self.vocabulary.indexes_from_sentence(sentence)?;
        let (input, length) = self.batcher.single(&indexes);

        let output = GreedySearchDecoder::new(&self.model).decode(input, length, self.max_length);

        Ok(output
            .tokens
            .iter()
            .filter(|&&t| t != EOS_TOKEN && t != PAD_TOKEN)
            .filter_map(|&t| self.vocabulary.word_of(t))
            .map(str::to_string)
            .collect())
    }
}

impl<B: Backend> Responder for Inferencer<B> {
    fn respond(&self, line: &str) -> Result<String> {
        let sentence = self.preprocessor.normalize(line);
        Ok(self.evaluate(&sentence)?.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ChatbotError;
    use crate::ml::attention::AttentionMethod;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn inferencer() -> Inferencer<TestBackend> {
        let device = Default::default();
        let mut vocabulary = Vocabulary::new("test");
        vocabulary.add_sentence("hello there .");
        let cfg   = Seq2SeqConfig::new(vocabulary.num_words, 8, 1, 1, 0.0, AttentionMethod::Dot);
        let model = cfg.init::<TestBackend>(&device);
        Inferencer::new(model, cfg, vocabulary, 5, device)
    }

    #[test]
    fn test_reply_has_no_special_tokens() {
        let inf   = inferencer();
        let words = inf.evaluate("hello there .").unwrap();
        assert!(words.len() <= 5);
        assert!(words.iter().all(|w| !Vocabulary::is_reserved_word(w)));
    }

    #[test]
    fn test_respond_normalises_input() {
        let inf = inferencer();
        assert!(inf.respond("  Héllo   THERE. ").is_ok());
    }

    #[test]
    fn test_unknown_word_is_reported() {
        let inf = inferencer();
        let err = inf.respond("goodbye").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChatbotError>(),
            Some(ChatbotError::UnknownWord(w)) if w == "goodbye"
        ));
    }
}
