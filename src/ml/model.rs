// ============================================================
// Layer 5 — Seq2Seq Model
// ============================================================
// Ties the pieces together:
//
//   embedding  — one word-vector table, shared by both halves
//   encoder    — bidirectional GRU over the query
//   decoder    — attention GRU that writes the response
//
// The embedding is owned here exactly once and lent to the
// encoder and decoder on every call, so both halves read and
// train the same table.

use burn::{
    nn::{Embedding, EmbeddingConfig},
    prelude::*,
};

use crate::domain::{error::ChatbotError, vocabulary::SOS_TOKEN};
use crate::ml::{
    attention::AttentionMethod,
    decoder::{DecoderConfig, DecoderOutput, LuongAttnDecoder},
    encoder::{EncoderConfig, EncoderOutput, EncoderRnn},
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct Seq2SeqConfig {
    pub vocab_size:       usize,
    pub hidden_size:      usize,
    pub encoder_n_layers: usize,
    pub decoder_n_layers: usize,
    pub dropout:          f64,
    pub attention:        AttentionMethod,
}

impl Seq2SeqConfig {
    pub fn validate(&self) -> Result<(), ChatbotError> {
        let invalid = |msg: String| Err(ChatbotError::InvalidConfig(msg));

        if self.vocab_size == 0 {
            return invalid("vocabulary is empty".to_string());
        }
        if self.hidden_size == 0 {
            return invalid("hidden size must be positive".to_string());
        }
        if self.encoder_n_layers == 0 || self.decoder_n_layers == 0 {
            return invalid("encoder and decoder need at least one layer".to_string());
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return invalid(format!("dropout {} is outside [0, 1)", self.dropout));
        }
        // The decoder starts from the first rows of [layers * 2, B, H]
        if self.decoder_n_layers > 2 * self.encoder_n_layers {
            return invalid(format!(
                "decoder has {} layers but the encoder only provides {} hidden states",
                self.decoder_n_layers,
                2 * self.encoder_n_layers,
            ));
        }
        Ok(())
    }

    /// Everything that decides parameter shapes. Dropout is left out:
    /// a checkpoint can be resumed with a different dropout rate.
    pub fn architecture(&self) -> String {
        format!(
            "vocab={} hidden={} layers={}-{} attention={}",
            self.vocab_size, self.hidden_size, self.encoder_n_layers, self.decoder_n_layers, self.attention,
        )
    }

    /// Fails with `CheckpointMismatch` when `stored` cannot be loaded into `self`
    pub fn check_compatible(&self, stored: &Seq2SeqConfig) -> Result<(), ChatbotError> {
        let expected = self.architecture();
        let found    = stored.architecture();
        if expected != found {
            return Err(ChatbotError::CheckpointMismatch { expected, found });
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Seq2Seq<B> {
        let embedding = EmbeddingConfig::new(self.vocab_size, self.hidden_size).init(device);
        let encoder = EncoderConfig::new(self.hidden_size)
            .with_n_layers(self.encoder_n_layers)
            .with_dropout(self.dropout)
            .init(device);
        let decoder = DecoderConfig::new(self.attention, self.hidden_size, self.vocab_size)
            .with_n_layers(self.decoder_n_layers)
            .with_dropout(self.dropout)
            .init(device);
        Seq2Seq { embedding, encoder, decoder }
    }
}

#[derive(Module, Debug)]
pub struct Seq2Seq<B: Backend> {
    pub embedding: Embedding<B>,
    pub encoder:   EncoderRnn<B>,
    pub decoder:   LuongAttnDecoder<B>,
}

impl<B: Backend> Seq2Seq<B> {
    pub fn device(&self) -> B::Device {
        self.embedding.weight.val().device()
    }

    /// Rejects input that lives on another device than the parameters
    pub fn check_device(&self, device: &B::Device) -> Result<(), ChatbotError> {
        let expected = self.device();
        if &expected != device {
            return Err(ChatbotError::DeviceMismatch {
                expected: format!("{expected:?}"),
                found:    format!("{device:?}"),
            });
        }
        Ok(())
    }

    /// input: [T, batch], lengths non-increasing
    pub fn encode(&self, input: Tensor<B, 2, Int>, lengths: &[usize]) -> EncoderOutput<B> {
        self.encoder.forward(&self.embedding, input, lengths, None)
    }

    /// First `decoder_n_layers` rows of the encoder's final hidden state
    pub fn decoder_initial_hidden(&self, encoder_hidden: Tensor<B, 3>) -> Tensor<B, 3> {
        let [_, batch, h] = encoder_hidden.dims();
        encoder_hidden.slice([0..self.decoder.n_layers, 0..batch, 0..h])
    }

    pub fn decode_step(
        &self,
        input_step:      Tensor<B, 2, Int>,
        hidden:          Tensor<B, 3>,
        encoder_outputs: Tensor<B, 3>,
    ) -> DecoderOutput<B> {
        self.decoder.forward(&self.embedding, input_step, hidden, encoder_outputs)
    }
}

/// The first decoder input: SOS in every column — [1, batch]
pub fn start_tokens<B: Backend>(batch: usize, device: &B::Device) -> Tensor<B, 2, Int> {
    let sos = vec![SOS_TOKEN as i32; batch];
    Tensor::<B, 1, Int>::from_ints(sos.as_slice(), device).reshape([1, batch])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn config() -> Seq2SeqConfig {
        Seq2SeqConfig::new(20, 8, 2, 2, 0.1, AttentionMethod::Dot)
    }

    #[test]
    fn test_default_shape_config_is_valid() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let mut cfg = config();
        cfg.encoder_n_layers = 0;
        assert!(matches!(cfg.validate(), Err(ChatbotError::InvalidConfig(_))));

        let mut cfg = config();
        cfg.dropout = 1.5;
        assert!(matches!(cfg.validate(), Err(ChatbotError::InvalidConfig(_))));

        let mut cfg = config();
        cfg.encoder_n_layers = 1;
        cfg.decoder_n_layers = 3;
        assert!(matches!(cfg.validate(), Err(ChatbotError::InvalidConfig(_))));
    }

    #[test]
    fn test_architecture_mismatch() {
        let mut stored = config();
        stored.dropout = 0.0;
        assert!(config().check_compatible(&stored).is_ok());

        stored.hidden_size = 16;
        assert!(matches!(
            config().check_compatible(&stored),
            Err(ChatbotError::CheckpointMismatch { .. })
        ));
    }

    #[test]
    fn test_decoder_initial_hidden_takes_leading_rows() {
        let device = Default::default();
        let mut cfg = config();
        cfg.decoder_n_layers = 1;
        let model  = cfg.init::<TestBackend>(&device);
        let hidden = Tensor::<TestBackend, 3>::ones([4, 3, 8], &device);
        assert_eq!(model.decoder_initial_hidden(hidden).dims(), [1, 3, 8]);
    }

    #[test]
    fn test_same_device_passes() {
        let device = Default::default();
        let model  = config().init::<TestBackend>(&device);
        assert!(model.check_device(&device).is_ok());
    }
}
