// ============================================================
// Layer 5 — Luong Attention Decoder (one step)
// ============================================================
// The decoder runs one word at a time. Each call:
//
//   1. Embeds the current input word          [1, B] → [B, H]
//   2. Applies embedding dropout (training only)
//   3. Advances a unidirectional n-layer GRU by one step
//   4. Scores the top GRU output against every encoder output
//   5. context = weights · encoder_outputs    (batched matmul)
//   6. concat(gru output, context) → Linear 2H→H → tanh
//   7. Linear H→V → softmax over the vocabulary
//
// Reference: Luong et al. (2015) Effective Approaches to
//            Attention-based Neural Machine Translation, §3

use burn::{
    nn::{Dropout, DropoutConfig, Embedding, Linear, LinearConfig},
    prelude::*,
    tensor::activation::softmax,
};

use crate::ml::{
    attention::{Attention, AttentionConfig, AttentionMethod},
    gru::{GruCell, GruCellConfig},
};

#[derive(Config, Debug)]
pub struct DecoderConfig {
    pub attention:   AttentionMethod,
    pub hidden_size: usize,
    pub output_size: usize,
    #[config(default = 1)]
    pub n_layers: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl DecoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> LuongAttnDecoder<B> {
        let h = self.hidden_size;
        let layer_dropout = if self.n_layers == 1 { 0.0 } else { self.dropout };

        LuongAttnDecoder {
            cells:             (0..self.n_layers).map(|_| GruCellConfig::new(h, h).init(device)).collect(),
            embedding_dropout: DropoutConfig::new(self.dropout).init(),
            layer_dropout:     DropoutConfig::new(layer_dropout).init(),
            attention:         AttentionConfig::new(self.attention, h).init(device),
            concat:            LinearConfig::new(2 * h, h).init(device),
            out:               LinearConfig::new(h, self.output_size).init(device),
            hidden_size:       h,
            n_layers:          self.n_layers,
        }
    }
}

#[derive(Module, Debug)]
pub struct LuongAttnDecoder<B: Backend> {
    pub cells:             Vec<GruCell<B>>,
    pub embedding_dropout: Dropout,
    pub layer_dropout:     Dropout,
    pub attention:         Attention<B>,
    pub concat:            Linear<B>,
    pub out:               Linear<B>,
    pub hidden_size:       usize,
    pub n_layers:          usize,
}

pub struct DecoderOutput<B: Backend> {
    /// Next-word distribution — [batch, vocab_size], rows sum to 1
    pub probs:  Tensor<B, 2>,
    /// Updated GRU state — [n_layers, batch, H]
    pub hidden: Tensor<B, 3>,
}

impl<B: Backend> LuongAttnDecoder<B> {
    /// input_step: [1, batch], last_hidden: [n_layers, batch, H],
    /// encoder_outputs: [T, batch, H]
    pub fn forward(
        &self,
        embedding:       &Embedding<B>,
        input_step:      Tensor<B, 2, Int>,
        last_hidden:     Tensor<B, 3>,
        encoder_outputs: Tensor<B, 3>,
    ) -> DecoderOutput<B> {
        let [_, batch] = input_step.dims();
        let h = self.hidden_size;

        let embedded = embedding.forward(input_step).reshape([batch, h]);
        let mut x = self.embedding_dropout.forward(embedded);

        let mut states = Vec::with_capacity(self.n_layers);
        for (layer, cell) in self.cells.iter().enumerate() {
            if layer > 0 {
                x = self.layer_dropout.forward(x);
            }
            let prev = last_hidden.clone().slice([layer..layer + 1, 0..batch, 0..h]).reshape([batch, h]);
            x = cell.step(x, prev);
            states.push(x.clone());
        }
        let rnn_output = x; // [batch, H]

        // [batch, 1, T] · [batch, T, H] → [batch, 1, H]
        let weights = self.attention.forward(rnn_output.clone().reshape([1, batch, h]), encoder_outputs.clone());
        let context = weights.matmul(encoder_outputs.swap_dims(0, 1)).reshape([batch, h]);

        let concat_output = self.concat.forward(Tensor::cat(vec![rnn_output, context], 1)).tanh();
        let probs = softmax(self.out.forward(concat_output), 1);

        DecoderOutput {
            probs,
            hidden: Tensor::stack::<3>(states, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{backend::NdArray, nn::EmbeddingConfig, tensor::Distribution};

    type TestBackend = NdArray;

    fn step(method: AttentionMethod, n_layers: usize) -> DecoderOutput<TestBackend> {
        let device    = Default::default();
        let embedding = EmbeddingConfig::new(12, 8).init::<TestBackend>(&device);
        let decoder   = DecoderConfig::new(method, 8, 12).with_n_layers(n_layers).init::<TestBackend>(&device);

        let input   = Tensor::<TestBackend, 2, Int>::from_ints([[1, 1, 1]], &device);
        let hidden  = Tensor::<TestBackend, 3>::zeros([n_layers, 3, 8], &device);
        let outputs = Tensor::<TestBackend, 3>::random([4, 3, 8], Distribution::Normal(0.0, 1.0), &device);
        decoder.forward(&embedding, input, hidden, outputs)
    }

    #[test]
    fn test_output_shapes() {
        let out = step(AttentionMethod::Dot, 2);
        assert_eq!(out.probs.dims(), [3, 12]);
        assert_eq!(out.hidden.dims(), [2, 3, 8]);
    }

    #[test]
    fn test_probabilities_sum_to_one_for_every_method() {
        for method in [AttentionMethod::Dot, AttentionMethod::General, AttentionMethod::Concat] {
            let sums: Vec<f32> = step(method, 1).probs.sum_dim(1).into_data().iter::<f32>().collect();
            for s in sums {
                assert!((s - 1.0).abs() < 1e-4, "{method}: row sums to {s}");
            }
        }
    }
}
