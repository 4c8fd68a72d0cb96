// ============================================================
// Layer 5 — Bidirectional GRU Encoder
// ============================================================
// Reads the whole (padded, length-sorted) query batch and
// produces one feature vector per timestep plus the final
// hidden state of every layer and direction.
//
// Computation:
//   1. Embed token IDs with the shared embedding table
//   2. For each layer, run a forward GRU over t = 0..T and a
//      backward GRU over t = T-1..0. Columns past their true
//      length are masked: their state is frozen and their output
//      is zero, exactly what pack/unpack of a padded batch gives.
//   3. Layer l+1 reads [forward ; backward] outputs of layer l
//      (2H features), with dropout in between while training.
//   4. The top layer's two directions are summed → H features.
//
// Final hidden layout is layer-major:
//   [l0 forward, l0 backward, l1 forward, l1 backward, ...]
//
// Reference: Cho et al. (2014) GRU
//            Schuster & Paliwal (1997) bidirectional RNNs

use burn::{
    nn::{Dropout, DropoutConfig, Embedding},
    prelude::*,
};

use crate::ml::gru::{GruCell, GruCellConfig};

#[derive(Config, Debug)]
pub struct EncoderConfig {
    pub hidden_size: usize,
    #[config(default = 1)]
    pub n_layers: usize,
    #[config(default = 0.0)]
    pub dropout: f64,
}

impl EncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> EncoderRnn<B> {
        let h = self.hidden_size;
        let cell = |layer: usize| {
            let d_input = if layer == 0 { h } else { 2 * h };
            GruCellConfig::new(d_input, h).init(device)
        };

        // Dropout between stacked layers only; a single layer gets none
        let dropout = if self.n_layers == 1 { 0.0 } else { self.dropout };

        EncoderRnn {
            forward_cells:  (0..self.n_layers).map(cell).collect(),
            backward_cells: (0..self.n_layers).map(cell).collect(),
            dropout:        DropoutConfig::new(dropout).init(),
            hidden_size:    h,
            n_layers:       self.n_layers,
        }
    }
}

#[derive(Module, Debug)]
pub struct EncoderRnn<B: Backend> {
    pub forward_cells:  Vec<GruCell<B>>,
    pub backward_cells: Vec<GruCell<B>>,
    pub dropout:        Dropout,
    pub hidden_size:    usize,
    pub n_layers:       usize,
}

pub struct EncoderOutput<B: Backend> {
    /// Summed bidirectional features — [max_input_len, batch, H]
    pub outputs: Tensor<B, 3>,
    /// Final state per layer and direction — [n_layers * 2, batch, H]
    pub hidden:  Tensor<B, 3>,
}

impl<B: Backend> EncoderRnn<B> {
    /// input: [T, batch] token IDs, lengths: true lengths (non-increasing),
    /// hidden: optional initial state [n_layers * 2, batch, H], zeros if None.
    pub fn forward(
        &self,
        embedding: &Embedding<B>,
        input:     Tensor<B, 2, Int>,
        lengths:   &[usize],
        hidden:    Option<Tensor<B, 3>>,
    ) -> EncoderOutput<B> {
        let [seq_len, batch] = input.dims();
        let h      = self.hidden_size;
        let device = input.device();
        debug_assert_eq!(lengths.len(), batch);
        debug_assert!(lengths.windows(2).all(|w| w[0] >= w[1]), "lengths must be sorted descending");

        let hidden = hidden.unwrap_or_else(|| Tensor::zeros([self.n_layers * 2, batch, h], &device));
        let masks  = step_masks::<B>(lengths, seq_len, &device);

        let embedded = embedding.forward(input); // [T, batch, H]
        let mut layer_input: Vec<Tensor<B, 2>> = (0..seq_len)
            .map(|t| embedded.clone().slice([t..t + 1, 0..batch, 0..h]).reshape([batch, h]))
            .collect();

        let mut finals = Vec::with_capacity(self.n_layers * 2);
        let mut fwd_out = Vec::new();
        let mut bwd_out = Vec::new();

        for layer in 0..self.n_layers {
            let initial = |k: usize| hidden.clone().slice([k..k + 1, 0..batch, 0..h]).reshape([batch, h]);

            // ── Forward direction ────────────────────────────────────────────
            let cell = &self.forward_cells[layer];
            let mut state = initial(2 * layer);
            fwd_out = Vec::with_capacity(seq_len);
            for t in 0..seq_len {
                state = cell.masked_step(layer_input[t].clone(), state, masks[t].clone());
                fwd_out.push(state.clone() * masks[t].clone());
            }
            finals.push(state);

            // ── Backward direction ───────────────────────────────────────────
            // Padded steps come first when walking backwards; the mask keeps
            // the state at its initial value until the real tokens start.
            let cell = &self.backward_cells[layer];
            let mut state = initial(2 * layer + 1);
            let mut reversed = Vec::with_capacity(seq_len);
            for t in (0..seq_len).rev() {
                state = cell.masked_step(layer_input[t].clone(), state, masks[t].clone());
                reversed.push(state.clone() * masks[t].clone());
            }
            reversed.reverse();
            bwd_out = reversed;
            finals.push(state);

            if layer + 1 < self.n_layers {
                layer_input = fwd_out
                    .iter()
                    .zip(bwd_out.iter())
                    .map(|(f, b)| self.dropout.forward(Tensor::cat(vec![f.clone(), b.clone()], 1)))
                    .collect();
            }
        }

        // Sum the two directions of the top layer
        let summed: Vec<Tensor<B, 2>> = fwd_out
            .into_iter()
            .zip(bwd_out)
            .map(|(f, b)| f + b)
            .collect();

        EncoderOutput {
            outputs: Tensor::stack::<3>(summed, 0),
            hidden:  Tensor::stack::<3>(finals, 0),
        }
    }
}

/// One [batch, 1] float mask per timestep: 1.0 while t < length, else 0.0
fn step_masks<B: Backend>(lengths: &[usize], seq_len: usize, device: &B::Device) -> Vec<Tensor<B, 2>> {
    let batch = lengths.len();
    (0..seq_len)
        .map(|t| {
            let values: Vec<f32> = lengths
                .iter()
                .map(|&len| if t < len { 1.0 } else { 0.0 })
                .collect();
            Tensor::<B, 1>::from_floats(values.as_slice(), device).reshape([batch, 1])
        })
        .collect()
}
