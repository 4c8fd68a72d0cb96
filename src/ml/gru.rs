// ============================================================
// Layer 5 — GRU Cell
// ============================================================
// One gated recurrent unit step (Cho et al. 2014):
//
//   r  = σ(W_ir x + b_ir + W_hr h + b_hr)        reset gate
//   z  = σ(W_iz x + b_iz + W_hz h + b_hz)        update gate
//   n  = tanh(W_in x + b_in + r ⊙ (W_hn h + b_hn))
//   h' = (1 − z) ⊙ n + z ⊙ h
//
// The three input projections live in one Linear (d_input → 3H)
// and the three hidden projections in another (H → 3H); the gate
// blocks are sliced out in r, z, n order.
//
// masked_step() is what makes variable-length batches work
// without packing: a column whose mask is 0 keeps its previous
// state, so padding never leaks into the hidden state.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::sigmoid,
};

#[derive(Config, Debug)]
pub struct GruCellConfig {
    pub d_input:  usize,
    pub d_hidden: usize,
}

impl GruCellConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> GruCell<B> {
        GruCell {
            input_gates:  LinearConfig::new(self.d_input, 3 * self.d_hidden).init(device),
            hidden_gates: LinearConfig::new(self.d_hidden, 3 * self.d_hidden).init(device),
            d_hidden:     self.d_hidden,
        }
    }
}

#[derive(Module, Debug)]
pub struct GruCell<B: Backend> {
    pub input_gates:  Linear<B>,
    pub hidden_gates: Linear<B>,
    pub d_hidden:     usize,
}

impl<B: Backend> GruCell<B> {
    /// x: [batch, d_input], h: [batch, d_hidden] → [batch, d_hidden]
    pub fn step(&self, x: Tensor<B, 2>, h: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, _] = x.dims();
        let d = self.d_hidden;

        let gi = self.input_gates.forward(x);
        let gh = self.hidden_gates.forward(h.clone());
        let gate = |t: &Tensor<B, 2>, k: usize| t.clone().slice([0..batch, k * d..(k + 1) * d]);

        let reset     = sigmoid(gate(&gi, 0) + gate(&gh, 0));
        let update    = sigmoid(gate(&gi, 1) + gate(&gh, 1));
        let candidate = (gate(&gi, 2) + reset * gate(&gh, 2)).tanh();

        update.clone().neg().add_scalar(1.0) * candidate + update * h
    }

    /// Like `step`, but rows where `mask` ([batch, 1], 1.0 / 0.0) is zero
    /// return `h` unchanged.
    pub fn masked_step(&self, x: Tensor<B, 2>, h: Tensor<B, 2>, mask: Tensor<B, 2>) -> Tensor<B, 2> {
        let next = self.step(x, h.clone());
        let keep = mask.clone().neg().add_scalar(1.0);
        next * mask + h * keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_step_shape() {
        let device = Default::default();
        let cell   = GruCellConfig::new(6, 4).init::<TestBackend>(&device);
        let x      = Tensor::<TestBackend, 2>::ones([3, 6], &device);
        let h      = Tensor::<TestBackend, 2>::zeros([3, 4], &device);
        assert_eq!(cell.step(x, h).dims(), [3, 4]);
    }

    #[test]
    fn test_masked_rows_keep_previous_state() {
        let device = Default::default();
        let cell   = GruCellConfig::new(2, 3).init::<TestBackend>(&device);
        let x      = Tensor::<TestBackend, 2>::ones([2, 2], &device);
        let h      = Tensor::<TestBackend, 2>::from_floats([[0.5, -0.5, 0.25], [0.1, 0.2, 0.3]], &device);
        let mask   = Tensor::<TestBackend, 2>::from_floats([[1.0], [0.0]], &device);

        let next: Vec<f32> = cell.masked_step(x, h, mask).into_data().iter::<f32>().collect();
        assert_eq!(&next[3..], &[0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_output_is_bounded() {
        // h' is a convex mix of tanh(·) and h, so with |h| ≤ 1 it stays in [-1, 1]
        let device = Default::default();
        let cell   = GruCellConfig::new(4, 4).init::<TestBackend>(&device);
        let x      = Tensor::<TestBackend, 2>::ones([2, 4], &device).mul_scalar(10.0);
        let h      = Tensor::<TestBackend, 2>::zeros([2, 4], &device);
        let out: Vec<f32> = cell.step(x, h).into_data().iter::<f32>().collect();
        assert!(out.iter().all(|v| v.abs() <= 1.0));
    }
}
