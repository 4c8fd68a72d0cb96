// ============================================================
// Layer 5 — Luong Attention
// ============================================================
// Scores every encoder timestep against the current decoder
// state and turns the scores into a distribution over input
// positions (Luong et al. 2015, §3.1):
//
//   dot      score(h, ē) = h · ē
//   general  score(h, ē) = h · (W ē)
//   concat   score(h, ē) = v · tanh(W [h ; ē])
//
// The method is fixed when the layer is built: `general` owns a
// H → H Linear, `concat` owns a 2H → H Linear plus the vector v
// (a bias-free H → 1 Linear), `dot` owns no weights at all.
//
// Shapes:
//   hidden          [1, batch, H]
//   encoder_outputs [T, batch, H]
//   weights         [batch, 1, T]   softmax over T

use std::{fmt, str::FromStr};

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::softmax,
};
use serde::{Deserialize, Serialize};

use crate::domain::error::ChatbotError;

/// Which scoring function the attention layer uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttentionMethod {
    Dot,
    General,
    Concat,
}

impl FromStr for AttentionMethod {
    type Err = ChatbotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dot"     => Ok(Self::Dot),
            "general" => Ok(Self::General),
            "concat"  => Ok(Self::Concat),
            other     => Err(ChatbotError::UnknownAttentionMethod(other.to_string())),
        }
    }
}

impl fmt::Display for AttentionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Dot     => "dot",
            Self::General => "general",
            Self::Concat  => "concat",
        };
        f.write_str(name)
    }
}

#[derive(Config, Debug)]
pub struct AttentionConfig {
    pub method:      AttentionMethod,
    pub hidden_size: usize,
}

impl AttentionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Attention<B> {
        let h = self.hidden_size;
        match self.method {
            AttentionMethod::Dot => Attention { general: None, concat: None },
            AttentionMethod::General => Attention {
                general: Some(LinearConfig::new(h, h).init(device)),
                concat:  None,
            },
            AttentionMethod::Concat => Attention {
                general: None,
                concat:  Some(ConcatScore {
                    attn: LinearConfig::new(2 * h, h).init(device),
                    v:    LinearConfig::new(h, 1).with_bias(false).init(device),
                }),
            },
        }
    }
}

/// Weights for the `concat` score
#[derive(Module, Debug)]
pub struct ConcatScore<B: Backend> {
    pub attn: Linear<B>,
    pub v:    Linear<B>,
}

/// At most one of the two weight sets is present; neither means `dot`.
#[derive(Module, Debug)]
pub struct Attention<B: Backend> {
    pub general: Option<Linear<B>>,
    pub concat:  Option<ConcatScore<B>>,
}

impl<B: Backend> Attention<B> {
    pub fn method(&self) -> AttentionMethod {
        match (&self.general, &self.concat) {
            (Some(_), _)    => AttentionMethod::General,
            (None, Some(_)) => AttentionMethod::Concat,
            (None, None)    => AttentionMethod::Dot,
        }
    }

    /// hidden: [1, batch, H], encoder_outputs: [T, batch, H] → [batch, 1, T]
    pub fn forward(&self, hidden: Tensor<B, 3>, encoder_outputs: Tensor<B, 3>) -> Tensor<B, 3> {
        let [seq_len, batch, h] = encoder_outputs.dims();
        let hidden = hidden.expand([seq_len, batch, h]);

        let energies = match (&self.general, &self.concat) {
            (Some(attn), _) => dot_score(hidden, attn.forward(encoder_outputs)),
            (None, Some(score)) => {
                let energy = score
                    .attn
                    .forward(Tensor::cat(vec![hidden, encoder_outputs], 2))
                    .tanh();
                score.v.forward(energy)
            }
            (None, None) => dot_score(hidden, encoder_outputs),
        };

        // [T, batch, 1] → [batch, T], normalised over T
        let energies = energies.reshape([seq_len, batch]).transpose();
        softmax(energies, 1).reshape([batch, 1, seq_len])
    }
}

/// Σ over features of hidden ⊙ output, per position → [T, batch, 1].
/// Both inputs are [T, batch, H].
fn dot_score<B: Backend>(hidden: Tensor<B, 3>, encoder_outputs: Tensor<B, 3>) -> Tensor<B, 3> {
    (hidden * encoder_outputs).sum_dim(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn check_rows_sum_to_one(method: AttentionMethod) {
        let device  = Default::default();
        let attn    = AttentionConfig::new(method, 8).init::<TestBackend>(&device);
        let hidden  = Tensor::<TestBackend, 3>::random([1, 3, 8], burn::tensor::Distribution::Normal(0.0, 1.0), &device);
        let outputs = Tensor::<TestBackend, 3>::random([5, 3, 8], burn::tensor::Distribution::Normal(0.0, 1.0), &device);

        let weights = attn.forward(hidden, outputs);
        assert_eq!(weights.dims(), [3, 1, 5]);

        let sums: Vec<f32> = weights.sum_dim(2).into_data().iter::<f32>().collect();
        assert_eq!(sums.len(), 3);
        for s in sums {
            assert!((s - 1.0).abs() < 1e-5, "row sums to {s}");
        }
    }

    #[test]
    fn test_dot_weights_sum_to_one() {
        check_rows_sum_to_one(AttentionMethod::Dot);
    }

    #[test]
    fn test_general_weights_sum_to_one() {
        check_rows_sum_to_one(AttentionMethod::General);
    }

    #[test]
    fn test_concat_weights_sum_to_one() {
        check_rows_sum_to_one(AttentionMethod::Concat);
    }

    #[test]
    fn test_dot_prefers_aligned_position() {
        let device  = Default::default();
        let attn    = AttentionConfig::new(AttentionMethod::Dot, 2).init::<TestBackend>(&device);
        let hidden  = Tensor::<TestBackend, 3>::from_floats([[[1.0, 0.0]]], &device);
        let outputs = Tensor::<TestBackend, 3>::from_floats([[[0.0, 1.0]], [[5.0, 0.0]], [[-5.0, 0.0]]], &device);

        let weights: Vec<f32> = attn.forward(hidden, outputs).into_data().iter::<f32>().collect();
        assert!(weights[1] > weights[0] && weights[0] > weights[2]);
    }

    #[test]
    fn test_method_is_fixed_at_construction() {
        let device = Default::default();
        for method in [AttentionMethod::Dot, AttentionMethod::General, AttentionMethod::Concat] {
            let attn = AttentionConfig::new(method, 4).init::<TestBackend>(&device);
            assert_eq!(attn.method(), method);
        }
    }

    #[test]
    fn test_unknown_method_fails_to_parse() {
        assert_eq!("general".parse::<AttentionMethod>().unwrap(), AttentionMethod::General);
        let err = "cosine".parse::<AttentionMethod>().unwrap_err();
        assert_eq!(err, ChatbotError::UnknownAttentionMethod("cosine".to_string()));
    }
}
