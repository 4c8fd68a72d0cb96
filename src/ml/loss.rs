// ============================================================
// Layer 5 — Masked Negative Log-Likelihood
// ============================================================
// Loss for one decoder timestep. Only columns whose target is
// a real word count; padding columns contribute nothing.
//
//   loss  = mean over {i : mask[i]} of  −ln probs[i, target[i]]
//   count = |{i : mask[i]}|
//
// The caller weights each step by `count` when it reports the
// average loss of a whole batch.

use burn::prelude::*;

use crate::domain::error::ChatbotError;

/// Probabilities are floored before the log so a word the model rules out
/// completely costs a large finite loss instead of infinity.
const PROB_FLOOR: f64 = 1e-12;

/// probs: [batch, V], target: [batch], mask: [batch].
/// Returns the scalar loss as a [1] tensor and the number of counted positions.
pub fn mask_nll_loss<B: Backend>(
    probs:  Tensor<B, 2>,
    target: Tensor<B, 1, Int>,
    mask:   Tensor<B, 1, Bool>,
) -> Result<(Tensor<B, 1>, usize), ChatbotError> {
    let [batch, _] = probs.dims();

    let n_total = mask.clone().int().sum().into_scalar().elem::<i64>() as usize;
    if n_total == 0 {
        return Err(ChatbotError::EmptyMask);
    }

    let picked = probs.gather(1, target.reshape([batch, 1])).reshape([batch]);
    let cross_entropy = picked.clamp_min(PROB_FLOOR).log().neg();

    let loss = (cross_entropy * mask.float()).sum().div_scalar(n_total as f64);
    Ok((loss, n_total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn probs() -> Tensor<TestBackend, 2> {
        Tensor::from_floats(
            [[0.7, 0.2, 0.1], [0.1, 0.8, 0.1], [0.25, 0.25, 0.5], [0.6, 0.3, 0.1]],
            &Default::default(),
        )
    }

    fn mask_of(flags: [i32; 4]) -> Tensor<TestBackend, 1, Bool> {
        Tensor::<TestBackend, 1, Int>::from_ints(flags, &Default::default()).equal_elem(1)
    }

    fn scalar(t: Tensor<TestBackend, 1>) -> f32 {
        t.into_scalar().elem::<f32>()
    }

    #[test]
    fn test_all_true_mask_is_plain_mean_nll() {
        let device = Default::default();
        let target = Tensor::<TestBackend, 1, Int>::from_ints([0, 1, 2, 1], &device);
        let mask   = mask_of([1, 1, 1, 1]);

        let (loss, n) = mask_nll_loss(probs(), target, mask).unwrap();
        let expected  = -(0.7f32.ln() + 0.8f32.ln() + 0.5f32.ln() + 0.3f32.ln()) / 4.0;
        assert_eq!(n, 4);
        assert!((scalar(loss) - expected).abs() < 1e-5);
    }

    #[test]
    fn test_masked_positions_are_ignored() {
        let device = Default::default();
        let target = Tensor::<TestBackend, 1, Int>::from_ints([0, 1, 0, 0], &device);
        let mask   = mask_of([1, 1, 0, 0]);

        let (loss, n) = mask_nll_loss(probs(), target, mask).unwrap();
        let expected  = -(0.7f32.ln() + 0.8f32.ln()) / 2.0;
        assert_eq!(n, 2);
        assert!((scalar(loss) - expected).abs() < 1e-5);
    }

    #[test]
    fn test_permutation_invariant() {
        let device = Default::default();
        let (a, _) = mask_nll_loss(
            probs(),
            Tensor::<TestBackend, 1, Int>::from_ints([0, 1, 2, 1], &device),
            mask_of([1, 0, 1, 1]),
        )
        .unwrap();

        // Same rows in reverse order
        let reversed = Tensor::<TestBackend, 2>::from_floats(
            [[0.6, 0.3, 0.1], [0.25, 0.25, 0.5], [0.1, 0.8, 0.1], [0.7, 0.2, 0.1]],
            &device,
        );
        let (b, _) = mask_nll_loss(
            reversed,
            Tensor::<TestBackend, 1, Int>::from_ints([1, 2, 1, 0], &device),
            mask_of([1, 1, 0, 1]),
        )
        .unwrap();

        assert!((scalar(a) - scalar(b)).abs() < 1e-6);
    }

    #[test]
    fn test_all_false_mask_is_an_error() {
        let device = Default::default();
        let target = Tensor::<TestBackend, 1, Int>::from_ints([0, 1, 2, 1], &device);
        let mask   = mask_of([0, 0, 0, 0]);
        assert!(matches!(mask_nll_loss(probs(), target, mask), Err(ChatbotError::EmptyMask)));
    }
}
