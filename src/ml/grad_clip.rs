// ============================================================
// Layer 5 — Gradient Norm Clipping per Parameter Group
// ============================================================
// The encoder side (embedding + encoder) and the decoder are
// clipped independently, each over the combined L2 norm of the
// whole group:
//
//   norm = √(Σ over every tensor g in the group of Σ g²)
//   if norm > max_norm:
//       every g *= max_norm / norm
//
// All tensors of a group share one scale factor, so the update
// direction is preserved.
//
// A GradientsParams only holds the gradients of its own group,
// so walking the whole model and skipping ids that are missing
// visits exactly that group.
//
// Reference: Pascanu et al. (2013) On the difficulty of
//            training recurrent neural networks

use burn::{
    module::{ModuleVisitor, ParamId},
    optim::GradientsParams,
    prelude::*,
    tensor::backend::AutodiffBackend,
};

/// Sums the squares of every gradient found in `grads`
struct SquaredNorm<'a> {
    grads:  &'a GradientsParams,
    sum_sq: f64,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for SquaredNorm<'_> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.get::<B::InnerBackend, D>(id) {
            self.sum_sq += grad.powf_scalar(2.0).sum().into_scalar().elem::<f64>();
        }
    }
}

/// Multiplies every gradient found in `grads` by `scale`
struct Rescale<'a> {
    grads: &'a mut GradientsParams,
    scale: f64,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for Rescale<'_> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.remove::<B::InnerBackend, D>(id) {
            self.grads.register::<B::InnerBackend, D>(id, grad.mul_scalar(self.scale));
        }
    }
}

/// L2 norm over all gradients of `module`'s parameters present in `grads`
pub fn group_grad_norm<B, M>(module: &M, grads: &GradientsParams) -> f64
where
    B: AutodiffBackend,
    M: Module<B>,
{
    let mut visitor = SquaredNorm { grads, sum_sq: 0.0 };
    module.visit(&mut visitor);
    visitor.sum_sq.sqrt()
}

/// Scale the whole group down to `max_norm` if its norm is larger.
/// Returns the (possibly rescaled) gradients and the norm before clipping.
pub fn clip_group_grad_norm<B, M>(module: &M, mut grads: GradientsParams, max_norm: f64) -> (GradientsParams, f64)
where
    B: AutodiffBackend,
    M: Module<B>,
{
    let norm = group_grad_norm::<B, M>(module, &grads);
    if norm > max_norm && norm.is_finite() {
        let mut visitor = Rescale { grads: &mut grads, scale: max_norm / norm };
        module.visit(&mut visitor);
    }
    (grads, norm)
}
