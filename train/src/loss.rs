use burn::prelude::{Backend, Tensor};

const PROB_EPS: f32 = 1e-7;

/// Mean binary cross-entropy of `probs` against a constant `target` label.
///
/// Probabilities are clamped away from 0 and 1 so a saturated discriminator
/// yields a large but finite loss.
pub fn binary_cross_entropy<B: Backend>(probs: Tensor<B, 1>, target: f32) -> Tensor<B, 1> {
    let probs = probs.clamp(PROB_EPS, 1.0 - PROB_EPS);
    let log_p = probs.clone().log() * target;
    let log_not_p = probs.neg().add_scalar(1.0).log() * (1.0 - target);
    (log_p + log_not_p).mean().neg()
}
