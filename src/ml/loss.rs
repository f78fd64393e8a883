use burn::{prelude::*, tensor::activation::sigmoid};
use serde::{Deserialize, Serialize};

const EPS: f64 = 1e-15;

/// `(1 - w) * BCEWithLogits - w * ln(soft Jaccard)`.
///
/// With `dice_weight == 0` this is plain binary cross-entropy. The
/// Jaccard term is computed over the whole batch, not per sample.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SegmentationLoss {
    pub dice_weight: f64,
}

impl SegmentationLoss {
    pub fn new(dice_weight: f64) -> Self {
        Self { dice_weight }
    }

    /// outputs: logits [N,1,H,W], targets: {0,1} [N,1,H,W] → scalar [1]
    pub fn forward<B: Backend>(&self, outputs: Tensor<B, 4>, targets: Tensor<B, 4>) -> Tensor<B, 1> {
        let bce = bce_with_logits(outputs.clone(), targets.clone());
        if self.dice_weight == 0.0 {
            return bce;
        }

        let jaccard_target = targets.equal_elem(1.0).float();
        let jaccard_output = sigmoid(outputs);
        let intersection = (jaccard_output.clone() * jaccard_target.clone()).sum();
        let union = jaccard_output.sum() + jaccard_target.sum();
        let jaccard = (intersection.clone() + EPS) / (union - intersection + EPS);

        bce * (1.0 - self.dice_weight) - jaccard.log() * self.dice_weight
    }
}

/// Mean of `max(x, 0) - x*t + ln(1 + e^-|x|)`, stable for large |x|.
pub fn bce_with_logits<B: Backend, const D: usize>(logits: Tensor<B, D>, targets: Tensor<B, D>) -> Tensor<B, 1> {
    let softplus = logits.clone().abs().neg().exp().log1p();
    (logits.clone().clamp_min(0.0) - logits * targets + softplus).mean()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    fn scalar(t: Tensor<NdArray, 1>) -> f64 {
        t.into_scalar().elem::<f64>()
    }

    fn filled(v: f32) -> Tensor<NdArray, 4> {
        Tensor::full([1, 1, 4, 4], v, &Default::default())
    }

    #[test]
    fn test_zero_logits_give_ln2() {
        let loss = SegmentationLoss::new(0.0).forward(filled(0.0), filled(1.0));
        assert!((scalar(loss) - std::f64::consts::LN_2).abs() < 1e-5);
    }

    #[test]
    fn test_large_logits_are_stable() {
        let right = SegmentationLoss::new(0.0).forward(filled(100.0), filled(1.0));
        assert!(scalar(right).abs() < 1e-5);
        let wrong = SegmentationLoss::new(0.0).forward(filled(-100.0), filled(1.0));
        assert!((scalar(wrong) - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_jaccard_term_rewards_overlap() {
        let loss = SegmentationLoss::new(0.5);
        let good = scalar(loss.forward(filled(20.0), filled(1.0)));
        let bad  = scalar(loss.forward(filled(-20.0), filled(1.0)));
        assert!(good < 1e-3);
        assert!(bad > good);
    }
}
