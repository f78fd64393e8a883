// ============================================================
// Layer 5 — Validation
// ============================================================
// Runs the model without autodiff over the validation split and
// reports the mean loss and mean Dice coefficient across batches.
//
//   dice = 2 * mean_n( |pred_n ∩ true_n| / (|pred_n| + |true_n| + eps) )
//
// where pred = logits > 0.5 (thresholded on the raw outputs).
//
// Reference: Burn Book §5 (model.valid())

use anyhow::Result;
use burn::{data::dataloader::batcher::Batcher, prelude::*};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::data::{
    batcher::SegBatcher,
    dataset::SegDataset,
    prefetch::{sequential_order, PrefetchLoader},
};
use crate::domain::traits::SampleSource;
use crate::ml::{loss::SegmentationLoss, model::UNet11};

const EPS: f64 = 1e-15;
const THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub valid_loss: f64,
    pub dice:       f64,
}

/// Evaluate `model` on every sample of `dataset`, in order.
pub fn validate<B, S>(
    model:     &UNet11<B>,
    criterion: &SegmentationLoss,
    dataset:   Arc<SegDataset<S>>,
    loader:    &PrefetchLoader,
    device:    &B::Device,
) -> Result<ValidationMetrics>
where
    B: Backend,
    S: SampleSource + Send + 'static,
{
    if dataset.is_empty() {
        tracing::warn!("Validation split is empty, metrics are undefined");
        return Ok(ValidationMetrics { valid_loss: f64::NAN, dice: f64::NAN });
    }

    let batcher = SegBatcher::<B>::new(device.clone());
    let order = sequential_order(dataset.len());

    let mut losses = Vec::new();
    let mut dices  = Vec::new();

    for items in loader.iter(dataset, order, 0, None) {
        let batch = batcher.batch(items?);
        let outputs = model.forward(batch.images);

        let loss = criterion.forward(outputs.clone(), batch.masks.clone());
        losses.push(loss.into_scalar().elem::<f64>());

        let preds = outputs.greater_elem(THRESHOLD).float();
        dices.push(dice(batch.masks, preds));
    }

    let metrics = ValidationMetrics { valid_loss: mean(&losses), dice: mean(&dices) };
    tracing::info!("Valid loss: {:.5}, dice: {:.5}", metrics.valid_loss, metrics.dice);
    Ok(metrics)
}

/// Mean per-sample Dice of binary `[N, C, H, W]` tensors, doubled.
pub fn dice<B: Backend>(targets: Tensor<B, 4>, preds: Tensor<B, 4>) -> f64 {
    let intersection = (preds.clone() * targets.clone()).sum_dim(3).sum_dim(2);
    let union = targets.sum_dim(3).sum_dim(2) + preds.sum_dim(3).sum_dim(2) + EPS;
    ((intersection / union).mean() * 2.0).into_scalar().elem::<f64>()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::{Padding, Sample};
    use crate::ml::model::UNet11Config;
    use burn::backend::NdArray;
    use image::{GrayImage, RgbImage};

    type B = NdArray;

    fn tensor(values: Vec<f32>, shape: [usize; 4]) -> Tensor<B, 4> {
        Tensor::from_data(TensorData::new(values, shape), &Default::default())
    }

    #[test]
    fn test_identical_masks_score_one() {
        let ones = tensor(vec![1.0; 2 * 16], [2, 1, 4, 4]);
        assert!((dice(ones.clone(), ones) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_disjoint_masks_score_zero() {
        let left:  Vec<f32> = (0..16).map(|i| if i % 4 < 2 { 1.0 } else { 0.0 }).collect();
        let right: Vec<f32> = left.iter().map(|v| 1.0 - v).collect();
        let d = dice(tensor(left, [1, 1, 4, 4]), tensor(right, [1, 1, 4, 4]));
        assert!(d.abs() < 1e-6);
    }

    #[test]
    fn test_half_overlap() {
        // |A∩B| = 4, |A| = |B| = 8 → 2 * 4 / 16 = 0.5
        let a: Vec<f32> = (0..16).map(|i| if i < 8 { 1.0 } else { 0.0 }).collect();
        let b: Vec<f32> = (0..16).map(|i| if (4..12).contains(&i) { 1.0 } else { 0.0 }).collect();
        let d = dice(tensor(a, [1, 1, 4, 4]), tensor(b, [1, 1, 4, 4]));
        assert!((d - 0.5).abs() < 1e-6);
    }

    struct Blank;

    impl SampleSource for Blank {
        fn load(&self, id: &str) -> Result<Sample> {
            Ok(Sample::new(id, RgbImage::new(32, 32), Some(GrayImage::new(32, 32)), Padding::default()))
        }
    }

    #[test]
    fn test_empty_validation_set_gives_nan() {
        let device = Default::default();
        let model: UNet11<B> = UNet11Config::new().with_encoder_width(2).with_num_filters(2).init(&device);
        let loader = PrefetchLoader::new(1, 2).unwrap();
        let ds = Arc::new(SegDataset::new(Blank, Vec::new()));
        let m = validate(&model, &SegmentationLoss::default(), ds, &loader, &device).unwrap();
        assert!(m.valid_loss.is_nan());
        assert!(m.dice.is_nan());
    }

    #[test]
    fn test_metrics_are_finite_on_real_batches() {
        let device = Default::default();
        let model: UNet11<B> = UNet11Config::new().with_encoder_width(2).with_num_filters(2).init(&device);
        let loader = PrefetchLoader::new(2, 2).unwrap();
        let ids = (0..3).map(|i| i.to_string()).collect();
        let ds = Arc::new(SegDataset::new(Blank, ids));
        let m = validate(&model, &SegmentationLoss::default(), ds, &loader, &device).unwrap();
        assert!(m.valid_loss.is_finite());
        assert!(m.dice.is_finite());
    }
}
