// ============================================================
// Layer 5 — Predictor
// ============================================================
// Runs a trained model over unlabelled images and hands back one
// 8-bit probability mask per sample, cropped to the original
// (unpadded) size:
//
//   logits → sigmoid → crop padding → round(p * 255) as u8
//
// Where the masks go is the caller's business (the sink closure).

use anyhow::{anyhow, Result};
use burn::{data::dataloader::batcher::Batcher, prelude::*, tensor::activation::sigmoid};
use image::GrayImage;
use std::sync::Arc;

use crate::data::{
    batcher::SegBatcher,
    dataset::SegDataset,
    image_io::crop_padding,
    prefetch::{sequential_order, PrefetchLoader},
};
use crate::domain::traits::SampleSource;
use crate::ml::model::UNet11;

pub struct Predictor<B: Backend> {
    model:  UNet11<B>,
    device: B::Device,
}

impl<B: Backend> Predictor<B> {
    pub fn new(model: UNet11<B>, device: B::Device) -> Self {
        Self { model, device }
    }

    /// Predict every sample of `dataset` in order, calling `sink(id, mask)`.
    /// Returns the number of masks produced.
    pub fn predict<S, F>(&self, dataset: Arc<SegDataset<S>>, loader: &PrefetchLoader, mut sink: F) -> Result<usize>
    where
        S: SampleSource + Send + 'static,
        F: FnMut(&str, GrayImage) -> Result<()>,
    {
        let batcher = SegBatcher::<B>::new(self.device.clone());
        let order = sequential_order(dataset.len());
        let mut count = 0usize;

        for items in loader.iter(dataset, order, 0, None) {
            let batch = batcher.batch(items?);
            let [_, _, h, w] = batch.images.dims();

            let probs = sigmoid(self.model.forward(batch.images))
                .into_data()
                .convert::<f32>()
                .to_vec::<f32>()
                .map_err(|e| anyhow!("Cannot read predictions: {e:?}"))?;

            for (k, (id, padding)) in batch.ids.iter().zip(&batch.paddings).enumerate() {
                let plane = &probs[k * h * w..(k + 1) * h * w];
                let padded = GrayImage::from_fn(w as u32, h as u32, |x, y| {
                    image::Luma([to_u8(plane[y as usize * w + x as usize])])
                });
                sink(id, crop_padding(&padded, *padding))?;
                count += 1;
            }
            tracing::debug!("Predicted {} samples", count);
        }
        Ok(count)
    }
}

fn to_u8(p: f32) -> u8 {
    (p * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::{Padding, Sample};
    use crate::ml::model::UNet11Config;
    use burn::backend::NdArray;
    use image::RgbImage;

    struct Padded;

    impl SampleSource for Padded {
        fn load(&self, id: &str) -> Result<Sample> {
            let padding = Padding { top: 13, bottom: 14, left: 13, right: 14 };
            Ok(Sample::new(id, RgbImage::new(128, 128), None, padding))
        }
    }

    #[test]
    fn test_masks_are_cropped_to_original_size() {
        let device = Default::default();
        let model: UNet11<NdArray> = UNet11Config::new().with_encoder_width(1).with_num_filters(1).init(&device);
        let predictor = Predictor::new(model, device);
        let loader = PrefetchLoader::new(1, 2).unwrap();
        let ds = Arc::new(SegDataset::new(Padded, vec!["a".into(), "b".into(), "c".into()]));

        let mut seen = Vec::new();
        let count = predictor
            .predict(ds, &loader, |id, mask| {
                seen.push((id.to_string(), mask.dimensions()));
                Ok(())
            })
            .unwrap();

        assert_eq!(count, 3);
        assert_eq!(seen[0], ("a".to_string(), (101, 101)));
        assert_eq!(seen[2].0, "c");
    }

    #[test]
    fn test_probability_scaling() {
        assert_eq!(to_u8(0.0), 0);
        assert_eq!(to_u8(0.5), 128);
        assert_eq!(to_u8(1.0), 255);
    }
}
