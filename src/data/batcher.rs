// ============================================================
// Layer 4 — Segmentation Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<SegItem> into
// tensors:
//
//   images: [N, 3, H, W]   ImageNet-normalised floats
//   masks:  [N, 1, H, W]   binary targets (zeros for test items)
//
// All items in a batch must share H and W. Every image in the
// competition data has the same size, so after padding they do.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::dataset::SegItem;
use crate::domain::sample::Padding;

#[derive(Debug, Clone)]
pub struct SegBatch<B: Backend> {
    pub images:   Tensor<B, 4>,
    pub masks:    Tensor<B, 4>,
    pub ids:      Vec<String>,
    pub paddings: Vec<Padding>,
}

#[derive(Clone, Debug)]
pub struct SegBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SegBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<SegItem, SegBatch<B>> for SegBatcher<B> {
    fn batch(&self, items: Vec<SegItem>) -> SegBatch<B> {
        let n = items.len();
        let (h, w) = (items[0].height, items[0].width);

        let image_flat: Vec<f32> = items
            .iter()
            .flat_map(|it| it.image.iter().copied())
            .collect();

        let mask_flat: Vec<f32> = items
            .iter()
            .flat_map(|it| match &it.mask {
                Some(m) => m.clone(),
                None => vec![0.0; h * w],
            })
            .collect();

        let images = Tensor::<B, 4>::from_data(TensorData::new(image_flat, [n, 3, h, w]), &self.device);
        let masks  = Tensor::<B, 4>::from_data(TensorData::new(mask_flat, [n, 1, h, w]), &self.device);

        SegBatch {
            images,
            masks,
            ids:      items.iter().map(|it| it.id.clone()).collect(),
            paddings: items.iter().map(|it| it.padding).collect(),
        }
    }
}
