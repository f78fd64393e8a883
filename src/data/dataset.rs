use anyhow::{Context, Result};
use image::{GrayImage, RgbImage};
use rand::{rngs::StdRng, SeedableRng};

use crate::data::augment::augment;
use crate::domain::sample::Padding;
use crate::domain::traits::SampleSource;

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// One sample converted to model-ready floats.
/// `image` is CHW, ImageNet-normalised; `mask` is HW with values in {0, 1}.
#[derive(Debug, Clone)]
pub struct SegItem {
    pub id:      String,
    pub image:   Vec<f32>,
    pub mask:    Option<Vec<f32>>,
    pub height:  usize,
    pub width:   usize,
    pub padding: Padding,
}

/// Identifier list plus the store that resolves it, optionally augmenting.
pub struct SegDataset<S> {
    source:  S,
    ids:     Vec<String>,
    augment: Option<u64>,
}

impl<S: SampleSource> SegDataset<S> {
    pub fn new(source: S, ids: Vec<String>) -> Self {
        Self { source, ids, augment: None }
    }

    /// Enable training augmentation, seeded per (seed, epoch, index).
    pub fn with_augmentation(mut self, seed: u64) -> Self {
        self.augment = Some(seed);
        self
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Load, optionally augment and convert the sample at `index`.
    pub fn item(&self, index: usize, epoch: usize) -> Result<SegItem> {
        let id = self
            .ids
            .get(index)
            .with_context(|| format!("Sample index {index} out of range ({})", self.ids.len()))?;
        let sample = self.source.load(id)?;

        let (image, mask) = match (self.augment, sample.mask) {
            (Some(seed), Some(mask)) => {
                let mut rng = StdRng::seed_from_u64(item_seed(seed, epoch, index));
                let (image, mask) = augment(&sample.image, &mask, &mut rng);
                (image, Some(mask))
            }
            (_, mask) => (sample.image, mask),
        };

        Ok(SegItem {
            id:      sample.id,
            height:  image.height() as usize,
            width:   image.width() as usize,
            image:   image_to_chw(&image),
            mask:    mask.as_ref().map(mask_to_target),
            padding: sample.padding,
        })
    }
}

/// Mix the run seed, epoch and sample index into one RNG seed.
pub fn item_seed(seed: u64, epoch: usize, index: usize) -> u64 {
    let mut z = seed
        ^ (epoch as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (index as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    // splitmix64 finaliser
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// HWC u8 → CHW f32, scaled to [0, 1] then ImageNet-normalised.
pub fn image_to_chw(img: &RgbImage) -> Vec<f32> {
    let frame = (img.width() * img.height()) as usize;
    let mut chw = vec![0.0f32; frame * 3];
    for (i, px) in img.pixels().enumerate() {
        for c in 0..3 {
            chw[c * frame + i] = (px.0[c] as f32 / 255.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }
    chw
}

/// Binary target: 1.0 wherever the mask is nonzero.
pub fn mask_to_target(mask: &GrayImage) -> Vec<f32> {
    mask.pixels().map(|p| if p.0[0] > 0 { 1.0 } else { 0.0 }).collect()
}
