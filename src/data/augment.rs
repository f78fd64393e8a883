// ============================================================
// Layer 4 — Augmentation Pipeline
// ============================================================
// Random transforms applied to training samples only.
//
//   1. p = 0.5  horizontal flip of image and mask
//   2. p = 0.5  one photometric transform, chosen 50/50:
//        a. hue / saturation / value jitter
//        b. grayscale blend of the masked region
//
// The random generator is passed in explicitly; the dataset seeds
// one per (seed, epoch, index) so results are reproducible no
// matter which worker thread runs them.
//
// Draw order (matters for reproducibility):
//   flip?  photometric?  hsv-or-gray?  hue  sat  val
//
// Reference: rand crate (Rng::gen, Rng::gen_range)

use image::{GrayImage, Rgb, RgbImage};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::data::color::{bgr_to_hsv, hsv_to_bgr, rgb_to_gray, saturating_shift};

/// Uniform ranges for the HSV jitter, as `(low, high)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HsvShiftLimits {
    pub hue: (f64, f64),
    pub sat: (f64, f64),
    pub val: (f64, f64),
}

impl Default for HsvShiftLimits {
    fn default() -> Self {
        Self { hue: (-50.0, 50.0), sat: (-5.0, 5.0), val: (-15.0, 15.0) }
    }
}

/// Apply the random flip / photometric pipeline. Always returns new buffers.
pub fn augment<R: Rng>(image: &RgbImage, mask: &GrayImage, rng: &mut R) -> (RgbImage, GrayImage) {
    let (mut image, mask) = if rng.gen::<f64>() < 0.5 {
        (
            image::imageops::flip_horizontal(image),
            image::imageops::flip_horizontal(mask),
        )
    } else {
        (image.clone(), mask.clone())
    };

    if rng.gen::<f64>() < 0.5 {
        image = if rng.gen::<f64>() < 0.5 {
            random_hue_saturation_value(&image, HsvShiftLimits::default(), rng)
        } else {
            grayscale_blend(&image, &mask)
        };
    }

    (image, mask)
}

/// Shift hue, saturation and value by one uniform random offset each.
///
/// The buffer is converted with BGR channel semantics exactly as stored,
/// so an RGB buffer gets its red and blue roles swapped for the shift.
pub fn random_hue_saturation_value<R: Rng>(
    image:  &RgbImage,
    limits: HsvShiftLimits,
    rng:    &mut R,
) -> RgbImage {
    let hue_shift = rng.gen_range(limits.hue.0..limits.hue.1);
    let sat_shift = rng.gen_range(limits.sat.0..limits.sat.1);
    let val_shift = rng.gen_range(limits.val.0..limits.val.1);
    shift_hsv(image, hue_shift, sat_shift, val_shift)
}

/// Deterministic half of `random_hue_saturation_value`.
pub fn shift_hsv(image: &RgbImage, hue: f64, sat: f64, val: f64) -> RgbImage {
    let mut out = image.clone();
    for px in out.pixels_mut() {
        let [h, s, v] = bgr_to_hsv(px.0);
        px.0 = hsv_to_bgr([
            saturating_shift(h, hue),
            saturating_shift(s, sat),
            saturating_shift(v, val),
        ]);
    }
    out
}

/// Desaturate the region under the mask.
///
/// The image is multiplied by the binary stencil (mask > 0), converted to
/// gray, and every pixel with a nonzero gray value is overwritten with that
/// gray in all three channels. Pixels outside the mask keep their colour.
pub fn grayscale_blend(image: &RgbImage, mask: &GrayImage) -> RgbImage {
    let mut out = image.clone();
    for (px, m) in out.pixels_mut().zip(mask.pixels()) {
        if m.0[0] == 0 {
            continue;
        }
        let gray = rgb_to_gray(px.0);
        if gray > 0 {
            *px = Rgb([gray, gray, gray]);
        }
    }
    out
}
