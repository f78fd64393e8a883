// ============================================================
// Layer 4 — Image Loader / Padder
// ============================================================
// Reads images and masks from disk and pads them so that both
// spatial dimensions are multiples of 32 (UNet11 downsamples
// five times by 2).
//
// Padding per axis:
//   deficit = (32 - dim % 32) % 32
//   low     = deficit / 2          (top / left)
//   high    = deficit - low        (bottom / right)
//
// Border extension is reflect-101: the border mirrors the
// interior about the edge pixel without repeating it.
//
//   row:      a b c d
//   padded:   c b | a b c d | c b
//
// Reference: image crate (ImageBuffer::from_fn, imageops::crop_imm)

use anyhow::{Context, Result};
use image::{GrayImage, ImageBuffer, Pixel, RgbImage};
use std::path::Path;

use crate::domain::sample::Padding;

/// Both spatial sides are padded up to a multiple of this.
pub const PAD_MULTIPLE: u32 = 32;

/// Load an RGB image and pad it to multiples of 32.
pub fn load_image(path: &Path) -> Result<(RgbImage, Padding)> {
    let img = image::open(path)
        .with_context(|| format!("Cannot read image '{}'", path.display()))?
        .to_rgb8();
    Ok(pad_to_multiple(&img, PAD_MULTIPLE))
}

/// Load a single-channel mask and pad it to multiples of 32.
pub fn load_mask(path: &Path) -> Result<(GrayImage, Padding)> {
    let mask = image::open(path)
        .with_context(|| format!("Cannot read mask '{}'", path.display()))?
        .to_luma8();
    Ok(pad_to_multiple(&mask, PAD_MULTIPLE))
}

/// Load a single-channel image without padding (fold predictions).
pub fn load_gray(path: &Path) -> Result<GrayImage> {
    Ok(image::open(path)
        .with_context(|| format!("Cannot read image '{}'", path.display()))?
        .to_luma8())
}

pub fn save_gray(img: &GrayImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
    }
    img.save(path)
        .with_context(|| format!("Cannot write image '{}'", path.display()))
}

/// Pad `img` with reflect-101 borders so each side is a multiple of `multiple`.
pub fn pad_to_multiple<P>(img: &ImageBuffer<P, Vec<u8>>, multiple: u32) -> (ImageBuffer<P, Vec<u8>>, Padding)
where
    P: Pixel<Subpixel = u8>,
{
    let padding = Padding::to_multiple(img.height(), img.width(), multiple);
    (pad_reflect_101(img, padding), padding)
}

pub fn pad_reflect_101<P>(img: &ImageBuffer<P, Vec<u8>>, padding: Padding) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    if padding.is_zero() {
        return img.clone();
    }

    let (w, h) = img.dimensions();
    let (out_h, out_w) = padding.padded_dims(h, w);

    ImageBuffer::from_fn(out_w, out_h, |x, y| {
        let sx = reflect_101(x as i64 - padding.left as i64, w as i64);
        let sy = reflect_101(y as i64 - padding.top as i64, h as i64);
        *img.get_pixel(sx as u32, sy as u32)
    })
}

/// Undo `pad_reflect_101`: cut the original region back out.
pub fn crop_padding<P>(img: &ImageBuffer<P, Vec<u8>>, padding: Padding) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let w = img.width() - padding.left - padding.right;
    let h = img.height() - padding.top - padding.bottom;
    image::imageops::crop_imm(img, padding.left, padding.top, w, h).to_image()
}

/// Map an out-of-range coordinate back into `0..len` by reflecting about
/// the edge pixels. Reflects repeatedly when the border is wider than
/// the image; a single-pixel axis always maps to 0.
fn reflect_101(mut p: i64, len: i64) -> i64 {
    if len == 1 {
        return 0;
    }
    while p < 0 || p >= len {
        p = if p < 0 { -p } else { 2 * len - 2 - p };
    }
    p
}
