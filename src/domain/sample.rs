// ============================================================
// Layer 3 — Sample Domain Type
// ============================================================
// One training or test example after loading:
//   - the RGB image, padded so both sides are multiples of 32
//   - the binary mask (absent for test images), padded the same way
//   - the padding that was added, so predictions can be cropped
//     back to the original image size
//
// Invariant: image and mask always have identical dimensions.

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

/// Border padding added on each side of an image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Padding {
    pub top:    u32,
    pub bottom: u32,
    pub left:   u32,
    pub right:  u32,
}

impl Padding {
    /// Padding that brings `height × width` up to the next multiple of `multiple`
    /// on each axis. The deficit is split as floor(half) on the low side and the
    /// remainder on the high side.
    pub fn to_multiple(height: u32, width: u32, multiple: u32) -> Self {
        let (top, bottom) = split_deficit(height, multiple);
        let (left, right) = split_deficit(width, multiple);
        Self { top, bottom, left, right }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    /// Dimensions `(height, width)` after padding an image of the given size.
    pub fn padded_dims(&self, height: u32, width: u32) -> (u32, u32) {
        (height + self.top + self.bottom, width + self.left + self.right)
    }
}

fn split_deficit(dim: u32, multiple: u32) -> (u32, u32) {
    let deficit = (multiple - dim % multiple) % multiple;
    let low = deficit / 2;
    (low, deficit - low)
}

/// An identifier with its loaded (and padded) image and optional mask.
#[derive(Debug, Clone)]
pub struct Sample {
    pub id:      String,
    pub image:   RgbImage,
    pub mask:    Option<GrayImage>,
    pub padding: Padding,
}

impl Sample {
    pub fn new(id: impl Into<String>, image: RgbImage, mask: Option<GrayImage>, padding: Padding) -> Self {
        Self { id: id.into(), image, mask, padding }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_101_pads_to_128_with_13_14_split() {
        let p = Padding::to_multiple(101, 101, 32);
        assert_eq!((p.top, p.bottom), (13, 14));
        assert_eq!((p.left, p.right), (13, 14));
        assert_eq!(p.padded_dims(101, 101), (128, 128));
    }

    #[test]
    fn test_multiple_of_32_needs_no_padding() {
        let p = Padding::to_multiple(64, 96, 32);
        assert!(p.is_zero());
    }

    #[test]
    fn test_pad_sums_equal_deficit() {
        for dim in 1..200u32 {
            let p = Padding::to_multiple(dim, dim + 7, 32);
            let (h, w) = p.padded_dims(dim, dim + 7);
            assert_eq!(h % 32, 0);
            assert_eq!(w % 32, 0);
            assert_eq!(p.top + p.bottom, (32 - dim % 32) % 32);
            assert!(p.bottom >= p.top && p.bottom - p.top <= 1);
        }
    }
}
