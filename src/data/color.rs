// ============================================================
// Layer 4 — 8-bit Colour Conversions
// ============================================================
// Integer/float colour-space conversions that reproduce the
// 8-bit OpenCV results bit for bit, so augmented images match
// those of the reference pipeline:
//
//   bgr_to_hsv   fixed-point, 12-bit division tables, H in [0, 180)
//   hsv_to_bgr   float sector interpolation, hue wraps modulo 180
//   rgb_to_gray  fixed-point ITU-R 601 weights, 14-bit shift
//
// All rounding is round-half-to-even, as cvRound does.

use std::sync::OnceLock;

const HSV_SHIFT: u32 = 12;
const HUE_RANGE: i32 = 180;

const GRAY_SHIFT: u32 = 14;
const R2Y: u32 = 4899;
const G2Y: u32 = 9617;
const B2Y: u32 = 1868;

struct DivTables {
    sdiv: [i32; 256],
    hdiv: [i32; 256],
}

fn div_tables() -> &'static DivTables {
    static TABLES: OnceLock<DivTables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut sdiv = [0i32; 256];
        let mut hdiv = [0i32; 256];
        for i in 1..256usize {
            sdiv[i] = (((255u32 << HSV_SHIFT) as f64) / i as f64).round_ties_even() as i32;
            hdiv[i] = (((HUE_RANGE as u32) << HSV_SHIFT) as f64 / (6.0 * i as f64)).round_ties_even() as i32;
        }
        DivTables { sdiv, hdiv }
    })
}

/// 8-bit BGR → HSV. Returns `[h, s, v]` with h in [0, 180).
pub fn bgr_to_hsv([b, g, r]: [u8; 3]) -> [u8; 3] {
    let tables = div_tables();
    let (b, g, r) = (b as i32, g as i32, r as i32);

    let v = b.max(g).max(r);
    let vmin = b.min(g).min(r);
    let diff = v - vmin;

    let vr: i32 = if v == r { -1 } else { 0 };
    let vg: i32 = if v == g { -1 } else { 0 };

    let round = 1 << (HSV_SHIFT - 1);
    let s = (diff * tables.sdiv[v as usize] + round) >> HSV_SHIFT;

    let mut h = (vr & (g - b)) + (!vr & ((vg & (b - r + 2 * diff)) + (!vg & (r - g + 4 * diff))));
    h = (h * tables.hdiv[diff as usize] + round) >> HSV_SHIFT;
    if h < 0 {
        h += HUE_RANGE;
    }

    [h as u8, s as u8, v as u8]
}

/// 8-bit HSV (h in [0, 180), values above wrap) → BGR.
pub fn hsv_to_bgr([h, s, v]: [u8; 3]) -> [u8; 3] {
    const SECTOR_DATA: [[usize; 3]; 6] = [[1, 3, 0], [1, 0, 2], [3, 0, 1], [0, 2, 1], [0, 1, 3], [2, 1, 0]];
    let hscale = 6.0f32 / HUE_RANGE as f32;

    let mut h = h as f32;
    let s = s as f32 * (1.0 / 255.0);
    let v = v as f32 * (1.0 / 255.0);

    let (b, g, r) = if s == 0.0 {
        (v, v, v)
    } else {
        h *= hscale;
        while h < 0.0 {
            h += 6.0;
        }
        while h >= 6.0 {
            h -= 6.0;
        }
        let mut sector = h.floor() as usize;
        h -= sector as f32;
        if sector >= 6 {
            sector = 0;
            h = 0.0;
        }
        let tab = [v, v * (1.0 - s), v * (1.0 - s * h), v * (1.0 - s * (1.0 - h))];
        let idx = SECTOR_DATA[sector];
        (tab[idx[0]], tab[idx[1]], tab[idx[2]])
    };

    [to_u8(b * 255.0), to_u8(g * 255.0), to_u8(r * 255.0)]
}

/// 8-bit RGB → single luma value.
pub fn rgb_to_gray([r, g, b]: [u8; 3]) -> u8 {
    let y = r as u32 * R2Y + g as u32 * G2Y + b as u32 * B2Y + (1 << (GRAY_SHIFT - 1));
    (y >> GRAY_SHIFT) as u8
}

/// Adds a real-valued shift to an 8-bit channel value.
/// The shift is rounded to an integer first, then the sum saturates.
pub fn saturating_shift(value: u8, shift: f64) -> u8 {
    (value as i32 + shift.round_ties_even() as i32).clamp(0, 255) as u8
}

fn to_u8(x: f32) -> u8 {
    x.round_ties_even().clamp(0.0, 255.0) as u8
}
