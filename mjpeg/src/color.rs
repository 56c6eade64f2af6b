// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Fixed-point conversion between 8-bit samples and the `sample * 4 - 512`
//! domain the transforms work in. Color samples are stored B, G, R.

use mjpeg_transforms::dct::descale;

/// Fractional bits of the conversion constants.
pub const COLOR_FIX_BITS: u32 = 12;

// YCbCr -> RGB: 1.772, -0.34414, -0.71414, 1.402.
const B_CB: i32 = 7258;
const G_CB: i32 = -1410;
const G_CR: i32 = -2925;
const R_CR: i32 = 5743;

// RGB -> YCbCr.
const Y_R: i32 = 1225;
const Y_G: i32 = 2404;
const Y_B: i32 = 467;
const CB_R: i32 = -691;
const CB_G: i32 = -1357;
const CB_B: i32 = 2048;
const CR_R: i32 = 2048;
const CR_G: i32 = -1715;
const CR_B: i32 = -333;

/// Offset of a zero sample in the transform domain.
pub const SAMPLE_OFFSET: i32 = 128 * 4;

// Bounds well outside anything a valid stream produces; keeps the products
// below from overflowing on corrupt input.
const MAX_COMPONENT: i32 = 1 << 15;

#[inline]
fn saturate(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// Luma and chroma of one BGR pixel, scaled by 4, luma centered on zero.
#[inline]
pub fn bgr_to_ycbcr(bgr: [u8; 3]) -> (i32, i32, i32) {
    let [b, g, r] = bgr.map(i32::from);
    let shift = COLOR_FIX_BITS - 2;
    (
        descale(r * Y_R + g * Y_G + b * Y_B, shift) - SAMPLE_OFFSET,
        descale(r * CB_R + g * CB_G + b * CB_B, shift),
        descale(r * CR_R + g * CR_G + b * CR_B, shift),
    )
}

#[inline]
pub fn gray_to_luma(v: u8) -> i32 {
    v as i32 * 4 - SAMPLE_OFFSET
}

#[inline]
pub fn luma_to_gray(y: i32) -> u8 {
    saturate(descale(y.clamp(-MAX_COMPONENT, MAX_COMPONENT) + SAMPLE_OFFSET, 2))
}

/// Inverse of [`bgr_to_ycbcr`], saturating each channel.
#[inline]
pub fn ycbcr_to_bgr(y: i32, cb: i32, cr: i32) -> [u8; 3] {
    let y = (y.clamp(-MAX_COMPONENT, MAX_COMPONENT) + SAMPLE_OFFSET) << COLOR_FIX_BITS;
    let cb = cb.clamp(-MAX_COMPONENT, MAX_COMPONENT);
    let cr = cr.clamp(-MAX_COMPONENT, MAX_COMPONENT);
    let shift = COLOR_FIX_BITS + 2;
    [
        saturate((y + cb * B_CB) >> shift),
        saturate((y + cb * G_CB + cr * G_CR) >> shift),
        saturate((y + cr * R_CR) >> shift),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_constants_sum_to_one() {
        assert_eq!(Y_R + Y_G + Y_B, 1 << COLOR_FIX_BITS);
        assert_eq!(CB_R + CB_G + CB_B, 0);
        assert_eq!(CR_R + CR_G + CR_B, 0);
    }

    #[test]
    fn test_gray_levels() {
        assert_eq!(gray_to_luma(0), -512);
        assert_eq!(gray_to_luma(255), 508);
        for v in 0..=255u8 {
            assert_eq!(luma_to_gray(gray_to_luma(v)), v);
            let (y, cb, cr) = bgr_to_ycbcr([v, v, v]);
            assert_eq!((y, cb, cr), (gray_to_luma(v), 0, 0));
        }
    }

    #[test]
    fn test_primaries() {
        // Pure red: Y = .299 * 255, Cr = .5 * 255, each scaled by 4.
        let (y, cb, cr) = bgr_to_ycbcr([0, 0, 255]);
        assert_eq!(y, 305 - 512);
        assert_eq!(cb, -172);
        assert_eq!(cr, 510);
    }

    #[test]
    fn test_round_trip_is_close() {
        for b in (0..=255u8).step_by(15) {
            for g in (0..=255u8).step_by(17) {
                for r in (0..=255u8).step_by(51) {
                    let (y, cb, cr) = bgr_to_ycbcr([b, g, r]);
                    let out = ycbcr_to_bgr(y, cb, cr);
                    for (got, want) in out.iter().zip([b, g, r]) {
                        assert!(got.abs_diff(want) <= 2, "{:?} -> {:?}", [b, g, r], out);
                    }
                }
            }
        }
    }

    #[test]
    fn test_corrupt_values_saturate() {
        assert_eq!(ycbcr_to_bgr(i32::MAX, i32::MIN, i32::MAX), [0, 255, 255]);
        assert_eq!(luma_to_gray(i32::MIN), 0);
        assert_eq!(luma_to_gray(i32::MAX), 255);
    }
}
