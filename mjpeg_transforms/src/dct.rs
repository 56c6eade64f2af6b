// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Separable AAN 8x8 transforms in 14-bit fixed point.
//!
//! Blocks are stored row-major: coefficient `(v, u)` lives at `v * 8 + u`,
//! where `v` is the vertical and `u` the horizontal frequency. Spatial samples
//! are expected in the `sample * 4 - 512` domain on both sides.
//!
//! The AAN factorization leaves a per-frequency scale on every coefficient;
//! callers fold [`IDCT_PRESCALE`] into their quantization tables instead of
//! applying it here. Arithmetic wraps on overflow so that corrupt input cannot
//! abort the process.

use std::num::Wrapping;

pub const BLOCK_DIM: usize = 8;
pub const BLOCK_SIZE: usize = BLOCK_DIM * BLOCK_DIM;

/// Fractional bits of the rotation constants.
pub const FIX_BITS: u32 = 14;

/// Fractional bits of the post-scale applied by [`forward_dct_8x8`].
pub const POSTSCALE_BITS: u32 = 14;

/// Fractional bits of [`IDCT_PRESCALE`].
pub const PRESCALE_BITS: u32 = 14;

type W = Wrapping<i32>;

// (x * 2^14 + 0.5) truncated
const C0_707: W = Wrapping(11585);
const C0_541: W = Wrapping(8867);
const C0_382: W = Wrapping(6270);
const C1_306: W = Wrapping(21407);
const C1_082: W = Wrapping(17734);
const C1_414: W = Wrapping(23170);
const C1_847: W = Wrapping(30274);
const C2_613: W = Wrapping(42813);

/// AAN scale factors `c(u) * c(v) * 2^14`, with `c(0) = 1` and
/// `c(k) = cos(k * pi / 16) * sqrt(2)`.
#[rustfmt::skip]
pub const IDCT_PRESCALE: [i32; BLOCK_SIZE] = [
    16384, 22725, 21407, 19266, 16384, 12873,  8867,  4520,
    22725, 31521, 29692, 26722, 22725, 17855, 12299,  6270,
    21407, 29692, 27969, 25172, 21407, 16819, 11585,  5906,
    19266, 26722, 25172, 22654, 19266, 15137, 10426,  5315,
    16384, 22725, 21407, 19266, 16384, 12873,  8867,  4520,
    12873, 17855, 16819, 15137, 12873, 10114,  6967,  3552,
     8867, 12299, 11585, 10426,  8867,  6967,  4799,  2446,
     4520,  6270,  5906,  5315,  4520,  3552,  2446,  1247,
];

/// Rounding right shift: `(x + 2^(n-1)) >> n`.
///
/// ```
/// use mjpeg_transforms::dct::descale;
/// assert_eq!(descale(5, 1), 3);
/// assert_eq!(descale(-5, 1), -2);
/// assert_eq!(descale(1 << 14, 14), 1);
/// ```
#[inline(always)]
pub fn descale(x: i32, n: u32) -> i32 {
    (x + (1 << (n - 1))) >> n
}

#[inline(always)]
fn descale_w(x: W, n: u32) -> W {
    (x + Wrapping(1 << (n - 1))) >> n as usize
}

#[inline(always)]
fn fdct_1d(v: [W; BLOCK_DIM]) -> [W; BLOCK_DIM] {
    let mut out = [Wrapping(0); BLOCK_DIM];

    // Even part.
    let (mut x0, mut x1, mut x2, mut x3) = (v[0], v[7], v[3], v[4]);
    let mut x4 = x0 + x1;
    x0 -= x1;
    x1 = x2 + x3;
    x2 -= x3;
    let (d07, d34) = (x0, x2);
    x2 = x4 + x1;
    x4 -= x1;

    x0 = v[1];
    x3 = v[6];
    x1 = x0 + x3;
    let d16 = x0 - x3;

    x0 = v[2];
    x3 = v[5];
    let d25 = x0 - x3;
    x0 += x3;

    x3 = x0 + x1;
    x0 -= x1;
    x1 = x2 + x3;
    x2 -= x3;
    out[0] = x1;
    out[4] = x2;

    x0 = descale_w((x0 - x4) * C0_707, FIX_BITS);
    x1 = x4 + x0;
    x4 -= x0;
    out[2] = x4;
    out[6] = x1;

    // Odd part.
    let (mut x0, mut x1, mut x2, mut x3) = (d34, d25, d16, d07);
    x0 += x1;
    x1 += x2;
    x2 += x3;
    x1 = descale_w(x1 * C0_707, FIX_BITS);

    let mut x4 = x1 + x3;
    x3 -= x1;
    x1 = (x0 - x2) * C0_382;
    x0 = descale_w(x0 * C0_541 + x1, FIX_BITS);
    x2 = descale_w(x2 * C1_306 + x1, FIX_BITS);

    x1 = x0 + x3;
    x3 -= x0;
    x0 = x4 + x2;
    x4 -= x2;
    out[5] = x1;
    out[1] = x0;
    out[7] = x4;
    out[3] = x3;
    out
}

#[inline(always)]
fn idct_1d(v: [W; BLOCK_DIM]) -> [W; BLOCK_DIM] {
    let mut out = [Wrapping(0); BLOCK_DIM];

    // Odd part.
    let (mut x0, mut x1, mut x2, mut x3) = (v[5], v[3], v[1], v[7]);
    let mut x4 = x0 + x1;
    x0 -= x1;
    x1 = x2 + x3;
    x2 -= x3;
    x3 = x1 + x4;
    x1 -= x4;

    x4 = (x0 + x2) * C1_847;
    x0 = descale_w(x4 - x0 * C2_613, FIX_BITS);
    x2 = descale_w(x2 * C1_082 - x4, FIX_BITS);
    x1 = descale_w(x1 * C1_414, FIX_BITS);

    x0 -= x3;
    x1 -= x0;
    x2 += x1;
    let (o7, o6, o5, o4) = (x3, x0, x1, x2);

    // Even part.
    let (mut x0, mut x1, mut x2, mut x3) = (v[0], v[4], v[2], v[6]);
    let mut x4 = x2 + x3;
    x2 = descale_w((x2 - x3) * C1_414, FIX_BITS) - x4;

    x3 = x0 + x1;
    x0 -= x1;
    x1 = x3 + x4;
    x3 -= x4;
    x4 = x0 + x2;
    x0 -= x2;

    out[0] = x1 + o7;
    out[7] = x1 - o7;
    out[1] = x4 + o6;
    out[6] = x4 - o6;
    out[2] = x0 + o5;
    out[5] = x0 - o5;
    out[3] = x3 - o4;
    out[4] = x3 + o4;
    out
}

/// Forward transform of one 8x8 block with fused quantization.
///
/// `src` holds 8 rows of 8 samples, `stride` elements apart. Every output
/// coefficient is multiplied by `postscale` at the same index and descaled by
/// [`POSTSCALE_BITS`]. A post-scale of `2^23 / (q * prescale)` therefore
/// yields coefficients quantized by `q`.
pub fn forward_dct_8x8(
    src: &[i32],
    stride: usize,
    postscale: &[i32; BLOCK_SIZE],
    dst: &mut [i32; BLOCK_SIZE],
) {
    debug_assert!(src.len() >= stride * (BLOCK_DIM - 1) + BLOCK_DIM);
    let mut work = [Wrapping(0); BLOCK_SIZE];

    for y in 0..BLOCK_DIM {
        let row = &src[y * stride..y * stride + BLOCK_DIM];
        let out = fdct_1d(std::array::from_fn(|x| Wrapping(row[x])));
        work[y * BLOCK_DIM..(y + 1) * BLOCK_DIM].copy_from_slice(&out);
    }

    for x in 0..BLOCK_DIM {
        let out = fdct_1d(std::array::from_fn(|y| work[y * BLOCK_DIM + x]));
        for (v, coeff) in out.iter().enumerate() {
            let idx = v * BLOCK_DIM + x;
            dst[idx] = descale_w(*coeff * Wrapping(postscale[idx]), POSTSCALE_BITS).0;
        }
    }
}

/// Inverse transform of one prescaled 8x8 coefficient block.
///
/// Columns are transformed first, then rows; the row pass writes 8 samples
/// per row into `dst`, `stride` elements apart, descaled by 3 bits.
pub fn inverse_dct_8x8(src: &[i32; BLOCK_SIZE], dst: &mut [i32], stride: usize) {
    debug_assert!(dst.len() >= stride * (BLOCK_DIM - 1) + BLOCK_DIM);
    let mut work = [Wrapping(0); BLOCK_SIZE];

    for x in 0..BLOCK_DIM {
        let out = idct_1d(std::array::from_fn(|v| Wrapping(src[v * BLOCK_DIM + x])));
        for (y, value) in out.iter().enumerate() {
            work[y * BLOCK_DIM + x] = *value;
        }
    }

    for y in 0..BLOCK_DIM {
        let row: [W; BLOCK_DIM] = std::array::from_fn(|u| work[y * BLOCK_DIM + u]);
        let out = idct_1d(row);
        let dst_row = &mut dst[y * stride..y * stride + BLOCK_DIM];
        for (sample, value) in dst_row.iter_mut().zip(out) {
            *sample = descale_w(value, 3).0;
        }
    }
}
