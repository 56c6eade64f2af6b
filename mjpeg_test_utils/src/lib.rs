// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Shared helpers for the mjpeg test suites: tolerance assertions and
//! deterministic synthetic images.

use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

#[macro_export]
macro_rules! assert_almost_eq {
    ($left:expr, $right:expr, $max_error:expr $(,)?) => {
        match (&$left, &$right) {
            (left_val, right_val) => {
                let diff = if *left_val > *right_val {
                    *left_val - *right_val
                } else {
                    *right_val - *left_val
                };
                if !(diff <= $max_error) {
                    panic!(
                        "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n max_error: `{:?}`",
                        left_val, right_val, $max_error
                    );
                }
            }
        }
    };
}

/// Asserts that two sample buffers have equal length and differ by at most
/// `max_error` at every position.
#[macro_export]
macro_rules! assert_all_almost_eq {
    ($left:expr, $right:expr, $max_error:expr $(,)?) => {
        let (left_val, right_val) = (&$left, &$right);
        assert_eq!(left_val.len(), right_val.len(), "length mismatch");
        if let Some(index) = $crate::first_mismatch(left_val, right_val, $max_error) {
            panic!(
                "assertion failed: `(left ≈ right)` at index {}\n  left: `{}`,\n right: `{}`,\n max_error: `{}`",
                index, left_val[index], right_val[index], $max_error
            );
        }
    };
}

/// Index of the first sample pair whose difference exceeds `max_error`.
pub fn first_mismatch(left: &[u8], right: &[u8], max_error: u8) -> Option<usize> {
    left.iter()
        .zip(right)
        .position(|(&l, &r)| l.abs_diff(r) > max_error)
}

/// Mean absolute difference between two equally sized sample buffers.
pub fn mean_abs_diff(left: &[u8], right: &[u8]) -> f64 {
    assert_eq!(left.len(), right.len());
    if left.is_empty() {
        return 0.0;
    }
    let total: u64 = left
        .iter()
        .zip(right)
        .map(|(&l, &r)| l.abs_diff(r) as u64)
        .sum();
    total as f64 / left.len() as f64
}

/// Peak signal-to-noise ratio in dB; infinite for identical buffers.
pub fn psnr(left: &[u8], right: &[u8]) -> f64 {
    assert_eq!(left.len(), right.len());
    let sse: f64 = left
        .iter()
        .zip(right)
        .map(|(&l, &r)| {
            let d = l as f64 - r as f64;
            d * d
        })
        .sum();
    if sse == 0.0 {
        return f64::INFINITY;
    }
    let mse = sse / left.len() as f64;
    10.0 * (255.0 * 255.0 / mse).log10()
}

/// Tightly packed image with every sample set to `value`.
pub fn uniform_image(width: usize, height: usize, channels: usize, value: u8) -> Vec<u8> {
    vec![value; width * height * channels]
}

/// Smooth diagonal ramp. Channel `c` is offset by `c * 40` so that color
/// images are not gray.
pub fn gradient_image(width: usize, height: usize, channels: usize) -> Vec<u8> {
    let span = (width + height).max(2) - 2;
    let mut data = Vec::with_capacity(width * height * channels);
    for y in 0..height {
        for x in 0..width {
            let base = if span == 0 { 0 } else { (x + y) * 200 / span };
            for c in 0..channels {
                data.push((base + c * 40).min(255) as u8);
            }
        }
    }
    data
}

/// Uniformly random samples from a seeded generator.
pub fn noise_image(width: usize, height: usize, channels: usize, seed: u64) -> Vec<u8> {
    let mut rng = XorShiftRng::seed_from_u64(seed);
    (0..width * height * channels).map(|_| rng.random()).collect()
}
