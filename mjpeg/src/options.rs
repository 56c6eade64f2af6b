// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

/// Lowest accepted encoder quality.
pub const MIN_QUALITY: u32 = 3;
/// Highest accepted encoder quality, giving the finest quantization.
pub const MAX_QUALITY: u32 = 12;

/// Chroma resolution of color output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Subsampling {
    /// Chroma halved in both directions (luma sampled 2x2).
    #[default]
    Yuv420,
    /// Full-resolution chroma.
    Yuv444,
}

impl Subsampling {
    /// Luma sampling factors `(h, v)`; chroma is always 1x1.
    pub fn luma_sampling(self) -> (u8, u8) {
        match self {
            Subsampling::Yuv420 => (2, 2),
            Subsampling::Yuv444 => (1, 1),
        }
    }
}

#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct EncoderOptions {
    /// Quantization tables are the standard ones divided by `quality`.
    /// Values outside `[MIN_QUALITY, MAX_QUALITY]` are clamped.
    pub quality: u32,
    /// Ignored for gray input.
    pub subsampling: Subsampling,
    /// Emit a restart marker every this many MCUs. `None` or `Some(0)`
    /// disables restarts.
    pub restart_interval: Option<u16>,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            quality: MAX_QUALITY,
            subsampling: Subsampling::default(),
            restart_interval: None,
        }
    }
}

impl EncoderOptions {
    pub fn clamped_quality(&self) -> u32 {
        self.quality.clamp(MIN_QUALITY, MAX_QUALITY)
    }
}

/// Layout of decoded pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One channel for gray images, B, G, R for color ones.
    #[default]
    Native,
    /// Luma only. Chroma is entropy-decoded but never transformed.
    Gray,
    /// Always B, G, R; gray images are replicated into all three.
    Bgr,
}

/// Default for [`DecoderOptions::pixel_limit`]: 8192 x 8192.
pub const DEFAULT_PIXEL_LIMIT: usize = 1 << 26;

#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct DecoderOptions {
    pub output: OutputFormat,
    /// Fail decoding frames with more than this number of pixels, before
    /// any pixel buffer is allocated. `None` disables the check.
    pub pixel_limit: Option<usize>,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            output: OutputFormat::Native,
            pixel_limit: Some(DEFAULT_PIXEL_LIMIT),
        }
    }
}

impl DecoderOptions {
    /// Channels of the decoded image for a frame with `components`
    /// components.
    pub fn output_channels(&self, components: usize) -> usize {
        match self.output {
            OutputFormat::Native if components == 3 => 3,
            OutputFormat::Native | OutputFormat::Gray => 1,
            OutputFormat::Bgr => 3,
        }
    }
}
