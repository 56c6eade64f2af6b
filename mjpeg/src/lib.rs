// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Self-contained baseline JPEG codec for motion-JPEG frames.
//!
//! Both directions work on interleaved 8-bit pixel buffers: one channel for
//! gray, three channels in B, G, R order for color. The encoder writes a
//! JFIF stream with the standard quantization and Huffman tables; the decoder
//! accepts any baseline sequential Huffman stream with 1 or 3 components.

#![deny(unsafe_code)]
pub mod bit_reader;
pub mod bit_writer;
pub mod byte_stream;
pub mod color;
pub mod decode;
pub mod encode;
pub mod entropy_coding;
pub mod error;
pub mod headers;
pub mod image;
pub mod options;
pub mod tables;
pub mod util;

pub use decode::{ImageInfo, JpegDecoder, decode};
pub use encode::{JpegEncoder, encode};
pub use error::{Error, HeaderError, Result};
pub use image::{Image, ImageView};
pub use options::{DecoderOptions, EncoderOptions, OutputFormat, Subsampling};
