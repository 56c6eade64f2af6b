// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.
#![no_main]

use libfuzzer_sys::fuzz_target;
use mjpeg::{EncoderOptions, ImageView, JpegEncoder, Subsampling, decode};

// The first bytes pick the layout; the rest are pixels.
fuzz_target!(|data: &[u8]| {
    let [w, h, flags, quality, pixels @ ..] = data else {
        return;
    };
    let (width, height) = (*w as usize % 64 + 1, *h as usize % 64 + 1);
    let channels = if flags & 1 == 0 { 1 } else { 3 };
    let Ok(view) = ImageView::new(pixels, width, height, channels) else {
        return;
    };
    let mut options = EncoderOptions::default();
    options.quality = *quality as u32;
    options.subsampling = if flags & 2 == 0 {
        Subsampling::Yuv420
    } else {
        Subsampling::Yuv444
    };
    options.restart_interval = Some((flags >> 2) as u16);
    let encoded = JpegEncoder::new(options).encode(&view).unwrap();
    let image = decode(&encoded).unwrap();
    assert_eq!(image.size(), (width, height));
    assert_eq!(image.channels(), channels);
});
