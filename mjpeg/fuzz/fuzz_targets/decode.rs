// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.
#![no_main]

use libfuzzer_sys::fuzz_target;
use mjpeg::{DecoderOptions, JpegDecoder, OutputFormat};

fuzz_target!(|data: &[u8]| {
    for output in [OutputFormat::Native, OutputFormat::Gray, OutputFormat::Bgr] {
        let mut options = DecoderOptions::default();
        options.output = output;
        options.pixel_limit = Some(1 << 22);
        let Ok(image) = JpegDecoder::new(options).decode(data) else {
            return;
        };
        assert_eq!(image.data().len(), image.width() * image.height() * image.channels());
    }
});
