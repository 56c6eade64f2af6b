// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.
#![no_main]

use libfuzzer_sys::fuzz_target;
use mjpeg::JpegDecoder;

fuzz_target!(|data: &[u8]| {
    if let Ok(info) = JpegDecoder::read_info(data) {
        assert!(info.width > 0 && info.height > 0);
        assert!(info.components == 1 || info.components == 3);
    }
});
