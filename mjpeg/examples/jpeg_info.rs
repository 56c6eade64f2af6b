// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Example: print the layout of a baseline JPEG file and check that it
//! decodes.
//!
//! Usage:
//!   cargo run --example jpeg_info -- input.jpg

use mjpeg::{JpegDecoder, error::Error};
use std::env;
use std::fs;

fn main() -> Result<(), Error> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <input.jpg>", args[0]);
        std::process::exit(1);
    }

    let filename = &args[1];
    let data = fs::read(filename)?;
    let info = JpegDecoder::read_info(&data)?;

    println!("=== Baseline JPEG Info ===");
    println!("File: {}", filename);
    println!("  Size: {}x{}", info.width, info.height);
    println!(
        "  Components: {} ({})",
        info.components,
        if info.components == 3 { "YCbCr" } else { "gray" }
    );
    println!("  Luma sampling: {}x{}", info.sampling.0, info.sampling.1);
    if info.restart_interval > 0 {
        println!("  Restart interval: {} MCUs", info.restart_interval);
    }
    match info.jfif {
        Some(jfif) => println!(
            "  JFIF {}.{:02}, density {}x{} (units {})",
            jfif.version >> 8,
            jfif.version & 0xff,
            jfif.x_density,
            jfif.y_density,
            jfif.density_units
        ),
        None => println!("  No JFIF segment"),
    }

    let image = mjpeg::decode(&data)?;
    println!(
        "Decoded {} bytes of {}-channel pixels",
        image.data().len(),
        image.channels()
    );
    Ok(())
}
