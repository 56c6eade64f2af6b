// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::io::Write;

use byteorder::BigEndian;
use mjpeg_transforms::{
    dct::{BLOCK_SIZE, IDCT_PRESCALE},
    forward_dct_8x8,
};

use crate::{
    bit_writer::BitWriter,
    byte_stream::ByteWriter,
    color::{bgr_to_ycbcr, gray_to_luma},
    entropy_coding::{
        coefficients::{MAX_AC_MAGNITUDE, encode_block},
        huffman::{HuffmanEncodeTable, HuffmanSpec},
    },
    error::Result,
    headers::{
        Component, FrameHeader, HuffmanTableDef, HuffmanTables, Jfif, JpegSegment, Marker,
        QuantTable, QuantTables, RestartInterval, ScanComponent, ScanHeader, TableClass,
    },
    image::{ImageView, Plane},
    options::EncoderOptions,
    tables::{
        STD_AC_CHROMINANCE, STD_AC_LUMINANCE, STD_CHROMINANCE_QUANT, STD_DC_CHROMINANCE,
        STD_DC_LUMINANCE, STD_LUMINANCE_QUANT,
    },
    util::tracing_wrappers::debug,
};

// Post-scales are `2^23 / (q * prescale)`: the 14-bit prescale and the
// 14-bit descale of the forward transform leave 5 bits of headroom, which
// cancel the 8x gain of the unnormalized transform and the `sample * 4`
// domain.
const POSTSCALE_NUMERATOR: i32 = 1 << 23;

// A DC difference must stay within category 11.
const MIN_DC: i32 = -1024;
const MAX_DC: i32 = 1023;

/// Per-component coding state for one scan.
struct ComponentCoder<'a> {
    postscale: &'a [i32; BLOCK_SIZE],
    dc_table: &'a HuffmanEncodeTable,
    ac_table: &'a HuffmanEncodeTable,
    predictor: i32,
}

impl ComponentCoder<'_> {
    fn encode_block<W: Write>(
        &mut self,
        bw: &mut BitWriter<W>,
        plane: &Plane,
        bx: usize,
        by: usize,
        coeffs: &mut [i32; BLOCK_SIZE],
    ) -> Result<()> {
        forward_dct_8x8(plane.block(bx, by), plane.stride(), self.postscale, coeffs);
        coeffs[0] = coeffs[0].clamp(MIN_DC, MAX_DC);
        for c in &mut coeffs[1..] {
            *c = (*c).clamp(-MAX_AC_MAGNITUDE, MAX_AC_MAGNITUDE);
        }
        encode_block(bw, self.dc_table, self.ac_table, &mut self.predictor, coeffs)
    }
}

/// Quantization table for `quality`, natural order.
fn scaled_quant_table(base: &[u8; BLOCK_SIZE], quality: u32) -> [u8; BLOCK_SIZE] {
    array_init::array_init(|k| {
        let q = (base[k] as f64 / quality as f64).round_ties_even();
        q.clamp(1.0, 255.0) as u8
    })
}

/// Forward-transform post-scales for `table`. `footprint` is the number of
/// samples summed into each chroma sample.
fn postscale_table(table: &[u8; BLOCK_SIZE], footprint: i32) -> [i32; BLOCK_SIZE] {
    array_init::array_init(|k| {
        let d = table[k] as i32 * footprint * IDCT_PRESCALE[k];
        POSTSCALE_NUMERATOR / d
    })
}

fn huffman_def(class: TableClass, index: u8, packed: &[u8]) -> Result<HuffmanTableDef> {
    Ok(HuffmanTableDef {
        class,
        index,
        spec: HuffmanSpec::from_packed(packed)?,
    })
}

/// Baseline JPEG encoder with fixed standard Huffman tables.
#[derive(Debug, Clone, Default)]
pub struct JpegEncoder {
    options: EncoderOptions,
}

impl JpegEncoder {
    pub fn new(options: EncoderOptions) -> Self {
        JpegEncoder { options }
    }

    pub fn options(&self) -> &EncoderOptions {
        &self.options
    }

    /// Encodes `image` into a new buffer.
    pub fn encode(&self, image: &ImageView) -> Result<Vec<u8>> {
        self.encode_to_writer(image, Vec::new())
    }

    /// Encodes `image` into `sink` and hands the sink back once the stream
    /// has been flushed.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, err))]
    pub fn encode_to_writer<W: Write>(&self, image: &ImageView, sink: W) -> Result<W> {
        let quality = self.options.clamped_quality();
        let color = image.channels() == 3;
        let (h, v) = if color {
            self.options.subsampling.luma_sampling()
        } else {
            (1, 1)
        };
        let restart_interval = self.options.restart_interval.unwrap_or(0);
        debug!(
            width = image.width(),
            height = image.height(),
            channels = image.channels(),
            quality,
            "encoding"
        );

        let luma_quant = scaled_quant_table(&STD_LUMINANCE_QUANT, quality);
        let chroma_quant = scaled_quant_table(&STD_CHROMINANCE_QUANT, quality);
        let luma_postscale = postscale_table(&luma_quant, 1);
        let chroma_postscale = postscale_table(&chroma_quant, h as i32 * v as i32);

        let mut huffman = vec![
            huffman_def(TableClass::Dc, 0, &STD_DC_LUMINANCE)?,
            huffman_def(TableClass::Ac, 0, &STD_AC_LUMINANCE)?,
        ];
        if color {
            huffman.push(huffman_def(TableClass::Dc, 1, &STD_DC_CHROMINANCE)?);
            huffman.push(huffman_def(TableClass::Ac, 1, &STD_AC_CHROMINANCE)?);
        }
        let dc_luma = HuffmanEncodeTable::build(&huffman[0].spec)?;
        let ac_luma = HuffmanEncodeTable::build(&huffman[1].spec)?;
        let (dc_chroma, ac_chroma) = if color {
            (
                HuffmanEncodeTable::build(&huffman[2].spec)?,
                HuffmanEncodeTable::build(&huffman[3].spec)?,
            )
        } else {
            (dc_luma.clone(), ac_luma.clone())
        };

        let num_components = if color { 3 } else { 1 };
        let frame = FrameHeader {
            precision: 8,
            height: image.height() as u16,
            width: image.width() as u16,
            components: (0..num_components)
                .map(|i| Component {
                    id: i + 1,
                    h: if i == 0 { h } else { 1 },
                    v: if i == 0 { v } else { 1 },
                    quant_table: (i > 0) as u8,
                })
                .collect(),
        };
        let scan = ScanHeader::sequential(
            (0..num_components)
                .map(|i| ScanComponent {
                    id: i + 1,
                    dc_table: (i > 0) as u8,
                    ac_table: (i > 0) as u8,
                })
                .collect(),
        );

        let mut bytes = ByteWriter::<W, BigEndian>::new(sink);
        bytes.put_word(Marker::Soi.word())?;
        Jfif::default().write(&mut bytes)?;
        QuantTables(vec![QuantTable::new(0, &luma_quant)]).write(&mut bytes)?;
        if color {
            QuantTables(vec![QuantTable::new(1, &chroma_quant)]).write(&mut bytes)?;
        }
        for def in huffman {
            HuffmanTables(vec![def]).write(&mut bytes)?;
        }
        frame.write(&mut bytes)?;
        if restart_interval > 0 {
            RestartInterval(restart_interval).write(&mut bytes)?;
        }
        scan.write(&mut bytes)?;

        let mut bw = BitWriter::new(bytes);
        let mut coders = [
            ComponentCoder {
                postscale: &luma_postscale,
                dc_table: &dc_luma,
                ac_table: &ac_luma,
                predictor: 0,
            },
            ComponentCoder {
                postscale: &chroma_postscale,
                dc_table: &dc_chroma,
                ac_table: &ac_chroma,
                predictor: 0,
            },
            ComponentCoder {
                postscale: &chroma_postscale,
                dc_table: &dc_chroma,
                ac_table: &ac_chroma,
                predictor: 0,
            },
        ];

        let (mcu_width, mcu_height) = (h as usize * 8, v as usize * 8);
        let (h_shift, v_shift) = (h.trailing_zeros(), v.trailing_zeros());
        let mut luma = Plane::new(mcu_width, mcu_height);
        let mut cb = Plane::new(8, 8);
        let mut cr = Plane::new(8, 8);
        let mut coeffs = [0; BLOCK_SIZE];

        let (width, height) = image.size();
        let (mcus_x, mcus_y) = (width.div_ceil(mcu_width), height.div_ceil(mcu_height));
        let total_mcus = mcus_x * mcus_y;
        let mut restarts = 0;

        for mcu in 0..total_mcus {
            let (x0, y0) = ((mcu % mcus_x) * mcu_width, (mcu / mcus_x) * mcu_height);

            cb.clear();
            cr.clear();
            for i in 0..mcu_height {
                let src = image.row((y0 + i).min(height - 1));
                let luma_row = luma.row_mut(i);
                for (j, sample) in luma_row.iter_mut().enumerate() {
                    let x = (x0 + j).min(width - 1);
                    if color {
                        let (y, u, w) =
                            bgr_to_ycbcr([src[3 * x], src[3 * x + 1], src[3 * x + 2]]);
                        *sample = y;
                        // Subsampled chroma holds footprint sums.
                        cb.row_mut(i >> v_shift)[j >> h_shift] += u;
                        cr.row_mut(i >> v_shift)[j >> h_shift] += w;
                    } else {
                        *sample = gray_to_luma(src[x]);
                    }
                }
            }

            for by in 0..v as usize {
                for bx in 0..h as usize {
                    coders[0].encode_block(&mut bw, &luma, bx, by, &mut coeffs)?;
                }
            }
            if color {
                coders[1].encode_block(&mut bw, &cb, 0, 0, &mut coeffs)?;
                coders[2].encode_block(&mut bw, &cr, 0, 0, &mut coeffs)?;
            }

            let done = mcu + 1;
            if restart_interval > 0 && done % restart_interval as usize == 0 && done < total_mcus {
                bw.flush(true)?;
                bw.bytes_mut().put_word(Marker::restart(restarts).word())?;
                restarts += 1;
                for coder in &mut coders {
                    coder.predictor = 0;
                }
            }
        }

        bw.flush(true)?;
        let mut bytes = bw.into_inner();
        bytes.put_word(Marker::Eoi.word())?;
        debug!(bytes = bytes.position(), restarts, "encoded");
        bytes.into_inner()
    }
}

/// Encodes `image` with `options`.
pub fn encode(image: &ImageView, options: EncoderOptions) -> Result<Vec<u8>> {
    JpegEncoder::new(options).encode(image)
}
