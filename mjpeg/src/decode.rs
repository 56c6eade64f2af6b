// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::io::Read;

use byteorder::BigEndian;
use mjpeg_transforms::{
    dct::{BLOCK_SIZE, IDCT_PRESCALE},
    inverse_dct_8x8,
};

use crate::{
    bit_reader::BitReader,
    byte_stream::ByteReader,
    color::{luma_to_gray, ycbcr_to_bgr},
    entropy_coding::{coefficients::decode_block, huffman::HuffmanDecodeTable},
    error::{Error, HeaderError, Result},
    headers::{
        FrameHeader, HuffmanTables, JpegSegment, Jfif, Marker, QuantTables, RestartInterval,
        ScanHeader, TableClass, markers::next_marker, parse_segment, read_payload, skip_segment,
        tables::NUM_HUFFMAN_TABLES,
    },
    image::{Image, Plane},
    options::DecoderOptions,
    util::tracing_wrappers::{debug, trace, warn},
};

// Multipliers carry the 14-bit transform prescale; dropping 12 bits leaves
// the 2 fractional bits of the `sample * 4` domain.
const DEQUANT_SHIFT: u32 = 12;
const MAX_DEQUANTIZED: i64 = 1 << 24;

/// Header-level description of a stream, available without decoding
/// entropy-coded data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: usize,
    pub height: usize,
    /// 1 for gray, 3 for YCbCr.
    pub components: usize,
    /// Luma sampling factors `(h, v)`.
    pub sampling: (u8, u8),
    pub jfif: Option<Jfif>,
    /// MCUs between restart markers, 0 if restarts are disabled.
    pub restart_interval: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    ExpectSoi,
    ScanningMarkers,
    HeaderParsed,
    Scanning,
    Done,
    Error,
}

/// Dequantization multipliers for one table, natural order.
type DequantTable = [i64; BLOCK_SIZE];

/// Baseline JPEG decoder. One instance decodes one stream.
///
/// Only single-scan streams are supported: a color frame must be coded in
/// one interleaved scan covering Y, Cb and Cr. Streams that split the
/// components over several non-interleaved scans are rejected, either with
/// [`HeaderError::UnsupportedScan`] when the first scan does not cover every
/// component or with [`HeaderError::MultipleScans`] when a second scan
/// follows.
pub struct JpegDecoder {
    options: DecoderOptions,
    state: DecoderState,
    frame: Option<FrameHeader>,
    jfif: Option<Jfif>,
    quant_tables: [Option<DequantTable>; 3],
    dc_tables: [Option<HuffmanDecodeTable>; NUM_HUFFMAN_TABLES as usize],
    ac_tables: [Option<HuffmanDecodeTable>; NUM_HUFFMAN_TABLES as usize],
    restart_interval: u16,
}

impl JpegDecoder {
    pub fn new(options: DecoderOptions) -> Self {
        JpegDecoder {
            options,
            state: DecoderState::ExpectSoi,
            frame: None,
            jfif: None,
            quant_tables: [None; 3],
            dc_tables: Default::default(),
            ac_tables: Default::default(),
            restart_interval: 0,
        }
    }

    /// Parses markers up to the start of the scan and reports the image
    /// layout. No pixel limit applies since nothing is allocated.
    pub fn read_info(data: &[u8]) -> Result<ImageInfo> {
        let mut options = DecoderOptions::default();
        options.pixel_limit = None;
        let mut decoder = JpegDecoder::new(options);
        let mut bytes = ByteReader::new(data);
        decoder.run(|d| d.read_headers(&mut bytes))?;
        decoder.info()
    }

    /// Decodes a complete stream held in memory.
    ///
    /// Non-interleaved multi-scan color streams are not supported; see
    /// [`JpegDecoder`].
    pub fn decode(&mut self, data: &[u8]) -> Result<Image> {
        self.decode_from_reader(data)
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, err))]
    pub fn decode_from_reader<R: Read>(&mut self, source: R) -> Result<Image> {
        let mut bytes = ByteReader::new(source);
        self.run(|d| {
            let scan = d.read_headers(&mut bytes)?;
            let image = d.decode_scan(&scan, &mut bytes)?;
            d.finish(&mut bytes)?;
            Ok(image)
        })
    }

    // A decoder handles a single stream; any further call fails.
    fn run<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.state != DecoderState::ExpectSoi {
            return Err(HeaderError::UnexpectedMarker {
                expected: "SOI",
                found: 0,
                offset: 0,
            }
            .into());
        }
        let result = f(self);
        if result.is_err() {
            self.state = DecoderState::Error;
        }
        result
    }

    fn info(&self) -> Result<ImageInfo> {
        let frame = match self.state {
            DecoderState::HeaderParsed | DecoderState::Scanning | DecoderState::Done => {
                self.frame.as_ref().ok_or(HeaderError::MissingFrame)?
            }
            _ => return Err(HeaderError::MissingFrame.into()),
        };
        Ok(ImageInfo {
            width: frame.width as usize,
            height: frame.height as usize,
            components: frame.components.len(),
            sampling: (frame.components[0].h, frame.components[0].v),
            jfif: self.jfif,
            restart_interval: self.restart_interval,
        })
    }

    fn read_headers<R: Read>(
        &mut self,
        bytes: &mut ByteReader<R, BigEndian>,
    ) -> Result<ScanHeader> {
        let soi = [bytes.get_byte()?, bytes.get_byte()?];
        if soi != [0xff, Marker::Soi.code()] {
            return Err(HeaderError::MissingSoi(soi[0], soi[1]).into());
        }
        self.state = DecoderState::ScanningMarkers;

        loop {
            let code = next_marker(bytes)?;
            let offset = bytes.position() - 2;
            let Some(marker) = Marker::from_code(code) else {
                debug!(code, offset, "skipping unknown segment");
                skip_segment(bytes, "unknown")?;
                continue;
            };
            match marker {
                Marker::Sof0 | Marker::Sof1 => {
                    if self.state == DecoderState::HeaderParsed {
                        return Err(HeaderError::DuplicateFrame.into());
                    }
                    let frame: FrameHeader =
                        parse_segment(&read_payload(bytes, FrameHeader::NAME)?)?;
                    debug!(
                        width = frame.width,
                        height = frame.height,
                        components = frame.components.len(),
                        "frame header"
                    );
                    self.check_pixel_limit(&frame)?;
                    self.frame = Some(frame);
                    self.state = DecoderState::HeaderParsed;
                }
                Marker::Dht => {
                    let tables: HuffmanTables =
                        parse_segment(&read_payload(bytes, HuffmanTables::NAME)?)?;
                    for def in tables.0 {
                        debug!(class = def.class as u8, index = def.index, "huffman table");
                        let table = HuffmanDecodeTable::build(&def.spec)
                            .map_err(HeaderError::InvalidHuffmanTable)?;
                        let slots = match def.class {
                            TableClass::Dc => &mut self.dc_tables,
                            TableClass::Ac => &mut self.ac_tables,
                        };
                        slots[def.index as usize] = Some(table);
                    }
                }
                Marker::Dqt => {
                    let tables: QuantTables =
                        parse_segment(&read_payload(bytes, QuantTables::NAME)?)?;
                    for table in tables.0 {
                        debug!(index = table.index, wide = table.wide, "quantization table");
                        self.quant_tables[table.index as usize] =
                            Some(array_init::array_init(|k| {
                                table.values[k] as i64 * IDCT_PRESCALE[k] as i64
                            }));
                    }
                }
                Marker::Dri => {
                    let RestartInterval(interval) =
                        parse_segment(&read_payload(bytes, RestartInterval::NAME)?)?;
                    debug!(interval, "restart interval");
                    self.restart_interval = interval;
                }
                Marker::App0 => {
                    let payload = read_payload(bytes, Jfif::NAME)?;
                    if Jfif::is_jfif(&payload) {
                        match parse_segment::<Jfif>(&payload) {
                            Ok(jfif) => self.jfif = Some(jfif),
                            Err(_e) => warn!(error = %_e, "ignoring malformed JFIF segment"),
                        }
                    }
                }
                Marker::Sos => {
                    if self.state != DecoderState::HeaderParsed {
                        return Err(HeaderError::MissingFrame.into());
                    }
                    let scan: ScanHeader = parse_segment(&read_payload(bytes, ScanHeader::NAME)?)?;
                    self.check_scan(&scan)?;
                    self.state = DecoderState::Scanning;
                    return Ok(scan);
                }
                Marker::Eoi => {
                    return Err(HeaderError::UnexpectedMarker {
                        expected: "SOS",
                        found: code,
                        offset,
                    }
                    .into());
                }
                m if m.is_standalone() => {
                    debug!(code, offset, "skipping standalone marker");
                }
                m => {
                    if let Some(frame_type) = m.frame_type() {
                        return Err(HeaderError::UnsupportedFrameType(frame_type).into());
                    }
                    debug!(code, offset, "skipping segment");
                    skip_segment(bytes, "APPn/COM")?;
                }
            }
        }
    }

    fn check_pixel_limit(&self, frame: &FrameHeader) -> Result<(), HeaderError> {
        let (width, height) = (frame.width as usize, frame.height as usize);
        match self.options.pixel_limit {
            Some(limit) if width * height > limit => Err(HeaderError::PixelLimitExceeded {
                width,
                height,
                limit,
            }),
            _ => Ok(()),
        }
    }

    fn check_scan(&self, scan: &ScanHeader) -> Result<(), HeaderError> {
        let frame = self.frame.as_ref().ok_or(HeaderError::MissingFrame)?;
        scan.check_baseline(frame)?;
        for (sc, c) in scan.components.iter().zip(&frame.components) {
            if self.quant_tables[c.quant_table as usize].is_none() {
                return Err(HeaderError::MissingQuantTable(c.quant_table));
            }
            for (class, index, slots) in [
                (TableClass::Dc, sc.dc_table, &self.dc_tables),
                (TableClass::Ac, sc.ac_table, &self.ac_tables),
            ] {
                if slots[index as usize].is_none() {
                    return Err(HeaderError::MissingHuffmanTable {
                        class: class as u8,
                        index,
                    });
                }
            }
        }
        Ok(())
    }

    /// Entropy-decodes the scan and writes pixels MCU by MCU.
    fn decode_scan<R: Read>(
        &mut self,
        scan: &ScanHeader,
        bytes: &mut ByteReader<R, BigEndian>,
    ) -> Result<Image> {
        let frame = self.frame.as_ref().ok_or(HeaderError::MissingFrame)?;
        let channels = self.options.output_channels(frame.components.len());
        let mut image = Image::new(frame.width as usize, frame.height as usize, channels)?;

        let mut components = Vec::with_capacity(frame.components.len());
        for (sc, c) in scan.components.iter().zip(&frame.components) {
            let (h, v) = if frame.is_color() {
                (c.h as usize, c.v as usize)
            } else {
                (1, 1)
            };
            components.push(ScanState {
                h,
                v,
                dc_table: self.dc_tables[sc.dc_table as usize]
                    .as_ref()
                    .ok_or(HeaderError::MissingHuffmanTable {
                        class: TableClass::Dc as u8,
                        index: sc.dc_table,
                    })?,
                ac_table: self.ac_tables[sc.ac_table as usize]
                    .as_ref()
                    .ok_or(HeaderError::MissingHuffmanTable {
                        class: TableClass::Ac as u8,
                        index: sc.ac_table,
                    })?,
                quant: self.quant_tables[c.quant_table as usize]
                    .as_ref()
                    .ok_or(HeaderError::MissingQuantTable(c.quant_table))?,
                plane: Plane::new(h * 8, v * 8),
                predictor: 0,
            });
        }
        // Chroma stays untransformed for gray output.
        let transformed = if channels == 1 { 1 } else { components.len() };
        let (shift_x, shift_y) = if frame.is_color() {
            (
                (components[0].h / components[1].h).trailing_zeros(),
                (components[0].v / components[1].v).trailing_zeros(),
            )
        } else {
            (0, 0)
        };

        let (mcu_w, mcu_h) = frame.mcu_size();
        let (mcus_x, mcus_y) = frame.mcu_grid();
        let interval = self.restart_interval as usize;
        debug!(mcus_x, mcus_y, interval, "decoding scan");

        let mut br = BitReader::new(bytes);
        let mut coeffs = [0; BLOCK_SIZE];
        let mut mcus_since_restart = 0;
        for my in 0..mcus_y {
            for mx in 0..mcus_x {
                if interval > 0 && mcus_since_restart == interval {
                    trace!(mx, my, "restart");
                    reset_predictors(&mut components);
                    br.align_on_byte();
                    mcus_since_restart = 0;
                }
                for (i, comp) in components.iter_mut().enumerate() {
                    for by in 0..comp.v {
                        for bx in 0..comp.h {
                            decode_block(
                                &mut br,
                                comp.dc_table,
                                comp.ac_table,
                                &mut comp.predictor,
                                &mut coeffs,
                            )?;
                            if i < transformed {
                                dequantize(&mut coeffs, comp.quant);
                                let stride = comp.plane.stride();
                                inverse_dct_8x8(&coeffs, comp.plane.block_mut(bx, by), stride);
                            }
                        }
                    }
                }
                let x0 = mx * mcu_w;
                let y0 = my * mcu_h;
                let w = mcu_w.min(image.width() - x0);
                let h = mcu_h.min(image.height() - y0);
                for y in 0..h {
                    let out = &mut image.row_mut(y0 + y)[x0 * channels..(x0 + w) * channels];
                    let luma = &components[0].plane.row(y)[..w];
                    if transformed == 3 {
                        let cb = components[1].plane.row(y >> shift_y);
                        let cr = components[2].plane.row(y >> shift_y);
                        for (x, px) in out.chunks_exact_mut(3).enumerate() {
                            let xc = x >> shift_x;
                            px.copy_from_slice(&ycbcr_to_bgr(luma[x], cb[xc], cr[xc]));
                        }
                    } else {
                        for (px, &sample) in out.chunks_exact_mut(channels).zip(luma) {
                            px.fill(luma_to_gray(sample));
                        }
                    }
                }
                mcus_since_restart += 1;
            }
        }
        self.state = DecoderState::Done;
        Ok(image)
    }

    /// Consumes what follows the scan up to EOI.
    fn finish<R: Read>(&mut self, bytes: &mut ByteReader<R, BigEndian>) -> Result<()> {
        if self.state != DecoderState::Done {
            return Err(HeaderError::MissingFrame.into());
        }
        loop {
            let code = match next_marker(bytes) {
                Ok(code) => code,
                Err(Error::StreamTruncated { .. }) => {
                    warn!("stream ends without EOI");
                    return Ok(());
                }
                Err(e) => return Err(e),
            };
            match Marker::from_code(code) {
                Some(Marker::Eoi) => return Ok(()),
                Some(Marker::Sos) => return Err(HeaderError::MultipleScans.into()),
                Some(m) if m.is_standalone() => {}
                _ => {
                    debug!(code, "skipping segment after scan");
                    skip_segment(bytes, "trailing")?;
                }
            }
        }
    }
}

struct ScanState<'a> {
    h: usize,
    v: usize,
    dc_table: &'a HuffmanDecodeTable,
    ac_table: &'a HuffmanDecodeTable,
    quant: &'a DequantTable,
    plane: Plane,
    predictor: i32,
}

fn reset_predictors(components: &mut [ScanState<'_>]) {
    for c in components {
        c.predictor = 0;
    }
}

fn dequantize(coeffs: &mut [i32; BLOCK_SIZE], table: &DequantTable) {
    for (c, &q) in coeffs.iter_mut().zip(table) {
        if *c != 0 {
            let v = (*c as i64 * q + (1 << (DEQUANT_SHIFT - 1))) >> DEQUANT_SHIFT;
            *c = v.clamp(-MAX_DEQUANTIZED, MAX_DEQUANTIZED) as i32;
        }
    }
}

/// Decodes `data` with default options.
///
/// Like [`JpegDecoder::decode`], this accepts single-scan streams only.
pub fn decode(data: &[u8]) -> Result<Image> {
    JpegDecoder::new(DecoderOptions::default()).decode(data)
}
