// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use byteorder::WriteBytesExt;

use crate::{
    error::HeaderError,
    headers::{
        FrameHeader, JpegSegment, Marker, SegmentReader,
        frame_header::MAX_BLOCKS_PER_MCU,
        tables::{NUM_HUFFMAN_TABLES, TableClass},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanComponent {
    pub id: u8,
    pub dc_table: u8,
    pub ac_table: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanHeader {
    pub components: Vec<ScanComponent>,
    pub spectral_start: u8,
    pub spectral_end: u8,
    pub approx_high: u8,
    pub approx_low: u8,
}

impl ScanHeader {
    /// Sequential scan over all coefficients of `components`.
    pub fn sequential(components: Vec<ScanComponent>) -> Self {
        ScanHeader {
            components,
            spectral_start: 0,
            spectral_end: 63,
            approx_high: 0,
            approx_low: 0,
        }
    }

    fn unsupported(&self) -> HeaderError {
        HeaderError::UnsupportedScan {
            components: self.components.len() as u8,
            ss: self.spectral_start,
            se: self.spectral_end,
            ah: self.approx_high,
            al: self.approx_low,
        }
    }

    /// Checks that this is the single sequential scan of `frame`: every frame
    /// component in frame order, the full spectrum, no successive
    /// approximation.
    pub fn check_baseline(&self, frame: &FrameHeader) -> Result<(), HeaderError> {
        if self.spectral_start != 0
            || self.spectral_end != 63
            || self.approx_high != 0
            || self.approx_low != 0
            || self.components.len() != frame.components.len()
        {
            return Err(self.unsupported());
        }
        for (i, sc) in self.components.iter().enumerate() {
            match frame.component_index(sc.id) {
                None => return Err(HeaderError::UnknownComponent(sc.id)),
                Some(index) if index != i => return Err(self.unsupported()),
                Some(_) => {}
            }
        }
        if frame.is_color() {
            let blocks: usize = frame.components.iter().map(|c| c.blocks_per_mcu()).sum();
            if blocks > MAX_BLOCKS_PER_MCU {
                return Err(HeaderError::TooManyBlocksPerMcu(blocks));
            }
        }
        Ok(())
    }
}

impl JpegSegment for ScanHeader {
    const MARKER: Marker = Marker::Sos;
    const NAME: &'static str = "SOS";

    fn read(payload: &mut SegmentReader<'_>) -> Result<Self, HeaderError> {
        let count = payload.read_u8()?;
        if !(1..=4).contains(&count) {
            return Err(HeaderError::InvalidComponentCount(count));
        }
        let mut components = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let id = payload.read_u8()?;
            let tables = payload.read_u8()?;
            let (dc_table, ac_table) = (tables >> 4, tables & 15);
            for (class, index) in [(TableClass::Dc, dc_table), (TableClass::Ac, ac_table)] {
                if index >= NUM_HUFFMAN_TABLES {
                    return Err(HeaderError::InvalidHuffmanTableIndex {
                        class: class as u8,
                        index,
                    });
                }
            }
            components.push(ScanComponent {
                id,
                dc_table,
                ac_table,
            });
        }
        let spectral_start = payload.read_u8()?;
        let spectral_end = payload.read_u8()?;
        let approx = payload.read_u8()?;
        payload.finish()?;
        Ok(ScanHeader {
            components,
            spectral_start,
            spectral_end,
            approx_high: approx >> 4,
            approx_low: approx & 15,
        })
    }

    fn write_payload(&self, out: &mut Vec<u8>) -> std::io::Result<()> {
        out.write_u8(self.components.len() as u8)?;
        for c in &self.components {
            out.write_u8(c.id)?;
            out.write_u8((c.dc_table << 4) | c.ac_table)?;
        }
        out.write_u8(self.spectral_start)?;
        out.write_u8(self.spectral_end)?;
        out.write_u8((self.approx_high << 4) | self.approx_low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::{Component, parse_segment};
    use test_log::test;

    fn color_frame() -> FrameHeader {
        FrameHeader {
            precision: 8,
            height: 8,
            width: 8,
            components: (1..=3)
                .map(|id| Component {
                    id,
                    h: 1,
                    v: 1,
                    quant_table: 0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_parse_and_check() {
        let payload = [3, 1, 0x00, 2, 0x11, 3, 0x11, 0, 63, 0];
        let scan: ScanHeader = parse_segment(&payload).unwrap();
        assert_eq!(scan.components[1].dc_table, 1);
        assert_eq!(scan.components[1].ac_table, 1);
        assert_eq!(scan.check_baseline(&color_frame()), Ok(()));
        let mut written = Vec::new();
        scan.write_payload(&mut written).unwrap();
        assert_eq!(written, payload);
    }

    #[test]
    fn test_rejects_progressive_and_partial_scans() {
        let frame = color_frame();
        let progressive: ScanHeader =
            parse_segment(&[3, 1, 0x00, 2, 0x11, 3, 0x11, 1, 5, 0x10]).unwrap();
        assert!(matches!(
            progressive.check_baseline(&frame),
            Err(HeaderError::UnsupportedScan { ss: 1, se: 5, ah: 1, .. })
        ));
        let partial: ScanHeader = parse_segment(&[1, 1, 0x00, 0, 63, 0]).unwrap();
        assert!(matches!(
            partial.check_baseline(&frame),
            Err(HeaderError::UnsupportedScan { components: 1, .. })
        ));
        let reordered: ScanHeader =
            parse_segment(&[3, 2, 0x11, 1, 0x00, 3, 0x11, 0, 63, 0]).unwrap();
        assert!(reordered.check_baseline(&frame).is_err());
        let unknown: ScanHeader =
            parse_segment(&[3, 1, 0x00, 2, 0x11, 9, 0x11, 0, 63, 0]).unwrap();
        assert_eq!(
            unknown.check_baseline(&frame),
            Err(HeaderError::UnknownComponent(9))
        );
    }

    #[test]
    fn test_rejects_table_index() {
        assert_eq!(
            parse_segment::<ScanHeader>(&[1, 1, 0x04, 0, 63, 0]),
            Err(HeaderError::InvalidHuffmanTableIndex { class: 1, index: 4 })
        );
        assert_eq!(
            parse_segment::<ScanHeader>(&[0, 0, 63, 0]),
            Err(HeaderError::InvalidComponentCount(0))
        );
    }
}
