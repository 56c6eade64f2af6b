// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Table-definition segments: DQT, DHT and DRI.

use byteorder::{BigEndian, WriteBytesExt};
use mjpeg_transforms::dct::BLOCK_SIZE;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::{
    entropy_coding::huffman::{HuffmanSpec, MAX_CODE_LENGTH},
    error::HeaderError,
    headers::{JpegSegment, Marker, SegmentReader, frame_header::NUM_QUANT_TABLES},
    tables::ZIGZAG,
};

/// Huffman table slots per class.
pub const NUM_HUFFMAN_TABLES: u8 = 4;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum TableClass {
    Dc = 0,
    Ac = 1,
}

/// One quantization table, in natural order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantTable {
    pub index: u8,
    /// Entries are sent as 16-bit values.
    pub wide: bool,
    pub values: [u16; BLOCK_SIZE],
}

impl QuantTable {
    /// 8-bit table from natural-order entries.
    pub fn new(index: u8, values: &[u8; BLOCK_SIZE]) -> Self {
        QuantTable {
            index,
            wide: false,
            values: array_init::array_init(|i| values[i] as u16),
        }
    }
}

/// DQT payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantTables(pub Vec<QuantTable>);

impl JpegSegment for QuantTables {
    const MARKER: Marker = Marker::Dqt;
    const NAME: &'static str = "DQT";

    fn read(payload: &mut SegmentReader<'_>) -> Result<Self, HeaderError> {
        let mut tables = Vec::new();
        while payload.remaining() > 0 {
            let pq_tq = payload.read_u8()?;
            let (precision, index) = (pq_tq >> 4, pq_tq & 15);
            if precision > 1 {
                return Err(HeaderError::InvalidQuantPrecision(precision));
            }
            if index >= NUM_QUANT_TABLES {
                return Err(HeaderError::InvalidQuantTableIndex(index));
            }
            let mut values = [0; BLOCK_SIZE];
            for &pos in &ZIGZAG {
                values[pos] = if precision == 1 {
                    payload.read_u16()?
                } else {
                    payload.read_u8()? as u16
                };
            }
            tables.push(QuantTable {
                index,
                wide: precision == 1,
                values,
            });
        }
        if tables.is_empty() {
            return Err(HeaderError::InvalidSegmentLength {
                segment: Self::NAME,
                length: 2,
            });
        }
        Ok(QuantTables(tables))
    }

    fn write_payload(&self, out: &mut Vec<u8>) -> std::io::Result<()> {
        for table in &self.0 {
            out.write_u8(((table.wide as u8) << 4) | table.index)?;
            for &pos in &ZIGZAG {
                if table.wide {
                    out.write_u16::<BigEndian>(table.values[pos])?;
                } else {
                    out.write_u8(table.values[pos] as u8)?;
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTableDef {
    pub class: TableClass,
    pub index: u8,
    pub spec: HuffmanSpec,
}

/// DHT payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTables(pub Vec<HuffmanTableDef>);

impl JpegSegment for HuffmanTables {
    const MARKER: Marker = Marker::Dht;
    const NAME: &'static str = "DHT";

    fn read(payload: &mut SegmentReader<'_>) -> Result<Self, HeaderError> {
        let mut tables = Vec::new();
        while payload.remaining() > 0 {
            let tc_th = payload.read_u8()?;
            let (class, index) = (tc_th >> 4, tc_th & 15);
            let class = match TableClass::from_u8(class) {
                Some(class) if index < NUM_HUFFMAN_TABLES => class,
                _ => return Err(HeaderError::InvalidHuffmanTableIndex { class, index }),
            };
            let counts = payload.read_bytes(MAX_CODE_LENGTH)?;
            let counts: [u8; MAX_CODE_LENGTH] = array_init::array_init(|i| counts[i]);
            let total = counts.iter().map(|&c| c as usize).sum();
            let symbols = payload.read_bytes(total)?;
            let spec =
                HuffmanSpec::new(counts, symbols).map_err(HeaderError::InvalidHuffmanTable)?;
            // Oversubscribed code spaces are rejected while parsing.
            spec.canonical_codes().map_err(HeaderError::InvalidHuffmanTable)?;
            tables.push(HuffmanTableDef { class, index, spec });
        }
        if tables.is_empty() {
            return Err(HeaderError::InvalidSegmentLength {
                segment: Self::NAME,
                length: 2,
            });
        }
        Ok(HuffmanTables(tables))
    }

    fn write_payload(&self, out: &mut Vec<u8>) -> std::io::Result<()> {
        for table in &self.0 {
            out.write_u8(((table.class as u8) << 4) | table.index)?;
            out.extend_from_slice(&table.spec.counts);
            out.extend_from_slice(&table.spec.symbols);
        }
        Ok(())
    }
}

/// DRI payload: MCUs between restart markers, 0 when disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartInterval(pub u16);

impl JpegSegment for RestartInterval {
    const MARKER: Marker = Marker::Dri;
    const NAME: &'static str = "DRI";

    fn read(payload: &mut SegmentReader<'_>) -> Result<Self, HeaderError> {
        let interval = payload.read_u16()?;
        payload.finish()?;
        Ok(RestartInterval(interval))
    }

    fn write_payload(&self, out: &mut Vec<u8>) -> std::io::Result<()> {
        out.write_u16::<BigEndian>(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        headers::parse_segment,
        tables::{STD_AC_LUMINANCE, STD_DC_CHROMINANCE, STD_LUMINANCE_QUANT},
    };
    use test_log::test;

    #[test]
    fn test_quant_table_zigzag() {
        let table = QuantTable::new(1, &STD_LUMINANCE_QUANT);
        let mut payload = Vec::new();
        QuantTables(vec![table.clone()])
            .write_payload(&mut payload)
            .unwrap();
        assert_eq!(payload.len(), 65);
        assert_eq!(payload[0], 0x01);
        // Zigzag order: 16 11 12 14 12 10 ...
        assert_eq!(payload[1..7], [16, 11, 12, 14, 12, 10]);
        let parsed: QuantTables = parse_segment(&payload).unwrap();
        assert_eq!(parsed.0, [table]);
    }

    #[test]
    fn test_wide_quant_table() {
        let mut payload = vec![0x12];
        for i in 0..64u16 {
            payload.extend_from_slice(&(256 + i).to_be_bytes());
        }
        payload[0] = 0x10;
        let parsed: QuantTables = parse_segment(&payload).unwrap();
        let table = &parsed.0[0];
        assert!(table.wide);
        assert_eq!(table.values[0], 256);
        assert_eq!(table.values[1], 257);
        assert_eq!(table.values[8], 258);
        assert_eq!(table.values[63], 319);
    }

    #[test]
    fn test_quant_table_errors() {
        let mut payload = vec![0x03];
        payload.extend_from_slice(&[1; 64]);
        assert_eq!(
            parse_segment::<QuantTables>(&payload),
            Err(HeaderError::InvalidQuantTableIndex(3))
        );
        payload[0] = 0x20;
        assert_eq!(
            parse_segment::<QuantTables>(&payload),
            Err(HeaderError::InvalidQuantPrecision(2))
        );
        payload[0] = 0x00;
        payload.pop();
        assert!(matches!(
            parse_segment::<QuantTables>(&payload),
            Err(HeaderError::InvalidSegmentLength { segment: "DQT", .. })
        ));
        assert!(parse_segment::<QuantTables>(&[]).is_err());
    }

    #[test]
    fn test_huffman_tables() {
        let mut payload = vec![0x01];
        payload.extend_from_slice(&STD_DC_CHROMINANCE);
        payload.push(0x10);
        payload.extend_from_slice(&STD_AC_LUMINANCE);
        let parsed: HuffmanTables = parse_segment(&payload).unwrap();
        assert_eq!(parsed.0.len(), 2);
        assert_eq!((parsed.0[0].class, parsed.0[0].index), (TableClass::Dc, 1));
        assert_eq!((parsed.0[1].class, parsed.0[1].index), (TableClass::Ac, 0));
        assert_eq!(parsed.0[1].spec.symbols.len(), 162);
        let mut written = Vec::new();
        parsed.write_payload(&mut written).unwrap();
        assert_eq!(written, payload);
    }

    #[test]
    fn test_huffman_table_errors() {
        let mut payload = vec![0x24];
        payload.extend_from_slice(&STD_DC_CHROMINANCE);
        assert_eq!(
            parse_segment::<HuffmanTables>(&payload),
            Err(HeaderError::InvalidHuffmanTableIndex { class: 2, index: 4 })
        );
        // Three 1-bit codes.
        let mut payload = vec![0x00, 3];
        payload.extend_from_slice(&[0; 15]);
        payload.extend_from_slice(&[0, 1, 2]);
        assert!(matches!(
            parse_segment::<HuffmanTables>(&payload),
            Err(HeaderError::InvalidHuffmanTable(_))
        ));
        // Counts promise more symbols than the segment holds.
        let mut payload = vec![0x00];
        payload.extend_from_slice(&STD_DC_CHROMINANCE[..20]);
        assert!(matches!(
            parse_segment::<HuffmanTables>(&payload),
            Err(HeaderError::InvalidSegmentLength { segment: "DHT", .. })
        ));
    }

    #[test]
    fn test_restart_interval() {
        assert_eq!(parse_segment(&[0x01, 0x00]), Ok(RestartInterval(256)));
        assert!(parse_segment::<RestartInterval>(&[0x01]).is_err());
    }
}
