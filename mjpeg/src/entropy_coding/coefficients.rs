// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Baseline coding of one 8x8 block of quantized coefficients: a
//! DPCM-coded DC value followed by run-length coded AC values in zigzag
//! order.

use std::io::{Read, Write};

use mjpeg_transforms::dct::BLOCK_SIZE;

use crate::{
    bit_reader::BitReader,
    bit_writer::BitWriter,
    entropy_coding::huffman::{HuffmanDecodeTable, HuffmanEncodeTable},
    error::{Error, Result},
    tables::ZIGZAG,
};

/// Largest magnitude category a baseline DC difference may use.
pub const MAX_DC_CATEGORY: u32 = 11;
/// Largest magnitude category a baseline AC coefficient may use.
pub const MAX_AC_CATEGORY: u32 = 10;
/// Largest AC magnitude representable in [`MAX_AC_CATEGORY`].
pub const MAX_AC_MAGNITUDE: i32 = (1 << MAX_AC_CATEGORY) - 1;

const END_OF_BLOCK: u8 = 0x00;
const ZERO_RUN: u8 = 0xf0;

/// Number of bits needed to represent `|value|`.
/// ```
/// # use mjpeg::entropy_coding::coefficients::category;
/// assert_eq!(category(0), 0);
/// assert_eq!(category(-1), 1);
/// assert_eq!(category(255), 8);
/// assert_eq!(category(-256), 9);
/// ```
#[inline]
pub fn category(value: i32) -> u32 {
    32 - value.unsigned_abs().leading_zeros()
}

/// Maps `category` raw bits back to a signed value. Values whose top bit is
/// clear are negative.
#[inline]
pub fn extend(raw: u32, category: u32) -> i32 {
    if category == 0 {
        return 0;
    }
    let mask = (1i32 << category) - 1;
    let raw = raw as i32;
    if raw * 2 <= mask { raw - mask } else { raw }
}

// Inverse of `extend`: negative values are sent in ones' complement.
#[inline]
fn magnitude_bits(value: i32, category: u32) -> u32 {
    let bits = if value < 0 { value - 1 } else { value };
    bits as u32 & ((1u32 << category) - 1)
}

/// Decodes one block into `coeffs`, in natural order. `dc_predictor` holds
/// the previous DC value of the same component and is updated.
pub fn decode_block<R: Read>(
    br: &mut BitReader<R>,
    dc_table: &HuffmanDecodeTable,
    ac_table: &HuffmanDecodeTable,
    dc_predictor: &mut i32,
    coeffs: &mut [i32; BLOCK_SIZE],
) -> Result<()> {
    coeffs.fill(0);

    let dc_category = dc_table.decode(br)?;
    if dc_category as u32 > MAX_DC_CATEGORY {
        return Err(Error::InvalidDcCategory {
            category: dc_category,
            offset: br.byte_position(),
        });
    }
    let raw = br.get(dc_category as usize)?;
    *dc_predictor = dc_predictor.wrapping_add(extend(raw, dc_category as u32));
    coeffs[0] = *dc_predictor;

    // Symbols with a zero size other than EOB skip `run + 1` positions, so
    // ZRL covers 16.
    let mut k = 1;
    while k < BLOCK_SIZE {
        let symbol = ac_table.decode(br)?;
        if symbol == END_OF_BLOCK {
            break;
        }
        k += (symbol >> 4) as usize;
        if k >= BLOCK_SIZE {
            return Err(Error::CoefficientOverrun {
                offset: br.byte_position(),
            });
        }
        let size = (symbol & 15) as u32;
        if size > 0 {
            let raw = br.get(size as usize)?;
            coeffs[ZIGZAG[k]] = extend(raw, size);
        }
        k += 1;
    }
    Ok(())
}

fn put_symbol<W: Write>(
    bw: &mut BitWriter<W>,
    table: &HuffmanEncodeTable,
    symbol: u8,
) -> Result<()> {
    let (code, length) = table.encode(symbol)?;
    bw.put(code as u32, length as u32)
}

/// Encodes one block of quantized coefficients given in natural order.
/// AC magnitudes above [`MAX_AC_MAGNITUDE`] have no code in baseline tables.
pub fn encode_block<W: Write>(
    bw: &mut BitWriter<W>,
    dc_table: &HuffmanEncodeTable,
    ac_table: &HuffmanEncodeTable,
    dc_predictor: &mut i32,
    coeffs: &[i32; BLOCK_SIZE],
) -> Result<()> {
    let diff = coeffs[0].wrapping_sub(*dc_predictor);
    *dc_predictor = coeffs[0];
    let dc_category = category(diff);
    put_symbol(bw, dc_table, dc_category as u8)?;
    bw.put(magnitude_bits(diff, dc_category), dc_category)?;

    let mut run = 0;
    for &pos in &ZIGZAG[1..] {
        let value = coeffs[pos];
        if value == 0 {
            run += 1;
            continue;
        }
        while run >= 16 {
            put_symbol(bw, ac_table, ZERO_RUN)?;
            run -= 16;
        }
        let size = category(value);
        put_symbol(bw, ac_table, ((run << 4) | size) as u8)?;
        bw.put(magnitude_bits(value, size), size)?;
        run = 0;
    }
    if run > 0 {
        put_symbol(bw, ac_table, END_OF_BLOCK)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        byte_stream::{ByteReader, ByteWriter},
        entropy_coding::huffman::HuffmanSpec,
        error::HuffmanTableError,
        tables::{STD_AC_LUMINANCE, STD_DC_LUMINANCE},
    };
    use byteorder::BigEndian;
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;
    use test_log::test;

    fn encode_tables() -> (HuffmanEncodeTable, HuffmanEncodeTable) {
        (
            HuffmanEncodeTable::build(&HuffmanSpec::from_packed(&STD_DC_LUMINANCE).unwrap())
                .unwrap(),
            HuffmanEncodeTable::build(&HuffmanSpec::from_packed(&STD_AC_LUMINANCE).unwrap())
                .unwrap(),
        )
    }

    fn decode_tables() -> (HuffmanDecodeTable, HuffmanDecodeTable) {
        (
            HuffmanDecodeTable::build(&HuffmanSpec::from_packed(&STD_DC_LUMINANCE).unwrap())
                .unwrap(),
            HuffmanDecodeTable::build(&HuffmanSpec::from_packed(&STD_AC_LUMINANCE).unwrap())
                .unwrap(),
        )
    }

    fn encode_blocks(blocks: &[[i32; BLOCK_SIZE]]) -> Vec<u8> {
        let (dc, ac) = encode_tables();
        let mut bw = BitWriter::new(ByteWriter::new(Vec::new()));
        let mut pred = 0;
        for block in blocks {
            encode_block(&mut bw, &dc, &ac, &mut pred, block).unwrap();
        }
        bw.flush(true).unwrap();
        bw.into_inner().into_inner().unwrap()
    }

    fn decode_blocks(data: &[u8], count: usize) -> Result<Vec<[i32; BLOCK_SIZE]>> {
        let (dc, ac) = decode_tables();
        let mut bytes = ByteReader::<_, BigEndian>::new(data);
        let mut br = BitReader::new(&mut bytes);
        let mut pred = 0;
        let mut out = vec![[0; BLOCK_SIZE]; count];
        for block in out.iter_mut() {
            decode_block(&mut br, &dc, &ac, &mut pred, block)?;
        }
        Ok(out)
    }

    fn dc_only(dc: i32) -> [i32; BLOCK_SIZE] {
        let mut block = [0; BLOCK_SIZE];
        block[0] = dc;
        block
    }

    #[test]
    fn test_extend() {
        assert_eq!(extend(0, 0), 0);
        assert_eq!(extend(0, 1), -1);
        assert_eq!(extend(1, 1), 1);
        assert_eq!(extend(0b00, 2), -3);
        assert_eq!(extend(0b01, 2), -2);
        assert_eq!(extend(0b10, 2), 2);
        assert_eq!(extend(0b11, 2), 3);
        for value in -2047..=2047 {
            let c = category(value);
            assert_eq!(extend(magnitude_bits(value, c), c), value);
        }
    }

    #[test]
    fn test_dc_differences() {
        // Differences 10, 2, -1: codes 101+1010, 011+10, 010+0, each
        // followed by EOB 1010, padded with ones.
        let data = encode_blocks(&[dc_only(10), dc_only(12), dc_only(11)]);
        assert_eq!(data, [0xb5, 0x4e, 0xa4, 0xaf]);
        let decoded = decode_blocks(&data, 3).unwrap();
        let dcs: Vec<i32> = decoded.iter().map(|b| b[0]).collect();
        assert_eq!(dcs, [10, 12, 11]);
        assert!(decoded.iter().all(|b| b[1..].iter().all(|&c| c == 0)));
    }

    #[test]
    fn test_zero_runs() {
        let mut block = [0; BLOCK_SIZE];
        block[0] = -5;
        // Zigzag position 1, then a run of 40 zeros, then the last position.
        block[ZIGZAG[1]] = 7;
        block[ZIGZAG[42]] = -300;
        block[ZIGZAG[63]] = 1;
        let data = encode_blocks(&[block]);
        assert_eq!(decode_blocks(&data, 1).unwrap()[0], block);
    }

    #[test]
    fn test_random_blocks() {
        let mut rng = XorShiftRng::seed_from_u64(11);
        let blocks: Vec<[i32; BLOCK_SIZE]> = (0..200)
            .map(|_| {
                let density = rng.random_range(0.0..1.0);
                std::array::from_fn(|i| {
                    if i == 0 {
                        rng.random_range(-1023..=1023)
                    } else if rng.random_bool(density) {
                        rng.random_range(-MAX_AC_MAGNITUDE..=MAX_AC_MAGNITUDE)
                    } else {
                        0
                    }
                })
            })
            .collect();
        let data = encode_blocks(&blocks);
        assert_eq!(decode_blocks(&data, blocks.len()).unwrap(), blocks);
    }

    #[test]
    fn test_coefficient_overrun() {
        // DC category 0 (00), then four ZRLs: the last one runs past 63.
        let (_, ac) = encode_tables();
        let (zrl, zrl_len) = ac.encode(ZERO_RUN).unwrap();
        let mut bw = BitWriter::new(ByteWriter::new(Vec::new()));
        bw.put(0, 2).unwrap();
        for _ in 0..4 {
            bw.put(zrl as u32, zrl_len as u32).unwrap();
        }
        bw.flush(true).unwrap();
        let data = bw.into_inner().into_inner().unwrap();
        assert!(matches!(
            decode_blocks(&data, 1),
            Err(Error::CoefficientOverrun { .. })
        ));
    }

    #[test]
    fn test_run_past_last_coefficient() {
        // Three ZRLs reach position 49, a further run of 15 lands on 64.
        let (_, ac) = encode_tables();
        let mut bw = BitWriter::new(ByteWriter::new(Vec::new()));
        bw.put(0, 2).unwrap();
        for _ in 0..3 {
            let (code, len) = ac.encode(ZERO_RUN).unwrap();
            bw.put(code as u32, len as u32).unwrap();
        }
        let (code, len) = ac.encode(0xf1).unwrap();
        bw.put(code as u32, len as u32).unwrap();
        bw.put(1, 1).unwrap();
        bw.flush(true).unwrap();
        let data = bw.into_inner().into_inner().unwrap();
        assert!(matches!(
            decode_blocks(&data, 1),
            Err(Error::CoefficientOverrun { .. })
        ));
    }

    #[test]
    fn test_truncated_block() {
        let mut block = [3; BLOCK_SIZE];
        block[0] = 100;
        let data = encode_blocks(&[block]);
        assert!(matches!(
            decode_blocks(&data[..data.len() / 2], 1),
            Err(Error::StreamTruncated { .. } | Error::ForbiddenCode { .. })
        ));
    }

    #[test]
    fn test_ac_category_too_large() {
        let (dc, ac) = encode_tables();
        let mut bw = BitWriter::new(ByteWriter::new(Vec::new()));
        let mut block = [0; BLOCK_SIZE];
        block[1] = 2048;
        let mut pred = 0;
        assert!(matches!(
            encode_block(&mut bw, &dc, &ac, &mut pred, &block),
            Err(Error::Huffman(HuffmanTableError::MissingSymbol(0x0c)))
        ));
    }
}
