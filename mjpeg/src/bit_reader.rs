// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::fmt::Debug;
use std::io::Read;

use byteorder::{BigEndian, ByteOrder};

use crate::{
    byte_stream::{ByteReader, DEFAULT_BLOCK_SIZE},
    error::{Error, Result},
    util::tracing_wrappers::trace,
};

/// Maximum number of bits returned by a single [`BitReader::show`].
pub const MAX_BITS_PER_CALL: usize = 32;

// Slack after the valid bytes so that 64-bit reads never run off the buffer.
const TAIL_PADDING: usize = 8;

/// Reads MSB-first bits from JPEG entropy-coded data.
///
/// Stuffed `FF 00` pairs are returned as a single `FF` and restart markers are
/// dropped. Any other marker ends the data: the underlying [`ByteReader`] is
/// left positioned on that marker's `FF` so that segment parsing can resume.
/// Bits shown past the end of the data read as 1.
/// ```
/// # use mjpeg::{bit_reader::BitReader, byte_stream::ByteReader};
/// # use byteorder::BigEndian;
/// let mut bytes = ByteReader::<_, BigEndian>::new(&[0xa5, 0xff, 0x00, 0xff, 0xd9][..]);
/// let mut br = BitReader::new(&mut bytes);
/// assert_eq!(br.get(4)?, 0xa);
/// assert_eq!(br.get(12)?, 0x5ff);
/// assert!(br.get(1).is_err());
/// drop(br);
/// assert_eq!(bytes.position(), 3);
/// # Ok::<(), mjpeg::error::Error>(())
/// ```
pub struct BitReader<'a, R> {
    bytes: &'a mut ByteReader<R, BigEndian>,
    data: Vec<u8>,
    len: usize,
    bit_pos: usize,
    at_marker: bool,
    exhausted: bool,
}

impl<R> Debug for BitReader<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BitReader{{ buffered: {} bytes, bit_pos: {}, at_marker: {}, exhausted: {} }}",
            self.len, self.bit_pos, self.at_marker, self.exhausted
        )
    }
}

impl<'a, R: Read> BitReader<'a, R> {
    pub fn new(bytes: &'a mut ByteReader<R, BigEndian>) -> Self {
        BitReader {
            bytes,
            data: vec![0xff; DEFAULT_BLOCK_SIZE + TAIL_PADDING],
            len: 0,
            bit_pos: 0,
            at_marker: false,
            exhausted: false,
        }
    }

    /// Returns the next `num` bits without consuming them.
    pub fn show(&mut self, num: usize) -> Result<u32> {
        debug_assert!(num <= MAX_BITS_PER_CALL);
        if num == 0 {
            return Ok(0);
        }
        if self.bit_pos + num > self.len * 8 {
            self.refill()?;
        }
        let word = BigEndian::read_u64(&self.data[self.bit_pos / 8..]);
        Ok(((word << (self.bit_pos % 8)) >> (64 - num)) as u32)
    }

    /// Advances by `num` bits.
    pub fn skip_bits(&mut self, num: usize) -> Result<()> {
        if self.bit_pos + num > self.len * 8 {
            self.refill()?;
            if self.bit_pos + num > self.len * 8 {
                return Err(Error::StreamTruncated {
                    offset: self.byte_position(),
                });
            }
        }
        self.bit_pos += num;
        Ok(())
    }

    /// Reads `num` bits.
    pub fn get(&mut self, num: usize) -> Result<u32> {
        let ret = self.show(num)?;
        self.skip_bits(num)?;
        Ok(ret)
    }

    /// Drops the bits left in the current byte.
    pub fn align_on_byte(&mut self) {
        self.bit_pos = self.bit_pos.next_multiple_of(8);
    }

    /// Approximate offset in the underlying stream of the next unread bit.
    pub fn byte_position(&self) -> u64 {
        let pending = (self.len - self.bit_pos.div_ceil(8).min(self.len)) as u64;
        self.bytes.position().saturating_sub(pending)
    }

    /// True once a non-restart marker has been reached.
    pub fn at_marker(&self) -> bool {
        self.at_marker
    }

    /// True if the next `num` bits run past the end of the data and no more
    /// data can follow, i.e. some of them are padding.
    pub fn reaches_padding(&self, num: usize) -> bool {
        (self.at_marker || self.exhausted) && self.bit_pos + num > self.len * 8
    }

    fn refill(&mut self) -> Result<()> {
        let consumed = self.bit_pos / 8;
        self.data.copy_within(consumed..self.len, 0);
        self.len -= consumed;
        self.bit_pos -= consumed * 8;

        while !self.at_marker && self.len < DEFAULT_BLOCK_SIZE {
            let byte = match self.bytes.get_byte() {
                Ok(byte) => byte,
                Err(Error::StreamTruncated { .. }) => {
                    self.exhausted = true;
                    break;
                }
                Err(e) => return Err(e),
            };
            if byte != 0xff {
                self.data[self.len] = byte;
                self.len += 1;
                continue;
            }
            let next = match self.bytes.get_byte() {
                Ok(next) => next,
                Err(Error::StreamTruncated { .. }) => {
                    self.exhausted = true;
                    break;
                }
                Err(e) => return Err(e),
            };
            match next {
                0x00 => {
                    self.data[self.len] = 0xff;
                    self.len += 1;
                }
                0xd0..=0xd7 => {
                    trace!(marker = next, "skipping restart marker");
                }
                _ => {
                    trace!(marker = next, "entropy-coded data ends at marker");
                    self.bytes.unget(2)?;
                    self.at_marker = true;
                }
            }
        }
        self.data[self.len..].fill(0xff);
        Ok(())
    }
}
