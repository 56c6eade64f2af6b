// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::io::Write;

use byteorder::BigEndian;

use crate::{byte_stream::ByteWriter, error::Result};

/// Writes MSB-first bits as JPEG entropy-coded data, inserting a `00` after
/// every `FF` byte.
/// ```
/// # use mjpeg::{bit_writer::BitWriter, byte_stream::ByteWriter};
/// # use byteorder::BigEndian;
/// let mut bw = BitWriter::new(ByteWriter::<_, BigEndian>::new(Vec::new()));
/// bw.put(0xff, 8)?;
/// bw.put(0b101, 3)?;
/// bw.flush(true)?;
/// assert_eq!(bw.into_inner().into_inner()?, [0xff, 0x00, 0xbf]);
/// # Ok::<(), mjpeg::error::Error>(())
/// ```
pub struct BitWriter<W: Write> {
    bytes: ByteWriter<W, BigEndian>,
    acc: u32,
    free: u32,
}

impl<W: Write> BitWriter<W> {
    pub fn new(bytes: ByteWriter<W, BigEndian>) -> Self {
        BitWriter {
            bytes,
            acc: 0,
            free: 32,
        }
    }

    /// Appends the low `bits` bits of `value`, most significant first.
    pub fn put(&mut self, value: u32, bits: u32) -> Result<()> {
        debug_assert!(bits <= 32);
        if bits == 0 {
            return Ok(());
        }
        let value = if bits == 32 {
            value
        } else {
            value & ((1 << bits) - 1)
        };
        if bits < self.free {
            self.free -= bits;
            self.acc |= value << self.free;
            return Ok(());
        }
        let overflow = bits - self.free;
        self.acc |= value >> overflow;
        let word = self.acc;
        self.put_stuffed(&word.to_be_bytes())?;
        self.free = 32 - overflow;
        self.acc = if overflow == 0 {
            0
        } else {
            value << self.free
        };
        Ok(())
    }

    /// Writes out any partial byte, filling its unused low bits with
    /// `pad_bit`.
    pub fn flush(&mut self, pad_bit: bool) -> Result<()> {
        let used = 32 - self.free;
        if used == 0 {
            return Ok(());
        }
        let num_bytes = used.div_ceil(8) as usize;
        let pad = num_bytes as u32 * 8 - used;
        if pad_bit && pad > 0 {
            self.acc |= ((1 << pad) - 1) << (self.free - pad);
        }
        let word = self.acc.to_be_bytes();
        self.put_stuffed(&word[..num_bytes])?;
        self.acc = 0;
        self.free = 32;
        Ok(())
    }

    /// Byte-level access for markers between entropy-coded segments. Only
    /// valid right after [`BitWriter::flush`].
    pub fn bytes_mut(&mut self) -> &mut ByteWriter<W, BigEndian> {
        debug_assert_eq!(self.free, 32);
        &mut self.bytes
    }

    pub fn into_inner(self) -> ByteWriter<W, BigEndian> {
        self.bytes
    }

    fn put_stuffed(&mut self, bytes: &[u8]) -> Result<()> {
        for &byte in bytes {
            self.bytes.put_byte(byte)?;
            if byte == 0xff {
                self.bytes.put_byte(0)?;
            }
        }
        Ok(())
    }
}
