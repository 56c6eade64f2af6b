// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Block-buffered sequential byte I/O with selectable byte order.

use std::io::{ErrorKind, Read, Write};
use std::marker::PhantomData;

use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};

pub const DEFAULT_BLOCK_SIZE: usize = 1 << 10;

/// Number of already consumed bytes that survive a refill, so that callers
/// can step back over a misidentified marker.
pub const UNGET_MARGIN: usize = 4;

/// Reads bytes and multi-byte integers from any [`Read`] source.
///
/// Data is pulled from the source one block at a time. Words are decoded in
/// the order given by `O`.
/// ```
/// # use mjpeg::byte_stream::ByteReader;
/// # use byteorder::BigEndian;
/// let mut reader = ByteReader::<_, BigEndian>::new(&[0xff, 0xd8, 0x00, 0x10][..]);
/// assert_eq!(reader.get_word()?, 0xffd8);
/// assert_eq!(reader.get_byte()?, 0x00);
/// assert_eq!(reader.position(), 3);
/// reader.set_position(0)?;
/// assert_eq!(reader.get_dword()?, 0xffd8_0010);
/// assert!(reader.get_byte().is_err());
/// # Ok::<(), mjpeg::error::Error>(())
/// ```
pub struct ByteReader<R, O = BigEndian> {
    source: R,
    buf: Vec<u8>,
    pos: usize,
    len: usize,
    buf_start: u64,
    block_size: usize,
    exhausted: bool,
    _order: PhantomData<O>,
}

impl<R: Read, O: ByteOrder> ByteReader<R, O> {
    pub fn new(source: R) -> Self {
        Self::with_block_size(source, DEFAULT_BLOCK_SIZE)
    }

    pub fn with_block_size(source: R, block_size: usize) -> Self {
        let block_size = block_size.max(UNGET_MARGIN);
        Self {
            source,
            buf: vec![0; block_size + 2 * UNGET_MARGIN],
            pos: 0,
            len: 0,
            buf_start: 0,
            block_size,
            exhausted: false,
            _order: PhantomData,
        }
    }

    /// Absolute offset of the next byte to be read.
    pub fn position(&self) -> u64 {
        self.buf_start + self.pos as u64
    }

    /// Moves to an absolute offset.
    ///
    /// Targets inside the buffered window, including the unget margin, are
    /// reached directly; later targets are reached by reading ahead.
    pub fn set_position(&mut self, target: u64) -> Result<()> {
        if target < self.buf_start {
            return Err(Error::SeekOutOfRange {
                target,
                window_start: self.buf_start,
            });
        }
        let end = self.buf_start + self.len as u64;
        if target <= end {
            self.pos = (target - self.buf_start) as usize;
            Ok(())
        } else {
            self.pos = self.len;
            self.skip(target - end)
        }
    }

    /// Steps back over the last `n` consumed bytes.
    pub fn unget(&mut self, n: usize) -> Result<()> {
        let target = self
            .position()
            .checked_sub(n as u64)
            .ok_or(Error::SeekOutOfRange {
                target: 0,
                window_start: self.buf_start,
            })?;
        self.set_position(target)
    }

    /// Returns true once the source has no more bytes to offer.
    pub fn is_at_end(&mut self) -> Result<bool> {
        if self.pos < self.len {
            return Ok(false);
        }
        Ok(!self.refill()?)
    }

    pub fn get_byte(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let byte = self.buf[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    pub fn get_word(&mut self) -> Result<u16> {
        self.ensure(2)?;
        let word = O::read_u16(&self.buf[self.pos..]);
        self.pos += 2;
        Ok(word)
    }

    pub fn get_dword(&mut self) -> Result<u32> {
        self.ensure(4)?;
        let dword = O::read_u32(&self.buf[self.pos..]);
        self.pos += 4;
        Ok(dword)
    }

    /// Fills `out` completely or fails with [`Error::StreamTruncated`].
    pub fn get_bytes(&mut self, out: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < out.len() {
            if self.pos == self.len && !self.refill()? {
                return Err(Error::StreamTruncated {
                    offset: self.position(),
                });
            }
            let n = (self.len - self.pos).min(out.len() - filled);
            out[filled..filled + n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
            self.pos += n;
            filled += n;
        }
        Ok(())
    }

    pub fn skip(&mut self, mut count: u64) -> Result<()> {
        while count > 0 {
            if self.pos == self.len && !self.refill()? {
                return Err(Error::StreamTruncated {
                    offset: self.position(),
                });
            }
            let n = ((self.len - self.pos) as u64).min(count);
            self.pos += n as usize;
            count -= n;
        }
        Ok(())
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    fn ensure(&mut self, needed: usize) -> Result<()> {
        while self.len - self.pos < needed {
            if !self.refill()? {
                return Err(Error::StreamTruncated {
                    offset: self.len as u64 + self.buf_start,
                });
            }
        }
        Ok(())
    }

    /// Reads the next block from the source. Returns false at end of data.
    fn refill(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        let keep_from = self.pos.saturating_sub(UNGET_MARGIN);
        self.buf.copy_within(keep_from..self.len, 0);
        self.buf_start += keep_from as u64;
        self.pos -= keep_from;
        self.len -= keep_from;

        let end = (self.len + self.block_size).min(self.buf.len());
        loop {
            match self.source.read(&mut self.buf[self.len..end]) {
                Ok(0) => {
                    self.exhausted = true;
                    return Ok(false);
                }
                Ok(n) => {
                    self.len += n;
                    return Ok(true);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Writes bytes and multi-byte integers to any [`Write`] sink, one block at
/// a time.
pub struct ByteWriter<W, O = BigEndian> {
    sink: W,
    buf: Vec<u8>,
    block_size: usize,
    flushed: u64,
    _order: PhantomData<O>,
}

impl<W: Write, O: ByteOrder> ByteWriter<W, O> {
    pub fn new(sink: W) -> Self {
        Self::with_block_size(sink, DEFAULT_BLOCK_SIZE)
    }

    pub fn with_block_size(sink: W, block_size: usize) -> Self {
        let block_size = block_size.max(1);
        Self {
            sink,
            buf: Vec::with_capacity(block_size),
            block_size,
            flushed: 0,
            _order: PhantomData,
        }
    }

    /// Number of bytes written so far, including buffered ones.
    pub fn position(&self) -> u64 {
        self.flushed + self.buf.len() as u64
    }

    pub fn put_byte(&mut self, byte: u8) -> Result<()> {
        self.buf.push(byte);
        self.write_full_block()
    }

    pub fn put_word(&mut self, word: u16) -> Result<()> {
        let mut bytes = [0; 2];
        O::write_u16(&mut bytes, word);
        self.put_bytes(&bytes)
    }

    pub fn put_dword(&mut self, dword: u32) -> Result<()> {
        let mut bytes = [0; 4];
        O::write_u32(&mut bytes, dword);
        self.put_bytes(&bytes)
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(bytes);
        self.write_full_block()
    }

    /// Writes all buffered bytes and flushes the sink.
    pub fn flush(&mut self) -> Result<()> {
        self.sink.write_all(&self.buf)?;
        self.flushed += self.buf.len() as u64;
        self.buf.clear();
        self.sink.flush()?;
        Ok(())
    }

    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.sink)
    }

    fn write_full_block(&mut self) -> Result<()> {
        if self.buf.len() >= self.block_size {
            self.sink.write_all(&self.buf)?;
            self.flushed += self.buf.len() as u64;
            self.buf.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::LittleEndian;
    use test_log::test;

    #[test]
    fn test_byte_order() -> Result<()> {
        let data = [0x12, 0x34, 0x56, 0x78];
        let mut be = ByteReader::<_, BigEndian>::new(&data[..]);
        assert_eq!(be.get_word()?, 0x1234);
        let mut le = ByteReader::<_, LittleEndian>::new(&data[..]);
        assert_eq!(le.get_dword()?, 0x7856_3412);
        Ok(())
    }

    #[test]
    fn test_reads_across_blocks() -> Result<()> {
        let data: Vec<u8> = (0..=255).collect();
        let mut reader = ByteReader::<_, BigEndian>::with_block_size(&data[..], 5);
        for expected in (0..=254).step_by(2) {
            let word = reader.get_word()?;
            assert_eq!(word, u16::from_be_bytes([expected, expected + 1]));
        }
        assert!(reader.is_at_end()?);
        Ok(())
    }

    #[test]
    fn test_unget_margin_survives_refill() -> Result<()> {
        let data: Vec<u8> = (0..32).collect();
        let mut reader = ByteReader::<_, BigEndian>::with_block_size(&data[..], 4);
        let mut head = [0; 7];
        reader.get_bytes(&mut head)?;
        assert_eq!(reader.get_byte()?, 7);
        // Forces a refill, then steps back over bytes of the previous block.
        assert_eq!(reader.get_byte()?, 8);
        reader.unget(UNGET_MARGIN)?;
        assert_eq!(reader.position(), 5);
        assert_eq!(reader.get_byte()?, 5);
        Ok(())
    }

    #[test]
    fn test_set_position() -> Result<()> {
        let data: Vec<u8> = (0..100).collect();
        let mut reader = ByteReader::<_, BigEndian>::with_block_size(&data[..], 8);
        reader.set_position(50)?;
        assert_eq!(reader.get_byte()?, 50);
        assert!(matches!(
            reader.set_position(10),
            Err(Error::SeekOutOfRange { target: 10, .. })
        ));
        reader.set_position(99)?;
        assert_eq!(reader.get_byte()?, 99);
        assert!(matches!(
            reader.set_position(120),
            Err(Error::StreamTruncated { offset: 100 })
        ));
        Ok(())
    }

    #[test]
    fn test_end_of_stream() {
        let mut reader = ByteReader::<_, BigEndian>::new(&[1u8, 2, 3][..]);
        assert!(matches!(
            reader.get_dword(),
            Err(Error::StreamTruncated { offset: 3 })
        ));
        let mut out = [0; 4];
        assert!(matches!(
            reader.get_bytes(&mut out),
            Err(Error::StreamTruncated { .. })
        ));
    }

    #[test]
    fn test_writer() -> Result<()> {
        let mut writer = ByteWriter::<_, BigEndian>::with_block_size(Vec::new(), 3);
        writer.put_word(0xffd8)?;
        writer.put_byte(0x01)?;
        writer.put_dword(0x0203_0405)?;
        assert_eq!(writer.position(), 7);
        writer.put_bytes(b"JFIF")?;
        let out = writer.into_inner()?;
        assert_eq!(out, [0xff, 0xd8, 1, 2, 3, 4, 5, b'J', b'F', b'I', b'F']);

        let mut le = ByteWriter::<_, LittleEndian>::new(Vec::new());
        le.put_word(0x1234)?;
        assert_eq!(le.into_inner()?, [0x34, 0x12]);
        Ok(())
    }

    #[test]
    fn test_writer_reports_sink_errors() {
        struct FailingSink;
        impl Write for FailingSink {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk full"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let mut writer = ByteWriter::<_, BigEndian>::with_block_size(FailingSink, 2);
        assert!(writer.put_byte(1).is_ok());
        assert!(matches!(writer.put_byte(2), Err(Error::Io(_))));
    }
}
