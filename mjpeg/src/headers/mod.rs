// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

pub mod frame_header;
pub mod jfif;
pub mod markers;
pub mod scan_header;
pub mod tables;

use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt};

use crate::{
    byte_stream::{ByteReader, ByteWriter},
    error::{HeaderError, Result},
};

pub use frame_header::{Component, FrameHeader};
pub use jfif::Jfif;
pub use markers::Marker;
pub use scan_header::{ScanComponent, ScanHeader};
pub use tables::{
    HuffmanTableDef, HuffmanTables, QuantTable, QuantTables, RestartInterval, TableClass,
};

/// A marker segment carrying a length-prefixed payload.
pub trait JpegSegment
where
    Self: Sized,
{
    const MARKER: Marker;
    const NAME: &'static str;

    /// Parses the payload that follows the length field.
    fn read(payload: &mut SegmentReader) -> Result<Self, HeaderError>;

    fn write_payload(&self, out: &mut Vec<u8>) -> std::io::Result<()>;

    /// Writes marker, length and payload.
    fn write<W: Write>(&self, bytes: &mut ByteWriter<W, BigEndian>) -> Result<()> {
        let mut payload = Vec::new();
        self.write_payload(&mut payload)?;
        let length = u16::try_from(payload.len() + 2).map_err(|_| {
            HeaderError::InvalidSegmentLength {
                segment: Self::NAME,
                length: u16::MAX,
            }
        })?;
        bytes.put_word(Self::MARKER.word())?;
        bytes.put_word(length)?;
        bytes.put_bytes(&payload)
    }
}

/// Reads the length field of the segment whose marker was just consumed and
/// returns its payload.
pub fn read_payload<R: Read>(
    bytes: &mut ByteReader<R, BigEndian>,
    segment: &'static str,
) -> Result<Vec<u8>> {
    let length = bytes.get_word()?;
    if length < 2 {
        return Err(HeaderError::InvalidSegmentLength { segment, length }.into());
    }
    let mut payload = vec![0; length as usize - 2];
    bytes.get_bytes(&mut payload)?;
    Ok(payload)
}

/// Skips the segment whose marker was just consumed.
pub fn skip_segment<R: Read>(
    bytes: &mut ByteReader<R, BigEndian>,
    segment: &'static str,
) -> Result<()> {
    let length = bytes.get_word()?;
    if length < 2 {
        return Err(HeaderError::InvalidSegmentLength { segment, length }.into());
    }
    bytes.skip(length as u64 - 2)
}

/// Cursor over a segment payload. Running out of data is reported as an
/// invalid segment length.
pub struct SegmentReader<'a> {
    data: &'a [u8],
    segment: &'static str,
    length: u16,
}

impl<'a> SegmentReader<'a> {
    pub fn new(data: &'a [u8], segment: &'static str) -> Self {
        SegmentReader {
            data,
            segment,
            length: (data.len() + 2).min(u16::MAX as usize) as u16,
        }
    }

    fn length_error(&self) -> HeaderError {
        HeaderError::InvalidSegmentLength {
            segment: self.segment,
            length: self.length,
        }
    }

    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    pub fn read_u8(&mut self) -> Result<u8, HeaderError> {
        self.data.read_u8().map_err(|_| self.length_error())
    }

    pub fn read_u16(&mut self) -> Result<u16, HeaderError> {
        self.data
            .read_u16::<BigEndian>()
            .map_err(|_| self.length_error())
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], HeaderError> {
        if n > self.data.len() {
            return Err(self.length_error());
        }
        let (head, tail) = self.data.split_at(n);
        self.data = tail;
        Ok(head)
    }

    /// Fails if any payload bytes are left.
    pub fn finish(&self) -> Result<(), HeaderError> {
        if self.data.is_empty() {
            Ok(())
        } else {
            Err(self.length_error())
        }
    }
}

/// Parses a complete segment payload.
pub fn parse_segment<T: JpegSegment>(payload: &[u8]) -> Result<T, HeaderError> {
    let mut reader = SegmentReader::new(payload, T::NAME);
    T::read(&mut reader)
}
