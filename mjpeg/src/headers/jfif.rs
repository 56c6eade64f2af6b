// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use byteorder::{BigEndian, WriteBytesExt};

use crate::{
    error::HeaderError,
    headers::{JpegSegment, Marker, SegmentReader},
};

pub const JFIF_IDENTIFIER: &[u8; 5] = b"JFIF\0";

/// JFIF APP0 payload. Thumbnails are skipped when reading and never
/// written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jfif {
    /// Major version in the high byte, minor in the low byte.
    pub version: u16,
    pub density_units: u8,
    pub x_density: u16,
    pub y_density: u16,
}

impl Default for Jfif {
    fn default() -> Self {
        Jfif {
            version: 0x0102,
            density_units: 0,
            x_density: 1,
            y_density: 1,
        }
    }
}

impl Jfif {
    pub fn is_jfif(payload: &[u8]) -> bool {
        payload.starts_with(JFIF_IDENTIFIER)
    }
}

impl JpegSegment for Jfif {
    const MARKER: Marker = Marker::App0;
    const NAME: &'static str = "APP0";

    fn read(payload: &mut SegmentReader<'_>) -> Result<Self, HeaderError> {
        if payload.read_bytes(JFIF_IDENTIFIER.len())? != JFIF_IDENTIFIER {
            return Err(HeaderError::NotJfif);
        }
        let version = payload.read_u16()?;
        let density_units = payload.read_u8()?;
        let x_density = payload.read_u16()?;
        let y_density = payload.read_u16()?;
        let thumb_w = payload.read_u8()? as usize;
        let thumb_h = payload.read_u8()? as usize;
        payload.read_bytes(3 * thumb_w * thumb_h)?;
        Ok(Jfif {
            version,
            density_units,
            x_density,
            y_density,
        })
    }

    fn write_payload(&self, out: &mut Vec<u8>) -> std::io::Result<()> {
        out.extend_from_slice(JFIF_IDENTIFIER);
        out.write_u16::<BigEndian>(self.version)?;
        out.write_u8(self.density_units)?;
        out.write_u16::<BigEndian>(self.x_density)?;
        out.write_u16::<BigEndian>(self.y_density)?;
        out.write_u8(0)?;
        out.write_u8(0)
    }
}
