// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use byteorder::{BigEndian, WriteBytesExt};

use crate::{
    error::HeaderError,
    headers::{JpegSegment, Marker, SegmentReader},
};

/// Number of quantization tables a baseline frame may reference.
pub const NUM_QUANT_TABLES: u8 = 3;

/// Most blocks a single MCU may hold.
pub const MAX_BLOCKS_PER_MCU: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Component {
    pub id: u8,
    pub h: u8,
    pub v: u8,
    pub quant_table: u8,
}

impl Component {
    pub fn blocks_per_mcu(&self) -> usize {
        self.h as usize * self.v as usize
    }
}

/// Baseline frame header (SOF0 / SOF1 payload).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub precision: u8,
    pub height: u16,
    pub width: u16,
    /// Luma first; for color images chroma follows in Cb, Cr order.
    pub components: Vec<Component>,
}

impl FrameHeader {
    pub fn is_color(&self) -> bool {
        self.components.len() == 3
    }

    /// Largest sampling factors over all components.
    pub fn max_sampling(&self) -> (u8, u8) {
        self.components
            .iter()
            .fold((1, 1), |(h, v), c| (h.max(c.h), v.max(c.v)))
    }

    /// MCU size in pixels. A single-component scan is not interleaved and
    /// codes one block per MCU whatever its sampling factors say.
    pub fn mcu_size(&self) -> (usize, usize) {
        if !self.is_color() {
            return (8, 8);
        }
        let (h, v) = self.max_sampling();
        (h as usize * 8, v as usize * 8)
    }

    /// Number of MCUs across and down the image.
    pub fn mcu_grid(&self) -> (usize, usize) {
        let (mw, mh) = self.mcu_size();
        (
            (self.width as usize).div_ceil(mw),
            (self.height as usize).div_ceil(mh),
        )
    }

    pub fn component_index(&self, id: u8) -> Option<usize> {
        self.components.iter().position(|c| c.id == id)
    }

    fn validate(&self) -> Result<(), HeaderError> {
        if self.width == 0 || self.height == 0 {
            return Err(HeaderError::InvalidDimensions(self.width, self.height));
        }
        for c in &self.components {
            if ![1, 2, 4].contains(&c.h) || ![1, 2, 4].contains(&c.v) {
                return Err(HeaderError::InvalidSamplingFactor {
                    component: c.id,
                    h: c.h,
                    v: c.v,
                });
            }
            if c.quant_table >= NUM_QUANT_TABLES {
                return Err(HeaderError::InvalidQuantTableIndex(c.quant_table));
            }
        }
        if let [luma, cb, cr] = &self.components[..] {
            if cb.h > luma.h || cb.v > luma.v {
                return Err(HeaderError::ChromaExceedsLuma);
            }
            if (cb.h, cb.v) != (cr.h, cr.v) {
                return Err(HeaderError::MismatchedChromaSampling);
            }
            let blocks: usize = self.components.iter().map(Component::blocks_per_mcu).sum();
            if blocks > MAX_BLOCKS_PER_MCU {
                return Err(HeaderError::TooManyBlocksPerMcu(blocks));
            }
        }
        Ok(())
    }
}

impl JpegSegment for FrameHeader {
    const MARKER: Marker = Marker::Sof0;
    const NAME: &'static str = "SOF";

    fn read(payload: &mut SegmentReader<'_>) -> Result<Self, HeaderError> {
        let precision = payload.read_u8()?;
        if precision != 8 {
            return Err(HeaderError::UnsupportedPrecision(precision));
        }
        let height = payload.read_u16()?;
        let width = payload.read_u16()?;
        let count = payload.read_u8()?;
        if count != 1 && count != 3 {
            return Err(HeaderError::InvalidComponentCount(count));
        }
        let mut components: Vec<Component> = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let id = payload.read_u8()?;
            let sampling = payload.read_u8()?;
            let quant_table = payload.read_u8()?;
            if components.iter().any(|c| c.id == id) {
                return Err(HeaderError::DuplicateComponent(id));
            }
            components.push(Component {
                id,
                h: sampling >> 4,
                v: sampling & 15,
                quant_table,
            });
        }
        payload.finish()?;
        let header = FrameHeader {
            precision,
            height,
            width,
            components,
        };
        header.validate()?;
        Ok(header)
    }

    fn write_payload(&self, out: &mut Vec<u8>) -> std::io::Result<()> {
        out.write_u8(self.precision)?;
        out.write_u16::<BigEndian>(self.height)?;
        out.write_u16::<BigEndian>(self.width)?;
        out.write_u8(self.components.len() as u8)?;
        for c in &self.components {
            out.write_u8(c.id)?;
            out.write_u8((c.h << 4) | c.v)?;
            out.write_u8(c.quant_table)?;
        }
        Ok(())
    }
}
