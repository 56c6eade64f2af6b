// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::fmt::Debug;

use crate::error::{Error, Result};

/// Largest width or height a JPEG frame header can carry.
pub const MAX_DIMENSION: usize = u16::MAX as usize;

fn check_layout(width: usize, height: usize, channels: usize) -> Result<()> {
    if width == 0
        || height == 0
        || width > MAX_DIMENSION
        || height > MAX_DIMENSION
        || (channels != 1 && channels != 3)
    {
        return Err(Error::InvalidImage {
            width,
            height,
            channels,
        });
    }
    Ok(())
}

/// Borrowed 8-bit pixels: gray, or interleaved B, G, R.
#[derive(Clone, Copy)]
pub struct ImageView<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    stride: usize,
    channels: usize,
}

impl Debug for ImageView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ImageView {}x{}x{} stride {}",
            self.width, self.height, self.channels, self.stride
        )
    }
}

impl<'a> ImageView<'a> {
    /// Tightly packed rows.
    pub fn new(data: &'a [u8], width: usize, height: usize, channels: usize) -> Result<Self> {
        Self::with_stride(data, width, height, width * channels, channels)
    }

    /// Rows start `stride` bytes apart. The last row only needs
    /// `width * channels` bytes.
    pub fn with_stride(
        data: &'a [u8],
        width: usize,
        height: usize,
        stride: usize,
        channels: usize,
    ) -> Result<Self> {
        check_layout(width, height, channels)?;
        let row_bytes = width * channels;
        if stride < row_bytes {
            return Err(Error::InvalidImage {
                width,
                height,
                channels,
            });
        }
        let needed = stride * (height - 1) + row_bytes;
        if data.len() < needed {
            return Err(Error::BufferTooSmall {
                needed,
                actual: data.len(),
            });
        }
        Ok(ImageView {
            data,
            width,
            height,
            stride,
            channels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn row(&self, y: usize) -> &'a [u8] {
        let start = y * self.stride;
        &self.data[start..start + self.width * self.channels]
    }
}

/// Owned 8-bit pixels with tightly packed rows.
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    data: Vec<u8>,
    width: usize,
    height: usize,
    channels: usize,
}

impl Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Image {}x{}x{}", self.width, self.height, self.channels)
    }
}

impl Image {
    pub fn new(width: usize, height: usize, channels: usize) -> Result<Self> {
        check_layout(width, height, channels)?;
        Ok(Image {
            data: vec![0; width * height * channels],
            width,
            height,
            channels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn stride(&self) -> usize {
        self.width * self.channels
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        let stride = self.stride();
        &self.data[y * stride..(y + 1) * stride]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let stride = self.stride();
        &mut self.data[y * stride..(y + 1) * stride]
    }

    pub fn as_view(&self) -> ImageView<'_> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.stride(),
            channels: self.channels,
        }
    }
}

/// Samples of one component for one MCU, in the transform domain.
#[derive(Debug, Clone)]
pub(crate) struct Plane {
    data: Vec<i32>,
    width: usize,
}

impl Plane {
    pub(crate) fn new(width: usize, height: usize) -> Self {
        Plane {
            data: vec![0; width * height],
            width,
        }
    }

    pub(crate) fn stride(&self) -> usize {
        self.width
    }

    pub(crate) fn clear(&mut self) {
        self.data.fill(0);
    }

    #[inline]
    pub(crate) fn row(&self, y: usize) -> &[i32] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    /// Samples from the top-left corner of 8x8 block `(bx, by)` to the end.
    #[inline]
    pub(crate) fn block(&self, bx: usize, by: usize) -> &[i32] {
        &self.data[by * 8 * self.width + bx * 8..]
    }

    #[inline]
    pub(crate) fn block_mut(&mut self, bx: usize, by: usize) -> &mut [i32] {
        &mut self.data[by * 8 * self.width + bx * 8..]
    }

    #[inline]
    pub(crate) fn row_mut(&mut self, y: usize) -> &mut [i32] {
        &mut self.data[y * self.width..(y + 1) * self.width]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_view_validation() {
        let data = [0u8; 30];
        assert!(ImageView::new(&data, 10, 1, 3).is_ok());
        assert!(matches!(
            ImageView::new(&data, 0, 1, 3),
            Err(Error::InvalidImage { width: 0, .. })
        ));
        assert!(matches!(
            ImageView::new(&data, 1, 1, 2),
            Err(Error::InvalidImage { channels: 2, .. })
        ));
        assert!(matches!(
            ImageView::new(&data, 70000, 1, 1),
            Err(Error::InvalidImage { .. })
        ));
        assert!(matches!(
            ImageView::new(&data, 4, 8, 1),
            Err(Error::BufferTooSmall {
                needed: 32,
                actual: 30
            })
        ));
        assert!(matches!(
            ImageView::with_stride(&data, 4, 2, 3, 1),
            Err(Error::InvalidImage { .. })
        ));
    }

    #[test]
    fn test_strided_rows() {
        let data: Vec<u8> = (0..22).collect();
        // Last row needs only width * channels bytes.
        let view = ImageView::with_stride(&data, 2, 3, 10, 1).unwrap();
        assert_eq!(view.row(0), [0, 1]);
        assert_eq!(view.row(2), [20, 21]);
    }

    #[test]
    fn test_image_rows() {
        let mut image = Image::new(3, 2, 3).unwrap();
        image.row_mut(1)[8] = 7;
        assert_eq!(image.data()[17], 7);
        assert_eq!(image.as_view().row(1)[8], 7);
        assert_eq!(image.size(), (3, 2));
    }

    #[test]
    fn test_plane_blocks() {
        let mut plane = Plane::new(16, 16);
        plane.block_mut(1, 1)[0] = 5;
        assert_eq!(plane.row(8)[8], 5);
        assert_eq!(plane.block(1, 0)[8 * plane.stride()], 5);
        plane.row_mut(15)[15] = 1;
        assert_eq!(plane.block(1, 1)[7 * 16 + 7], 1);
    }
}
