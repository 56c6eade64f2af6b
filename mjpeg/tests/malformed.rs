// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use mjpeg::{
    DecoderOptions, EncoderOptions, Error, HeaderError, ImageView, JpegDecoder, JpegEncoder,
    decode, options::DEFAULT_PIXEL_LIMIT,
};
use mjpeg_test_utils::gradient_image;
use test_log::test;

fn sample_stream(restart_interval: Option<u16>) -> Vec<u8> {
    let pixels = gradient_image(40, 24, 3);
    let view = ImageView::new(&pixels, 40, 24, 3).unwrap();
    let mut options = EncoderOptions::default();
    options.quality = 8;
    options.restart_interval = restart_interval;
    JpegEncoder::new(options).encode(&view).unwrap()
}

fn find_marker(data: &[u8], code: u8) -> usize {
    data.windows(2).position(|w| w == [0xff, code]).unwrap()
}

fn limited_decoder() -> JpegDecoder {
    let mut options = DecoderOptions::default();
    options.pixel_limit = Some(1 << 16);
    JpegDecoder::new(options)
}

#[test]
fn truncated_scan() {
    let gray = gradient_image(40, 24, 1);
    let gray = JpegEncoder::new(EncoderOptions::default())
        .encode(&ImageView::new(&gray, 40, 24, 1).unwrap())
        .unwrap();
    for data in [sample_stream(None), sample_stream(Some(2)), gray] {
        let sos = find_marker(&data, 0xda);
        // Everything short of dropping only the EOI loses scan data.
        for cut in sos..data.len() - 2 {
            match decode(&data[..cut]) {
                Err(Error::StreamTruncated { .. }) => {}
                other => panic!("cut at {cut} of {}: {other:?}", data.len()),
            }
        }
    }
}

#[test]
fn truncated_header() {
    let data = sample_stream(None);
    let sof = find_marker(&data, 0xc0);
    assert!(matches!(
        decode(&data[..sof + 6]),
        Err(Error::StreamTruncated { .. })
    ));
    assert!(matches!(
        JpegDecoder::read_info(&data[..3]),
        Err(Error::StreamTruncated { .. })
    ));
}

#[test]
fn missing_eoi_is_tolerated() {
    let data = sample_stream(Some(2));
    let complete = decode(&data).unwrap();
    let trimmed = decode(&data[..data.len() - 2]).unwrap();
    assert_eq!(complete.data(), trimmed.data());
}

#[test]
fn oversized_frames_are_rejected_by_default() {
    let mut data = sample_stream(None);
    let sof = find_marker(&data, 0xc0);
    // Height and width follow the length and precision fields.
    data[sof + 5..sof + 9].copy_from_slice(&[0xff, 0xff, 0xff, 0xff]);
    assert!(matches!(
        decode(&data),
        Err(Error::Header(HeaderError::PixelLimitExceeded {
            width: 65535,
            height: 65535,
            limit: DEFAULT_PIXEL_LIMIT,
        }))
    ));

    let info = JpegDecoder::read_info(&data).unwrap();
    assert_eq!((info.width, info.height), (65535, 65535));

    let mut options = DecoderOptions::default();
    options.pixel_limit = Some(40 * 24);
    assert!(JpegDecoder::new(options).decode(&sample_stream(None)).is_ok());
}

#[test]
fn quant_table_index_out_of_range() {
    let mut data = sample_stream(None);
    let dqt = find_marker(&data, 0xdb);
    // Pq = 0, Tq = 3.
    data[dqt + 4] = 0x03;
    assert!(matches!(
        decode(&data),
        Err(Error::Header(HeaderError::InvalidQuantTableIndex(3)))
    ));
}

#[test]
fn missing_huffman_table() {
    let mut data = sample_stream(None);
    let sos = find_marker(&data, 0xda);
    // Point the luma AC selector at an undefined slot.
    data[sos + 6] = 0x03;
    assert!(matches!(
        decode(&data),
        Err(Error::Header(HeaderError::MissingHuffmanTable { class: 1, index: 3 }))
    ));
}

#[test]
fn non_interleaved_color_scans_are_rejected() {
    let data = sample_stream(None);
    let sos = find_marker(&data, 0xda);
    let length = u16::from_be_bytes([data[sos + 2], data[sos + 3]]) as usize;
    // A luma-only first scan, as in a multi-scan sequential stream.
    let luma_scan = [0xff, 0xda, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3f, 0x00];
    let patched = [&data[..sos], &luma_scan[..], &data[sos + 2 + length..]].concat();
    assert!(matches!(
        decode(&patched),
        Err(Error::Header(HeaderError::UnsupportedScan { components: 1, .. }))
    ));
}

#[test]
fn progressive_frames_are_rejected() {
    let mut data = sample_stream(None);
    let sof = find_marker(&data, 0xc0);
    data[sof + 1] = 0xc2;
    assert!(matches!(
        decode(&data),
        Err(Error::Header(HeaderError::UnsupportedFrameType(2)))
    ));
}

#[test]
fn garbage_and_extra_segments_are_skipped() {
    let data = sample_stream(None);
    let expected = decode(&data).unwrap();

    // Fill bytes, a comment and an unknown APP segment ahead of the frame.
    let sof = find_marker(&data, 0xc0);
    let mut patched = data[..sof].to_vec();
    patched.extend_from_slice(&[0x12, 0x34, 0xff, 0xff]);
    patched.extend_from_slice(&[0xfe, 0x00, 0x05, b'h', b'i', b'!']);
    patched.extend_from_slice(&[0xff, 0xe5, 0x00, 0x03, 0x00]);
    patched.extend_from_slice(&data[sof..]);
    assert_eq!(decode(&patched).unwrap().data(), expected.data());
}

#[test]
fn bad_restart_data_does_not_panic() {
    let mut data = sample_stream(Some(1));
    let rst = find_marker(&data, 0xd0);
    data[rst + 2] ^= 0x5a;
    // Damage is confined to one interval; either outcome is acceptable.
    let _ = limited_decoder().decode(&data);
}

#[test]
fn corrupted_streams_do_not_panic() {
    let data = sample_stream(Some(3));
    arbtest::arbtest(|u| {
        let mut corrupted = data.clone();
        let flips = u.int_in_range(1..=8)?;
        for _ in 0..flips {
            let pos = u.choose_index(corrupted.len())?;
            corrupted[pos] = u.arbitrary()?;
        }
        let _ = limited_decoder().decode(&corrupted);
        let _ = JpegDecoder::read_info(&corrupted);
        Ok(())
    });
}

#[test]
fn arbitrary_bytes_do_not_panic() {
    arbtest::arbtest(|u| {
        let mut bytes: Vec<u8> = u.arbitrary()?;
        if u.arbitrary()? {
            bytes = [&[0xff, 0xd8][..], &bytes].concat();
        }
        let _ = limited_decoder().decode(&bytes);
        Ok(())
    });
}

#[test]
fn invalid_pixel_buffers() {
    let pixels = [0u8; 10];
    assert!(matches!(
        ImageView::new(&pixels, 4, 4, 1),
        Err(Error::BufferTooSmall { needed: 16, actual: 10 })
    ));
    assert!(matches!(
        ImageView::new(&pixels, 2, 1, 4),
        Err(Error::InvalidImage { channels: 4, .. })
    ));
    assert!(matches!(
        ImageView::new(&pixels, 0, 1, 1),
        Err(Error::InvalidImage { width: 0, .. })
    ));
}
