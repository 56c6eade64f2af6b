// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use thiserror::Error;

use crate::entropy_coding::huffman::MAX_DECODE_TABLE_SIZE;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Structural header error: {0}")]
    Header(#[from] HeaderError),
    #[error("Stream truncated at byte {offset}")]
    StreamTruncated { offset: u64 },
    #[error("Forbidden Huffman code at byte {offset}")]
    ForbiddenCode { offset: u64 },
    #[error("AC coefficients run past the end of the block at byte {offset}")]
    CoefficientOverrun { offset: u64 },
    #[error("Invalid DC category {category} at byte {offset}")]
    InvalidDcCategory { category: u8, offset: u64 },
    #[error("Invalid Huffman table: {0}")]
    Huffman(#[from] HuffmanTableError),
    #[error("Invalid image: {width}x{height} with {channels} channels")]
    InvalidImage {
        width: usize,
        height: usize,
        channels: usize,
    },
    #[error("Pixel buffer too small: {actual} bytes, need {needed}")]
    BufferTooSmall { needed: usize, actual: usize },
    #[error("Cannot seek to byte {target}, buffered data starts at byte {window_start}")]
    SeekOutOfRange { target: u64, window_start: u64 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Problems found while parsing marker segments, before any entropy-coded
/// data is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("Missing SOI marker, found {0:02x}{1:02x}")]
    MissingSoi(u8, u8),
    #[error("Unexpected marker {found:02x} at byte {offset}, expected {expected}")]
    UnexpectedMarker {
        expected: &'static str,
        found: u8,
        offset: u64,
    },
    #[error("Unsupported frame type SOF{0} (only baseline sequential Huffman is supported)")]
    UnsupportedFrameType(u8),
    #[error("More than one frame header")]
    DuplicateFrame,
    #[error("Unsupported sample precision: {0}")]
    UnsupportedPrecision(u8),
    #[error("Invalid component count: {0}")]
    InvalidComponentCount(u8),
    #[error("Invalid image dimensions: {0}x{1}")]
    InvalidDimensions(u16, u16),
    #[error("Invalid sampling factors {h}x{v} for component {component}")]
    InvalidSamplingFactor { component: u8, h: u8, v: u8 },
    #[error("Chroma sampling exceeds luma sampling")]
    ChromaExceedsLuma,
    #[error("Chroma components use different sampling factors")]
    MismatchedChromaSampling,
    #[error("Component id {0} declared twice")]
    DuplicateComponent(u8),
    #[error("Quantization table index {0} out of range")]
    InvalidQuantTableIndex(u8),
    #[error("Quantization table precision {0} is not 0 (8 bit) or 1 (16 bit)")]
    InvalidQuantPrecision(u8),
    #[error("Huffman table class {class} index {index} out of range")]
    InvalidHuffmanTableIndex { class: u8, index: u8 },
    #[error("Invalid Huffman table: {0}")]
    InvalidHuffmanTable(HuffmanTableError),
    #[error("Invalid length {length} for {segment} segment")]
    InvalidSegmentLength { segment: &'static str, length: u16 },
    #[error("APP0 segment does not carry the JFIF identifier")]
    NotJfif,
    #[error("Scan without a preceding frame header")]
    MissingFrame,
    #[error("Quantization table {0} referenced but never defined")]
    MissingQuantTable(u8),
    #[error("Huffman table class {class} index {index} referenced but never defined")]
    MissingHuffmanTable { class: u8, index: u8 },
    #[error("Scan references unknown component id {0}")]
    UnknownComponent(u8),
    #[error("Unsupported scan: components {components}, spectral {ss}..{se}, approximation {ah}/{al}")]
    UnsupportedScan {
        components: u8,
        ss: u8,
        se: u8,
        ah: u8,
        al: u8,
    },
    #[error("MCU has {0} blocks, at most 10 are allowed")]
    TooManyBlocksPerMcu(usize),
    #[error("Only a single scan is supported")]
    MultipleScans,
    #[error("Image of {width}x{height} exceeds the pixel limit of {limit}")]
    PixelLimitExceeded {
        width: usize,
        height: usize,
        limit: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HuffmanTableError {
    #[error("Code lengths promise {declared} symbols, {provided} provided")]
    SymbolCountMismatch { declared: usize, provided: usize },
    #[error("Code lengths oversubscribe the code space at length {0}")]
    Oversubscribed(usize),
    #[error("Decode table needs {0} entries, at most {MAX_DECODE_TABLE_SIZE} are allowed")]
    TableTooLarge(usize),
    #[error("Table defines no symbols")]
    Empty,
    #[error("Symbol {0:#04x} has no code")]
    MissingSymbol(u8),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
