// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Canonical JPEG Huffman tables: a two-level lookup table for decoding and a
//! dense symbol-indexed table for encoding.

use std::collections::BTreeMap;
use std::io::Read;

use crate::{
    bit_reader::BitReader,
    error::{Error, HuffmanTableError, Result},
};

pub const MAX_CODE_LENGTH: usize = 16;

/// Width of the first-level decode lookup.
pub const FIRST_LEVEL_BITS: usize = 9;

/// Upper bound on first-level plus overflow entries of a decode table.
pub const MAX_DECODE_TABLE_SIZE: usize = 1 << 12;

/// Value reported for bit patterns that have no code.
pub const FORBIDDEN_SYMBOL: u16 = 2047;

/// Code-length counts and symbols of one table, as carried by a DHT segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanSpec {
    /// `counts[i]` is the number of codes of length `i + 1`.
    pub counts: [u8; MAX_CODE_LENGTH],
    /// Symbols in order of increasing code.
    pub symbols: Vec<u8>,
}

/// A symbol together with its canonical code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalCode {
    pub symbol: u8,
    pub code: u16,
    pub length: u8,
}

impl HuffmanSpec {
    pub fn new(counts: [u8; MAX_CODE_LENGTH], symbols: &[u8]) -> Result<Self, HuffmanTableError> {
        let declared = counts.iter().map(|&c| c as usize).sum::<usize>();
        if declared != symbols.len() {
            return Err(HuffmanTableError::SymbolCountMismatch {
                declared,
                provided: symbols.len(),
            });
        }
        if declared == 0 {
            return Err(HuffmanTableError::Empty);
        }
        Ok(HuffmanSpec {
            counts,
            symbols: symbols.to_vec(),
        })
    }

    /// Builds a spec from the 16 counts followed by the symbols, the layout
    /// used by DHT payloads and the standard tables.
    pub fn from_packed(packed: &[u8]) -> Result<Self, HuffmanTableError> {
        if packed.len() < MAX_CODE_LENGTH {
            return Err(HuffmanTableError::SymbolCountMismatch {
                declared: MAX_CODE_LENGTH,
                provided: packed.len(),
            });
        }
        let (counts, symbols) = packed.split_at(MAX_CODE_LENGTH);
        let counts = array_init::array_init(|i| counts[i]);
        Self::new(counts, symbols)
    }

    /// Assigns codes shortest first, numerically increasing within a length.
    pub fn canonical_codes(&self) -> Result<Vec<CanonicalCode>, HuffmanTableError> {
        let mut codes = Vec::with_capacity(self.symbols.len());
        let mut symbols = self.symbols.iter();
        let mut code = 0u32;
        for (i, &count) in self.counts.iter().enumerate() {
            let length = i + 1;
            for _ in 0..count {
                let &symbol = symbols.next().ok_or(HuffmanTableError::SymbolCountMismatch {
                    declared: codes.len() + 1,
                    provided: self.symbols.len(),
                })?;
                codes.push(CanonicalCode {
                    symbol,
                    code: code as u16,
                    length: length as u8,
                });
                code += 1;
            }
            if code > 1 << length {
                return Err(HuffmanTableError::Oversubscribed(length));
            }
            code <<= 1;
        }
        Ok(codes)
    }
}

/// Packed decode table entry.
///
/// A terminal entry holds `(symbol << 4) | length` with a non-zero length; a
/// redirect holds `(offset << 8) | (depth << 4)` and a zero length nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HuffmanEntry(u32);

impl HuffmanEntry {
    const FORBIDDEN: HuffmanEntry = HuffmanEntry::terminal(FORBIDDEN_SYMBOL, 1);

    const fn terminal(symbol: u16, length: usize) -> Self {
        HuffmanEntry(((symbol as u32) << 4) | length as u32)
    }

    const fn redirect(offset: usize, depth: usize) -> Self {
        HuffmanEntry(((offset as u32) << 8) | ((depth as u32) << 4))
    }

    fn is_redirect(self) -> bool {
        self.0 & 15 == 0
    }

    fn symbol(self) -> u16 {
        (self.0 >> 4) as u16
    }

    fn length(self) -> usize {
        (self.0 & 15) as usize
    }

    fn offset(self) -> usize {
        (self.0 >> 8) as usize
    }

    fn depth(self) -> usize {
        ((self.0 >> 4) & 15) as usize
    }
}

/// Two-level decoding table: a [`FIRST_LEVEL_BITS`]-bit lookup, with one
/// overflow subtable per first-level prefix shared by longer codes.
#[derive(Debug, Clone)]
pub struct HuffmanDecodeTable {
    entries: Vec<HuffmanEntry>,
}

impl HuffmanDecodeTable {
    pub fn build(spec: &HuffmanSpec) -> Result<Self, HuffmanTableError> {
        let codes = spec.canonical_codes()?;
        let first_level = 1 << FIRST_LEVEL_BITS;

        // Depth of the subtable under every prefix that has longer codes.
        let mut depths: BTreeMap<usize, usize> = BTreeMap::new();
        for c in codes.iter().filter(|c| c.length as usize > FIRST_LEVEL_BITS) {
            let extra = c.length as usize - FIRST_LEVEL_BITS;
            let prefix = (c.code >> extra) as usize;
            let depth = depths.entry(prefix).or_default();
            *depth = (*depth).max(extra);
        }
        let size = first_level + depths.values().map(|&d| 1 << d).sum::<usize>();
        if size > MAX_DECODE_TABLE_SIZE {
            return Err(HuffmanTableError::TableTooLarge(size));
        }

        let mut entries = vec![HuffmanEntry::FORBIDDEN; size];
        let mut subtables = BTreeMap::new();
        let mut offset = first_level;
        for (&prefix, &depth) in &depths {
            entries[prefix] = HuffmanEntry::redirect(offset, depth);
            subtables.insert(prefix, (offset, depth));
            offset += 1 << depth;
        }

        for c in &codes {
            let length = c.length as usize;
            let code = c.code as usize;
            let (start, span, stored_length) = if length <= FIRST_LEVEL_BITS {
                let shift = FIRST_LEVEL_BITS - length;
                (code << shift, 1 << shift, length)
            } else {
                let extra = length - FIRST_LEVEL_BITS;
                let (base, depth) = subtables[&(code >> extra)];
                let shift = depth - extra;
                let low = code & ((1 << extra) - 1);
                (base + (low << shift), 1 << shift, extra)
            };
            entries[start..start + span]
                .fill(HuffmanEntry::terminal(c.symbol as u16, stored_length));
        }
        Ok(HuffmanDecodeTable { entries })
    }

    /// Decodes one symbol from `br`.
    ///
    /// A pattern without a code is [`Error::ForbiddenCode`], unless it was
    /// formed with padding bits past the end of the data, in which case the
    /// stream is reported as truncated.
    pub fn decode<R: Read>(&self, br: &mut BitReader<R>) -> Result<u8> {
        let mut lookahead = FIRST_LEVEL_BITS;
        let mut entry = self.entries[br.show(lookahead)? as usize];
        if entry.is_redirect() {
            br.skip_bits(FIRST_LEVEL_BITS)?;
            lookahead = entry.depth();
            entry = self.entries[entry.offset() + br.show(lookahead)? as usize];
        }
        if entry.symbol() == FORBIDDEN_SYMBOL {
            if br.reaches_padding(lookahead) {
                return Err(Error::StreamTruncated {
                    offset: br.byte_position(),
                });
            }
            return Err(Error::ForbiddenCode {
                offset: br.byte_position(),
            });
        }
        br.skip_bits(entry.length())?;
        Ok(entry.symbol() as u8)
    }

    /// Resolves a left-aligned 16-bit lookahead to `(symbol, code length)`.
    /// Patterns without a code resolve to [`FORBIDDEN_SYMBOL`].
    pub fn lookup(&self, bits: u16) -> (u16, usize) {
        let bits = bits as usize;
        let entry = self.entries[bits >> (MAX_CODE_LENGTH - FIRST_LEVEL_BITS)];
        if !entry.is_redirect() {
            return (entry.symbol(), entry.length());
        }
        let depth = entry.depth();
        let low = (bits >> (MAX_CODE_LENGTH - FIRST_LEVEL_BITS - depth)) & ((1 << depth) - 1);
        let sub = self.entries[entry.offset() + low];
        (sub.symbol(), FIRST_LEVEL_BITS + sub.length())
    }
}

/// Symbol-indexed encoding table.
#[derive(Debug, Clone)]
pub struct HuffmanEncodeTable {
    min_symbol: u8,
    // (code, length); length 0 marks symbols without a code.
    codes: Vec<(u16, u8)>,
}

impl HuffmanEncodeTable {
    pub fn build(spec: &HuffmanSpec) -> Result<Self, HuffmanTableError> {
        let canonical = spec.canonical_codes()?;
        let min_symbol = canonical
            .iter()
            .map(|c| c.symbol)
            .min()
            .ok_or(HuffmanTableError::Empty)?;
        let max_symbol = canonical.iter().map(|c| c.symbol).max().unwrap_or(min_symbol);
        let mut codes = vec![(0, 0); (max_symbol - min_symbol) as usize + 1];
        for c in canonical {
            codes[(c.symbol - min_symbol) as usize] = (c.code, c.length);
        }
        Ok(HuffmanEncodeTable { min_symbol, codes })
    }

    /// Returns `(code, length)` for `symbol`.
    pub fn encode(&self, symbol: u8) -> Result<(u16, u8), HuffmanTableError> {
        symbol
            .checked_sub(self.min_symbol)
            .and_then(|i| self.codes.get(i as usize))
            .filter(|(_, length)| *length != 0)
            .copied()
            .ok_or(HuffmanTableError::MissingSymbol(symbol))
    }
}
