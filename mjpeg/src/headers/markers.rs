// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::io::Read;

use byteorder::BigEndian;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::{byte_stream::ByteReader, error::Result, util::tracing_wrappers::debug};

/// Second byte of every marker recognized by the codec. Reserved codes that
/// are not listed are treated as unknown segments.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum Marker {
    Tem = 0x01,
    Sof0 = 0xc0,
    Sof1 = 0xc1,
    Sof2 = 0xc2,
    Sof3 = 0xc3,
    Dht = 0xc4,
    Sof5 = 0xc5,
    Sof6 = 0xc6,
    Sof7 = 0xc7,
    Jpg = 0xc8,
    Sof9 = 0xc9,
    Sof10 = 0xca,
    Sof11 = 0xcb,
    Dac = 0xcc,
    Sof13 = 0xcd,
    Sof14 = 0xce,
    Sof15 = 0xcf,
    Rst0 = 0xd0,
    Rst1 = 0xd1,
    Rst2 = 0xd2,
    Rst3 = 0xd3,
    Rst4 = 0xd4,
    Rst5 = 0xd5,
    Rst6 = 0xd6,
    Rst7 = 0xd7,
    Soi = 0xd8,
    Eoi = 0xd9,
    Sos = 0xda,
    Dqt = 0xdb,
    Dnl = 0xdc,
    Dri = 0xdd,
    Dhp = 0xde,
    Exp = 0xdf,
    App0 = 0xe0,
    App1 = 0xe1,
    App2 = 0xe2,
    App3 = 0xe3,
    App4 = 0xe4,
    App5 = 0xe5,
    App6 = 0xe6,
    App7 = 0xe7,
    App8 = 0xe8,
    App9 = 0xe9,
    App10 = 0xea,
    App11 = 0xeb,
    App12 = 0xec,
    App13 = 0xed,
    App14 = 0xee,
    App15 = 0xef,
    Com = 0xfe,
}

impl Marker {
    pub fn from_code(code: u8) -> Option<Marker> {
        Marker::from_u8(code)
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// The `FFxx` word as it appears in the stream.
    pub fn word(self) -> u16 {
        0xff00 | self as u16
    }

    /// Restart marker `RSTn` for `n` modulo 8.
    pub fn restart(n: usize) -> Marker {
        match n % 8 {
            0 => Marker::Rst0,
            1 => Marker::Rst1,
            2 => Marker::Rst2,
            3 => Marker::Rst3,
            4 => Marker::Rst4,
            5 => Marker::Rst5,
            6 => Marker::Rst6,
            _ => Marker::Rst7,
        }
    }

    /// Frame type number `n` of an `SOFn` marker.
    pub fn frame_type(self) -> Option<u8> {
        match self {
            Marker::Dht | Marker::Jpg | Marker::Dac => None,
            m if (Marker::Sof0.code()..=Marker::Sof15.code()).contains(&m.code()) => {
                Some(m.code() - Marker::Sof0.code())
            }
            _ => None,
        }
    }

    pub fn is_restart(self) -> bool {
        (Marker::Rst0.code()..=Marker::Rst7.code()).contains(&self.code())
    }

    pub fn is_app(self) -> bool {
        (Marker::App0.code()..=Marker::App15.code()).contains(&self.code())
    }

    /// Markers without a length field and payload.
    pub fn is_standalone(self) -> bool {
        matches!(self, Marker::Soi | Marker::Eoi | Marker::Tem) || self.is_restart()
    }
}

/// Advances to the next marker and returns its code.
///
/// Bytes that are not part of a marker are skipped, as are fill bytes
/// (`FF FF ...`) in front of one. `FF 00` is not a marker.
pub fn next_marker<R: Read>(bytes: &mut ByteReader<R, BigEndian>) -> Result<u8> {
    let start = bytes.position();
    let mut code = bytes.get_word()?;
    while code & 0xff00 != 0xff00 || code == 0xffff || code == 0xff00 {
        code = (code << 8) | bytes.get_byte()? as u16;
    }
    let skipped = bytes.position() - start - 2;
    if skipped > 0 {
        debug!(skipped, marker = code & 0xff, "skipped bytes before marker");
    }
    Ok((code & 0xff) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use test_log::test;

    #[test]
    fn test_codes() {
        assert_eq!(Marker::from_code(0xd8), Some(Marker::Soi));
        assert_eq!(Marker::from_code(0xc4), Some(Marker::Dht));
        assert_eq!(Marker::from_code(0xf0), None);
        assert_eq!(Marker::Dqt.word(), 0xffdb);
        assert_eq!(Marker::restart(9), Marker::Rst1);
        assert_eq!(Marker::restart(15).code(), 0xd7);
    }

    #[test]
    fn test_frame_types() {
        assert_eq!(Marker::Sof0.frame_type(), Some(0));
        assert_eq!(Marker::Sof2.frame_type(), Some(2));
        assert_eq!(Marker::Sof15.frame_type(), Some(15));
        assert_eq!(Marker::Dht.frame_type(), None);
        assert_eq!(Marker::Dac.frame_type(), None);
        assert_eq!(Marker::Sos.frame_type(), None);
    }

    #[test]
    fn test_standalone() {
        assert!(Marker::Soi.is_standalone());
        assert!(Marker::Rst5.is_standalone());
        assert!(!Marker::Sos.is_standalone());
        assert!(Marker::App14.is_app());
        assert!(!Marker::Com.is_app());
    }

    #[test]
    fn test_next_marker_skips_fill_and_garbage() -> Result<()> {
        let data = [0xff, 0xd8, 0x12, 0xff, 0x00, 0xff, 0xff, 0xff, 0xdb, 0x00];
        let mut bytes = ByteReader::new(&data[..]);
        assert_eq!(next_marker(&mut bytes)?, 0xd8);
        assert_eq!(next_marker(&mut bytes)?, 0xdb);
        assert_eq!(bytes.position(), 9);
        assert!(matches!(
            next_marker(&mut bytes),
            Err(Error::StreamTruncated { .. })
        ));
        Ok(())
    }
}
