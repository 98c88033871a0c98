// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Record tags and primitive encodings shared by the cycle-file reader and
//! writer.

use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

/// The first bytes of every cycle file.
pub const MAGIC: &[u8; 8] = b"VISCYC01";

pub(crate) const TAG_HEADER: u8 = b'H';
pub(crate) const TAG_FLAG_TABLE: u8 = b'F';
pub(crate) const TAG_POINT: u8 = b'P';
pub(crate) const TAG_SYSCAL: u8 = b'S';
pub(crate) const TAG_END_OF_CYCLE: u8 = b'T';

/// Strings longer than this are considered corrupt.
const MAX_STRING_LENGTH: u32 = 1 << 16;

pub(crate) fn write_string<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    w.write_u32::<BigEndian>(s.len() as u32)?;
    w.write_all(s.as_bytes())
}

pub(crate) fn read_string<R: Read>(r: &mut R) -> io::Result<String> {
    let len = r.read_u32::<BigEndian>()?;
    if len > MAX_STRING_LENGTH {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("string length {len} is unreasonably large"),
        ));
    }
    let mut buf = vec![0; len as usize];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

pub(crate) fn write_bool<W: Write>(w: &mut W, b: bool) -> io::Result<()> {
    w.write_u8(u8::from(b))
}

pub(crate) fn read_bool<R: Read>(r: &mut R) -> io::Result<bool> {
    Ok(r.read_u8()? != 0)
}

pub(crate) fn write_pair<W: Write>(w: &mut W, pair: [f32; 2]) -> io::Result<()> {
    w.write_f32::<BigEndian>(pair[0])?;
    w.write_f32::<BigEndian>(pair[1])
}

pub(crate) fn read_pair<R: Read>(r: &mut R) -> io::Result<[f32; 2]> {
    Ok([r.read_f32::<BigEndian>()?, r.read_f32::<BigEndian>()?])
}
