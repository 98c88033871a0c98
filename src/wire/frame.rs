// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Length-prefixed framing: a big-endian `u64` byte count, then the body.

use std::io::{ErrorKind, Read, Write};

use byteorder::{BigEndian, WriteBytesExt};

use super::WireError;
use crate::constants::MAX_FRAME_LENGTH;

/// The most that is reserved for a frame body before any of it has arrived.
const FRAME_READ_CAPACITY: u64 = 1 << 16;

pub fn write_frame<W: Write>(w: &mut W, body: &[u8]) -> Result<(), WireError> {
    w.write_u64::<BigEndian>(body.len() as u64)?;
    w.write_all(body)?;
    w.flush()?;
    Ok(())
}

/// Read one frame. `None` is returned if the stream ends cleanly before a
/// frame starts; a stream ending part way through a frame is a
/// [WireError::ShortFrame].
pub fn read_frame<R: Read>(r: &mut R) -> Result<Option<Vec<u8>>, WireError> {
    let mut length_bytes = [0; 8];
    let received = read_fully(r, &mut length_bytes)?;
    if received == 0 {
        return Ok(None);
    }
    if received < length_bytes.len() {
        return Err(WireError::ShortFrame {
            expected: length_bytes.len() as u64,
            received: received as u64,
        });
    }

    let length = u64::from_be_bytes(length_bytes);
    if length > MAX_FRAME_LENGTH {
        return Err(WireError::FrameTooLarge {
            length,
            max: MAX_FRAME_LENGTH,
        });
    }
    // The body grows as bytes arrive; a peer declaring a large frame and then
    // going quiet costs nothing.
    let mut body = Vec::with_capacity(length.min(FRAME_READ_CAPACITY) as usize);
    let received = r.by_ref().take(length).read_to_end(&mut body)?;
    if (received as u64) < length {
        return Err(WireError::ShortFrame {
            expected: length,
            received: received as u64,
        });
    }
    Ok(Some(body))
}

/// Keep reading until `buf` is full or the stream ends, returning the number
/// of bytes read.
fn read_fully<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<usize, WireError> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(WireError::IO(e)),
        }
    }
    Ok(filled)
}
