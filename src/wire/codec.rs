// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The binary encoding of message bodies.
//!
//! Everything is big endian. `usize` values travel as `u32`, booleans as a
//! single byte, strings and arrays as a `u32` length followed by their
//! contents, and optional values as a boolean followed by the value if it is
//! present.

use std::{
    io::{self, Read, Write},
    sync::Arc,
};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use num_complex::Complex;

use super::WireError;

pub trait Encode {
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()>;
}

pub trait Decode: Sized {
    fn decode<R: Read>(r: &mut R) -> Result<Self, WireError>;
}

/// Implement [Encode] and [Decode] for a struct by visiting its fields in the
/// order given.
macro_rules! wire_struct {
    ($ty:ident { $($field:ident),* $(,)? }) => {
        impl $crate::wire::codec::Encode for $ty {
            fn encode<W: std::io::Write>(&self, w: &mut W) -> std::io::Result<()> {
                $( $crate::wire::codec::Encode::encode(&self.$field, w)?; )*
                Ok(())
            }
        }

        impl $crate::wire::codec::Decode for $ty {
            fn decode<R: std::io::Read>(r: &mut R) -> Result<Self, $crate::wire::WireError> {
                Ok($ty {
                    $( $field: $crate::wire::codec::Decode::decode(r)?, )*
                })
            }
        }
    };
}
pub(crate) use wire_struct;

macro_rules! wire_primitive {
    ($ty:ty, $write:ident, $read:ident) => {
        impl Encode for $ty {
            fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
                w.$write::<BigEndian>(*self)
            }
        }

        impl Decode for $ty {
            fn decode<R: Read>(r: &mut R) -> Result<Self, WireError> {
                Ok(r.$read::<BigEndian>()?)
            }
        }
    };
}

wire_primitive!(i32, write_i32, read_i32);
wire_primitive!(u32, write_u32, read_u32);
wire_primitive!(f32, write_f32, read_f32);
wire_primitive!(f64, write_f64, read_f64);

impl Encode for usize {
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let v = u32::try_from(*self).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{self} doesn't fit in 32 bits"),
            )
        })?;
        w.write_u32::<BigEndian>(v)
    }
}

impl Decode for usize {
    fn decode<R: Read>(r: &mut R) -> Result<Self, WireError> {
        Ok(r.read_u32::<BigEndian>()? as usize)
    }
}

impl Encode for bool {
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u8(u8::from(*self))
    }
}

impl Decode for bool {
    fn decode<R: Read>(r: &mut R) -> Result<Self, WireError> {
        Ok(r.read_u8()? != 0)
    }
}

impl Encode for String {
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.len().encode(w)?;
        w.write_all(self.as_bytes())
    }
}

impl Decode for String {
    fn decode<R: Read>(r: &mut R) -> Result<Self, WireError> {
        let len = usize::decode(r)?;
        let mut buf = Vec::with_capacity(len.min(4096));
        r.take(len as u64).read_to_end(&mut buf)?;
        if buf.len() != len {
            return Err(WireError::Truncated);
        }
        Ok(String::from_utf8(buf)?)
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.as_slice().encode(w)
    }
}

impl<T: Encode> Encode for [T] {
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.len().encode(w)?;
        for v in self {
            v.encode(w)?;
        }
        Ok(())
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode<R: Read>(r: &mut R) -> Result<Self, WireError> {
        let len = usize::decode(r)?;
        // Don't trust the length for the allocation; a corrupt body runs out
        // of bytes soon enough.
        let mut v = Vec::with_capacity(len.min(4096));
        for _ in 0..len {
            v.push(T::decode(r)?);
        }
        Ok(v)
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for v in self {
            v.encode(w)?;
        }
        Ok(())
    }
}

impl<T: Decode, const N: usize> Decode for [T; N] {
    fn decode<R: Read>(r: &mut R) -> Result<Self, WireError> {
        let mut v = Vec::with_capacity(N);
        for _ in 0..N {
            v.push(T::decode(r)?);
        }
        v.try_into().map_err(|_| WireError::Truncated)
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        match self {
            Some(v) => {
                true.encode(w)?;
                v.encode(w)
            }
            None => false.encode(w),
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode<R: Read>(r: &mut R) -> Result<Self, WireError> {
        if bool::decode(r)? {
            Ok(Some(T::decode(r)?))
        } else {
            Ok(None)
        }
    }
}

impl<T: Encode> Encode for Arc<T> {
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.as_ref().encode(w)
    }
}

impl<T: Decode> Decode for Arc<T> {
    fn decode<R: Read>(r: &mut R) -> Result<Self, WireError> {
        Ok(Arc::new(T::decode(r)?))
    }
}

impl<A: Encode, B: Encode> Encode for (A, B) {
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.0.encode(w)?;
        self.1.encode(w)
    }
}

impl<A: Decode, B: Decode> Decode for (A, B) {
    fn decode<R: Read>(r: &mut R) -> Result<Self, WireError> {
        Ok((A::decode(r)?, B::decode(r)?))
    }
}

impl Encode for Complex<f32> {
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.re.encode(w)?;
        self.im.encode(w)
    }
}

impl Decode for Complex<f32> {
    fn decode<R: Read>(r: &mut R) -> Result<Self, WireError> {
        Ok(Complex::new(f32::decode(r)?, f32::decode(r)?))
    }
}

/// Write a string into a fixed-width, NUL-padded field.
pub(crate) fn write_fixed_string<W: Write>(w: &mut W, s: &str, width: usize) -> io::Result<()> {
    let bytes = s.as_bytes();
    if bytes.len() > width {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("'{s}' is longer than {width} bytes"),
        ));
    }
    w.write_all(bytes)?;
    w.write_all(&vec![0; width - bytes.len()])
}

/// Read a fixed-width, NUL-padded string field.
pub(crate) fn read_fixed_string<R: Read>(r: &mut R, width: usize) -> Result<String, WireError> {
    let mut buf = vec![0; width];
    r.read_exact(&mut buf)?;
    let end = buf.iter().position(|&b| b == 0).unwrap_or(width);
    buf.truncate(end);
    Ok(String::from_utf8(buf)?)
}
