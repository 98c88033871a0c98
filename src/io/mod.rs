// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! File stuff (input/output, reading/writing, globs) for cycle files.
//!
//! # The cycle-file container
//!
//! A cycle file starts with the 8-byte magic [`MAGIC`], followed by records.
//! Each record is a one-byte tag, a big-endian `u32` payload length, then the
//! payload. All numbers in payloads are big-endian; strings are a `u32` byte
//! count followed by UTF-8.
//!
//! | Tag | Record | Payload |
//! |-----|--------|---------|
//! | `H` | scan header | date, UT, obstype, calcode, cycle time, sources, windows, antennas |
//! | `F` | flag table | opaque; skipped |
//! | `P` | data point | UT, u/v/w, baseline, flag, bin, window, source, values |
//! | `S` | SYSCAL row | window, antenna (0 for the site row), values |
//! | `T` | end of integration | UT |
//!
//! Point visibilities are stored Stokes-major (all channels of the first
//! product, then the next) as interleaved `f32` real/imaginary pairs, followed
//! by the weights in the same order. The reader transposes them into the
//! channel-major layout used by [crate::data::VisPoint].

mod format;
mod glob;
pub mod read;
pub mod write;

pub use format::MAGIC;
pub(crate) use self::glob::{expand_input_paths, GlobError};
