// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Miscellaneous things.

use hifitime::Epoch;
use rand::{distributions::Uniform, Rng};

use crate::constants::{MJD_TOLERANCE_SECONDS, SECONDS_PER_DAY};

/// Convert an MJD to an [Epoch] (UTC) for display purposes.
pub(crate) fn mjd_to_epoch(mjd: f64) -> Epoch {
    Epoch::from_mjd_utc(mjd)
}

/// Cycle times are derived from a date and a number of seconds past midnight
/// stored in single precision, so they may be read in ever so slightly off
/// from their true values. If the seconds are really close to a neat value in
/// the hundredths, round them.
pub(crate) fn round_hundredths_of_a_second(seconds: f64) -> f64 {
    let hundredths = seconds * 100.0;
    if (hundredths.round() - hundredths).abs() < 0.1 {
        hundredths.round() / 100.0
    } else {
        seconds
    }
}

/// Are two MJDs within `half_window_seconds` of each other? A small tolerance
/// is allowed for float errors.
pub(crate) fn mjds_within(a: f64, b: f64, half_window_seconds: f64) -> bool {
    (a - b).abs() * SECONDS_PER_DAY <= half_window_seconds + MJD_TOLERANCE_SECONDS
}

/// Generate an identifier of `len` random printable (alphanumeric) ASCII
/// characters.
pub fn random_printable_id(len: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let dist = Uniform::from(0..CHARSET.len());
    rand::thread_rng()
        .sample_iter(dist)
        .take(len)
        .map(|i| CHARSET[i] as char)
        .collect()
}
