// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

Calculations on the cycle data are done in double precision wherever
practical; visibilities themselves are stored in single precision, as they are
in the input files.
 */

pub use std::f64::consts::{PI, TAU};

/// The number of seconds in a day.
pub const SECONDS_PER_DAY: f64 = 86400.0;

/// The port the server listens on when none is specified.
pub const DEFAULT_PORT: u16 = 8880;

/// The reserved client ID under which preloaded products are registered.
pub const DEFAULT_CLIENT_ID: &str = "DEFAULT";

/// The fixed width of client IDs and usernames in message headers.
pub const CLIENT_ID_LENGTH: usize = 20;

/// Usernames shorter than this are rejected.
pub const MIN_USERNAME_LENGTH: usize = 6;

/// The number of rejected usernames after which a connection is closed.
pub const MAX_USERNAME_ATTEMPTS: usize = 5;

/// The largest frame body the server will accept \[bytes\].
pub const MAX_FRAME_LENGTH: u64 = 1 << 30;

/// Cycle times that differ by less than this are treated as identical
/// \[seconds\].
pub const MJD_TOLERANCE_SECONDS: f64 = 1e-4;

/// The autocorrelation bin holding noise-diode OFF samples.
pub const NOISE_DIODE_OFF_BIN: usize = 1;

/// The autocorrelation bin holding noise-diode ON samples.
pub const NOISE_DIODE_ON_BIN: usize = 2;

/// Computed Tsys values are set to the square root of this when the
/// noise-diode signal is too weak to measure.
pub const UNMEASURABLE_TSYS_SQUARED: f64 = 99.995 * 99.995;

/// The noise-diode signal must exceed this fraction of the total power before
/// a system temperature is computed.
pub const MIN_NOISE_DIODE_FRACTION: f64 = 0.01;

/// The default delay-averaging factor for a newly-installed window.
pub const DEFAULT_DELAY_AVERAGING: usize = 1;

/// The antenna that anchors closure triangles unless the user says otherwise.
pub const DEFAULT_REFERENCE_ANTENNA: usize = 1;

/// The preloaded spectrum is taken this far into a scan \[seconds\].
pub const PRELOAD_SCAN_OFFSET_SECONDS: f64 = 10.0;

/// The name of the spectrum dump file written in non-networked mode.
pub const SPECTRUM_DUMP_FILENAME: &str = "test_spd.dat";

/// The name of the vis dump file written in non-networked mode.
pub const VIS_DUMP_FILENAME: &str = "test_vis.dat";
