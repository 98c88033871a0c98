// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Time-windowed per-antenna corrections.

use crate::data::{Feed, Pol};

/// The column of the single-antenna cross-hand entry in per-antenna
/// delay/phase arrays. Columns 0 and 1 are the X and Y feeds.
pub const XY_COLUMN: usize = 2;

/// Adjustments applied while computing spectra, active only between
/// `start_mjd` and `end_mjd` (inclusive). Any subset of the adjustments may be
/// set. Per-antenna arrays are indexed by antenna number - 1.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Modifier {
    pub start_mjd: f64,
    pub end_mjd: f64,
    /// Delays to add \[ns\], columns X, Y, XY.
    pub delay_ns: Option<Vec<[f64; 3]>>,
    /// Phases to add \[radians\], columns X, Y, XY.
    pub phase_rad: Option<Vec<[f64; 3]>>,
    /// Noise-diode amplitudes to use instead of the recorded ones \[Jy\],
    /// columns X, Y.
    pub noise_diode_jy: Option<Vec<[f64; 2]>>,
}

impl Modifier {
    pub fn new(start_mjd: f64, end_mjd: f64) -> Modifier {
        Modifier {
            start_mjd,
            end_mjd,
            ..Default::default()
        }
    }

    pub fn is_active(&self, mjd: f64) -> bool {
        mjd >= self.start_mjd && mjd <= self.end_mjd
    }

    /// The delay difference for a correlation product on a baseline \[ns\].
    pub fn delay_difference(&self, ant1: usize, ant2: usize, pol: Pol) -> f64 {
        self.delay_ns
            .as_deref()
            .map(|d| difference(d, ant1, ant2, pol))
            .unwrap_or(0.0)
    }

    /// The phase difference for a correlation product on a baseline
    /// \[radians\].
    pub fn phase_difference(&self, ant1: usize, ant2: usize, pol: Pol) -> f64 {
        self.phase_rad
            .as_deref()
            .map(|p| difference(p, ant1, ant2, pol))
            .unwrap_or(0.0)
    }

    /// The noise-diode amplitude for an antenna's feed, if this modifier sets
    /// one.
    pub fn noise_diode(&self, antenna: usize, feed: Feed) -> Option<f64> {
        self.noise_diode_jy
            .as_deref()
            .and_then(|n| n.get(antenna.checked_sub(1)?))
            .map(|v| v[feed.index()])
    }
}

/// For a cross-correlation, the second antenna's value minus the first's, each
/// taken from its feed column. For an autocorrelation, the antenna's
/// cross-hand entry: positive for XY, negative for YX, zero otherwise.
fn difference(values: &[[f64; 3]], ant1: usize, ant2: usize, pol: Pol) -> f64 {
    let get = |ant: usize, column: usize| {
        ant.checked_sub(1)
            .and_then(|i| values.get(i))
            .map(|v| v[column])
            .unwrap_or(0.0)
    };

    if ant1 == ant2 {
        match pol {
            Pol::XY => get(ant1, XY_COLUMN),
            Pol::YX => -get(ant1, XY_COLUMN),
            Pol::XX | Pol::YY => 0.0,
        }
    } else {
        let (f1, f2) = pol.feeds();
        get(ant2, f2.index()) - get(ant1, f1.index())
    }
}
