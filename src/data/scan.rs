// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Scan headers.

use hifitime::Epoch;
use regex::Regex;

use super::{DataError, Pol};
use crate::{constants::SECONDS_PER_DAY, misc::round_hundredths_of_a_second};

lazy_static::lazy_static! {
    static ref OBSDATE_RE: Regex = Regex::new(r"^\s*(\d{4})-(\d{1,2})-(\d{1,2})").expect("valid regex");
}

/// Whether a window is the wide band of its RF chain or a zoom carved out of
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    Continuum,
    Zoom,
}

/// A frequency window (IF).
#[derive(Debug, Clone, PartialEq)]
pub struct IfWindow {
    /// \[MHz\]
    pub centre_freq_mhz: f64,
    /// \[MHz\]
    pub bandwidth_mhz: f64,
    pub num_channels: usize,
    pub num_stokes: usize,
    /// +1 or -1.
    pub sideband: i32,
    /// The RF chain this window belongs to (1-based).
    pub chain: usize,
    /// The label of this window within its scan (1-based).
    pub label: usize,
    /// The names of the correlation products, in storage order.
    pub stokes: Vec<String>,

    pub kind: WindowKind,
    /// The position of this window within its chain (0 for the continuum
    /// window).
    pub chain_index: usize,
    /// Human-readable names, e.g. ["f3", "z1", "z1-1"]. These are derived
    /// from the structured fields above.
    pub names: [String; 3],
}

impl IfWindow {
    /// Create a window. Its kind, chain index and names are derived when it
    /// becomes part of a [ScanHeader].
    pub fn new(
        centre_freq_mhz: f64,
        bandwidth_mhz: f64,
        num_channels: usize,
        sideband: i32,
        chain: usize,
        stokes: Vec<String>,
    ) -> IfWindow {
        IfWindow {
            centre_freq_mhz,
            bandwidth_mhz,
            num_channels,
            num_stokes: stokes.len(),
            sideband: if sideband < 0 { -1 } else { 1 },
            chain,
            label: 0,
            stokes,
            kind: WindowKind::Continuum,
            chain_index: 0,
            names: Default::default(),
        }
    }

    /// The storage slot of a correlation product, if this window has it.
    pub fn stokes_slot(&self, pol: Pol) -> Option<usize> {
        let name = pol.to_string();
        self.stokes
            .iter()
            .position(|s| s.trim().eq_ignore_ascii_case(&name))
    }

    /// The correlation product stored in a slot, if it is a recognised one.
    pub fn stokes_pol(&self, slot: usize) -> Option<Pol> {
        self.stokes
            .get(slot)
            .and_then(|s| s.trim().to_uppercase().parse().ok())
    }

    /// The channel width \[MHz\], as used for default tvchannel selection.
    pub fn channel_width_mhz(&self) -> f64 {
        let half = self.num_channels / 2;
        if half == 0 {
            self.bandwidth_mhz
        } else {
            self.bandwidth_mhz / (2 * half) as f64
        }
    }

    /// The number of values held per data point for this window.
    pub fn num_values(&self) -> usize {
        self.num_channels * self.num_stokes
    }

    /// Does this window have the same centre frequency, bandwidth and channel
    /// count as the supplied values?
    pub fn same_configuration(
        &self,
        centre_freq_mhz: f64,
        bandwidth_mhz: f64,
        num_channels: usize,
    ) -> bool {
        self.centre_freq_mhz == centre_freq_mhz
            && self.bandwidth_mhz == bandwidth_mhz
            && self.num_channels == num_channels
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub name: String,
    /// \[degrees\]
    pub ra_deg: f64,
    /// \[degrees\]
    pub dec_deg: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Antenna {
    /// 1-based antenna number.
    pub number: usize,
    pub station: String,
    /// Geocentric XYZ \[metres\].
    pub xyz_m: [f64; 3],
}

/// Everything known about a scan before its cycles are read.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanHeader {
    /// The base UTC date, formatted as YYYY-MM-DD.
    pub obsdate: String,
    /// The start of the scan in seconds past midnight of `obsdate`.
    pub ut_seconds: f64,
    pub obstype: String,
    pub calcode: String,
    /// \[seconds\]
    pub cycle_time_s: f64,
    pub sources: Vec<Source>,
    pub windows: Vec<IfWindow>,
    pub antennas: Vec<Antenna>,
}

impl ScanHeader {
    /// Create a new header. Window labels, kinds and names are assigned here.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        obsdate: String,
        ut_seconds: f64,
        obstype: String,
        calcode: String,
        cycle_time_s: f64,
        sources: Vec<Source>,
        mut windows: Vec<IfWindow>,
        antennas: Vec<Antenna>,
    ) -> ScanHeader {
        name_windows(&mut windows);
        ScanHeader {
            obsdate,
            ut_seconds,
            obstype,
            calcode,
            cycle_time_s,
            sources,
            windows,
            antennas,
        }
    }

    /// Is there at least one window holding data?
    pub fn data_available(&self) -> bool {
        self.windows.iter().any(|w| w.num_values() > 0)
    }

    /// Get the window with the supplied (1-based) label.
    pub fn window(&self, label: usize) -> Option<&IfWindow> {
        self.windows.iter().find(|w| w.label == label)
    }

    /// The MJD at midnight of the observation date.
    pub fn base_mjd(&self) -> Result<f64, DataError> {
        obsdate_to_mjd(&self.obsdate)
    }

    /// The MJD of a time expressed in seconds past midnight of the observation
    /// date.
    pub fn mjd_at(&self, ut_seconds: f64) -> Result<f64, DataError> {
        Ok(self.base_mjd()? + round_hundredths_of_a_second(ut_seconds) / SECONDS_PER_DAY)
    }

    /// Half of the cycle time \[seconds\].
    pub fn half_cycle_s(&self) -> f64 {
        self.cycle_time_s / 2.0
    }

    pub fn source_name(&self) -> &str {
        self.sources.first().map(|s| s.name.as_str()).unwrap_or("")
    }
}

/// Parse a YYYY-MM-DD date into the MJD of its midnight.
pub(crate) fn obsdate_to_mjd(obsdate: &str) -> Result<f64, DataError> {
    let caps = OBSDATE_RE
        .captures(obsdate)
        .ok_or_else(|| DataError::BadObsDate(obsdate.to_string()))?;
    let field = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or("");
    let year: i32 = field(1)
        .parse()
        .map_err(|_| DataError::BadObsDate(obsdate.to_string()))?;
    let month: u8 = field(2)
        .parse()
        .map_err(|_| DataError::BadObsDate(obsdate.to_string()))?;
    let day: u8 = field(3)
        .parse()
        .map_err(|_| DataError::BadObsDate(obsdate.to_string()))?;
    if !(1..=12).contains(&month) {
        return Err(DataError::ObsDateOutOfRange {
            date: obsdate.to_string(),
            field: "month",
        });
    }
    if !(1..=31).contains(&day) {
        return Err(DataError::ObsDateOutOfRange {
            date: obsdate.to_string(),
            field: "day",
        });
    }

    Ok(Epoch::from_gregorian_utc_at_midnight(year, month, day).to_mjd_utc_days())
}

/// Assign labels, kinds, chain positions and the name triplet to each window,
/// in header order.
///
/// - name 0 is "f{label}";
/// - name 1 is "f{n}" for the n-th continuum window and "z{k}" for the k-th
///   zoom window, both counted across chains in header order;
/// - name 2 is "f{chain}" for the first window of a chain and "z{chain}-{m}"
///   for the m-th subsequent window of the same chain.
fn name_windows(windows: &mut [IfWindow]) {
    let mut continuum_count = 0;
    let mut zoom_count = 0;
    let mut chain_counts: Vec<(usize, usize)> = vec![];
    for (i, window) in windows.iter_mut().enumerate() {
        window.label = i + 1;

        let chain_index = match chain_counts.iter_mut().find(|(c, _)| *c == window.chain) {
            Some((_, count)) => {
                *count += 1;
                *count - 1
            }
            None => {
                chain_counts.push((window.chain, 1));
                0
            }
        };
        window.chain_index = chain_index;

        let (kind, second, third) = if chain_index == 0 {
            continuum_count += 1;
            (
                WindowKind::Continuum,
                format!("f{continuum_count}"),
                format!("f{}", window.chain),
            )
        } else {
            zoom_count += 1;
            (
                WindowKind::Zoom,
                format!("z{zoom_count}"),
                format!("z{}-{}", window.chain, chain_index),
            )
        };
        window.kind = kind;
        window.names = [format!("f{}", window.label), second, third];
    }
}
