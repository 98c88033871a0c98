// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Per-channel amplitude and phase spectra.
//!
//! An [AmpPhase] is derived from one cycle for one window and one
//! polarisation product. Every baseline present in the cycle gets a slot (in
//! compact baseline-index order), and each of its bins carries the dense
//! per-channel arrays as well as an "unflagged" copy that omits channels whose
//! raw value is NaN.

mod error;
#[cfg(test)]
mod tests;

pub use error::AmpPhaseError;

use std::sync::Arc;

use num_complex::Complex;

use crate::{
    constants::TAU,
    data::{split_baseline_code, CycleData, IfWindow, Pol, ScanHeader, SyscalSlice},
    math::{cexp, RangeTracker},
    options::{find_or_create_options, AmpPhaseOptions},
};

/// Minimum and maximum values; zeros if there were no finite values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Extents {
    pub amplitude: (f32, f32),
    pub phase: (f32, f32),
    pub real: (f32, f32),
    pub imag: (f32, f32),
}

#[derive(Debug, Clone, Copy, Default)]
struct ExtentsTracker {
    amplitude: RangeTracker,
    phase: RangeTracker,
    real: RangeTracker,
    imag: RangeTracker,
}

impl ExtentsTracker {
    fn update(&mut self, amplitude: f32, phase: f32, raw: Complex<f32>) {
        self.amplitude.update(amplitude);
        self.phase.update(phase);
        self.real.update(raw.re);
        self.imag.update(raw.im);
    }

    fn merge(&mut self, other: &ExtentsTracker) {
        self.amplitude.merge(&other.amplitude);
        self.phase.merge(&other.phase);
        self.real.merge(&other.real);
        self.imag.merge(&other.imag);
    }

    fn finish(&self) -> Extents {
        Extents {
            amplitude: self.amplitude.finish(),
            phase: self.phase.finish(),
            real: self.real.finish(),
            imag: self.imag.finish(),
        }
    }
}

/// The channels of a bin whose raw values aren't NaN.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnflaggedSpectrum {
    pub channel: Vec<f32>,
    pub frequency_ghz: Vec<f64>,
    pub weight: Vec<f32>,
    pub amplitude: Vec<f32>,
    pub phase: Vec<f32>,
    pub raw: Vec<Complex<f32>>,
}

impl UnflaggedSpectrum {
    pub fn num_channels(&self) -> usize {
        self.raw.len()
    }
}

/// One bin of one baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct BinSpectrum {
    /// The (1-based) bin number.
    pub bin: usize,
    pub flagged_bad: bool,
    pub weight: Vec<f32>,
    pub amplitude: Vec<f32>,
    pub phase: Vec<f32>,
    /// Modifier-corrected complex values.
    pub raw: Vec<Complex<f32>>,
    pub unflagged: UnflaggedSpectrum,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BaselineSpectrum {
    /// `256·ant1 + ant2`, with `ant1 <= ant2`.
    pub baseline: u32,
    /// Ordered by bin number.
    pub bins: Vec<BinSpectrum>,
    pub extents: Extents,
}

impl BaselineSpectrum {
    pub fn antennas(&self) -> (usize, usize) {
        split_baseline_code(self.baseline)
    }

    pub fn is_autocorrelation(&self) -> bool {
        let (a1, a2) = self.antennas();
        a1 == a2
    }

    pub fn bin(&self, bin: usize) -> Option<&BinSpectrum> {
        self.bins.iter().find(|b| b.bin == bin)
    }
}

/// Spectra of one window and polarisation product for one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct AmpPhase {
    pub header: Arc<ScanHeader>,
    pub ut_seconds: f64,
    pub mjd: f64,
    /// The window label (1-based).
    pub window: usize,
    pub pol: Pol,
    /// Channel numbers, as floats for plotting.
    pub channels: Vec<f32>,
    pub frequency_ghz: Vec<f64>,
    pub baselines: Vec<BaselineSpectrum>,
    pub extents: Extents,
    /// The options the spectra were computed with.
    pub options: AmpPhaseOptions,
    pub syscal: SyscalSlice,
}

impl AmpPhase {
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn num_baselines(&self) -> usize {
        self.baselines.len()
    }

    pub fn obsdate(&self) -> &str {
        &self.header.obsdate
    }

    pub fn baseline(&self, code: u32) -> Option<&BaselineSpectrum> {
        self.baselines.iter().find(|b| b.baseline == code)
    }

    pub fn window_info(&self) -> Option<&IfWindow> {
        self.header.window(self.window)
    }
}

/// The sky frequency of each channel of a window \[GHz\]. The centre
/// frequency falls on channel `N/2`.
pub fn channel_frequencies_ghz(window: &IfWindow) -> Vec<f64> {
    let half = window.num_channels / 2;
    let width = if half == 0 {
        window.sideband as f64 * window.bandwidth_mhz
    } else {
        window.sideband as f64 * window.bandwidth_mhz / (2 * half) as f64
    };
    let first = window.centre_freq_mhz - half as f64 * width;
    (0..window.num_channels)
        .map(|i| (first + i as f64 * width) / 1000.0)
        .collect()
}

/// Compute the spectra of a window and polarisation product.
///
/// The options for the header's IF configuration are found in
/// `options_list`, or created there from the first entry if absent. Active
/// delay and phase modifiers rotate the visibilities before amplitudes and
/// phases are taken.
pub fn compute_ampphase(
    header: &Arc<ScanHeader>,
    cycle: &CycleData,
    window: usize,
    pol: Pol,
    options_list: &mut Vec<AmpPhaseOptions>,
) -> Result<AmpPhase, AmpPhaseError> {
    let if_window = header.window(window).ok_or(AmpPhaseError::UnknownIF {
        window,
        num_windows: header.windows.len(),
    })?;
    let slot = if_window
        .stokes_slot(pol)
        .ok_or(AmpPhaseError::UnknownPolarization { window, pol })?;
    let mjd = header.mjd_at(cycle.ut_seconds)?;
    let options = find_or_create_options(options_list, header).clone();

    let num_channels = if_window.num_channels;
    let num_stokes = if_window.num_stokes;
    let frequency_ghz = channel_frequencies_ghz(if_window);
    let channels: Vec<f32> = (0..num_channels).map(|c| c as f32).collect();
    let phase_scale = if options.phase_in_degrees {
        360.0 / TAU
    } else {
        1.0
    };
    let modifiers: Vec<_> = options.active_modifiers(window, mjd).collect();

    let mut baselines: Vec<BaselineSpectrum> = cycle
        .baseline_codes()
        .map(|baseline| BaselineSpectrum {
            baseline,
            bins: vec![],
            extents: Extents::default(),
        })
        .collect();
    let mut trackers = vec![ExtentsTracker::default(); baselines.len()];

    for point in cycle.points.iter().filter(|p| p.window == window) {
        let bl_index = match cycle.baseline_index(point.baseline_code()) {
            Some(i) => i - 1,
            None => continue,
        };
        let (delay_ns, phase_rad) = modifiers.iter().fold((0.0, 0.0), |(d, p), m| {
            (
                d + m.delay_difference(point.ant1, point.ant2, pol),
                p + m.phase_difference(point.ant1, point.ant2, pol),
            )
        });

        let mut bin = BinSpectrum {
            bin: point.bin,
            flagged_bad: point.is_flagged(),
            weight: Vec::with_capacity(num_channels),
            amplitude: Vec::with_capacity(num_channels),
            phase: Vec::with_capacity(num_channels),
            raw: Vec::with_capacity(num_channels),
            unflagged: UnflaggedSpectrum::default(),
        };
        let tracker = &mut trackers[bl_index];
        for (chan, &freq) in frequency_ghz.iter().enumerate() {
            let original = point
                .value(slot, chan, num_stokes)
                .unwrap_or(Complex::new(f32::NAN, f32::NAN));
            let weight = point
                .weight
                .get(slot + chan * num_stokes)
                .copied()
                .unwrap_or(0.0);
            let raw = if delay_ns == 0.0 && phase_rad == 0.0 {
                original
            } else {
                let delay_angle = -TAU * delay_ns * freq;
                let rotated = Complex::new(original.re as f64, original.im as f64)
                    * cexp(delay_angle - phase_rad);
                Complex::new(rotated.re as f32, rotated.im as f32)
            };
            let amplitude = raw.norm();
            let phase = (raw.arg() as f64 * phase_scale) as f32;

            bin.weight.push(weight);
            bin.amplitude.push(amplitude);
            bin.phase.push(phase);
            bin.raw.push(raw);
            if !original.re.is_nan() {
                let u = &mut bin.unflagged;
                u.channel.push(chan as f32);
                u.frequency_ghz.push(freq);
                u.weight.push(weight);
                u.amplitude.push(amplitude);
                u.phase.push(phase);
                u.raw.push(raw);
            }
            tracker.update(amplitude, phase, raw);
        }
        baselines[bl_index].bins.push(bin);
    }

    let mut global = ExtentsTracker::default();
    for (baseline, tracker) in baselines.iter_mut().zip(trackers.iter()) {
        baseline.bins.sort_by_key(|b| b.bin);
        baseline.extents = tracker.finish();
        global.merge(tracker);
    }

    Ok(AmpPhase {
        header: Arc::clone(header),
        ut_seconds: cycle.ut_seconds,
        mjd,
        window,
        pol,
        channels,
        frequency_ghz,
        baselines,
        extents: global.finish(),
        syscal: cycle.syscal.slice(window, pol.parallel_feed()),
        options,
    })
}
