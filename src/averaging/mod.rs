// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reduce spectra to per-cycle quantities: amplitude, phase and delay per
//! baseline and bin, and closure phases on triangles anchored at the
//! reference antenna.


use std::{collections::BTreeSet, ops::Range, sync::Arc};

use num_complex::Complex;

use crate::{
    ampphase::{AmpPhase, BinSpectrum},
    constants::TAU,
    data::{baseline_code, Pol, ScanHeader},
    math::{
        complex_mean, complex_median, mean, median, phase_turn, smallest_phase_difference,
        wrap_phase, RangeTracker,
    },
    options::{default_tvchannels, AmpPhaseOptions, AverageKind, AveragingMethod, Statistic},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinQuantities {
    pub bin: usize,
    pub amplitude: f32,
    /// In degrees or radians, as the options ask.
    pub phase: f32,
    pub delay_ns: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BaselineQuantities {
    pub baseline: u32,
    /// The number of flagged bins, when flagged data are excluded.
    pub flagged_bad: usize,
    pub bins: Vec<BinQuantities>,
}

/// The closure phase of a triangle, per bin.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosurePhase {
    /// Ascending; one of them is the reference antenna.
    pub antennas: [usize; 3],
    pub phase: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QuantityExtents {
    pub amplitude: (f32, f32),
    pub phase: (f32, f32),
    pub delay_ns: (f32, f32),
    pub closure_phase: (f32, f32),
}

/// Averaged quantities of one window and polarisation product for one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct VisQuantities {
    pub header: Arc<ScanHeader>,
    pub ut_seconds: f64,
    pub mjd: f64,
    pub window: usize,
    pub pol: Pol,
    pub options: AmpPhaseOptions,
    pub baselines: Vec<BaselineQuantities>,
    pub closures: Vec<ClosurePhase>,
    pub extents: QuantityExtents,
}

impl VisQuantities {
    pub fn obsdate(&self) -> &str {
        &self.header.obsdate
    }

    pub fn baseline(&self, code: u32) -> Option<&BaselineQuantities> {
        self.baselines.iter().find(|b| b.baseline == code)
    }
}

/// A group of adjacent channels reduced to one complex value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ChannelGroup {
    pub(crate) value: Complex<f64>,
    pub(crate) frequency_ghz: f64,
}

fn reduce(values: &[f64], statistic: Statistic) -> f64 {
    match statistic {
        Statistic::Mean => mean(values),
        Statistic::Median => median(values),
    }
}

fn reduce_complex(values: &[Complex<f64>], statistic: Statistic) -> Complex<f64> {
    match statistic {
        Statistic::Mean => complex_mean(values),
        Statistic::Median => complex_median(values),
    }
}

/// Split `channels` into groups of `group_size` and reduce each group's
/// non-NaN values and frequencies. Groups without any values are omitted.
pub(crate) fn average_channels(
    raw: &[Complex<f32>],
    frequency_ghz: &[f64],
    channels: Range<usize>,
    group_size: usize,
    statistic: Statistic,
) -> Vec<ChannelGroup> {
    let group_size = group_size.max(1);
    let channels: Vec<usize> = channels.collect();
    channels
        .chunks(group_size)
        .filter_map(|group| {
            let (values, freqs): (Vec<Complex<f64>>, Vec<f64>) = group
                .iter()
                .filter_map(|&c| {
                    let v = raw.get(c)?;
                    if v.re.is_nan() {
                        return None;
                    }
                    Some((
                        Complex::new(v.re as f64, v.im as f64),
                        *frequency_ghz.get(c)?,
                    ))
                })
                .unzip();
            if values.is_empty() {
                return None;
            }
            Some(ChannelGroup {
                value: reduce_complex(&values, statistic),
                frequency_ghz: reduce(&freqs, statistic),
            })
        })
        .collect()
}

/// The delay from the phase slope between adjacent channel groups \[ns\].
/// NaN if there are fewer than two groups.
pub(crate) fn group_delay_ns(groups: &[ChannelGroup], statistic: Statistic, degrees: bool) -> f64 {
    let turn = phase_turn(degrees);
    let to_units = if degrees { 360.0 / TAU } else { 1.0 };
    let delays: Vec<f64> = groups
        .windows(2)
        .filter_map(|pair| {
            let df_mhz = (pair[1].frequency_ghz - pair[0].frequency_ghz) * 1000.0;
            if df_mhz == 0.0 {
                return None;
            }
            let dphi = smallest_phase_difference(
                pair[0].value.arg() * to_units,
                pair[1].value.arg() * to_units,
                turn,
            );
            // Phase per MHz gives microseconds.
            Some(dphi / (turn * df_mhz) * 1000.0)
        })
        .collect();
    reduce(&delays, statistic)
}

fn average_bin(
    spectrum: &BinSpectrum,
    frequency_ghz: &[f64],
    channels: Range<usize>,
    method: AveragingMethod,
    delay_averaging: usize,
    degrees: bool,
) -> BinQuantities {
    let to_units = if degrees { 360.0 / TAU } else { 1.0 };
    let selected: Vec<usize> = channels
        .clone()
        .filter(|&c| spectrum.raw.get(c).map_or(false, |v| !v.re.is_nan()))
        .collect();

    let (amplitude, phase) = match method.kind {
        AverageKind::Scalar => {
            let amps: Vec<f64> = selected.iter().map(|&c| spectrum.amplitude[c] as f64).collect();
            let phases: Vec<f64> = selected.iter().map(|&c| spectrum.phase[c] as f64).collect();
            (reduce(&amps, method.statistic), reduce(&phases, method.statistic))
        }
        AverageKind::Vector => {
            let values: Vec<Complex<f64>> = selected
                .iter()
                .map(|&c| Complex::new(spectrum.raw[c].re as f64, spectrum.raw[c].im as f64))
                .collect();
            let v = reduce_complex(&values, method.statistic);
            (v.norm(), v.arg() * to_units)
        }
    };

    let groups = average_channels(
        &spectrum.raw,
        frequency_ghz,
        channels,
        delay_averaging,
        method.statistic,
    );
    let delay_ns = group_delay_ns(&groups, method.statistic, degrees);

    BinQuantities {
        bin: spectrum.bin,
        amplitude: amplitude as f32,
        phase: phase as f32,
        delay_ns: delay_ns as f32,
    }
}

/// Reduce spectra under the supplied options. Channels within the window's
/// tvchannels (the default range if unset) are used; channels with NaN values
/// are skipped. Flagged bins are set to NaN and counted unless flagged data
/// are included.
pub fn compute_vis_quantities(ampphase: &AmpPhase, options: &AmpPhaseOptions) -> VisQuantities {
    let window_options = options.window(ampphase.window);
    let num_channels = ampphase.num_channels();
    let tv = window_options
        .and_then(|w| w.tvchannels)
        .or_else(|| {
            ampphase.window_info().map(|w| {
                default_tvchannels(w.num_channels, w.channel_width_mhz(), w.centre_freq_mhz)
            })
        });
    let channels = tv.map(|tv| tv.clamp(num_channels)).unwrap_or(0..num_channels);
    let method = window_options
        .map(|w| w.effective_averaging())
        .unwrap_or_default();
    let delay_averaging = window_options
        .map(|w| w.effective_delay_averaging())
        .unwrap_or(1);
    let degrees = options.phase_in_degrees;

    let mut amplitude = RangeTracker::default();
    let mut phase = RangeTracker::default();
    let mut delay = RangeTracker::default();

    let baselines: Vec<BaselineQuantities> = ampphase
        .baselines
        .iter()
        .map(|bl| {
            let mut flagged_bad = 0;
            let bins = bl
                .bins
                .iter()
                .map(|spectrum| {
                    if spectrum.flagged_bad && !options.include_flagged_data {
                        flagged_bad += 1;
                        return BinQuantities {
                            bin: spectrum.bin,
                            amplitude: f32::NAN,
                            phase: f32::NAN,
                            delay_ns: f32::NAN,
                        };
                    }
                    let q = average_bin(
                        spectrum,
                        &ampphase.frequency_ghz,
                        channels.clone(),
                        method,
                        delay_averaging,
                        degrees,
                    );
                    amplitude.update(q.amplitude);
                    phase.update(q.phase);
                    delay.update(q.delay_ns);
                    q
                })
                .collect();
            BaselineQuantities {
                baseline: bl.baseline,
                flagged_bad,
                bins,
            }
        })
        .collect();

    let closures = closure_phases(&baselines, options.reference_antenna, degrees);
    let mut closure = RangeTracker::default();
    for c in &closures {
        c.phase.iter().for_each(|&p| closure.update(p));
    }

    VisQuantities {
        header: Arc::clone(&ampphase.header),
        ut_seconds: ampphase.ut_seconds,
        mjd: ampphase.mjd,
        window: ampphase.window,
        pol: ampphase.pol,
        options: options.clone(),
        baselines,
        closures,
        extents: QuantityExtents {
            amplitude: amplitude.finish(),
            phase: phase.finish(),
            delay_ns: delay.finish(),
            closure_phase: closure.finish(),
        },
    }
}

/// Closure phases of all triangles `(reference, i, j)` with `i < j`. The
/// phase of a baseline traversed against its stored order is negated.
fn closure_phases(
    baselines: &[BaselineQuantities],
    reference: usize,
    degrees: bool,
) -> Vec<ClosurePhase> {
    let turn = phase_turn(degrees);
    let find = |a: usize, b: usize| {
        let code = baseline_code(a, b);
        baselines.iter().find(|bl| bl.baseline == code)
    };
    // The phase of a baseline in bin index `i`, from `a` to `b`.
    let directed = |a: usize, b: usize, i: usize| -> Option<f64> {
        let p = find(a, b)?.bins.get(i)?.phase as f64;
        Some(if a <= b { p } else { -p })
    };

    let antennas: BTreeSet<usize> = baselines
        .iter()
        .flat_map(|bl| {
            let (a1, a2) = crate::data::split_baseline_code(bl.baseline);
            if a1 == a2 {
                vec![]
            } else {
                vec![a1, a2]
            }
        })
        .collect();
    if !antennas.contains(&reference) {
        return vec![];
    }
    let others: Vec<usize> = antennas.into_iter().filter(|&a| a != reference).collect();

    let mut closures = vec![];
    for (k, &i) in others.iter().enumerate() {
        for &j in &others[k + 1..] {
            let legs = [find(reference, i), find(i, j), find(j, reference)];
            if legs.iter().any(|l| l.is_none()) {
                continue;
            }
            let num_bins = legs
                .iter()
                .flatten()
                .map(|l| l.bins.len())
                .min()
                .unwrap_or(0);
            let phase = (0..num_bins)
                .map(|b| {
                    match (
                        directed(reference, i, b),
                        directed(i, j, b),
                        directed(j, reference, b),
                    ) {
                        (Some(p1), Some(p2), Some(p3)) => wrap_phase(p1 + p2 + p3, turn) as f32,
                        _ => f32::NAN,
                    }
                })
                .collect();
            let mut triangle = [reference, i, j];
            triangle.sort_unstable();
            closures.push(ClosurePhase {
                antennas: triangle,
                phase,
            });
        }
    }
    closures
}
