// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! System temperatures.
//!
//! Visibilities may be scaled by the system temperatures measured by the
//! correlator ("online") or by temperatures computed here from the
//! noise-diode bins of the autocorrelations. At most one table is applied at
//! any time; the state is kept in the SYSCAL cells of the cycle.
//!
//! A visibility of antennas `a1` and `a2` and feeds `f1` and `f2` is scaled by
//! `sqrt(Tsys(a1, f1) · Tsys(a2, f2))`.

mod error;

pub use error::TsysError;

use std::collections::HashMap;

use log::trace;

use crate::{
    constants::{
        MIN_NOISE_DIODE_FRACTION, NOISE_DIODE_OFF_BIN, NOISE_DIODE_ON_BIN,
        UNMEASURABLE_TSYS_SQUARED,
    },
    data::{CycleData, Feed, Pol, ScanHeader, TsysState},
    math::{mean, median},
    options::{AmpPhaseOptions, Statistic},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TsysAction {
    /// Scale by the correlator's system temperatures.
    ApplyCorrelator,
    /// Scale by the computed system temperatures.
    ApplyComputed,
    /// Undo whichever scaling is applied.
    Remove,
}

impl TsysAction {
    /// The action that leaves a cycle in the state the options ask for.
    pub fn from_options(options: &AmpPhaseOptions) -> TsysAction {
        match (options.systemp_reverse_online, options.systemp_apply_computed) {
            (true, true) => TsysAction::ApplyComputed,
            (true, false) => TsysAction::Remove,
            (false, _) => TsysAction::ApplyCorrelator,
        }
    }
}

/// Change the Tsys scaling of a cycle. Applying one table while the other is
/// applied removes the other first; removing when nothing is applied, or
/// applying the table already applied, does nothing.
pub fn apply_tsys_action(header: &ScanHeader, cycle: &mut CycleData, action: TsysAction) {
    let state = cycle.syscal.tsys_state();
    let target = match action {
        TsysAction::ApplyCorrelator => TsysState::Online,
        TsysAction::ApplyComputed => TsysState::Computed,
        TsysAction::Remove => TsysState::None,
    };
    if state == target {
        return;
    }
    if state != TsysState::None {
        rescale(header, cycle, state, false);
    }
    if target != TsysState::None {
        rescale(header, cycle, target, true);
    }
    for cell in cycle.syscal.cells_mut() {
        cell.applied = target;
    }
    trace!("Tsys state of cycle at {} s: {state:?} -> {target:?}", cycle.ut_seconds);
}

/// Multiply (`apply`) or divide every visibility by the scaling of `table`.
/// Visibilities without a usable temperature for both antennas are left as
/// they are.
fn rescale(header: &ScanHeader, cycle: &mut CycleData, table: TsysState, apply: bool) {
    let mut temperatures: HashMap<(usize, usize), [f32; 2]> = HashMap::new();
    for cell in cycle.syscal.cells() {
        let t = match table {
            TsysState::Online => cell.tsys,
            TsysState::Computed => cell.computed_tsys,
            TsysState::None => return,
        };
        temperatures.insert((cell.window, cell.antenna), t);
    }

    for point in cycle.points.iter_mut() {
        let window = match header.window(point.window) {
            Some(w) => w,
            None => continue,
        };
        let (t1, t2) = match (
            temperatures.get(&(point.window, point.ant1)),
            temperatures.get(&(point.window, point.ant2)),
        ) {
            (Some(t1), Some(t2)) => (t1, t2),
            _ => continue,
        };
        let num_stokes = window.num_stokes;
        for slot in 0..num_stokes {
            let pol = match window.stokes_pol(slot) {
                Some(p) => p,
                None => continue,
            };
            let (f1, f2) = pol.feeds();
            let factor = (t1[f1.index()] as f64 * t2[f2.index()] as f64).sqrt();
            if !factor.is_finite() || factor <= 0.0 {
                continue;
            }
            for v in point.vis.iter_mut().skip(slot).step_by(num_stokes) {
                let (re, im) = if apply {
                    (v.re as f64 * factor, v.im as f64 * factor)
                } else {
                    (v.re as f64 / factor, v.im as f64 / factor)
                };
                v.re = re as f32;
                v.im = im as f32;
            }
        }
    }
}

/// Compute system temperatures from the autocorrelations' noise-diode bins.
///
/// For each (window, antenna, feed), the real parts of the parallel-hand
/// autocorrelation within the window's tvchannels are reduced with the
/// window's averaging statistic into `on` (bin 2) and `off` (bin 1) powers.
/// With `fs = (on + off) / 2` and `fd = on - off`, the computed Tsys is
/// `sqrt(fs / fd · CALJY)`, or 99.995 if the noise diode is too weak to
/// measure. An active noise-diode modifier replaces the recorded CALJY.
///
/// Missing tvchannels are installed in `options` with their defaults.
pub fn compute_tsys(
    header: &ScanHeader,
    cycle: &mut CycleData,
    options: &mut AmpPhaseOptions,
) -> Result<(), TsysError> {
    let mjd = header.mjd_at(cycle.ut_seconds)?;

    for window in &header.windows {
        let label = window.label;
        let tv = options.tvchannels_or_default(header, label)?;
        let channels = tv.clamp(window.num_channels);
        let statistic = options
            .window(label)
            .map(|w| w.effective_averaging().statistic)
            .unwrap_or(Statistic::Mean);

        let antennas: Vec<usize> = cycle
            .syscal
            .cells()
            .filter(|c| c.window == label)
            .map(|c| c.antenna)
            .collect();
        for antenna in antennas {
            for feed in [Feed::X, Feed::Y] {
                let pol = match feed {
                    Feed::X => Pol::XX,
                    Feed::Y => Pol::YY,
                };
                let slot = match window.stokes_slot(pol) {
                    Some(s) => s,
                    None => continue,
                };

                let mut on = vec![];
                let mut off = vec![];
                for point in cycle
                    .points
                    .iter()
                    .filter(|p| p.window == label && p.ant1 == antenna && p.ant2 == antenna)
                {
                    let bucket = match point.bin {
                        NOISE_DIODE_OFF_BIN => &mut off,
                        NOISE_DIODE_ON_BIN => &mut on,
                        bin => {
                            return Err(TsysError::UnexpectedBin {
                                window: label,
                                antenna,
                                bin,
                            })
                        }
                    };
                    for chan in channels.clone() {
                        if let Some(v) = point.value(slot, chan, window.num_stokes) {
                            if !v.re.is_nan() {
                                bucket.push(v.re as f64);
                            }
                        }
                    }
                }
                if on.is_empty() || off.is_empty() {
                    continue;
                }

                let reduce = |values: &[f64]| match statistic {
                    Statistic::Mean => mean(values),
                    Statistic::Median => median(values),
                };
                let (tp_on, tp_off) = (reduce(&on), reduce(&off));
                let fs = (tp_on + tp_off) / 2.0;
                let fd = tp_on - tp_off;

                let cell = match cycle.syscal.cell_mut(label, antenna) {
                    Some(c) => c,
                    None => continue,
                };
                let caljy = options
                    .active_modifiers(label, mjd)
                    .find_map(|m| m.noise_diode(antenna, feed))
                    .unwrap_or(cell.caljy[feed.index()] as f64);
                let dx = if fd > MIN_NOISE_DIODE_FRACTION * fs {
                    fs / fd * caljy
                } else {
                    UNMEASURABLE_TSYS_SQUARED
                };
                let i = feed.index();
                cell.computed_tsys[i] = dx.sqrt() as f32;
                cell.computed_gtp[i] = fs as f32;
                cell.computed_sdo[i] = fd as f32;
            }
        }
    }
    Ok(())
}

/// Recompute the system temperatures of a cycle and leave it scaled the way
/// the options ask for. If the computed temperatures were applied on entry,
/// they are removed before recomputing.
pub fn calibrate_cycle(
    header: &ScanHeader,
    cycle: &mut CycleData,
    options: &mut AmpPhaseOptions,
) -> Result<(), TsysError> {
    if cycle.syscal.tsys_state() == TsysState::Computed {
        apply_tsys_action(header, cycle, TsysAction::Remove);
    }
    compute_tsys(header, cycle, options)?;
    apply_tsys_action(header, cycle, TsysAction::from_options(options));
    Ok(())
}
