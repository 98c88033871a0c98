// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Cycle data.

use std::collections::BTreeSet;

use indexmap::IndexSet;
use num_complex::Complex;

use super::{IfWindow, Pol, Syscal};

/// Pack an antenna pair into a baseline code. The smaller antenna number
/// always comes first.
pub fn baseline_code(ant1: usize, ant2: usize) -> u32 {
    let (a1, a2) = if ant1 <= ant2 {
        (ant1, ant2)
    } else {
        (ant2, ant1)
    };
    (256 * a1 + a2) as u32
}

/// Unpack a baseline code into its antenna pair.
pub fn split_baseline_code(code: u32) -> (usize, usize) {
    ((code / 256) as usize, (code % 256) as usize)
}

/// A single data point: one baseline, bin and window of a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct VisPoint {
    /// \[metres\]
    pub u_m: f32,
    /// \[metres\]
    pub v_m: f32,
    /// \[metres\]
    pub w_m: f32,
    pub ant1: usize,
    pub ant2: usize,
    /// Nonzero if the point is flagged bad.
    pub flag: i32,
    /// 1-based bin number.
    pub bin: usize,
    /// The label of the window this point belongs to.
    pub window: usize,
    /// 1-based source number.
    pub source: usize,
    /// Channel-major visibilities: `vis[stokes + channel * num_stokes]`.
    pub vis: Vec<Complex<f32>>,
    /// Weights with the same indexing as `vis`.
    pub weight: Vec<f32>,
}

impl VisPoint {
    pub fn baseline_code(&self) -> u32 {
        baseline_code(self.ant1, self.ant2)
    }

    pub fn is_autocorrelation(&self) -> bool {
        self.ant1 == self.ant2
    }

    pub fn is_flagged(&self) -> bool {
        self.flag != 0
    }

    /// Ensure `ant1 <= ant2`. Reversed points have their antennas swapped,
    /// visibilities conjugated, UVWs negated and cross-hand products
    /// exchanged.
    pub fn normalise(&mut self, window: &IfWindow) {
        if self.ant1 <= self.ant2 {
            return;
        }
        std::mem::swap(&mut self.ant1, &mut self.ant2);
        self.u_m = -self.u_m;
        self.v_m = -self.v_m;
        self.w_m = -self.w_m;
        self.vis.iter_mut().for_each(|v| *v = v.conj());

        if let (Some(xy), Some(yx)) = (window.stokes_slot(Pol::XY), window.stokes_slot(Pol::YX)) {
            let num_stokes = window.num_stokes.max(1);
            for chan in 0..window.num_channels {
                let (i, j) = (xy + chan * num_stokes, yx + chan * num_stokes);
                if i < self.vis.len() && j < self.vis.len() {
                    self.vis.swap(i, j);
                }
                if i < self.weight.len() && j < self.weight.len() {
                    self.weight.swap(i, j);
                }
            }
        }
    }

    /// The visibility of a product in a channel, if present.
    pub fn value(&self, slot: usize, channel: usize, num_stokes: usize) -> Option<Complex<f32>> {
        self.vis.get(slot + channel * num_stokes).copied()
    }
}

/// One integration's worth of data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CycleData {
    /// Seconds past midnight of the scan header's observation date.
    pub ut_seconds: f64,
    pub points: Vec<VisPoint>,
    baselines: IndexSet<u32>,
    pub syscal: Syscal,
}

impl CycleData {
    /// Build a cycle from normalised points. The baseline presence map is
    /// ordered by baseline code.
    pub fn new(ut_seconds: f64, points: Vec<VisPoint>, syscal: Syscal) -> CycleData {
        let mut baselines: IndexSet<u32> = points.iter().map(|p| p.baseline_code()).collect();
        baselines.sort();
        CycleData {
            ut_seconds,
            points,
            baselines,
            syscal,
        }
    }

    /// The compact (1-based) index of a baseline, if it is present in this
    /// cycle.
    pub fn baseline_index(&self, code: u32) -> Option<usize> {
        self.baselines.get_index_of(&code).map(|i| i + 1)
    }

    /// The baseline codes present in this cycle, in compact-index order.
    pub fn baseline_codes(&self) -> impl Iterator<Item = u32> + '_ {
        self.baselines.iter().copied()
    }

    pub fn num_baselines(&self) -> usize {
        self.baselines.len()
    }

    /// The antenna numbers appearing in this cycle, ascending.
    pub fn antennas(&self) -> BTreeSet<usize> {
        self.points.iter().flat_map(|p| [p.ant1, p.ant2]).collect()
    }
}
